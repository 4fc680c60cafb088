//! Scenario tests for the reconciliation and cleanup engines over mock
//! sources, plus filesystem tests for the snapshot store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use rejoin_connector::error::{ConnectorError, ConnectorResult};
use rejoin_connector::traits::{
    CloudDeviceSource, DirectorySource, ManagedDeviceSource, SiteDeviceSource, Source,
};
use rejoin_core::models::{
    CmDevice, DirectoryDevice, InventoryDevice, InventorySource, Snapshot, SnapshotMetrics,
};
use rejoin_core::options::{CleanupOptions, SnapshotOptions};
use rejoin_engine::{
    CleanupEngine, EngineError, FileSnapshotStore, Reconciler, SccmCleanupEngine, SnapshotStore,
    StoreError,
};

// ---------------------------------------------------------------------------
// Mock sources
// ---------------------------------------------------------------------------

struct MockDirectory {
    devices: Vec<DirectoryDevice>,
}

#[async_trait]
impl Source for MockDirectory {
    fn display_name(&self) -> &str {
        "mock-directory"
    }
    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DirectorySource for MockDirectory {
    async fn fetch_computers(&self) -> ConnectorResult<Vec<DirectoryDevice>> {
        Ok(self.devices.clone())
    }
}

#[derive(Default)]
struct MockEntra {
    devices: Vec<InventoryDevice>,
    deleted: Mutex<Vec<Uuid>>,
    fail_ids: Vec<Uuid>,
}

#[async_trait]
impl Source for MockEntra {
    fn display_name(&self) -> &str {
        "mock-entra"
    }
    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CloudDeviceSource for MockEntra {
    async fn fetch_devices(&self) -> ConnectorResult<Vec<InventoryDevice>> {
        Ok(self.devices.clone())
    }

    async fn delete_device(&self, id: Uuid) -> ConnectorResult<()> {
        if self.fail_ids.contains(&id) {
            return Err(ConnectorError::operation_failed("simulated delete failure"));
        }
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

#[derive(Default)]
struct MockIntune {
    devices: Vec<InventoryDevice>,
    deleted: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl Source for MockIntune {
    fn display_name(&self) -> &str {
        "mock-intune"
    }
    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ManagedDeviceSource for MockIntune {
    async fn fetch_managed_devices(&self) -> ConnectorResult<Vec<InventoryDevice>> {
        Ok(self.devices.clone())
    }

    async fn delete_managed_device(&self, id: Uuid) -> ConnectorResult<()> {
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

#[derive(Default)]
struct MockSite {
    devices_by_filter: HashMap<String, Vec<CmDevice>>,
    missing_ids: Vec<i64>,
    deleted: Mutex<Vec<i64>>,
}

#[async_trait]
impl Source for MockSite {
    fn display_name(&self) -> &str {
        "mock-site"
    }
    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SiteDeviceSource for MockSite {
    async fn fetch_devices_where(&self, filter: &str) -> ConnectorResult<Vec<CmDevice>> {
        Ok(self.devices_by_filter.get(filter).cloned().unwrap_or_default())
    }

    async fn delete_device_by_resource_id(&self, resource_id: i64) -> ConnectorResult<bool> {
        if self.missing_ids.contains(&resource_id) {
            return Ok(false);
        }
        self.deleted.lock().unwrap().push(resource_id);
        Ok(true)
    }
}

#[derive(Default)]
struct MemoryStore {
    snapshots: Mutex<Vec<Snapshot>>,
    saves: AtomicUsize,
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn get_latest(&self) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.lock().unwrap().last().cloned())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn directory_device(name: &str) -> DirectoryDevice {
    DirectoryDevice {
        object_guid: Uuid::new_v4(),
        account_name: name.to_string(),
        distinguished_name: format!("CN={name},OU=Workstations,DC=corp,DC=example"),
        dns_host_name: None,
        operating_system: Some("Windows 11 Enterprise".to_string()),
        operating_system_version: None,
        last_activity_at: Some(Utc::now() - Duration::days(1)),
        changed_at: None,
        cloud_device_id: None,
    }
}

fn inventory_device(name: &str, source: InventorySource) -> InventoryDevice {
    InventoryDevice {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        cloud_device_id: None,
        operating_system: None,
        operating_system_version: None,
        last_seen_at: None,
        source,
    }
}

fn snapshot_with(
    directory_devices: Vec<DirectoryDevice>,
    entra_devices: Vec<InventoryDevice>,
    intune_devices: Vec<InventoryDevice>,
) -> Snapshot {
    Snapshot {
        captured_at: Utc::now(),
        metrics: SnapshotMetrics {
            directory_count: directory_devices.len(),
            entra_count: entra_devices.len(),
            intune_count: intune_devices.len(),
            missing_in_entra_count: 0,
            missing_in_intune_count: 0,
            stale_count: 0,
        },
        directory_devices,
        entra_devices,
        intune_devices,
        missing_in_entra: vec![],
        missing_in_intune: vec![],
    }
}

fn cleanup_options(delete_entra: bool, delete_intune: bool, dry_run: bool) -> CleanupOptions {
    CleanupOptions {
        enabled: true,
        delete_entra,
        delete_intune,
        dry_run,
        fresh_window_days: 30,
    }
}

fn reconciler(
    directory: Vec<DirectoryDevice>,
    entra: Vec<InventoryDevice>,
    intune: Vec<InventoryDevice>,
    store: Arc<MemoryStore>,
) -> Reconciler {
    Reconciler::new(
        Arc::new(MockDirectory { devices: directory }),
        Arc::new(MockEntra {
            devices: entra,
            ..Default::default()
        }),
        Arc::new(MockIntune {
            devices: intune,
            ..Default::default()
        }),
        store,
        30,
    )
}

// ---------------------------------------------------------------------------
// Reconciliation scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unlinked_active_device_is_missing_in_entra() {
    let store = Arc::new(MemoryStore::default());
    let device = directory_device("WKS-A$");
    let engine = reconciler(vec![device.clone()], vec![], vec![], store.clone());

    let snapshot = engine.reconcile(&CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.metrics.directory_count, 1);
    assert_eq!(snapshot.metrics.missing_in_entra_count, 1);
    assert_eq!(snapshot.missing_in_entra[0].object_guid, device.object_guid);
    // The snapshot was persisted before being returned
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn linked_device_is_correlated_not_missing() {
    let linked = Uuid::new_v4();
    let mut device = directory_device("WKS-B$");
    device.cloud_device_id = Some(linked);

    let mut cloud = inventory_device("totally-renamed", InventorySource::EntraId);
    cloud.cloud_device_id = Some(linked);

    let store = Arc::new(MemoryStore::default());
    let engine = reconciler(vec![device], vec![cloud], vec![], store);

    let snapshot = engine.reconcile(&CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.metrics.missing_in_entra_count, 0);
    assert!(snapshot.missing_in_entra.is_empty());
}

#[tokio::test]
async fn stale_and_timestampless_devices_leave_the_active_set() {
    let active = directory_device("WKS-C$");
    let mut stale = directory_device("WKS-D$");
    stale.last_activity_at = Some(Utc::now() - Duration::days(90));
    let mut never_seen = directory_device("WKS-E$");
    never_seen.last_activity_at = None;

    let store = Arc::new(MemoryStore::default());
    let engine = reconciler(vec![active, stale, never_seen], vec![], vec![], store);

    let snapshot = engine.reconcile(&CancellationToken::new()).await.unwrap();

    assert_eq!(snapshot.metrics.directory_count, 1);
    assert_eq!(snapshot.metrics.stale_count, 2);
    assert_eq!(snapshot.directory_devices.len(), 1);
    assert_eq!(snapshot.directory_devices[0].account_name, "WKS-C$");
}

#[tokio::test]
async fn missing_sets_are_subsets_of_the_active_set() {
    let devices: Vec<DirectoryDevice> = (0..5)
        .map(|i| directory_device(&format!("WKS-{i}$")))
        .collect();
    let cloud = inventory_device("WKS-2$", InventorySource::EntraId);

    let store = Arc::new(MemoryStore::default());
    let engine = reconciler(devices, vec![cloud], vec![], store);

    let snapshot = engine.reconcile(&CancellationToken::new()).await.unwrap();

    for missing in &snapshot.missing_in_entra {
        assert!(snapshot
            .directory_devices
            .iter()
            .any(|d| d.object_guid == missing.object_guid));
    }
    assert_eq!(snapshot.metrics.missing_in_entra_count, 4);
}

#[tokio::test]
async fn reconciliation_metrics_are_idempotent() {
    let devices = vec![directory_device("WKS-F$"), directory_device("WKS-G$")];
    let cloud = inventory_device("WKS-F$", InventorySource::EntraId);

    let store = Arc::new(MemoryStore::default());
    let engine = reconciler(devices, vec![cloud], vec![], store);

    let cancel = CancellationToken::new();
    let first = engine.reconcile(&cancel).await.unwrap();
    let second = engine.reconcile(&cancel).await.unwrap();

    assert_eq!(first.metrics, second.metrics);
}

#[tokio::test]
async fn cancelled_reconciliation_saves_nothing() {
    let store = Arc::new(MemoryStore::default());
    let engine = reconciler(vec![directory_device("WKS-H$")], vec![], vec![], store.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine.reconcile(&cancel).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Cleanup scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cleanup_never_deletes_devices_with_active_counterparts() {
    let linked = Uuid::new_v4();
    let mut account = directory_device("WKS-I$");
    account.cloud_device_id = Some(linked);

    let mut cloud = inventory_device("WKS-I-renamed", InventorySource::EntraId);
    cloud.cloud_device_id = Some(linked);

    let entra = Arc::new(MockEntra::default());
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra.clone(),
        intune,
        cleanup_options(true, false, false),
    );

    let snapshot = snapshot_with(vec![account], vec![cloud], vec![]);
    let report = engine
        .perform_cleanup(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    assert!(entra.deleted.lock().unwrap().is_empty());
    assert_eq!(report.entra.skipped_active, 1);
    assert_eq!(report.entra.deleted, 0);
}

#[tokio::test]
async fn freshness_guard_suppresses_deletion_without_counterpart() {
    let linked = Uuid::new_v4();

    // Orphaned in the directory, but the endpoint saw it yesterday
    let mut cloud = inventory_device("orphan", InventorySource::EntraId);
    cloud.cloud_device_id = Some(linked);

    let mut endpoint = inventory_device("orphan", InventorySource::Intune);
    endpoint.cloud_device_id = Some(linked);
    endpoint.last_seen_at = Some(Utc::now() - Duration::days(1));

    let entra = Arc::new(MockEntra::default());
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra.clone(),
        intune,
        cleanup_options(true, false, false),
    );

    // The endpoint record matches the cloud record by name, so restrict the
    // directory set to something unrelated to keep the orphan orphaned.
    let snapshot = snapshot_with(vec![directory_device("OTHER$")], vec![cloud], vec![endpoint]);
    let report = engine
        .perform_cleanup(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    assert!(entra.deleted.lock().unwrap().is_empty());
    assert_eq!(report.entra.suppressed, 1);
}

#[tokio::test]
async fn orphan_with_stale_endpoint_is_deleted_exactly_once() {
    let linked = Uuid::new_v4();

    let mut cloud = inventory_device("orphan-c", InventorySource::EntraId);
    cloud.cloud_device_id = Some(linked);

    let mut endpoint = inventory_device("orphan-c", InventorySource::Intune);
    endpoint.cloud_device_id = Some(linked);
    endpoint.last_seen_at = Some(Utc::now() - Duration::days(120));

    let entra = Arc::new(MockEntra::default());
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra.clone(),
        intune,
        cleanup_options(true, false, false),
    );

    let snapshot = snapshot_with(vec![], vec![cloud.clone()], vec![endpoint]);
    let report = engine
        .perform_cleanup(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    let deleted = entra.deleted.lock().unwrap();
    assert_eq!(deleted.as_slice(), &[cloud.id]);
    assert_eq!(report.entra.deleted, 1);
    assert_eq!(report.entra.suppressed, 0);
}

#[tokio::test]
async fn dry_run_issues_zero_delete_calls() {
    let orphans: Vec<InventoryDevice> = (0..3)
        .map(|i| inventory_device(&format!("orphan-{i}"), InventorySource::EntraId))
        .collect();

    let entra = Arc::new(MockEntra::default());
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra.clone(),
        intune.clone(),
        cleanup_options(true, true, true),
    );

    let snapshot = snapshot_with(vec![], orphans, vec![]);
    let report = engine
        .perform_cleanup(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    assert!(entra.deleted.lock().unwrap().is_empty());
    assert!(intune.deleted.lock().unwrap().is_empty());
    assert_eq!(report.entra.would_delete, 3);
    assert_eq!(report.entra.deleted, 0);
}

#[tokio::test]
async fn per_record_delete_failure_does_not_abort_the_sweep() {
    let first = inventory_device("orphan-x", InventorySource::EntraId);
    let second = inventory_device("orphan-y", InventorySource::EntraId);

    let entra = Arc::new(MockEntra {
        devices: vec![],
        deleted: Mutex::new(vec![]),
        fail_ids: vec![first.id],
    });
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra.clone(),
        intune,
        cleanup_options(true, false, false),
    );

    let snapshot = snapshot_with(vec![], vec![first, second.clone()], vec![]);
    let report = engine
        .perform_cleanup(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    let deleted = entra.deleted.lock().unwrap();
    assert_eq!(deleted.as_slice(), &[second.id]);
    assert_eq!(report.entra.failed, 1);
    assert_eq!(report.entra.deleted, 1);
}

#[tokio::test]
async fn intune_sweep_uses_its_own_check_in_as_guard() {
    let mut fresh = inventory_device("fresh-device", InventorySource::Intune);
    fresh.last_seen_at = Some(Utc::now() - Duration::days(2));

    let mut stale = inventory_device("stale-device", InventorySource::Intune);
    stale.last_seen_at = Some(Utc::now() - Duration::days(200));

    let entra = Arc::new(MockEntra::default());
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra,
        intune.clone(),
        cleanup_options(false, true, false),
    );

    let snapshot = snapshot_with(vec![], vec![], vec![fresh, stale.clone()]);
    let report = engine
        .perform_cleanup(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    let deleted = intune.deleted.lock().unwrap();
    assert_eq!(deleted.as_slice(), &[stale.id]);
    assert_eq!(report.intune.suppressed, 1);
    assert_eq!(report.intune.deleted, 1);
}

#[tokio::test]
async fn disabled_cleanup_does_nothing() {
    let entra = Arc::new(MockEntra::default());
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra.clone(),
        intune,
        CleanupOptions {
            enabled: false,
            delete_entra: true,
            delete_intune: true,
            dry_run: false,
            fresh_window_days: 30,
        },
    );

    let orphan = inventory_device("orphan", InventorySource::EntraId);
    let snapshot = snapshot_with(vec![], vec![orphan], vec![]);
    let report = engine
        .perform_cleanup(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    assert!(entra.deleted.lock().unwrap().is_empty());
    assert_eq!(report, Default::default());
}

#[tokio::test]
async fn cancelled_cleanup_stops_before_deleting() {
    let entra = Arc::new(MockEntra::default());
    let intune = Arc::new(MockIntune::default());
    let engine = CleanupEngine::new(
        entra.clone(),
        intune,
        cleanup_options(true, false, false),
    );

    let orphan = inventory_device("orphan", InventorySource::EntraId);
    let snapshot = snapshot_with(vec![], vec![orphan], vec![]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine.perform_cleanup(&snapshot, &cancel).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
    assert!(entra.deleted.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Site sweeps
// ---------------------------------------------------------------------------

fn cm_device(resource_id: i64, name: &str) -> CmDevice {
    CmDevice {
        resource_id,
        name: Some(name.to_string()),
        client_active_status: 0,
        is_obsolete: 1,
        last_online_time: None,
    }
}

#[tokio::test]
async fn obsolete_sweep_counts_only_actual_deletions() {
    let mut devices_by_filter = HashMap::new();
    devices_by_filter.insert(
        "IsObsolete eq 1".to_string(),
        vec![cm_device(1, "CM-1"), cm_device(2, "CM-2"), cm_device(3, "CM-3")],
    );

    let site = Arc::new(MockSite {
        devices_by_filter,
        missing_ids: vec![2],
        deleted: Mutex::new(vec![]),
    });
    let engine = SccmCleanupEngine::new(site.clone());

    let deleted = engine
        .cleanup_obsolete(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(site.deleted.lock().unwrap().as_slice(), &[1, 3]);
}

#[tokio::test]
async fn inactive_sweep_uses_client_active_status_filter() {
    let mut devices_by_filter = HashMap::new();
    devices_by_filter.insert(
        "ClientActiveStatus eq 0".to_string(),
        vec![cm_device(7, "CM-7")],
    );

    let site = Arc::new(MockSite {
        devices_by_filter,
        missing_ids: vec![],
        deleted: Mutex::new(vec![]),
    });
    let engine = SccmCleanupEngine::new(site.clone());

    let deleted = engine
        .cleanup_inactive(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(site.deleted.lock().unwrap().as_slice(), &[7]);
}

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

fn store_in(dir: &tempfile::TempDir, history_size: usize) -> FileSnapshotStore {
    FileSnapshotStore::new(SnapshotOptions {
        root_path: dir.path().to_string_lossy().into_owned(),
        latest_file_name: "latest-snapshot.json".to_string(),
        history_size,
    })
}

#[tokio::test]
async fn snapshot_round_trips_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir, 10);

    let snapshot = snapshot_with(
        vec![directory_device("WKS-RT$")],
        vec![inventory_device("WKS-RT$", InventorySource::EntraId)],
        vec![],
    );

    store.save(&snapshot).await.unwrap();
    let loaded = store.get_latest().await.unwrap().unwrap();

    assert_eq!(loaded, snapshot);
}

#[tokio::test]
async fn get_latest_returns_none_before_first_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir, 10);
    assert!(store.get_latest().await.unwrap().is_none());
}

#[tokio::test]
async fn history_is_pruned_to_the_retention_count() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir, 3);

    let base = Utc::now() - Duration::minutes(10);
    for i in 0..5 {
        let mut snapshot = snapshot_with(vec![], vec![], vec![]);
        snapshot.captured_at = base + Duration::seconds(i);
        store.save(&snapshot).await.unwrap();
    }

    let mut history: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("snapshot-"))
        .collect();
    history.sort();

    // The three most recent survive
    assert_eq!(history.len(), 3);
    let expected: Vec<String> = (2..5)
        .map(|i| {
            format!(
                "snapshot-{}.json",
                (base + Duration::seconds(i)).format("%Y%m%d%H%M%S")
            )
        })
        .collect();
    assert_eq!(history, expected);
}

#[tokio::test]
async fn same_second_saves_fail_instead_of_overwriting_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir, 10);

    let snapshot = snapshot_with(vec![], vec![], vec![]);
    store.save(&snapshot).await.unwrap();

    let err = store.save(&snapshot).await.unwrap_err();
    assert!(matches!(err, StoreError::HistoryCollision { .. }));

    // No temp file debris is left behind
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("tmp-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn zero_history_size_disables_pruning() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir, 0);

    let base = Utc::now() - Duration::minutes(10);
    for i in 0..4 {
        let mut snapshot = snapshot_with(vec![], vec![], vec![]);
        snapshot.captured_at = base + Duration::seconds(i);
        store.save(&snapshot).await.unwrap();
    }

    let history_count = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("snapshot-"))
        .count();
    assert_eq!(history_count, 4);
}
