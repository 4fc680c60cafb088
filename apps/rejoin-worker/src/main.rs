use std::sync::Arc;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rejoin_connector_graph::{EntraDeviceSource, GraphConfig, IntuneDeviceSource};
use rejoin_connector_ldap::LdapDirectorySource;
use rejoin_connector_sccm::{SccmAdminClient, SccmConfig};
use rejoin_core::options::RejoinOptions;
use rejoin_engine::{
    CleanupEngine, FileSnapshotStore, ReconcileWorker, Reconciler, SccmCleanupEngine,
};

mod config;

fn graph_config(options: &RejoinOptions) -> GraphConfig {
    let client_secret = options.graph.client_secret.clone().unwrap_or_else(|| {
        eprintln!("Configuration error: graph clientSecret is required");
        std::process::exit(1);
    });

    let mut graph = GraphConfig::new(
        &options.graph.tenant_id,
        &options.graph.client_id,
        SecretString::from(client_secret),
    )
    .with_request_timeout_secs(options.graph.request_timeout_secs);

    if let Some(base_url) = &options.graph.base_url {
        graph = graph.with_base_url(base_url);
    }
    if let Some(login_url) = &options.graph.login_url {
        graph = graph.with_login_url(login_url);
    }

    graph
}

fn sccm_engine(options: &RejoinOptions) -> Option<SccmCleanupEngine> {
    if !options.sccm.enabled {
        return None;
    }

    let base_url = options.sccm.admin_service_base_url.clone().unwrap_or_else(|| {
        eprintln!("Configuration error: sccm adminServiceBaseUrl is required when sccm is enabled");
        std::process::exit(1);
    });

    let mut sccm_config = SccmConfig::new(base_url);
    if let (Some(username), Some(password)) = (&options.sccm.username, &options.sccm.password) {
        sccm_config =
            sccm_config.with_credentials(username, SecretString::from(password.clone()));
    }
    if options.sccm.allow_invalid_certificates {
        sccm_config = sccm_config.with_invalid_certificates_allowed();
    }

    let client = SccmAdminClient::new(sccm_config).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    Some(SccmCleanupEngine::new(Arc::new(client)))
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config_path = config::config_path();
    let options = config::load_from(&config_path).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    info!(
        config = %config_path.display(),
        interval_secs = options.scheduler.interval_secs,
        cleanup_enabled = options.cleanup.enabled,
        dry_run = options.cleanup.dry_run,
        sccm_enabled = options.sccm.enabled,
        "Starting rejoin worker"
    );

    // Construct source adapters
    let directory = Arc::new(
        LdapDirectorySource::new(options.directory.clone()).unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }),
    );

    let graph = graph_config(&options);
    let entra = Arc::new(EntraDeviceSource::new(graph.clone()).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    }));
    let intune = Arc::new(IntuneDeviceSource::new(graph).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    }));

    let store = Arc::new(FileSnapshotStore::new(options.snapshot.clone()));

    // Wire the engines
    let reconciler = Reconciler::new(
        directory,
        entra.clone(),
        intune.clone(),
        store,
        options.directory.activity_window_days,
    );
    let cleanup = CleanupEngine::new(entra, intune, options.cleanup.clone());
    let sccm = sccm_engine(&options);

    let worker = ReconcileWorker::new(reconciler, cleanup, sccm, options.scheduler.clone());

    // Cancel on ctrl-c; the current pass drains before the process exits
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    worker.run(cancel).await;
}
