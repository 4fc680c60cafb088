//! Worker configuration loading.
//!
//! The envelope is read from a JSON file named by the `REJOIN_CONFIG`
//! environment variable, defaulting to `rejoin.json` in the working
//! directory.

use std::path::{Path, PathBuf};

use rejoin_core::options::RejoinOptions;

const CONFIG_ENV_VAR: &str = "REJOIN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "rejoin.json";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolve the config file path from the environment.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the options envelope from a config file.
pub fn load_from(path: &Path) -> Result<RejoinOptions, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rejoin.json");
        std::fs::write(
            &path,
            r#"{
                "directory": {
                    "ldapServer": "dc01.corp.example",
                    "baseDn": "DC=corp,DC=example"
                },
                "graph": {
                    "tenantId": "tenant",
                    "clientId": "client"
                },
                "scheduler": { "intervalSecs": 600 }
            }"#,
        )
        .unwrap();

        let options = load_from(&path).unwrap();
        assert_eq!(options.directory.ldap_server, "dc01.corp.example");
        assert_eq!(options.scheduler.interval_secs, 600);
        assert_eq!(options.scheduler.startup_delay_secs, 10);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_from(Path::new("/nonexistent/rejoin.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rejoin.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("rejoin.json"));
    }
}
