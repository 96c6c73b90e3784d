use crate::core::catalog::Catalog;
use crate::core::error::Result;
use crate::core::firewall::DEFAULT_PRIORITY;
use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Replacement catalog (JSON); the built-in catalog is used when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    /// Priority for preset and custom wizard rules without an explicit one
    #[serde(default = "default_priority")]
    pub default_priority: i32,
    /// Write logs to `vmfw.log` in the state directory instead of stderr
    #[serde(default = "default_true")]
    pub log_to_file: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            default_priority: DEFAULT_PRIORITY,
            log_to_file: true,
        }
    }
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_true() -> bool {
    true
}

pub fn config_path() -> Option<PathBuf> {
    get_data_dir().map(|mut path| {
        path.push(CONFIG_FILE);
        path
    })
}

/// Saves the config to the data directory using an atomic write pattern.
/// 1. Writes to a temporary file.
/// 2. Sets restrictive permissions (0o600).
/// 3. Atomically renames to the target path.
pub async fn save_config(config: &EngineConfig) -> std::io::Result<()> {
    if let Some(path) = config_path() {
        save_config_to(&path, config).await?;
    }
    Ok(())
}

/// Atomic write of `config` to `path`
pub async fn save_config_to(path: &Path, config: &EngineConfig) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    // Create file with restrictive permissions before any data is written
    #[cfg(unix)]
    {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&temp_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e
        }
    })
}

/// Loads the config from the data directory, or returns default if not found.
pub async fn load_config() -> EngineConfig {
    match config_path() {
        Some(path) => load_config_from(&path).await,
        None => EngineConfig::default(),
    }
}

/// Loads the config at `path`, falling back to defaults when missing or unreadable
pub async fn load_config_from(path: &Path) -> EngineConfig {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => match serde_json::from_str::<EngineConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring malformed config {}: {e}", path.display());
                EngineConfig::default()
            }
        },
        Err(_) => EngineConfig::default(),
    }
}

/// Builds the catalog named by the config.
///
/// # Errors
///
/// Fails if `catalog_path` is set but the file cannot be read or is not a
/// valid catalog. A configured catalog never silently falls back to the
/// built-in one.
pub async fn load_catalog(config: &EngineConfig) -> Result<Catalog> {
    match config.catalog_path {
        Some(ref path) => {
            let json = tokio::fs::read_to_string(path).await?;
            let catalog = Catalog::from_json(&json)?;
            info!("Loaded catalog from {}", path.display());
            Ok(catalog)
        }
        None => Ok(Catalog::builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = EngineConfig {
            catalog_path: Some(PathBuf::from("/etc/vmfw/catalog.json")),
            default_priority: 300,
            log_to_file: false,
        };

        save_config_to(&path, &config).await.unwrap();
        assert_eq!(load_config_from(&path).await, config);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_with_private_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config_to(&path, &EngineConfig::default()).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_missing_and_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(load_config_from(&path).await, EngineConfig::default());

        tokio::fs::write(&path, r#"{"default_priority": 42}"#).await.unwrap();
        let config = load_config_from(&path).await;
        assert_eq!(config.default_priority, 42);
        assert!(config.log_to_file);

        tokio::fs::write(&path, "not json").await.unwrap();
        assert_eq!(load_config_from(&path).await, EngineConfig::default());
    }

    #[tokio::test]
    async fn test_load_catalog() {
        let builtin = load_catalog(&EngineConfig::default()).await.unwrap();
        assert!(builtin.get_firewall_template("lockdown").is_some());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        tokio::fs::write(
            &path,
            r#"{"services": [{"id": "ssh", "name": "SSH", "category": "remote", "risk": "MEDIUM",
                "rules": [{"protocol": "tcp", "port": {"start": 2222, "end": 2222},
                           "direction": "in", "description": "SSH on 2222"}]}]}"#,
        )
        .await
        .unwrap();
        let config = EngineConfig {
            catalog_path: Some(path),
            ..EngineConfig::default()
        };
        let catalog = load_catalog(&config).await.unwrap();
        assert_eq!(catalog.service_presets().len(), 1);
        assert!(catalog.firewall_templates().is_empty());

        let config = EngineConfig {
            catalog_path: Some(dir.path().join("missing.json")),
            ..EngineConfig::default()
        };
        assert!(matches!(load_catalog(&config).await, Err(Error::Io(_))));
    }
}
