//! Presentation-side core of the task board: picks a store once from
//! configuration and keeps the board state the UI renders from.

use shared::local::LocalStore;
use shared::Store;
use std::sync::Arc;
use tracing::info;

pub mod board;
pub mod config;
pub mod preferences;
pub mod remote;

pub use board::{Board, Dashboard};
pub use config::{BackendConfig, ClientConfig, ConfigError};
pub use remote::RemoteStore;

/// Opens the configured backend. Called once at startup.
pub fn open_store(config: &ClientConfig) -> Result<Arc<dyn Store>, ConfigError> {
    let store: Arc<dyn Store> = match &config.backend {
        BackendConfig::Local { path } => {
            let path = match path {
                Some(path) => path.clone(),
                None => ClientConfig::default_data_file()?,
            };
            info!(path = %path.display(), "using local store");
            Arc::new(LocalStore::open(path))
        }
        BackendConfig::Memory => {
            info!("using in-memory store");
            Arc::new(LocalStore::in_memory())
        }
        BackendConfig::Remote { base_url } => {
            info!(%base_url, "using remote store");
            let remote = RemoteStore::new(base_url).map_err(|e| ConfigError::InvalidUrl {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;
            Arc::new(remote)
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{NewTask, TaskStore};

    #[tokio::test]
    async fn memory_backend_is_usable() {
        let config = ClientConfig {
            backend: BackendConfig::Memory,
        };
        let store = open_store(&config).unwrap();
        store.create(NewTask::new("Try", "2024-03-01")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn local_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let config = ClientConfig {
            backend: BackendConfig::Local {
                path: Some(path.clone()),
            },
        };
        let store = open_store(&config).unwrap();
        store.create(NewTask::new("Saved", "2024-03-01")).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn bad_remote_url_is_a_config_error() {
        let config = ClientConfig {
            backend: BackendConfig::Remote {
                base_url: "::nope".to_string(),
            },
        };
        assert!(matches!(open_store(&config), Err(ConfigError::InvalidUrl { .. })));
    }
}
