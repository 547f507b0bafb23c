//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

/// Where the server keeps its data. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Redis { url: String },
    /// Single JSON file, same layout as the client-side local store.
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Reads `BIND_ADDR` (or `PORT`), `TASKBOARD_DATA_FILE`, `REDIS_URL` and `STATIC_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidAddr { value, source })?,
            None => {
                let port = match get("PORT") {
                    Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let storage = match get("TASKBOARD_DATA_FILE") {
            Some(path) => StorageConfig::File { path: path.into() },
            None => StorageConfig::Redis {
                url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
        };

        let static_dir = get("STATIC_DIR")
            .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
            .into();

        Ok(Self {
            bind_addr,
            storage,
            static_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_redis_on_port_3000() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(
            config.storage,
            StorageConfig::Redis {
                url: DEFAULT_REDIS_URL.to_string()
            }
        );
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn data_file_selects_file_storage() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("TASKBOARD_DATA_FILE", "/tmp/board.json"),
            ("REDIS_URL", "redis://elsewhere"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::File {
                path: "/tmp/board.json".into()
            }
        );
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn bind_addr_wins_over_port() {
        let config =
            ServerConfig::from_lookup(lookup(&[("BIND_ADDR", "127.0.0.1:4000"), ("PORT", "1")]))
                .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:4000".parse().unwrap());
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])),
            Err(ConfigError::InvalidAddr { .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("PORT", "http")])),
            Err(ConfigError::InvalidPort(_))
        ));
    }
}
