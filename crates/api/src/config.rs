//! Server settings read from the environment at startup.

use std::path::PathBuf;

use factoring_documents::GeneratorConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DATA_PATH: &str = "assets/demo-data.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// JSON seed for the in-memory directory.
    pub data_path: PathBuf,
    pub generator: GeneratorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            generator: GeneratorConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let bind_addr = match non_empty("FACTORING_BIND_ADDR") {
            Some(addr) if addr.parse::<std::net::SocketAddr>().is_ok() => addr,
            Some(addr) => {
                tracing::warn!(value = %addr, "FACTORING_BIND_ADDR is not a socket address; using default");
                DEFAULT_BIND_ADDR.to_string()
            }
            None => DEFAULT_BIND_ADDR.to_string(),
        };
        Self {
            bind_addr,
            data_path: non_empty("FACTORING_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            generator: GeneratorConfig::from_lookup(&lookup),
        }
    }
}
