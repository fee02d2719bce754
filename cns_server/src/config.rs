//! Ambient server configuration, resolved from the environment the way
//! `SHIPCAT_MANIFEST_DIR` was in this tool's predecessor.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub data_dir: Option<PathBuf>,
    pub snapshot_root: PathBuf,
    pub build_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:8080".to_string(),
            data_dir: std::env::var_os("CNS_DATA_DIR").map(PathBuf::from),
            snapshot_root: std::env::var_os("CNS_SNAPSHOT_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            build_timeout: Duration::from_secs(
                std::env::var("CNS_BUILD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
            ),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut cfg = ServerConfig::default();
        if let Ok(addr) = std::env::var("CNS_BIND_ADDR") {
            cfg.bind_addr = addr;
        }
        cfg
    }
}
