//! Ambient CLI configuration: where recipe data lives, how long a build may
//! run, and how verbose logging should be. Resolved from flags with
//! environment-variable fallbacks, the way `SHIPCAT_MANIFEST_DIR` worked in
//! this tool's predecessor.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct CnsConfig {
    /// External recipe/registry directory to layer over the embedded
    /// defaults. `None` means embedded-only.
    pub data_dir: Option<PathBuf>,
    /// External time budget for a single build, handed to the builder as
    /// `external_budget`.
    pub build_timeout: Duration,
    pub verbosity: u64,
}

impl Default for CnsConfig {
    fn default() -> Self {
        CnsConfig { data_dir: None, build_timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS), verbosity: 0 }
    }
}

impl CnsConfig {
    /// Resolves config from explicit CLI flags, falling back to the
    /// `CNS_DATA_DIR` environment variable when `--data-dir` was omitted.
    pub fn resolve(data_dir_flag: Option<PathBuf>, timeout_secs_flag: Option<u64>, verbosity: u64) -> Self {
        let data_dir = data_dir_flag.or_else(|| std::env::var_os("CNS_DATA_DIR").map(PathBuf::from));
        let build_timeout = Duration::from_secs(timeout_secs_flag.unwrap_or(DEFAULT_BUILD_TIMEOUT_SECS));
        CnsConfig { data_dir, build_timeout, verbosity }
    }
}
