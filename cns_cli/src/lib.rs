#![allow(renamed_and_removed_lints)]

#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_yaml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate failure;

pub use failure::Error;
pub type Result<T> = std::result::Result<T, Error>;

extern crate cns_core;
pub use cns_core::{Builder, Criteria, CriteriaDocument, CriteriaQuery, RecipeResult};

/// `cns recipe` subcommand
pub mod recipe;
/// `cns bundle` subcommand and the emitter trait it dispatches to
pub mod bundle;
/// `cns snapshot` subcommand
pub mod snapshot;
/// `cns validate` subcommand
pub mod validate;
/// Ambient CLI configuration (data dir, timeouts, log verbosity)
pub mod config;

/// Initialises process-wide state shared by every subcommand: SSL cert
/// probing for HTTPS clients, and installing the configured data provider
/// before any recipe lookups happen.
pub fn init(cfg: &config::CnsConfig) -> Result<()> {
    openssl_probe::init_ssl_cert_env_vars();
    let provider: std::sync::Arc<dyn cns_core::DataProvider> = match &cfg.data_dir {
        Some(dir) => std::sync::Arc::new(cns_core::LayeredProvider::with_external_root(dir)?),
        None => std::sync::Arc::new(cns_core::LayeredProvider::embedded_only()),
    };
    cns_core::install_provider(provider);
    Ok(())
}
