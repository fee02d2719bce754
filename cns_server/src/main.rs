#[macro_use]
extern crate log;

use actix_web::{web, App, HttpServer};
use cns_server::ServerConfig;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    openssl_probe::init_ssl_cert_env_vars();

    let cfg = ServerConfig::from_env();
    let provider: Arc<dyn cns_core::DataProvider> = match &cfg.data_dir {
        Some(dir) => Arc::new(cns_core::LayeredProvider::with_external_root(dir).unwrap_or_else(|e| {
            panic!("failed to install data provider from '{}': {}", dir.display(), e);
        })),
        None => Arc::new(cns_core::LayeredProvider::embedded_only()),
    };
    cns_core::install_provider(provider);

    info!("starting cns_server on {}", cfg.bind_addr);
    let bind_addr = cfg.bind_addr.clone();

    HttpServer::new(move || App::new().app_data(web::Data::new(cfg.clone())).configure(cns_server::handlers::configure))
        .bind(&bind_addr)?
        .run()
        .await
}
