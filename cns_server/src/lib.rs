//! HTTP front end for the recipe builder core: thin `actix-web` handlers
//! that parse a request into a `cns_core` criteria document and hand it
//! straight to the builder.

#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_yaml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate failure;

pub mod config;
pub mod error;
pub mod handlers;
pub mod output;
pub mod snapshot;

pub use config::ServerConfig;
