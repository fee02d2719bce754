//! Core recipe-building engine: criteria matching, overlay inheritance,
//! deep-merge, dependency ordering and the builder that ties them together.
//! `cns_cli` and `cns_server` are both thin shells around this crate.

#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_yaml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate failure;

pub mod builder;
pub mod cancel;
pub mod criteria;
pub mod error;
pub mod ingress;
pub mod matcher;
pub mod merge;
pub mod provider;
pub mod recipe;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod toposort;
pub mod value;

pub use builder::{Builder, ConstraintWarning, RecipeResult, ResolvedComponent};
pub use criteria::{Accelerator, Criteria, Intent, Nodes, Os, Service};
pub use error::{CnsError, ErrorKind, Result};
pub use ingress::{CriteriaDocument, CriteriaQuery, RecipeCriteriaDocument};
pub use provider::{DataProvider, EmbeddedProvider, LayeredProvider, Provenance};
pub use recipe::{ComponentRef, ComponentType, Constraint, RecipeMetadata, RecipeSpec, API_VERSION, KIND_RECIPE_RESULT};
pub use registry::{ComponentRegistry, RegistryEntry};
pub use snapshot::{derive_criteria, parse_configmap_uri, ConstraintEvaluator, Snapshot, SnapshotSource};
pub use store::{build_duration_stats, cache_stats, install_provider, shared_store, BuildDurationSnapshot, MetadataStore};
pub use value::Value;
