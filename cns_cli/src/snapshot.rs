//! `cns snapshot`: fetches and prints a cluster snapshot, and provides the
//! `SnapshotSource` implementation the CLI uses to resolve `cm://`
//! URIs against local files. A real cluster-polling source (e.g. via a
//! Kubernetes API client) is a matter of a second `SnapshotSource` impl;
//! wiring that in is out of scope here.

use cns_core::{parse_configmap_uri, CnsError, Snapshot, SnapshotSource};
use std::path::PathBuf;

/// Resolves `cm://<namespace>/<name>` against
/// `<root>/<namespace>/<name>.yaml` on disk. Meant for local development and
/// tests, where a snapshot is just a checked-in fixture rather than a live
/// cluster read.
pub struct FileSnapshotSource {
    root: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSnapshotSource { root: root.into() }
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn fetch(&self, uri: &str) -> cns_core::Result<Snapshot> {
        let (namespace, name) = parse_configmap_uri(uri)?;
        let path = self.root.join(namespace).join(format!("{}.yaml", name));
        let bytes = std::fs::read(&path).map_err(|e| {
            CnsError::not_found(format!("no snapshot at '{}': {}", path.display(), e)).with_path(path.display().to_string())
        })?;
        let snapshot: Snapshot = serde_yaml::from_slice(&bytes)?;
        Ok(snapshot)
    }
}
