//! Resolves `cm://` snapshot URIs against a local fixture root,
//! mirroring `cns_cli`'s `FileSnapshotSource`. The two crates don't share a
//! dependency, so the implementation is duplicated rather than imported.

use cns_core::{parse_configmap_uri, CnsError, Snapshot, SnapshotSource};
use std::path::PathBuf;

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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fetch_reads_namespace_name_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("gpu-operator")).unwrap();
        let mut f = std::fs::File::create(dir.path().join("gpu-operator").join("cluster-info.yaml")).unwrap();
        f.write_all(b"kind: Snapshot\napiVersion: cns.nvidia.com/v1alpha1\nfacts:\n  GPU.model.name: h100\n").unwrap();
        let source = FileSnapshotSource::new(dir.path());
        let snap = source.fetch("cm://gpu-operator/cluster-info").unwrap();
        assert_eq!(snap.get("GPU.model.name"), Some("h100"));
    }
}
