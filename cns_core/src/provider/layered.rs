use super::{next_generation, DataProvider, EmbeddedProvider, Provenance, WalkDecision};
use crate::error::{CnsError, Result};
use crate::registry::ComponentRegistry;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
const REGISTRY_PATH: &str = "registry.yaml";

/// Serves recipe/registry documents from an operator-supplied directory,
/// falling back to [`EmbeddedProvider`] for any path the external directory
/// doesn't override. `registry.yaml` is special-cased: rather than one side
/// wholesale-replacing the other, the two are deep-merged by component name
/// (see [`ComponentRegistry::merge`]) the first time it's read, then cached
/// for the life of this provider.
pub struct LayeredProvider {
    embedded: EmbeddedProvider,
    external_root: Option<PathBuf>,
    generation: u64,
    max_file_size: u64,
    follow_symlinks: bool,
    merged_registry_cache: OnceLock<Vec<u8>>,
}

impl LayeredProvider {
    /// Constructs a provider with only the embedded defaults (no external
    /// directory). Used when no `--data-dir` is configured.
    pub fn embedded_only() -> Self {
        LayeredProvider {
            embedded: EmbeddedProvider::new(),
            external_root: None,
            generation: next_generation(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            follow_symlinks: false,
            merged_registry_cache: OnceLock::new(),
        }
    }

    /// Constructs a provider layering `external_root` over the embedded
    /// defaults. Fails fast if `external_root` doesn't exist or isn't a
    /// directory, since a silently-ignored `--data-dir` typo is worse than
    /// an install-time error.
    pub fn with_external_root(external_root: impl Into<PathBuf>) -> Result<Self> {
        let root = external_root.into();
        let meta = fs::metadata(&root)
            .map_err(|_| CnsError::not_found(format!("data dir '{}' does not exist", root.display())))?;
        if !meta.is_dir() {
            return Err(CnsError::invalid_request(format!("data dir '{}' is not a directory", root.display())));
        }
        if !root.join(REGISTRY_PATH).is_file() {
            return Err(CnsError::not_found(format!(
                "data dir '{}' must contain a 'registry.yaml' file",
                root.display()
            )));
        }
        Ok(LayeredProvider {
            embedded: EmbeddedProvider::new(),
            external_root: Some(root),
            generation: next_generation(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            follow_symlinks: false,
            merged_registry_cache: OnceLock::new(),
        })
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    fn external_path_for(&self, logical_path: &str) -> Option<PathBuf> {
        let root = self.external_root.as_ref()?;
        Some(root.join(logical_path))
    }

    /// Validates `logical_path` against directory-traversal, symlink and
    /// size-limit policy before it's read from disk.
    fn validate(&self, logical_path: &str, candidate: &Path) -> Result<WalkDecision> {
        if Path::new(logical_path).components().any(|c| matches!(c, Component::ParentDir)) {
            return Ok(WalkDecision::RejectTraversal);
        }
        let root = self.external_root.as_ref().expect("validate only called with external_root set");
        let canonical_root = fs::canonicalize(root)?;
        let canonical = match fs::canonicalize(candidate) {
            Ok(c) => c,
            Err(_) => return Ok(WalkDecision::RejectTraversal),
        };
        if !canonical.starts_with(&canonical_root) {
            return Ok(WalkDecision::RejectTraversal);
        }
        let symlink_meta = fs::symlink_metadata(candidate)?;
        if symlink_meta.file_type().is_symlink() && !self.follow_symlinks {
            return Ok(WalkDecision::RejectSymlink);
        }
        let meta = fs::metadata(candidate)?;
        if meta.len() > self.max_file_size {
            return Ok(WalkDecision::RejectTooLarge);
        }
        Ok(WalkDecision::Accept)
    }

    fn read_external(&self, logical_path: &str) -> Result<Option<Vec<u8>>> {
        let Some(candidate) = self.external_path_for(logical_path) else {
            return Ok(None);
        };
        if !candidate.exists() {
            return Ok(None);
        }
        match self.validate(logical_path, &candidate)? {
            WalkDecision::Accept => Ok(Some(fs::read(&candidate)?)),
            WalkDecision::RejectTraversal => {
                Err(CnsError::invalid_request(format!("path '{}' escapes the data directory", logical_path)))
            }
            WalkDecision::RejectSymlink => {
                Err(CnsError::invalid_request(format!("path '{}' is a symlink and follow_symlinks is disabled", logical_path)))
            }
            WalkDecision::RejectTooLarge => Err(CnsError::invalid_request(format!(
                "path '{}' exceeds the maximum file size of {} bytes",
                logical_path, self.max_file_size
            ))),
        }
    }

    fn merged_registry(&self) -> Result<&[u8]> {
        if let Some(cached) = self.merged_registry_cache.get() {
            return Ok(cached.as_slice());
        }
        let (embedded_bytes, _) = self.embedded.read(REGISTRY_PATH)?;
        let embedded: ComponentRegistry = serde_yaml::from_slice(&embedded_bytes)?;
        let merged = match self.read_external(REGISTRY_PATH)? {
            Some(external_bytes) => {
                let external: ComponentRegistry = serde_yaml::from_slice(&external_bytes)?;
                ComponentRegistry::merge(&embedded, &external)
            }
            None => embedded,
        };
        let serialized = serde_yaml::to_string(&merged)?.into_bytes();
        // OnceLock::get_or_init would recompute if beaten by a racing
        // writer; set() only inserts once and is fine to lose the race.
        let _ = self.merged_registry_cache.set(serialized);
        Ok(self.merged_registry_cache.get().expect("just set").as_slice())
    }
}

impl DataProvider for LayeredProvider {
    fn read(&self, logical_path: &str) -> Result<(Vec<u8>, Provenance)> {
        if logical_path == REGISTRY_PATH && self.external_root.is_some() {
            return Ok((self.merged_registry()?.to_vec(), Provenance::Merged));
        }
        if let Some(bytes) = self.read_external(logical_path)? {
            return Ok((bytes, Provenance::External));
        }
        self.embedded.read(logical_path)
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut paths: std::collections::BTreeSet<String> = self.embedded.list()?.into_iter().collect();
        if let Some(root) = &self.external_root {
            for entry in walkdir::WalkDir::new(root).follow_links(self.follow_symlinks) {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    continue;
                }
                if let Ok(rel) = entry.path().strip_prefix(root) {
                    let logical = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
                    if self.validate(&logical, entry.path())? == WalkDecision::Accept {
                        paths.insert(logical);
                    }
                }
            }
        }
        Ok(paths.into_iter().collect())
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn external_root_must_exist() {
        assert!(LayeredProvider::with_external_root("/does/not/exist").is_err());
    }

    #[test]
    fn embedded_only_reads_fall_through() {
        let p = LayeredProvider::embedded_only();
        let (bytes, provenance) = p.read("base.yaml").unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(provenance, Provenance::Embedded);
    }

    #[test]
    fn external_overrides_non_registry_paths_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        fs::File::create(dir.path().join(REGISTRY_PATH)).unwrap();
        let mut f = fs::File::create(dir.path().join("base.yaml")).unwrap();
        f.write_all(b"kind: recipeMetadata\n").unwrap();
        let p = LayeredProvider::with_external_root(dir.path()).unwrap();
        let (bytes, provenance) = p.read("base.yaml").unwrap();
        assert_eq!(provenance, Provenance::External);
        assert_eq!(bytes, b"kind: recipeMetadata\n");
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::File::create(dir.path().join(REGISTRY_PATH)).unwrap();
        let p = LayeredProvider::with_external_root(dir.path()).unwrap();
        let err = p.read("../../etc/passwd").unwrap_err();
        assert_eq!(err.kind().label(), "invalid-request");
    }

    #[test]
    fn construction_fails_without_registry_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let err = LayeredProvider::with_external_root(dir.path()).unwrap_err();
        assert_eq!(err.kind().label(), "not-found");
    }
}
