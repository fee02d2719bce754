use super::{DataProvider, Provenance};
use crate::error::{CnsError, Result};
use rust_embed::RustEmbed;

/// The default recipe/registry tree, baked into the binary at build time so
/// `cns` works with zero external configuration.
#[derive(RustEmbed)]
#[folder = "data/"]
struct DefaultData;

/// A `DataProvider` backed solely by [`DefaultData`]. Always generation 0:
/// the embedded tree never changes at runtime.
pub struct EmbeddedProvider;

impl EmbeddedProvider {
    pub fn new() -> Self {
        EmbeddedProvider
    }
}

impl Default for EmbeddedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for EmbeddedProvider {
    fn read(&self, logical_path: &str) -> Result<(Vec<u8>, Provenance)> {
        DefaultData::get(logical_path)
            .map(|f| (f.data.into_owned(), Provenance::Embedded))
            .ok_or_else(|| CnsError::not_found(format!("no embedded data at '{}'", logical_path)))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(DefaultData::iter().map(|p| p.to_string()).collect())
    }

    fn generation(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_reads_base_yaml() {
        let p = EmbeddedProvider::new();
        let (bytes, provenance) = p.read("base.yaml").expect("base.yaml must ship embedded");
        assert!(!bytes.is_empty());
        assert_eq!(provenance, Provenance::Embedded);
    }

    #[test]
    fn embedded_lists_registry() {
        let p = EmbeddedProvider::new();
        let names = p.list().unwrap();
        assert!(names.iter().any(|n| n == "registry.yaml"));
    }
}
