//! The data provider (C1): resolves recipe/registry documents from either
//! the embedded default tree or an external directory layered on top of it.

mod embedded;
mod layered;

pub use embedded::EmbeddedProvider;
pub use layered::LayeredProvider;

use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};

/// Where a byte sequence returned by a provider ultimately came from.
/// Surfaced in diagnostics (`cns recipe --explain`) so an operator can tell
/// an embedded default from a locally overridden file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Embedded,
    External,
    /// `registry.yaml` specifically, where the two are merged rather than
    /// one replacing the other.
    Merged,
}

/// What the layered provider's directory walk should do with a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkDecision {
    Accept,
    /// `..` component or resolves outside the root.
    RejectTraversal,
    /// A symlink encountered while `follow_symlinks` is disabled.
    RejectSymlink,
    /// Larger than the configured max file size.
    RejectTooLarge,
}

/// Abstraction over "a source of recipe/registry YAML documents", so the
/// metadata store doesn't care whether it's reading from the binary's
/// embedded defaults or an operator-supplied directory.
pub trait DataProvider: Send + Sync {
    /// Raw bytes for a logical path (e.g. `"base.yaml"`,
    /// `"components/gpu-operator/values.yaml"`), along with where they came
    /// from. `Err(NotFound)` if the path doesn't resolve in any layer.
    fn read(&self, logical_path: &str) -> Result<(Vec<u8>, Provenance)>;

    /// Every logical path this provider can resolve, in no particular
    /// order. Used by the metadata store to discover overlay files.
    fn list(&self) -> Result<Vec<String>>;

    /// Monotonically increasing generation counter. Bumped whenever the
    /// provider's backing content could have changed (e.g. a fresh
    /// `install_provider` call); lets the metadata store invalidate caches
    /// keyed by generation rather than re-reading on every lookup.
    fn generation(&self) -> u64;
}

pub(crate) static PROVIDER_GENERATION: AtomicU64 = AtomicU64::new(0);

/// Allocates the next provider generation. Called once per
/// `MetadataStore::install_provider`.
pub(crate) fn next_generation() -> u64 {
    PROVIDER_GENERATION.fetch_add(1, Ordering::SeqCst) + 1
}
