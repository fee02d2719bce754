//! The metadata store (C3): a process-wide, generation-cached view over a
//! [`DataProvider`], holding every parsed recipe overlay and the merged
//! component registry.

use crate::criteria::Criteria;
use crate::error::{CnsError, Result};
use crate::matcher;
use crate::provider::{DataProvider, LayeredProvider, Provenance};
use crate::recipe::{RecipeMetadata, KIND_RECIPE_METADATA};
use crate::registry::ComponentRegistry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

static CURRENT_PROVIDER: OnceLock<RwLock<Arc<dyn DataProvider>>> = OnceLock::new();
static STORE_CACHE: OnceLock<RwLock<Option<(u64, Arc<MetadataStore>)>>> = OnceLock::new();

static CACHE_HITS: AtomicU64 = AtomicU64::new(0);
static CACHE_MISSES: AtomicU64 = AtomicU64::new(0);

/// Upper bounds (milliseconds) of the build-duration histogram's buckets,
/// observed by the [`Builder`](crate::builder::Builder) at the end of every
/// build. Mirrors the bucket-boundary style of a Prometheus histogram
/// without depending on a metrics crate the rest of this codebase doesn't
/// otherwise pull in -- only the bucket *counts* are exposed, per spec's
/// carve-out that exact metric names/wire format are out of scope.
const BUILD_DURATION_BUCKETS_MS: [u64; 9] = [10, 25, 50, 100, 250, 500, 1_000, 5_000, 25_000];

struct BuildDurationHistogram {
    bucket_counts: [AtomicU64; BUILD_DURATION_BUCKETS_MS.len()],
    overflow_count: AtomicU64,
    sum_ms: AtomicU64,
    count: AtomicU64,
}

impl BuildDurationHistogram {
    const fn new() -> Self {
        BuildDurationHistogram {
            bucket_counts: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
            overflow_count: AtomicU64::new(0),
            sum_ms: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, elapsed: Duration) {
        let ms = elapsed.as_millis().min(u64::MAX as u128) as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ms.fetch_add(ms, Ordering::Relaxed);
        match BUILD_DURATION_BUCKETS_MS.iter().position(|bound| ms <= *bound) {
            Some(i) => self.bucket_counts[i].fetch_add(1, Ordering::Relaxed),
            None => self.overflow_count.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> BuildDurationSnapshot {
        BuildDurationSnapshot {
            buckets: BUILD_DURATION_BUCKETS_MS
                .iter()
                .zip(self.bucket_counts.iter())
                .map(|(bound, c)| (*bound, c.load(Ordering::Relaxed)))
                .collect(),
            overflow_count: self.overflow_count.load(Ordering::Relaxed),
            sum_ms: self.sum_ms.load(Ordering::Relaxed),
            count: self.count.load(Ordering::Relaxed),
        }
    }
}

static BUILD_DURATIONS: BuildDurationHistogram = BuildDurationHistogram::new();

/// A read-only view over the build-duration histogram, for diagnostics
/// endpoints (e.g. `cns validate`, a future `/metrics` handler).
#[derive(Debug, Clone)]
pub struct BuildDurationSnapshot {
    /// `(upper bound ms, cumulative-bucket count)` pairs, ascending.
    pub buckets: Vec<(u64, u64)>,
    /// Builds slower than the largest bucket boundary.
    pub overflow_count: u64,
    pub sum_ms: u64,
    pub count: u64,
}

/// Records one build's wall-clock duration into the process-wide histogram.
/// Called by [`Builder`](crate::builder::Builder) once per build, success or
/// failure, so the histogram reflects load rather than just successful runs.
pub fn observe_build_duration(elapsed: Duration) {
    BUILD_DURATIONS.observe(elapsed);
}

pub fn build_duration_stats() -> BuildDurationSnapshot {
    BUILD_DURATIONS.snapshot()
}

/// Replaces the process-wide data provider. Subsequent [`shared_store`]
/// calls rebuild against it on next access (the generation bump
/// invalidates the cached [`MetadataStore`]).
pub fn install_provider(provider: Arc<dyn DataProvider>) {
    let lock = CURRENT_PROVIDER.get_or_init(|| RwLock::new(Arc::new(LayeredProvider::embedded_only())));
    *lock.write().expect("provider lock poisoned") = provider;
}

/// Returns the cached store for the current provider's generation,
/// rebuilding it if the provider changed (or on first access).
pub fn shared_store() -> Result<Arc<MetadataStore>> {
    let provider_lock = CURRENT_PROVIDER.get_or_init(|| RwLock::new(Arc::new(LayeredProvider::embedded_only())));
    let provider = provider_lock.read().expect("provider lock poisoned").clone();
    let generation = provider.generation();

    let cache_lock = STORE_CACHE.get_or_init(|| RwLock::new(None));
    if let Some((cached_gen, store)) = cache_lock.read().expect("store cache poisoned").as_ref() {
        if *cached_gen == generation {
            CACHE_HITS.fetch_add(1, Ordering::Relaxed);
            return Ok(store.clone());
        }
    }

    CACHE_MISSES.fetch_add(1, Ordering::Relaxed);
    let built = Arc::new(MetadataStore::build(provider.clone())?);
    *cache_lock.write().expect("store cache poisoned") = Some((generation, built.clone()));
    Ok(built)
}

pub fn cache_stats() -> (u64, u64) {
    (CACHE_HITS.load(Ordering::Relaxed), CACHE_MISSES.load(Ordering::Relaxed))
}

const MAX_INHERITANCE_DEPTH: usize = 10;

/// An immutable snapshot of every recipe overlay and the component registry,
/// as resolved from a [`DataProvider`] at a given generation.
pub struct MetadataStore {
    overlays: BTreeMap<String, RecipeMetadata>,
    registry: ComponentRegistry,
    generation: u64,
    provider: Arc<dyn DataProvider>,
}

impl MetadataStore {
    fn build(provider: Arc<dyn DataProvider>) -> Result<Self> {
        let generation = provider.generation();
        let mut overlays = BTreeMap::new();

        for path in provider.list()? {
            if !path.ends_with(".yaml") && !path.ends_with(".yml") {
                continue;
            }
            if path == "registry.yaml" {
                continue;
            }
            if !path.starts_with("components/") {
                let (bytes, _provenance) = provider.read(&path)?;
                let doc: RecipeMetadata = serde_yaml::from_slice(&bytes).map_err(|e| CnsError::from(e).with_path(path.clone()))?;
                if doc.kind != KIND_RECIPE_METADATA {
                    continue;
                }
                doc.validate_header(&path)?;
                let name = doc.metadata.name.clone();
                if let Some(existing) = overlays.insert(name.clone(), doc) {
                    return Err(CnsError::invalid_request(format!(
                        "duplicate recipe name '{}' (paths collide, one already loaded as '{}')",
                        name, existing.metadata.name
                    )));
                }
            }
        }

        let (registry_bytes, _) = provider.read("registry.yaml")?;
        let registry: ComponentRegistry = serde_yaml::from_slice(&registry_bytes)?;
        let defects = registry.validate();
        if !defects.is_empty() {
            return Err(CnsError::invalid_request(format!("component registry is invalid: {}", defects.join("; "))));
        }

        let root = overlays
            .get("base")
            .ok_or_else(|| CnsError::invalid_request("no root base recipe found (expected a recipe named 'base' with an empty 'base' field)"))?;
        if root.spec.base.is_some() {
            return Err(CnsError::invalid_request("root base recipe 'base' must not itself declare a 'base' field"));
        }
        crate::merge::validate_dependencies(&root.spec.component_refs).map_err(|e| e.with_stage("store.load"))?;

        Ok(MetadataStore { overlays, registry, generation, provider })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &dyn DataProvider {
        self.provider.as_ref()
    }

    pub fn get_by_name(&self, name: &str) -> Result<&RecipeMetadata> {
        let name = if name.is_empty() { "base" } else { name };
        self.overlays.get(name).ok_or_else(|| CnsError::not_found(format!("no recipe named '{}'", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.overlays.keys().map(String::as_str).collect()
    }

    /// Every overlay whose own criteria matches `query`, ordered ascending
    /// by specificity (ties broken lexicographically by name) so callers
    /// apply them least-specific first.
    pub fn find_matching_overlays(&self, query: &Criteria) -> Vec<&RecipeMetadata> {
        matcher::order_by_specificity(self.overlays.values().filter(|o| o.spec.criteria_or_default().matches(query)))
    }

    /// Resolves `name`'s `base` inheritance chain, root first, `name`'s own
    /// document last. Rejects cycles and chains deeper than
    /// [`MAX_INHERITANCE_DEPTH`].
    pub fn resolve_chain(&self, name: &str) -> Result<Vec<&RecipeMetadata>> {
        let mut chain = Vec::new();
        let mut seen = Vec::new();
        let mut current = name.to_string();
        loop {
            if seen.contains(&current) {
                seen.push(current.clone());
                return Err(CnsError::invalid_request(format!(
                    "circular recipe inheritance: {}",
                    seen.join(" -> ")
                )));
            }
            seen.push(current.clone());
            if seen.len() > MAX_INHERITANCE_DEPTH {
                return Err(CnsError::invalid_request(format!(
                    "recipe inheritance chain for '{}' exceeds the maximum depth of {}",
                    name, MAX_INHERITANCE_DEPTH
                )));
            }
            let doc = self.get_by_name(&current)?;
            chain.push(doc);
            match &doc.spec.base {
                Some(base) => current = base.clone(),
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::EmbeddedProvider;

    #[test]
    fn build_loads_embedded_overlays_and_registry() {
        let store = MetadataStore::build(Arc::new(EmbeddedProvider::new())).expect("embedded data must be well formed");
        assert!(!store.names().is_empty());
        assert!(store.registry().count() > 0);
    }

    #[test]
    fn build_duration_histogram_buckets_and_counts_observations() {
        // module-level static, so just assert counts move monotonically
        // rather than pinning exact totals (other tests in this binary
        // observe into the same histogram).
        let before = build_duration_stats().count;
        observe_build_duration(Duration::from_millis(5));
        observe_build_duration(Duration::from_secs(60));
        let after = build_duration_stats();
        assert_eq!(after.count, before + 2);
        assert!(after.sum_ms >= 60_005);
        assert!(after.overflow_count >= 1, "a 60s build must land in overflow, past the largest bucket boundary");
    }

    #[test]
    fn resolve_chain_detects_self_cycle() {
        let mut overlays = BTreeMap::new();
        overlays.insert(
            "a".to_string(),
            RecipeMetadata {
                kind: KIND_RECIPE_METADATA.to_string(),
                api_version: crate::recipe::API_VERSION.to_string(),
                metadata: crate::recipe::RecipeName { name: "a".into() },
                spec: crate::recipe::RecipeSpec { base: Some("a".into()), ..Default::default() },
            },
        );
        let store = MetadataStore {
            overlays,
            registry: ComponentRegistry::default(),
            generation: 0,
            provider: Arc::new(EmbeddedProvider::new()),
        };
        let err = store.resolve_chain("a").unwrap_err();
        assert!(err.to_string().contains("circular recipe inheritance"));
    }
}
