//! The builder (C6): the single entry point that turns a query [`Criteria`]
//! into an ordered, fully-merged component list.

use crate::cancel::CancelToken;
use crate::criteria::Criteria;
use crate::error::Result;
use crate::merge::{resolve_values, validate_dependencies, Accumulator};
use crate::recipe::{ComponentRef, Constraint, API_VERSION, KIND_RECIPE_RESULT};
use crate::registry::{apply_defaults, build_scheduling_overrides};
use crate::snapshot::ConstraintEvaluator;
use crate::store::{observe_build_duration, MetadataStore};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The build's internal time budget, carved out of whatever external
/// deadline the caller supplies (typically 30s at the HTTP/CLI boundary,
/// leaving headroom for request marshalling on either side).
const INTERNAL_BUDGET: Duration = Duration::from_secs(25);

/// The builder's own version string, stamped onto every [`RecipeResult`].
/// Distinct from the document `apiVersion`: this identifies the engine
/// revision that produced the result, not the wire schema it's written in.
pub const BUILDER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct ResolvedComponent {
    pub component: ComponentRef,
    pub values: Value,
}

/// A constraint that excluded an overlay's components from the build,
/// recorded rather than raised so the rest of the build can still
/// complete.
#[derive(Debug, Clone)]
pub struct ConstraintWarning {
    pub overlay: String,
    pub constraint: Constraint,
    pub actual: Option<String>,
    pub reason: Option<String>,
}

pub struct RecipeResult {
    pub kind: &'static str,
    pub api_version: &'static str,
    /// RFC 3339 UTC timestamp of when this result was assembled.
    pub generated_at: String,
    pub recipe_version: &'static str,
    pub criteria: Criteria,
    /// Recipe names that contributed to the merge, `"base"` first, in the
    /// order their chains were applied. Never contains duplicates.
    pub applied_overlays: Vec<String>,
    /// Matching overlays dropped because one or more of their own
    /// constraints failed evaluation (only ever populated when an evaluator
    /// was supplied).
    pub excluded_overlays: Vec<String>,
    pub constraints: Vec<Constraint>,
    pub components: Vec<ResolvedComponent>,
    pub deployment_order: Vec<String>,
    pub constraint_warnings: Vec<ConstraintWarning>,
}

pub struct Builder {
    store: Arc<MetadataStore>,
}

impl Builder {
    pub fn new(store: Arc<MetadataStore>) -> Self {
        Builder { store }
    }

    /// Builds a recipe from `query` with no constraint evaluation: every
    /// matching overlay's components are included unconditionally. This is
    /// the path used when the caller supplied criteria directly rather than
    /// a snapshot.
    pub fn build_from_criteria(&self, query: &Criteria, external_budget: Duration) -> Result<RecipeResult> {
        self.build(query, None, external_budget)
    }

    /// Builds a recipe from `query`, gating each overlay's components on
    /// its declared constraints via `evaluator` (typically a [`Snapshot`]).
    pub fn build_from_criteria_with_evaluator(
        &self,
        query: &Criteria,
        evaluator: &dyn ConstraintEvaluator,
        external_budget: Duration,
    ) -> Result<RecipeResult> {
        self.build(query, Some(evaluator), external_budget)
    }

    fn build(&self, query: &Criteria, evaluator: Option<&dyn ConstraintEvaluator>, external_budget: Duration) -> Result<RecipeResult> {
        let started = Instant::now();
        let result = self.build_inner(query, evaluator, external_budget);
        observe_build_duration(started.elapsed());
        result
    }

    fn build_inner(&self, query: &Criteria, evaluator: Option<&dyn ConstraintEvaluator>, external_budget: Duration) -> Result<RecipeResult> {
        let token = CancelToken::with_timeout(external_budget).child_with_timeout(INTERNAL_BUDGET);

        let mut accumulator = Accumulator::new();
        let mut applied: Vec<String> = Vec::new();
        let mut applied_set = std::collections::BTreeSet::new();
        let mut excluded = Vec::new();
        let mut warnings = Vec::new();

        let root = self.store.get_by_name("base")?;
        accumulator.apply(&root.spec.constraints, &root.spec.component_refs);
        applied.push("base".to_string());
        applied_set.insert("base".to_string());

        token.check("match")?;
        let matching: Vec<_> = self
            .store
            .find_matching_overlays(query)
            .into_iter()
            .filter(|o| o.metadata.name != "base")
            .collect();

        for overlay in &matching {
            token.check("merge")?;
            let (admitted, mut overlay_warnings) = evaluate_constraints(&overlay.metadata.name, &overlay.spec.constraints, evaluator);
            warnings.append(&mut overlay_warnings);
            if !admitted {
                excluded.push(overlay.metadata.name.clone());
                continue;
            }

            // Pull in the overlay's whole inheritance chain, skipping
            // anything already applied by a previous (possibly
            // higher-specificity) overlay's chain so each recipe
            // contributes at most once.
            for doc in self.store.resolve_chain(&overlay.metadata.name)? {
                if !applied_set.insert(doc.metadata.name.clone()) {
                    continue;
                }
                accumulator.apply(&doc.spec.constraints, &doc.spec.component_refs);
                applied.push(doc.metadata.name.clone());
            }
        }

        if applied.len() == 1 {
            warn!("criteria {:?} matched no overlay beyond the root base", query);
        }

        let merged_constraints = accumulator.constraints();
        let mut components = accumulator.into_components();
        for component in &mut components {
            component.verify_shape()?;
            if let Some(entry) = self.store.registry().get(&component.name) {
                apply_defaults(component, entry);
                if let Some(scheduling) = &entry.node_scheduling {
                    token.check("scheduling")?;
                    inject_scheduling(component, query, scheduling);
                }
            }
        }

        token.check("order")?;
        let deployment_order = validate_dependencies(&components)?;
        let by_name: BTreeMap<String, ComponentRef> = components.into_iter().map(|c| (c.name.clone(), c)).collect();

        let mut resolved = Vec::with_capacity(deployment_order.len());
        for name in &deployment_order {
            token.check("resolve-values")?;
            let component = by_name.get(name).expect("ordered name came from components").clone();
            let values = resolve_values(self.store.provider(), &component)?;
            resolved.push(ResolvedComponent { component, values });
        }

        if !excluded.is_empty() {
            info!("build excluded {} overlay(s), applied {}: excluded={:?}", excluded.len(), applied.len(), excluded);
        }

        Ok(RecipeResult {
            kind: KIND_RECIPE_RESULT,
            api_version: API_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            recipe_version: BUILDER_VERSION,
            criteria: *query,
            applied_overlays: applied,
            excluded_overlays: excluded,
            constraints: merged_constraints,
            components: resolved,
            deployment_order,
            constraint_warnings: warnings,
        })
    }
}

/// Evaluates `constraints` (if any) against `evaluator`. With no evaluator
/// configured, or no constraints declared, the overlay is unconditionally
/// admitted. Returns whether the overlay's components should be merged in,
/// plus one warning per failing constraint.
fn evaluate_constraints(
    overlay: &str,
    constraints: &[Constraint],
    evaluator: Option<&dyn ConstraintEvaluator>,
) -> (bool, Vec<ConstraintWarning>) {
    let Some(evaluator) = evaluator else {
        return (true, Vec::new());
    };
    if constraints.is_empty() {
        return (true, Vec::new());
    }
    let mut warnings = Vec::new();
    for constraint in constraints {
        let (passed, actual, reason) = evaluator.evaluate(constraint);
        if !passed {
            // An evaluation error (fact missing, operand didn't parse) already
            // carries its own explanation; a plain value mismatch gets the
            // standard "expected X, got Y" wording synthesized here, since the
            // evaluator only reports the raw actual value.
            let reason = reason.or_else(|| {
                Some(match &actual {
                    Some(a) => format!("expected {}, got {}", constraint.value, a),
                    None => format!("expected {}, got no value", constraint.value),
                })
            });
            warnings.push(ConstraintWarning { overlay: overlay.to_string(), constraint: constraint.clone(), actual, reason });
        }
    }
    (warnings.is_empty(), warnings)
}

/// Injects node selectors/tolerations for the accelerated-node case when
/// the query targets a specific accelerator, or for the system-node case
/// otherwise, per the registry entry's declared scheduling paths.
fn inject_scheduling(component: &mut ComponentRef, query: &Criteria, scheduling: &crate::registry::NodeScheduling) {
    let accelerated = !query.accelerator.is_any();
    let paths = if accelerated { &scheduling.accelerated } else { &scheduling.system };
    if paths.node_selector_paths.is_empty() && paths.toleration_paths.is_empty() {
        return;
    }
    let node_selectors = if accelerated {
        vec![("nvidia.com/gpu.product".to_string(), query.accelerator.as_str().to_string())]
    } else {
        Vec::new()
    };
    let tolerations = if accelerated {
        vec![("nvidia.com/gpu".to_string(), "present".to_string(), "NoSchedule".to_string())]
    } else {
        Vec::new()
    };
    let fragment = build_scheduling_overrides(paths, &node_selectors, &tolerations);
    component.overrides = crate::value::deep_merge(&component.overrides, &fragment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LayeredProvider;
    use crate::store::MetadataStore;

    fn store() -> Arc<MetadataStore> {
        crate::store::install_provider(Arc::new(LayeredProvider::embedded_only()));
        crate::store::shared_store().expect("embedded store must build")
    }

    #[test]
    fn build_from_default_criteria_returns_the_base_recipe() {
        let builder = Builder::new(store());
        let result = builder.build_from_criteria(&Criteria::default(), Duration::from_secs(30)).expect("build must succeed");
        assert!(!result.components.is_empty());
    }

    #[test]
    fn build_orders_components_by_dependency() {
        let builder = Builder::new(store());
        let query = Criteria { service: crate::criteria::Service::Eks, intent: crate::criteria::Intent::Training, accelerator: crate::criteria::Accelerator::Gb200, ..Default::default() };
        let result = builder.build_from_criteria(&query, Duration::from_secs(30)).expect("build must succeed");
        let names: Vec<&str> = result.components.iter().map(|c| c.component.name.as_str()).collect();
        if let (Some(cm), Some(gpu)) = (
            names.iter().position(|n| *n == "cert-manager"),
            names.iter().position(|n| *n == "gpu-operator"),
        ) {
            assert!(cm < gpu, "cert-manager must come before gpu-operator when gpu-operator depends on it");
        }
    }
}
