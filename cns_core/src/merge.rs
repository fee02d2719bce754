//! The merge & ordering engine (C5): folds a sequence of overlays'
//! `componentRefs` into one map keyed by component name, resolves each
//! component's final values document, and orders the result for emission.

use crate::error::Result;
use crate::provider::DataProvider;
use crate::recipe::{ComponentRef, Constraint};
use crate::toposort::topo_sort;
use crate::value::{deep_merge, Value};
use std::collections::BTreeMap;

/// Merges one overlay's `ComponentRef` on top of an already-accumulated one.
/// Scalar fields: `overlay`'s value wins when set, otherwise `base`'s is
/// kept. List fields (`patches`, `dependencyRefs`): `overlay`'s list
/// replaces `base`'s wholesale when non-empty, otherwise `base`'s survives.
/// `overrides` always deep-merges.
pub fn merge_component_ref(base: &ComponentRef, overlay: &ComponentRef) -> ComponentRef {
    ComponentRef {
        name: overlay.name.clone(),
        component_type: overlay.component_type.or(base.component_type),
        source: overlay.source.clone().or_else(|| base.source.clone()),
        version: overlay.version.clone().or_else(|| base.version.clone()),
        tag: overlay.tag.clone().or_else(|| base.tag.clone()),
        path: overlay.path.clone().or_else(|| base.path.clone()),
        values_file: overlay.values_file.clone().or_else(|| base.values_file.clone()),
        overrides: deep_merge(&base.overrides, &overlay.overrides),
        patches: if overlay.patches.is_empty() { base.patches.clone() } else { overlay.patches.clone() },
        dependency_refs: if overlay.dependency_refs.is_empty() {
            base.dependency_refs.clone()
        } else {
            overlay.dependency_refs.clone()
        },
    }
}

/// Accumulates `componentRefs` and `constraints` across a sequence of
/// overlays, applied in the order given (callers pass ascending-specificity
/// order so the most specific overlay wins on any field collision).
#[derive(Default)]
pub struct Accumulator {
    components: BTreeMap<String, ComponentRef>,
    constraints: BTreeMap<String, Constraint>,
}

impl Accumulator {
    pub fn new() -> Self {
        Accumulator::default()
    }

    pub fn apply(&mut self, constraints: &[Constraint], refs: &[ComponentRef]) {
        for c in constraints {
            self.constraints.insert(c.name.clone(), c.clone());
        }
        for r in refs {
            let merged = match self.components.get(&r.name) {
                Some(existing) => merge_component_ref(existing, r),
                None => r.clone(),
            };
            self.components.insert(r.name.clone(), merged);
        }
    }

    /// Merged `componentRefs`, sorted by name for deterministic output.
    pub fn into_components(self) -> Vec<ComponentRef> {
        self.components.into_values().collect()
    }

    /// Merged `constraints`, sorted by name for deterministic output.
    pub fn constraints(&self) -> Vec<Constraint> {
        self.constraints.values().cloned().collect()
    }
}

/// Resolves a component's final values document per the layering order in
/// §4.5: base-values (`components/<name>/values.yaml`) ≺ `valuesFile`
/// overlay (any other path under `components/<name>/`) ≺ inline `overrides`.
///
/// When `valuesFile` names the base-values path itself, it is loaded once
/// directly — there is nothing beneath it to layer. When it names some
/// other path under the component's directory, the base-values file is
/// loaded first (its absence is tolerated) and the `valuesFile` content is
/// deep-merged on top, before `overrides` are applied last.
pub fn resolve_values(provider: &dyn DataProvider, component: &ComponentRef) -> Result<Value> {
    let base_values_path = format!("components/{}/values.yaml", component.name);
    let base = match &component.values_file {
        Some(path) if *path == base_values_path => load_yaml(provider, path)?,
        Some(path) => {
            let base_values = load_yaml_tolerant(provider, &base_values_path)?;
            let overlay_values = load_yaml(provider, path)?;
            deep_merge(&base_values, &overlay_values)
        }
        None => Value::default(),
    };
    Ok(deep_merge(&base, &component.overrides))
}

fn load_yaml(provider: &dyn DataProvider, path: &str) -> Result<Value> {
    let (bytes, _) = provider.read(path)?;
    Ok(serde_yaml::from_slice(&bytes)?)
}

/// Like [`load_yaml`], but a `not-found` result is silently treated as an
/// empty mapping rather than propagated, per §4.5 step 2 ("silently
/// tolerate its absence").
fn load_yaml_tolerant(provider: &dyn DataProvider, path: &str) -> Result<Value> {
    match load_yaml(provider, path) {
        Ok(v) => Ok(v),
        Err(e) if matches!(e.kind(), crate::error::ErrorKind::NotFound(_)) => Ok(Value::default()),
        Err(e) => Err(e),
    }
}

/// Topologically orders `components` by their `dependencyRefs`, returning
/// the ordered component names. Unknown dependency targets and cycles are
/// both reported as `invalid-request` errors.
pub fn validate_dependencies(components: &[ComponentRef]) -> Result<Vec<String>> {
    let names: Vec<String> = components.iter().map(|c| c.name.clone()).collect();
    let deps: BTreeMap<String, Vec<String>> =
        components.iter().map(|c| (c.name.clone(), c.dependency_refs.clone())).collect();
    topo_sort(&names, &deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::ComponentType;

    fn comp(name: &str) -> ComponentRef {
        ComponentRef { name: name.to_string(), ..Default::default() }
    }

    #[test]
    fn merge_keeps_base_scalar_when_overlay_unset() {
        let base = ComponentRef { version: Some("1.0".into()), ..comp("gpu-operator") };
        let overlay = comp("gpu-operator");
        let merged = merge_component_ref(&base, &overlay);
        assert_eq!(merged.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn merge_overlay_scalar_wins_when_set() {
        let base = ComponentRef { version: Some("1.0".into()), ..comp("gpu-operator") };
        let overlay = ComponentRef { version: Some("2.0".into()), ..comp("gpu-operator") };
        let merged = merge_component_ref(&base, &overlay);
        assert_eq!(merged.version.as_deref(), Some("2.0"));
    }

    #[test]
    fn merge_empty_overlay_list_keeps_base_list() {
        let base = ComponentRef { patches: vec!["p1".into()], ..comp("gpu-operator") };
        let overlay = comp("gpu-operator");
        let merged = merge_component_ref(&base, &overlay);
        assert_eq!(merged.patches, vec!["p1".to_string()]);
    }

    #[test]
    fn accumulator_applies_overlays_in_order() {
        let mut acc = Accumulator::new();
        acc.apply(&[], &[ComponentRef { component_type: Some(ComponentType::Helm), ..comp("gpu-operator") }]);
        acc.apply(&[], &[ComponentRef { version: Some("550.54".into()), ..comp("gpu-operator") }]);
        let components = acc.into_components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].component_type, Some(ComponentType::Helm));
        assert_eq!(components[0].version.as_deref(), Some("550.54"));
    }

    #[test]
    fn accumulator_constraints_are_keyed_by_name_last_writer_wins() {
        let mut acc = Accumulator::new();
        acc.apply(&[Constraint { name: "K8s.cluster.version".into(), value: ">=1.28".into() }], &[]);
        acc.apply(&[Constraint { name: "K8s.cluster.version".into(), value: ">=1.30".into() }], &[]);
        let constraints = acc.constraints();
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].value, ">=1.30");
    }

    #[test]
    fn validate_dependencies_orders_topologically() {
        let components = vec![
            ComponentRef { dependency_refs: vec!["cert-manager".into()], ..comp("gpu-operator") },
            comp("cert-manager"),
        ];
        let order = validate_dependencies(&components).unwrap();
        assert_eq!(order, vec!["cert-manager".to_string(), "gpu-operator".to_string()]);
    }
}
