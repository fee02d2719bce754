//! The component registry (C2): a declarative catalog of known components
//! with their Helm/Kustomize defaults and scheduling-injection paths.

use crate::recipe::{ComponentRef, ComponentType};
use crate::value::Value;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-z\-]{1,50}$").expect("static pattern is valid"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComponentRegistry {
    #[serde(default)]
    pub kind: String,
    #[serde(default, rename = "apiVersion")]
    pub api_version: String,
    #[serde(default)]
    pub components: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistryEntry {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default, rename = "valueOverrideKeys")]
    pub value_override_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmDefaults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<KustomizeDefaults>,
    #[serde(default, rename = "nodeScheduling", skip_serializing_if = "Option::is_none")]
    pub node_scheduling: Option<NodeScheduling>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HelmDefaults {
    pub repository: String,
    pub chart: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KustomizeDefaults {
    pub source: String,
    pub path: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeScheduling {
    #[serde(default)]
    pub system: SchedulingPaths,
    #[serde(default)]
    pub accelerated: SchedulingPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulingPaths {
    #[serde(default, rename = "nodeSelectorPaths")]
    pub node_selector_paths: Vec<String>,
    #[serde(default, rename = "tolerationPaths")]
    pub toleration_paths: Vec<String>,
}

impl ComponentRegistry {
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn get_by_override_key(&self, key: &str) -> Option<&RegistryEntry> {
        self.components
            .iter()
            .find(|c| c.name == key || c.value_override_keys.iter().any(|k| k == key))
    }

    pub fn names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn count(&self) -> usize {
        self.components.len()
    }

    /// Returns every structural defect found; an empty vec means the
    /// registry is well formed.
    pub fn validate(&self) -> Vec<String> {
        let mut defects = Vec::new();
        let mut seen_names = BTreeSet::new();
        let mut seen_keys: BTreeMap<&str, &str> = BTreeMap::new();

        for entry in &self.components {
            if entry.name.trim().is_empty() {
                defects.push("component entry missing required field 'name'".to_string());
            } else if !name_pattern().is_match(&entry.name) {
                defects.push(format!("component name '{}' must match ^[0-9a-z-]{{1,50}}$", entry.name));
            }
            if entry.display_name.trim().is_empty() {
                defects.push(format!("component '{}' missing required field 'displayName'", entry.name));
            }
            if !seen_names.insert(entry.name.as_str()) {
                defects.push(format!("duplicate component name '{}'", entry.name));
            }
            match (&entry.helm, &entry.kustomize) {
                (Some(_), Some(_)) => {
                    defects.push(format!("component '{}' declares both helm and kustomize defaults", entry.name))
                }
                (None, None) => {
                    defects.push(format!("component '{}' declares neither helm nor kustomize defaults", entry.name))
                }
                _ => {}
            }
            for key in std::iter::once(entry.name.as_str()).chain(entry.value_override_keys.iter().map(String::as_str))
            {
                if let Some(owner) = seen_keys.insert(key, entry.name.as_str()) {
                    if owner != entry.name.as_str() {
                        defects.push(format!(
                            "override key '{}' claimed by both '{}' and '{}'",
                            key, owner, entry.name
                        ));
                    }
                }
            }
        }
        defects
    }

    /// Coarse-grained merge used by the layered data provider: external
    /// entries replace same-named embedded ones wholesale; unmatched
    /// external entries are appended. The embedded `apiVersion`/`kind` are
    /// preserved (a differing external header is a warning, not a merge
    /// input).
    pub fn merge(embedded: &ComponentRegistry, external: &ComponentRegistry) -> ComponentRegistry {
        if !external.kind.is_empty() && external.kind != embedded.kind {
            warn!(
                "external registry.yaml kind '{}' differs from embedded '{}', embedded wins",
                external.kind, embedded.kind
            );
        }
        if !external.api_version.is_empty() && external.api_version != embedded.api_version {
            warn!(
                "external registry.yaml apiVersion '{}' differs from embedded '{}', embedded wins",
                external.api_version, embedded.api_version
            );
        }

        let mut by_name: BTreeMap<String, RegistryEntry> =
            embedded.components.iter().cloned().map(|c| (c.name.clone(), c)).collect();
        for ext in &external.components {
            by_name.insert(ext.name.clone(), ext.clone());
        }

        // preserve embedded ordering for embedded names, then append new
        // external-only names in their external order.
        let mut ordered = Vec::with_capacity(by_name.len());
        let mut taken = BTreeSet::new();
        for c in &embedded.components {
            if let Some(entry) = by_name.get(&c.name) {
                ordered.push(entry.clone());
                taken.insert(c.name.clone());
            }
        }
        for c in &external.components {
            if !taken.contains(&c.name) {
                ordered.push(c.clone());
                taken.insert(c.name.clone());
            }
        }

        ComponentRegistry { kind: embedded.kind.clone(), api_version: embedded.api_version.clone(), components: ordered }
    }
}

/// Fills in missing fields of `r` from `entry`'s defaults. Never overwrites
/// a field the recipe author set explicitly.
pub fn apply_defaults(r: &mut ComponentRef, entry: &RegistryEntry) {
    if r.component_type.is_none() {
        if entry.helm.is_some() {
            r.component_type = Some(ComponentType::Helm);
        } else if entry.kustomize.is_some() {
            r.component_type = Some(ComponentType::Kustomize);
        }
    }
    match r.component_type {
        Some(ComponentType::Helm) => {
            if let Some(h) = &entry.helm {
                if r.source.is_none() {
                    r.source = Some(h.repository.clone());
                }
                if r.version.is_none() {
                    r.version = Some(h.version.clone());
                }
            }
        }
        Some(ComponentType::Kustomize) => {
            if let Some(k) = &entry.kustomize {
                if r.source.is_none() {
                    r.source = Some(k.source.clone());
                }
                if r.tag.is_none() {
                    r.tag = Some(k.tag.clone());
                }
                if r.path.is_none() {
                    r.path = Some(k.path.clone());
                }
            }
        }
        None => {}
    }
}

/// Given a registry entry's declared scheduling paths, builds the
/// `overrides` fragment an emitter should deep-merge to inject node
/// selectors/tolerations. `tolerations` are `(key, value, effect)` triples.
pub fn build_scheduling_overrides(
    paths: &SchedulingPaths,
    node_selectors: &[(String, String)],
    tolerations: &[(String, String, String)],
) -> Value {
    let mut v = Value::default();
    for path in &paths.node_selector_paths {
        let mut mapping = std::collections::BTreeMap::new();
        for (k, val) in node_selectors {
            mapping.insert(k.clone(), Value::String(val.clone()));
        }
        v.set_path(path, Value::Mapping(mapping));
    }
    for path in &paths.toleration_paths {
        let seq = tolerations
            .iter()
            .map(|(k, val, effect)| {
                let mut m = std::collections::BTreeMap::new();
                m.insert("key".to_string(), Value::String(k.clone()));
                m.insert("value".to_string(), Value::String(val.clone()));
                m.insert("effect".to_string(), Value::String(effect.clone()));
                Value::Mapping(m)
            })
            .collect();
        v.set_path(path, Value::Sequence(seq));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, helm: bool) -> RegistryEntry {
        RegistryEntry {
            name: name.to_string(),
            display_name: name.to_string(),
            helm: if helm { Some(HelmDefaults::default()) } else { None },
            ..Default::default()
        }
    }

    #[test]
    fn validate_flags_duplicate_names_and_both_backends() {
        let reg = ComponentRegistry {
            components: vec![
                entry("a", true),
                entry("a", true),
                RegistryEntry {
                    helm: Some(HelmDefaults::default()),
                    kustomize: Some(KustomizeDefaults::default()),
                    ..entry("b", false)
                },
            ],
            ..Default::default()
        };
        let defects = reg.validate();
        assert!(defects.iter().any(|d| d.contains("duplicate component name 'a'")));
        assert!(defects.iter().any(|d| d.contains("both helm and kustomize")));
    }

    #[test]
    fn merge_replaces_by_name_and_appends_new() {
        let embedded = ComponentRegistry {
            kind: "componentRegistry".into(),
            api_version: "v1".into(),
            components: vec![entry("cert-manager", true), entry("gpu-operator", true)],
        };
        let mut gpu_override = entry("gpu-operator", true);
        gpu_override.display_name = "Overridden".into();
        let external =
            ComponentRegistry { kind: "componentRegistry".into(), api_version: "v1".into(), components: vec![gpu_override, entry("network-operator", true)] };
        let merged = ComponentRegistry::merge(&embedded, &external);
        assert_eq!(merged.names(), vec!["cert-manager", "gpu-operator", "network-operator"]);
        assert_eq!(merged.get("gpu-operator").unwrap().display_name, "Overridden");
    }

    #[test]
    fn apply_defaults_never_overwrites_explicit_fields() {
        let entry = RegistryEntry {
            helm: Some(HelmDefaults { repository: "https://default".into(), chart: "c".into(), version: "1.0".into() }),
            ..entry("gpu-operator", true)
        };
        let mut r = ComponentRef { name: "gpu-operator".into(), version: Some("2.0".into()), ..Default::default() };
        apply_defaults(&mut r, &entry);
        assert_eq!(r.component_type, Some(ComponentType::Helm));
        assert_eq!(r.source.as_deref(), Some("https://default"));
        assert_eq!(r.version.as_deref(), Some("2.0")); // explicit, untouched
    }
}
