//! End-to-end scenarios against the embedded default data tree: wildcard
//! matching, inheritance chains, constraint gating, and dependency
//! ordering.

use cns_core::{
    install_provider, shared_store, Accelerator, Builder, Criteria, Intent, LayeredProvider, Os,
    Service, Snapshot,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn builder() -> Builder {
    install_provider(Arc::new(LayeredProvider::embedded_only()));
    Builder::new(shared_store().expect("embedded store must build"))
}

#[test]
fn s1_wildcard_query_resolves_only_the_base_recipe() {
    let b = builder();
    let result = b.build_from_criteria(&Criteria::default(), Duration::from_secs(30)).unwrap();
    let names: Vec<&str> = result.components.iter().map(|c| c.component.name.as_str()).collect();
    assert_eq!(names, vec!["cert-manager"]);
    assert_eq!(result.applied_overlays, vec!["base".to_string()]);
    assert!(result.excluded_overlays.is_empty());
    assert!(result.constraint_warnings.is_empty());
    assert_eq!(result.deployment_order, vec!["cert-manager".to_string()]);
}

#[test]
fn applied_overlays_always_starts_with_base_and_has_no_duplicates() {
    let b = builder();
    let query = Criteria { service: Service::Eks, intent: Intent::Training, accelerator: Accelerator::Gb200, ..Default::default() };
    let result = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    assert_eq!(result.applied_overlays.first(), Some(&"base".to_string()));
    let mut sorted = result.applied_overlays.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), result.applied_overlays.len(), "applied_overlays must not repeat a recipe name");
    // gb200-eks-training inherits eks-training <- eks <- base: every link of
    // the chain must show up exactly once, in root-to-leaf order.
    let base = result.applied_overlays.iter().position(|n| n == "base").unwrap();
    let eks = result.applied_overlays.iter().position(|n| n == "eks").unwrap();
    let eks_training = result.applied_overlays.iter().position(|n| n == "eks-training").unwrap();
    let leaf = result.applied_overlays.iter().position(|n| n == "gb200-eks-training").unwrap();
    assert!(base < eks && eks < eks_training && eks_training < leaf);
}

#[test]
fn s2_eks_query_inherits_base_and_adds_network_operator() {
    let b = builder();
    let query = Criteria { service: Service::Eks, ..Default::default() };
    let result = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    let names: Vec<&str> = result.components.iter().map(|c| c.component.name.as_str()).collect();
    assert!(names.contains(&"cert-manager"));
    assert!(names.contains(&"network-operator"));
}

#[test]
fn s3_deep_chain_merges_driver_override_from_the_most_specific_overlay() {
    let b = builder();
    let query = Criteria { service: Service::Eks, intent: Intent::Training, accelerator: Accelerator::Gb200, ..Default::default() };
    let result = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    let gpu = result.components.iter().find(|c| c.component.name == "gpu-operator").expect("gpu-operator must be present");
    let driver = gpu.values.as_mapping().unwrap().get("driver").unwrap().as_mapping().unwrap();
    assert_eq!(driver.get("version"), Some(&cns_core::Value::String("580.82.07".to_string())));
    // sibling field from the values file gb200-eks-training points at survives the override merge.
    assert!(gpu.values.as_mapping().unwrap().contains_key("mig"));
    // the leaf overlay also adds the DRA driver componentRef alongside gpu-operator.
    assert!(result.components.iter().any(|c| c.component.name == "nvidia-dra-driver-gpu"));
}

#[test]
fn s4_failing_constraint_excludes_its_overlay_but_not_the_rest_of_the_build() {
    let b = builder();
    let query = Criteria { service: Service::Eks, os: Os::Ubuntu, ..Default::default() };
    let snapshot = Snapshot::default(); // no facts: K8s.cluster.version constraint cannot be evaluated
    let result = b.build_from_criteria_with_evaluator(&query, &snapshot, Duration::from_secs(30)).unwrap();
    assert!(!result.constraint_warnings.is_empty());
    assert!(result.constraint_warnings.iter().any(|w| w.overlay == "eks-strict"));
    assert!(result.excluded_overlays.contains(&"eks-strict".to_string()));
    assert!(!result.applied_overlays.contains(&"eks-strict".to_string()));
    // network-operator came from `eks`, which has no constraints, so it still appears.
    assert!(result.components.iter().any(|c| c.component.name == "network-operator"));
    // the strictMode override declared on eks-strict's componentRefs must not have applied.
    let net = result.components.iter().find(|c| c.component.name == "network-operator").unwrap();
    assert!(!net.values.as_mapping().unwrap().contains_key("strictMode"));
}

#[test]
fn s4b_passing_constraint_admits_the_overlay() {
    let b = builder();
    let query = Criteria { service: Service::Eks, os: Os::Ubuntu, ..Default::default() };
    let mut facts = BTreeMap::new();
    facts.insert("K8s.cluster.version".to_string(), "1.30".to_string());
    let snapshot = Snapshot { kind: "Snapshot".into(), api_version: "cns.nvidia.com/v1alpha1".into(), facts };
    let result = b.build_from_criteria_with_evaluator(&query, &snapshot, Duration::from_secs(30)).unwrap();
    assert!(result.constraint_warnings.is_empty());
    assert!(result.applied_overlays.contains(&"eks-strict".to_string()));
    assert!(result.constraints.iter().any(|c| c.name == "K8s.cluster.version"));
    let net = result.components.iter().find(|c| c.component.name == "network-operator").unwrap();
    assert_eq!(net.values.as_mapping().unwrap().get("strictMode"), Some(&cns_core::Value::Bool(true)));
}

#[test]
fn s4c_value_mismatch_produces_an_expected_got_reason() {
    let b = builder();
    let query = Criteria { service: Service::Eks, os: Os::Ubuntu, ..Default::default() };
    let mut facts = BTreeMap::new();
    facts.insert("K8s.cluster.version".to_string(), "1.20".to_string());
    let snapshot = Snapshot { kind: "Snapshot".into(), api_version: "cns.nvidia.com/v1alpha1".into(), facts };
    let result = b.build_from_criteria_with_evaluator(&query, &snapshot, Duration::from_secs(30)).unwrap();
    let warning = result
        .constraint_warnings
        .iter()
        .find(|w| w.overlay == "eks-strict")
        .expect("eks-strict's K8s.cluster.version constraint must fail against 1.20");
    assert_eq!(warning.constraint.value, ">=1.28");
    assert_eq!(warning.actual.as_deref(), Some("1.20"));
    assert_eq!(warning.reason.as_deref(), Some("expected >=1.28, got 1.20"));
}

#[test]
fn s5_gpu_operator_is_ordered_after_its_cert_manager_dependency() {
    let b = builder();
    let query = Criteria { accelerator: Accelerator::H100, os: Os::Ubuntu, intent: Intent::Inference, ..Default::default() };
    let result = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    let names: Vec<&str> = result.components.iter().map(|c| c.component.name.as_str()).collect();
    let cm = names.iter().position(|n| *n == "cert-manager").unwrap();
    let gpu = names.iter().position(|n| *n == "gpu-operator").unwrap();
    assert!(cm < gpu);
}

#[test]
fn s6_query_wildcard_never_pulls_in_a_specific_overlay() {
    let b = builder();
    // accelerator left wildcard: gb200-eks-training (which requires a specific
    // accelerator) must not match even though service/intent line up.
    let query = Criteria { service: Service::Eks, intent: Intent::Training, ..Default::default() };
    let result = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    let gpu = result.components.iter().find(|c| c.component.name == "gpu-operator").unwrap();
    let driver = gpu.values.as_mapping().unwrap().get("driver").unwrap().as_mapping().unwrap();
    // base gpu-operator values, not gb200's override.
    assert_eq!(driver.get("version"), Some(&cns_core::Value::String("550.54.15".to_string())));
}

#[test]
fn p_accelerated_node_scheduling_is_injected_only_for_specific_accelerators() {
    let b = builder();
    let query = Criteria { accelerator: Accelerator::H100, os: Os::Ubuntu, intent: Intent::Inference, ..Default::default() };
    let result = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    let gpu = result.components.iter().find(|c| c.component.name == "gpu-operator").unwrap();
    let daemonsets = gpu.values.as_mapping().unwrap().get("daemonsets").unwrap().as_mapping().unwrap();
    let selector = daemonsets.get("nodeSelector").unwrap().as_mapping().unwrap();
    assert_eq!(selector.get("nvidia.com/gpu.product"), Some(&cns_core::Value::String("h100".to_string())));
}

#[test]
fn p_byte_stable_component_order_across_repeated_builds() {
    let b = builder();
    let query = Criteria { service: Service::Eks, intent: Intent::Training, accelerator: Accelerator::Gb200, ..Default::default() };
    let first = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    let second = b.build_from_criteria(&query, Duration::from_secs(30)).unwrap();
    let names_a: Vec<&str> = first.components.iter().map(|c| c.component.name.as_str()).collect();
    let names_b: Vec<&str> = second.components.iter().map(|c| c.component.name.as_str()).collect();
    assert_eq!(names_a, names_b);
}
