//! Cluster snapshots: the dotted `Type.subtype.key` fact documents that
//! constraints are evaluated against, plus criteria inference from a
//! snapshot's facts.

use crate::criteria::{Accelerator, Criteria, Intent, Nodes, Os, Service};
use crate::error::{CnsError, Result};
use crate::recipe::{Constraint, ConstraintOp, KIND_SNAPSHOT};
use std::collections::BTreeMap;

/// A point-in-time record of facts about a target cluster, keyed by the
/// same dotted `Type.subtype.key` path constraints use.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub kind: String,
    #[serde(default, rename = "apiVersion")]
    pub api_version: String,
    #[serde(default)]
    pub facts: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.facts.get(path).map(String::as_str)
    }

    pub fn validate_header(&self) -> Result<()> {
        if self.kind != KIND_SNAPSHOT {
            return Err(CnsError::invalid_request(format!("expected kind '{}', got '{}'", KIND_SNAPSHOT, self.kind)));
        }
        Ok(())
    }
}

/// A pure evaluator over a single constraint: `(passed, actual, error)`.
/// Failure to evaluate (fact missing, operand doesn't parse) degrades to
/// `(false, None, Some(reason))` -- the caller excludes the affected
/// component and emits a warning rather than aborting the whole build.
pub trait ConstraintEvaluator {
    fn evaluate(&self, constraint: &Constraint) -> (bool, Option<String>, Option<String>);
}

impl ConstraintEvaluator for Snapshot {
    fn evaluate(&self, constraint: &Constraint) -> (bool, Option<String>, Option<String>) {
        let (_t, _s, _k) = match constraint.path_parts() {
            Ok(parts) => parts,
            Err(e) => return (false, None, Some(e.to_string())),
        };
        let actual = match self.get(&constraint.name) {
            Some(v) => v,
            None => return (false, None, Some(format!("snapshot has no fact '{}'", constraint.name))),
        };
        let (op, expected) = constraint.operator_expr();
        let passed = match op {
            None | Some(ConstraintOp::Eq) => actual == expected,
            Some(ConstraintOp::Ne) => actual != expected,
            Some(cmp) => match (actual.parse::<f64>(), expected.parse::<f64>()) {
                (Ok(a), Ok(b)) => match cmp {
                    ConstraintOp::Ge => a >= b,
                    ConstraintOp::Le => a <= b,
                    ConstraintOp::Gt => a > b,
                    ConstraintOp::Lt => a < b,
                    ConstraintOp::Eq | ConstraintOp::Ne => unreachable!(),
                },
                _ => {
                    return (
                        false,
                        Some(actual.to_string()),
                        Some(format!("cannot compare non-numeric fact '{}' ({}) with operator {}", constraint.name, actual, cmp.as_str())),
                    )
                }
            },
        };
        (passed, Some(actual.to_string()), None)
    }
}

/// Fetches a [`Snapshot`] from an external source, identified by a URI. The
/// only scheme implemented directly is `cm://`; other schemes are a matter
/// of supplying a different `SnapshotSource` impl.
pub trait SnapshotSource {
    fn fetch(&self, uri: &str) -> Result<Snapshot>;
}

/// Splits a `cm://<namespace>/<name>` URI into its namespace and name
/// parts.
pub fn parse_configmap_uri(uri: &str) -> Result<(String, String)> {
    let rest = uri
        .strip_prefix("cm://")
        .ok_or_else(|| CnsError::invalid_request(format!("snapshot URI '{}' must use the cm:// scheme", uri)))?;
    let mut parts = rest.splitn(2, '/');
    let (namespace, name) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
    if namespace.is_empty() || name.is_empty() {
        return Err(CnsError::invalid_request(format!(
            "snapshot URI '{}' must be cm://<namespace>/<name>",
            uri
        )));
    }
    Ok((namespace.to_string(), name.to_string()))
}

/// Infers a query [`Criteria`] from a snapshot's well-known facts, for
/// callers that want to build a recipe straight from what a cluster reports
/// about itself rather than supplying criteria explicitly.
pub fn derive_criteria(snapshot: &Snapshot) -> Criteria {
    Criteria {
        service: snapshot.get("K8s.cluster.service").and_then(|v| Service::parse(v).ok()).unwrap_or_default(),
        accelerator: snapshot.get("GPU.model.name").and_then(|v| Accelerator::parse(v).ok()).unwrap_or_default(),
        intent: snapshot.get("K8s.cluster.intent").and_then(|v| Intent::parse(v).ok()).unwrap_or_default(),
        os: snapshot.get("OS.release.id").and_then(|v| Os::parse(v).ok()).unwrap_or_default(),
        nodes: snapshot.get("K8s.cluster.nodeCount").and_then(|v| Nodes::parse(v).ok()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(facts: &[(&str, &str)]) -> Snapshot {
        Snapshot {
            kind: KIND_SNAPSHOT.to_string(),
            api_version: "cns.nvidia.com/v1alpha1".into(),
            facts: facts.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn configmap_uri_parses_namespace_and_name() {
        let (ns, name) = parse_configmap_uri("cm://gpu-operator/cluster-info").unwrap();
        assert_eq!(ns, "gpu-operator");
        assert_eq!(name, "cluster-info");
    }

    #[test]
    fn configmap_uri_rejects_other_schemes() {
        assert!(parse_configmap_uri("s3://bucket/key").is_err());
    }

    #[test]
    fn evaluate_numeric_ge_constraint() {
        let snap = snapshot(&[("K8s.node.cpuCores", "64")]);
        let c = Constraint { name: "K8s.node.cpuCores".into(), value: ">=32".into() };
        let (passed, actual, err) = snap.evaluate(&c);
        assert!(passed);
        assert_eq!(actual.as_deref(), Some("64"));
        assert!(err.is_none());
    }

    #[test]
    fn evaluate_missing_fact_degrades_to_failure_with_reason() {
        let snap = snapshot(&[]);
        let c = Constraint { name: "K8s.node.cpuCores".into(), value: ">=32".into() };
        let (passed, _actual, err) = snap.evaluate(&c);
        assert!(!passed);
        assert!(err.unwrap().contains("no fact"));
    }

    #[test]
    fn derive_criteria_reads_known_facts() {
        let snap = snapshot(&[("GPU.model.name", "h100"), ("OS.release.id", "ubuntu"), ("K8s.cluster.service", "eks")]);
        let criteria = derive_criteria(&snap);
        assert_eq!(criteria.accelerator, Accelerator::H100);
        assert_eq!(criteria.os, Os::Ubuntu);
        assert_eq!(criteria.service, Service::Eks);
    }
}
