//! Recipe documents: the versioned declarative format read from the data
//! provider, plus the `Constraint`/`ComponentRef` fragments they carry.

use crate::criteria::Criteria;
use crate::error::{CnsError, Result};
use crate::value::Value;

pub const API_VERSION: &str = "cns.nvidia.com/v1alpha1";
pub const KIND_RECIPE_METADATA: &str = "recipeMetadata";
pub const KIND_RECIPE_RESULT: &str = "recipeResult";
pub const KIND_RECIPE_CRITERIA: &str = "recipeCriteria";
pub const KIND_SNAPSHOT: &str = "Snapshot";
pub const KIND_COMPONENT_REGISTRY: &str = "componentRegistry";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecipeName {
    pub name: String,
}

/// A RecipeMetadata document, as read from `base.yaml` or one of the
/// overlay `*.yaml` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeMetadata {
    pub kind: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub metadata: RecipeName,
    #[serde(default)]
    pub spec: RecipeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecipeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, rename = "componentRefs", skip_serializing_if = "Vec::is_empty")]
    pub component_refs: Vec<ComponentRef>,
}

impl RecipeSpec {
    /// The overlay's own criteria, or the all-wildcard tuple if unset
    /// (a recipe that sets no criteria at all matches only an equally
    /// wildcard query).
    pub fn criteria_or_default(&self) -> Criteria {
        self.criteria.unwrap_or_default()
    }
}

impl RecipeMetadata {
    /// Validates the document header: `kind` must be `recipeMetadata`,
    /// `apiVersion` must match, and `metadata.name` must be set.
    pub fn validate_header(&self, source_path: &str) -> Result<()> {
        if self.kind != KIND_RECIPE_METADATA {
            return Err(CnsError::invalid_request(format!(
                "{}: expected kind '{}', got '{}'",
                source_path, KIND_RECIPE_METADATA, self.kind
            ))
            .with_path(source_path.to_string()));
        }
        if self.api_version != API_VERSION {
            return Err(CnsError::invalid_request(format!(
                "{}: expected apiVersion '{}', got '{}'",
                source_path, API_VERSION, self.api_version
            ))
            .with_path(source_path.to_string()));
        }
        if self.metadata.name.trim().is_empty() {
            return Err(CnsError::invalid_request(format!("{}: metadata.name is required", source_path))
                .with_path(source_path.to_string()));
        }
        Ok(())
    }
}

/// A typed predicate over a dotted snapshot path `Type.subtype.key`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

impl ConstraintOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintOp::Ge => ">=",
            ConstraintOp::Le => "<=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Lt => "<",
            ConstraintOp::Eq => "==",
            ConstraintOp::Ne => "!=",
        }
    }
}

impl Constraint {
    /// Splits the dotted `name` into its `(Type, subtype, key)` parts,
    /// validating `Type` against the known set.
    pub fn path_parts(&self) -> Result<(String, String, String)> {
        let mut parts = self.name.splitn(3, '.');
        let (t, s, k) = (
            parts.next().unwrap_or(""),
            parts.next().unwrap_or(""),
            parts.next().unwrap_or(""),
        );
        if t.is_empty() || s.is_empty() || k.is_empty() {
            return Err(CnsError::invalid_request(format!(
                "constraint name '{}' must be a dotted Type.subtype.key path",
                self.name
            )));
        }
        if !matches!(t, "K8s" | "OS" | "GPU" | "SystemD") {
            return Err(CnsError::invalid_request(format!(
                "constraint name '{}' has unknown type '{}', expected one of K8s/OS/GPU/SystemD",
                self.name, t
            )));
        }
        Ok((t.to_string(), s.to_string(), k.to_string()))
    }

    /// Splits `value` into an optional comparison operator and the operand
    /// token. A bare literal (no recognised operator prefix) is treated as
    /// an exact-match expectation.
    pub fn operator_expr(&self) -> (Option<ConstraintOp>, &str) {
        let v = self.value.trim();
        for (prefix, op) in [
            (">=", ConstraintOp::Ge),
            ("<=", ConstraintOp::Le),
            ("==", ConstraintOp::Eq),
            ("!=", ConstraintOp::Ne),
            (">", ConstraintOp::Gt),
            ("<", ConstraintOp::Lt),
        ] {
            if let Some(rest) = v.strip_prefix(prefix) {
                return (Some(op), rest.trim());
            }
        }
        (None, v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentType {
    Helm,
    Kustomize,
}

/// A reference to a deployable unit (Helm chart or Kustomize overlay).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComponentRef {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, rename = "valuesFile", skip_serializing_if = "Option::is_none")]
    pub values_file: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_empty_mapping")]
    pub overrides: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<String>,
    #[serde(default, rename = "dependencyRefs", skip_serializing_if = "Vec::is_empty")]
    pub dependency_refs: Vec<String>,
}

impl ComponentRef {
    /// I7: `type` and configuration fields are mutually exclusive per the
    /// declared type.
    pub fn verify_shape(&self) -> Result<()> {
        match self.component_type {
            Some(ComponentType::Kustomize) if self.version.is_some() => Err(CnsError::invalid_request(format!(
                "component '{}' is Kustomize but sets Helm-only field 'version'",
                self.name
            ))),
            Some(ComponentType::Helm) if self.tag.is_some() || self.path.is_some() => Err(CnsError::invalid_request(
                format!("component '{}' is Helm but sets Kustomize-only field 'tag'/'path'", self.name),
            )),
            _ => Ok(()),
        }
    }
}
