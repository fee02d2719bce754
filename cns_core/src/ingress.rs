//! Request-side criteria ingress: turns a query-string or a JSON/YAML
//! request body into a [`Criteria`], the one normalized shape the rest of
//! the engine works with.

use crate::criteria::{Accelerator, Criteria, Intent, Nodes, Os, Service};
use crate::error::{CnsError, Result};
use crate::recipe::{API_VERSION, KIND_RECIPE_CRITERIA};

/// The `GET /v1/recipe?service=eks&accelerator=h100` shape: every field
/// optional and string-typed, since that's what a query string gives you.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriteriaQuery {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub accelerator: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub nodes: Option<String>,
}

impl CriteriaQuery {
    pub fn into_criteria(self) -> Result<Criteria> {
        self.apply_over(Criteria::default())
    }

    /// Resolves against a `base` tuple (typically loaded from a
    /// [`RecipeCriteriaDocument`] on disk): any axis left unset on this
    /// query falls back to `base`'s value for that axis, so CLI flags can
    /// override individual fields of a loaded document without having to
    /// repeat the rest.
    pub fn apply_over(&self, base: Criteria) -> Result<Criteria> {
        Ok(Criteria {
            service: self.service.as_deref().map(Service::parse).transpose()?.unwrap_or(base.service),
            accelerator: self.accelerator.as_deref().map(Accelerator::parse).transpose()?.unwrap_or(base.accelerator),
            intent: self.intent.as_deref().map(Intent::parse).transpose()?.unwrap_or(base.intent),
            os: self.os.as_deref().map(Os::parse).transpose()?.unwrap_or(base.os),
            nodes: self.nodes.as_deref().map(Nodes::parse).transpose()?.unwrap_or(base.nodes),
        })
    }
}

/// The on-disk/wire envelope for a standalone criteria document: a
/// `{kind: recipeCriteria, apiVersion, spec}` shape mirroring
/// [`RecipeMetadata`](crate::recipe::RecipeMetadata)'s header, loaded e.g. by
/// `cns recipe --criteria path/to/doc.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCriteriaDocument {
    pub kind: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub spec: Criteria,
}

impl RecipeCriteriaDocument {
    pub fn validate_header(&self, source_path: &str) -> Result<()> {
        if self.kind != KIND_RECIPE_CRITERIA {
            return Err(CnsError::invalid_request(format!(
                "{}: expected kind '{}', got '{}'",
                source_path, KIND_RECIPE_CRITERIA, self.kind
            )));
        }
        if self.api_version != API_VERSION {
            return Err(CnsError::invalid_request(format!(
                "{}: expected apiVersion '{}', got '{}'",
                source_path, API_VERSION, self.api_version
            )));
        }
        Ok(())
    }
}

/// The `POST /v1/recipe` body: either an explicit `criteria` tuple or a
/// `snapshotUri` to derive one from. Exactly one must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriteriaDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    #[serde(default, rename = "snapshotUri", skip_serializing_if = "Option::is_none")]
    pub snapshot_uri: Option<String>,
}

impl CriteriaDocument {
    pub fn validate(&self) -> Result<()> {
        match (&self.criteria, &self.snapshot_uri) {
            (Some(_), Some(_)) => Err(CnsError::invalid_request("request body must set exactly one of 'criteria' or 'snapshotUri', not both")),
            (None, None) => Err(CnsError::invalid_request("request body must set one of 'criteria' or 'snapshotUri'")),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_with_no_fields_is_all_wildcard() {
        let q = CriteriaQuery::default();
        assert_eq!(q.into_criteria().unwrap(), Criteria::default());
    }

    #[test]
    fn query_rejects_unknown_axis_value() {
        let q = CriteriaQuery { service: Some("openshift".into()), ..Default::default() };
        assert!(q.into_criteria().is_err());
    }

    #[test]
    fn document_rejects_both_criteria_and_snapshot_uri() {
        let doc = CriteriaDocument { criteria: Some(Criteria::default()), snapshot_uri: Some("cm://a/b".into()) };
        assert!(doc.validate().is_err());
    }

    #[test]
    fn document_rejects_neither() {
        let doc = CriteriaDocument { criteria: None, snapshot_uri: None };
        assert!(doc.validate().is_err());
    }

    #[test]
    fn query_overrides_only_its_own_set_axes_over_a_base() {
        let base = Criteria { service: Service::Eks, accelerator: Accelerator::H100, ..Default::default() };
        let q = CriteriaQuery { intent: Some("training".into()), ..Default::default() };
        let merged = q.apply_over(base).unwrap();
        assert_eq!(merged.service, Service::Eks);
        assert_eq!(merged.accelerator, Accelerator::H100);
        assert_eq!(merged.intent, Intent::Training);
    }

    #[test]
    fn criteria_document_rejects_wrong_kind() {
        let doc = RecipeCriteriaDocument { kind: "somethingElse".into(), api_version: API_VERSION.into(), spec: Criteria::default() };
        assert!(doc.validate_header("doc.yaml").is_err());
    }

    #[test]
    fn criteria_document_accepts_well_formed_header() {
        let doc = RecipeCriteriaDocument { kind: KIND_RECIPE_CRITERIA.into(), api_version: API_VERSION.into(), spec: Criteria::default() };
        assert!(doc.validate_header("doc.yaml").is_ok());
    }
}
