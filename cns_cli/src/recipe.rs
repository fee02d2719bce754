//! `cns recipe`: resolves a recipe from explicit criteria or a snapshot and
//! prints the merged component list.

use cns_core::{
    derive_criteria, shared_store, Builder, ComponentRef, Constraint, Criteria, CriteriaQuery,
    RecipeResult, Snapshot, SnapshotSource, Value,
};
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct RecipeOutputDocument {
    pub kind: &'static str,
    #[serde(rename = "apiVersion")]
    pub api_version: &'static str,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    #[serde(rename = "recipeVersion")]
    pub recipe_version: &'static str,
    pub criteria: Criteria,
    #[serde(rename = "appliedOverlays")]
    pub applied_overlays: Vec<String>,
    #[serde(rename = "excludedOverlays", skip_serializing_if = "Vec::is_empty")]
    pub excluded_overlays: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintOutput>,
    #[serde(rename = "componentRefs")]
    pub components: Vec<ComponentOutput>,
    #[serde(rename = "deploymentOrder")]
    pub deployment_order: Vec<String>,
    #[serde(rename = "constraintWarnings", skip_serializing_if = "Vec::is_empty")]
    pub constraint_warnings: Vec<WarningOutput>,
}

#[derive(Debug, Serialize)]
pub struct ConstraintOutput {
    pub name: String,
    pub value: String,
}

impl From<Constraint> for ConstraintOutput {
    fn from(c: Constraint) -> Self {
        ConstraintOutput { name: c.name, value: c.value }
    }
}

#[derive(Debug, Serialize)]
pub struct ComponentOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: Option<&'static str>,
    pub source: Option<String>,
    pub version: Option<String>,
    pub tag: Option<String>,
    pub path: Option<String>,
    pub values: Value,
}

#[derive(Debug, Serialize)]
pub struct WarningOutput {
    pub overlay: String,
    pub constraint: String,
    pub actual: Option<String>,
    pub reason: Option<String>,
}

/// Resolves a recipe from an explicit query-style criteria tuple (no
/// constraint evaluation: there's no snapshot to evaluate constraints
/// against).
pub fn build_by_criteria(query: CriteriaQuery, timeout: Duration) -> crate::Result<RecipeOutputDocument> {
    build_by_resolved_criteria(query.into_criteria()?, timeout)
}

/// Resolves a recipe from an already-resolved [`Criteria`] tuple, e.g. one
/// merged from a `--criteria` document and per-flag overrides.
pub fn build_by_resolved_criteria(criteria: Criteria, timeout: Duration) -> crate::Result<RecipeOutputDocument> {
    let builder = Builder::new(shared_store()?);
    let result = builder.build_from_criteria(&criteria, timeout)?;
    Ok(to_output(result))
}

/// Resolves a recipe by fetching a snapshot through `source`, deriving
/// criteria from its facts, and gating every overlay's constraints against
/// it.
pub fn build_by_snapshot(source: &dyn SnapshotSource, uri: &str, timeout: Duration) -> crate::Result<RecipeOutputDocument> {
    let snapshot: Snapshot = source.fetch(uri)?;
    snapshot.validate_header()?;
    let criteria = derive_criteria(&snapshot);
    let builder = Builder::new(shared_store()?);
    let result = builder.build_from_criteria_with_evaluator(&criteria, &snapshot, timeout)?;
    Ok(to_output(result))
}

fn to_output(result: RecipeResult) -> RecipeOutputDocument {
    RecipeOutputDocument {
        kind: result.kind,
        api_version: result.api_version,
        generated_at: result.generated_at,
        recipe_version: result.recipe_version,
        criteria: result.criteria,
        applied_overlays: result.applied_overlays,
        excluded_overlays: result.excluded_overlays,
        constraints: result.constraints.into_iter().map(ConstraintOutput::from).collect(),
        components: result.components.into_iter().map(|c| component_output(c.component, c.values)).collect(),
        deployment_order: result.deployment_order,
        constraint_warnings: result
            .constraint_warnings
            .into_iter()
            .map(|w| WarningOutput {
                overlay: w.overlay,
                constraint: w.constraint.name,
                actual: w.actual,
                reason: w.reason,
            })
            .collect(),
    }
}

fn component_output(component: ComponentRef, values: Value) -> ComponentOutput {
    ComponentOutput {
        name: component.name,
        component_type: component.component_type.map(|t| match t {
            cns_core::ComponentType::Helm => "Helm",
            cns_core::ComponentType::Kustomize => "Kustomize",
        }),
        source: component.source,
        version: component.version,
        tag: component.tag,
        path: component.path,
        values,
    }
}
