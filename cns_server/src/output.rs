//! Wire-shape for a resolved recipe, independent of `cns_cli`'s own output
//! type since the two crates don't share a dependency on each other.

use cns_core::{ComponentType, Constraint, Criteria, RecipeResult};

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
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
    pub constraints: Vec<ConstraintResponse>,
    #[serde(rename = "componentRefs")]
    pub components: Vec<ComponentResponse>,
    #[serde(rename = "deploymentOrder")]
    pub deployment_order: Vec<String>,
    #[serde(rename = "constraintWarnings", skip_serializing_if = "Vec::is_empty")]
    pub constraint_warnings: Vec<WarningResponse>,
}

#[derive(Debug, Serialize)]
pub struct ConstraintResponse {
    pub name: String,
    pub value: String,
}

impl From<Constraint> for ConstraintResponse {
    fn from(c: Constraint) -> Self {
        ConstraintResponse { name: c.name, value: c.value }
    }
}

#[derive(Debug, Serialize)]
pub struct ComponentResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: Option<&'static str>,
    pub source: Option<String>,
    pub version: Option<String>,
    pub tag: Option<String>,
    pub path: Option<String>,
    pub values: cns_core::Value,
}

#[derive(Debug, Serialize)]
pub struct WarningResponse {
    pub overlay: String,
    pub constraint: String,
    pub actual: Option<String>,
    pub reason: Option<String>,
}

impl From<RecipeResult> for RecipeResponse {
    fn from(result: RecipeResult) -> Self {
        RecipeResponse {
            kind: result.kind,
            api_version: result.api_version,
            generated_at: result.generated_at,
            recipe_version: result.recipe_version,
            criteria: result.criteria,
            applied_overlays: result.applied_overlays,
            excluded_overlays: result.excluded_overlays,
            constraints: result.constraints.into_iter().map(ConstraintResponse::from).collect(),
            components: result
                .components
                .into_iter()
                .map(|c| ComponentResponse {
                    name: c.component.name,
                    component_type: c.component.component_type.map(|t| match t {
                        ComponentType::Helm => "Helm",
                        ComponentType::Kustomize => "Kustomize",
                    }),
                    source: c.component.source,
                    version: c.component.version,
                    tag: c.component.tag,
                    path: c.component.path,
                    values: c.values,
                })
                .collect(),
            deployment_order: result.deployment_order,
            constraint_warnings: result
                .constraint_warnings
                .into_iter()
                .map(|w| WarningResponse { overlay: w.overlay, constraint: w.constraint.name, actual: w.actual, reason: w.reason })
                .collect(),
        }
    }
}
