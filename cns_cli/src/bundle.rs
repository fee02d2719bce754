//! `cns bundle`: writes a resolved [`RecipeResult`] out as a directory of
//! per-component artifacts an agent (or a human with `kubectl apply -f`)
//! can act on. `BundleEmitter` is the seam between "what to deploy" (the
//! core's job) and "how to lay it out on disk" (this crate's job), so a
//! future Kustomize- or raw-manifest-flavoured emitter only needs a new
//! impl, not a change to the builder.

use cns_core::{ComponentType, RecipeResult};
use std::fs;
use std::path::Path;

pub trait BundleEmitter {
    /// Writes one bundle artifact per component of `result` under
    /// `out_dir`, creating it if necessary.
    fn emit(&self, result: &RecipeResult, out_dir: &Path) -> crate::Result<()>;
}

/// Writes `<out_dir>/<component>/values.yaml` for every Helm component and
/// `<out_dir>/<component>/values.yaml` (treated as a Kustomize values
/// overlay) for Kustomize ones -- the shape a downstream `helm upgrade -f`
/// or `kustomize build` step expects.
pub struct ValuesFileEmitter;

impl BundleEmitter for ValuesFileEmitter {
    fn emit(&self, result: &RecipeResult, out_dir: &Path) -> crate::Result<()> {
        fs::create_dir_all(out_dir)?;
        for resolved in &result.components {
            let component_dir = out_dir.join(&resolved.component.name);
            fs::create_dir_all(&component_dir)?;
            let values_yaml = serde_yaml::to_string(&resolved.values)?;
            fs::write(component_dir.join("values.yaml"), values_yaml)?;

            let manifest_yaml = serde_yaml::to_string(&ComponentManifest::from(resolved))?;
            fs::write(component_dir.join("component.yaml"), manifest_yaml)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ComponentManifest {
    name: String,
    #[serde(rename = "type")]
    component_type: Option<&'static str>,
    source: Option<String>,
    version: Option<String>,
    tag: Option<String>,
    path: Option<String>,
}

impl From<&cns_core::ResolvedComponent> for ComponentManifest {
    fn from(resolved: &cns_core::ResolvedComponent) -> Self {
        let c = &resolved.component;
        ComponentManifest {
            name: c.name.clone(),
            component_type: c.component_type.map(|t| match t {
                ComponentType::Helm => "Helm",
                ComponentType::Kustomize => "Kustomize",
            }),
            source: c.source.clone(),
            version: c.version.clone(),
            tag: c.tag.clone(),
            path: c.path.clone(),
        }
    }
}

/// Hands a resolved bundle off to something that actually applies it to a
/// cluster. No implementation ships here -- wiring this to a real
/// Kubernetes client or GitOps push is deployment-environment-specific and
/// deliberately left to the integrator.
pub trait AgentDeployer {
    fn deploy(&self, result: &RecipeResult, out_dir: &Path) -> crate::Result<()>;
}

/// Logs what it would have done; used by `cns bundle --dry-run` and in
/// tests.
pub struct DryRunDeployer;

impl AgentDeployer for DryRunDeployer {
    fn deploy(&self, result: &RecipeResult, out_dir: &Path) -> crate::Result<()> {
        for resolved in &result.components {
            info!("dry-run: would deploy '{}' from bundle at {}", resolved.component.name, out_dir.display());
        }
        Ok(())
    }
}
