//! `cns validate`: checks the configured data provider's recipes and
//! component registry for structural defects without performing a build --
//! the install-time sanity check an operator runs against a new `--data-dir`
//! before pointing traffic at it.

use cns_core::{shared_store, ComponentRef};

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub recipe_count: usize,
    pub component_count: usize,
    pub defects: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }
}

pub fn run() -> crate::Result<ValidationReport> {
    let store = shared_store()?;
    let mut defects = store.registry().validate();

    for name in store.names() {
        if let Err(e) = store.resolve_chain(name) {
            defects.push(format!("recipe '{}': {}", name, e));
            continue;
        }
        let doc = store.get_by_name(name)?;
        for component in &doc.spec.component_refs {
            if let Err(e) = component.verify_shape() {
                defects.push(format!("recipe '{}': {}", name, e));
            }
            check_registry_coverage(component, &mut defects, name);
        }
    }

    Ok(ValidationReport { recipe_count: store.names().len(), component_count: store.registry().count(), defects })
}

fn check_registry_coverage(component: &ComponentRef, defects: &mut Vec<String>, recipe_name: &str) {
    let store = match shared_store() {
        Ok(s) => s,
        Err(_) => return,
    };
    if store.registry().get(&component.name).is_none() {
        defects.push(format!(
            "recipe '{}' references component '{}' which has no registry entry",
            recipe_name, component.name
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_tree_validates_clean() {
        cns_core::install_provider(std::sync::Arc::new(cns_core::LayeredProvider::embedded_only()));
        let report = run().expect("validate must run against embedded data");
        assert!(report.is_clean(), "embedded data should have no defects: {:?}", report.defects);
        assert!(report.recipe_count > 0);
        assert!(report.component_count > 0);
    }
}
