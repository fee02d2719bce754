//! Pure matching/ordering helpers (C4), kept free of any store or provider
//! dependency so they're trivial to unit test in isolation.

use crate::recipe::RecipeMetadata;

/// Orders overlays ascending by criteria specificity, breaking ties
/// lexicographically by recipe name for a deterministic application order
/// (and therefore deterministic merge winner on field collisions).
pub fn order_by_specificity<'a, I>(overlays: I) -> Vec<&'a RecipeMetadata>
where
    I: IntoIterator<Item = &'a RecipeMetadata>,
{
    let mut v: Vec<&RecipeMetadata> = overlays.into_iter().collect();
    v.sort_by(|a, b| {
        let sa = a.spec.criteria_or_default().specificity();
        let sb = b.spec.criteria_or_default().specificity();
        sa.cmp(&sb).then_with(|| a.metadata.name.cmp(&b.metadata.name))
    });
    v
}
