//! Dependency ordering for the final component list: a deterministic
//! topological sort (Kahn's algorithm) plus DFS-based cycle detection for
//! the diagnostic error path.

use crate::error::{CnsError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Topologically sorts `names` against `deps` (`deps[name]` = the names it
/// must come after). The ready-set is a `BTreeSet`, so at every step the
/// lexicographically smallest ready node is emitted next -- this is what
/// makes the output byte-stable across runs with the same input, not just
/// dependency-order-correct.
pub fn topo_sort(names: &[String], deps: &BTreeMap<String, Vec<String>>) -> Result<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = names.iter().map(|n| (n.as_str(), 0)).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = names.iter().map(|n| (n.as_str(), Vec::new())).collect();

    for name in names {
        for dep in deps.get(name).map(Vec::as_slice).unwrap_or(&[]) {
            if !in_degree.contains_key(dep.as_str()) {
                return Err(CnsError::invalid_request(format!(
                    "component '{}' declares a dependency on unknown component '{}'",
                    name, dep
                )));
            }
            *in_degree.get_mut(name.as_str()).expect("name is a key") += 1;
            dependents.get_mut(dep.as_str()).expect("dep is a key").push(name.as_str());
        }
    }

    let mut ready: BTreeSet<&str> = in_degree.iter().filter(|(_, d)| **d == 0).map(|(n, _)| *n).collect();
    let mut order = Vec::with_capacity(names.len());

    while let Some(next) = ready.iter().next().copied() {
        ready.remove(next);
        order.push(next.to_string());
        for dependent in dependents.get(next).expect("next is a key") {
            let d = in_degree.get_mut(dependent).expect("dependent is a key");
            *d -= 1;
            if *d == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != names.len() {
        let cycle = find_cycle(names, deps).unwrap_or_default();
        return Err(CnsError::invalid_request(format!("circular dependency: {}", cycle.join(", "))));
    }

    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// DFS with White/Gray/Black coloring; on hitting a back-edge into a Gray
/// node, slices the live recursion stack from that node onward (plus the
/// closing edge) to report a minimal cyclic path.
fn find_cycle(names: &[String], deps: &BTreeMap<String, Vec<String>>) -> Option<Vec<String>> {
    let mut color: BTreeMap<&str, Color> = names.iter().map(|n| (n.as_str(), Color::White)).collect();
    let mut stack: Vec<&str> = Vec::new();

    fn visit<'a>(
        node: &'a str,
        deps: &'a BTreeMap<String, Vec<String>>,
        color: &mut BTreeMap<&'a str, Color>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        color.insert(node, Color::Gray);
        stack.push(node);
        for dep in deps.get(node).map(Vec::as_slice).unwrap_or(&[]) {
            match color.get(dep.as_str()).copied() {
                Some(Color::Gray) => {
                    let start = stack.iter().position(|n| *n == dep.as_str()).expect("gray node is on stack");
                    let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                Some(Color::Black) => continue,
                Some(Color::White) | None => {
                    if let Some(c) = visit(dep.as_str(), deps, color, stack) {
                        return Some(c);
                    }
                }
            }
        }
        stack.pop();
        color.insert(node, Color::Black);
        None
    }

    for name in names {
        if color.get(name.as_str()).copied() == Some(Color::White) {
            if let Some(c) = visit(name.as_str(), deps, &mut color, &mut stack) {
                return Some(c);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }
    fn deps(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect())).collect()
    }

    #[test]
    fn independent_nodes_sort_lexicographically() {
        let order = topo_sort(&names(&["c", "a", "b"]), &BTreeMap::new()).unwrap();
        assert_eq!(order, names(&["a", "b", "c"]));
    }

    #[test]
    fn dependents_follow_their_dependency() {
        let order = topo_sort(&names(&["a", "b"]), &deps(&[("a", &["b"])])).unwrap();
        assert_eq!(order, names(&["b", "a"]));
    }

    #[test]
    fn ties_still_resolve_lexicographically_after_an_unlock() {
        // b and c both become ready only after a; the ready-set re-sorts,
        // picking b before c even though c was declared first.
        let order = topo_sort(&names(&["a", "c", "b"]), &deps(&[("b", &["a"]), ("c", &["a"])])).unwrap();
        assert_eq!(order, names(&["a", "b", "c"]));
    }

    #[test]
    fn cycle_is_reported_with_minimal_path() {
        let err = topo_sort(&names(&["a", "b", "c"]), &deps(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("circular dependency:"));
        assert!(msg.contains("a") && msg.contains("b") && msg.contains("c"));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let err = topo_sort(&names(&["a"]), &deps(&[("a", &["ghost"])])).unwrap_err();
        assert!(err.to_string().contains("unknown component"));
    }
}
