//! A tagged heterogeneous value used for `ComponentRef::overrides` and for
//! component values-files.
//!
//! Deliberately a concrete tagged enum rather than a loosely-typed dynamic
//! structure (`serde_yaml::Value`/`serde_json::Value` directly), so the
//! merge routine can match on "both sides mapping" without guessing at
//! runtime what it's holding.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Mapping(BTreeMap::new())
    }
}

impl Value {
    pub fn is_empty_mapping(&self) -> bool {
        matches!(self, Value::Mapping(m) if m.is_empty())
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Sets a value at a dotted path, creating intermediate mappings as
    /// needed. Used by the node-scheduling override builder.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut cursor = self;
        let parts: Vec<&str> = path.split('.').collect();
        for (i, part) in parts.iter().enumerate() {
            if !matches!(cursor, Value::Mapping(_)) {
                *cursor = Value::Mapping(BTreeMap::new());
            }
            let map = cursor.as_mapping_mut().expect("just ensured mapping");
            if i + 1 == parts.len() {
                map.insert((*part).to_string(), value.clone());
                return;
            }
            cursor = map.entry((*part).to_string()).or_insert_with(|| Value::Mapping(BTreeMap::new()));
        }
    }
}

/// Deep merge: recursive mapping merge where matching-mapping branches
/// recurse, and all other shape combinations favor the right (`overlay`)
/// operand.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(b), Value::Mapping(o)) => {
            let mut result = b.clone();
            for (k, v) in o {
                let merged = match result.get(k) {
                    Some(existing) => deep_merge(existing, v),
                    None => v.clone(),
                };
                result.insert(k.clone(), merged);
            }
            Value::Mapping(result)
        }
        (_, o) => o.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, Value)]) -> Value {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert((*k).to_string(), v.clone());
        }
        Value::Mapping(m)
    }

    #[test]
    fn deep_merge_preserves_sibling_fields() {
        let base = mapping(&[(
            "driver",
            mapping(&[
                ("version", Value::String("550.54.15".into())),
                ("repo", Value::String("nvcr.io/nvidia".into())),
            ]),
        )]);
        let overlay = mapping(&[(
            "driver",
            mapping(&[("version", Value::String("999.99.99".into()))]),
        )]);
        let merged = deep_merge(&base, &overlay);
        let driver = merged.as_mapping().unwrap().get("driver").unwrap().as_mapping().unwrap();
        assert_eq!(driver.get("version"), Some(&Value::String("999.99.99".into())));
        assert_eq!(driver.get("repo"), Some(&Value::String("nvcr.io/nvidia".into())));
    }

    #[test]
    fn deep_merge_mismatched_shapes_right_wins() {
        let base = mapping(&[("x", Value::Sequence(vec![Value::Int(1)]))]);
        let overlay = mapping(&[("x", Value::String("replaced".into()))]);
        let merged = deep_merge(&base, &overlay);
        assert_eq!(merged.as_mapping().unwrap().get("x"), Some(&Value::String("replaced".into())));
    }

    #[test]
    fn deep_merge_is_idempotent() {
        let v = mapping(&[("a", Value::Int(1)), ("b", mapping(&[("c", Value::Bool(true))]))]);
        let merged = deep_merge(&v, &v);
        assert_eq!(merged, v);
    }

    #[test]
    fn set_path_creates_intermediate_mappings() {
        let mut v = Value::default();
        v.set_path("daemonsets.nodeSelector", Value::String("present".into()));
        let m = v.as_mapping().unwrap();
        let ds = m.get("daemonsets").unwrap().as_mapping().unwrap();
        assert_eq!(ds.get("nodeSelector"), Some(&Value::String("present".into())));
    }
}
