//! The five-axis `Criteria` tuple and its wildcard semantics.
//!
//! Each axis is its own tagged enum with an explicit `Any` variant, rather
//! than a magic empty-string constant, so the matcher can never confuse
//! "missing", "empty string" and "explicit wildcard". All three forms
//! normalize to the same `Any` variant on parse.

use crate::error::{CnsError, Result};
use std::fmt;

macro_rules! wildcard_axis {
    ($name:ident { $($variant:ident => $lit:literal $(| $alias:literal)*),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum $name {
            #[default]
            Any,
            $($variant),+
        }

        impl $name {
            pub fn is_any(&self) -> bool {
                matches!(self, $name::Any)
            }

            pub fn parse(raw: &str) -> Result<Self> {
                let s = raw.trim().to_lowercase();
                if s.is_empty() || s == "any" {
                    return Ok($name::Any);
                }
                match s.as_str() {
                    $($lit $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(CnsError::invalid_request(format!(
                        "unknown {} value '{}'",
                        stringify!($name),
                        raw
                    ))),
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::Any => "any",
                    $($name::$variant => $lit,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                $name::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// The managed-service axis. `self`, `self-managed`, `vanilla`, and the
/// empty string all normalize to the `Any` wildcard rather than a distinct
/// opinionated value — there is no recipe-level notion of "self-managed" as
/// a concrete criteria match, only "no managed service specified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Service {
    #[default]
    Any,
    Eks,
    Gke,
    Aks,
    Oke,
}

impl Service {
    pub fn is_any(&self) -> bool {
        matches!(self, Service::Any)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim().to_lowercase();
        match s.as_str() {
            "" | "any" | "self" | "self-managed" | "vanilla" => Ok(Service::Any),
            "eks" => Ok(Service::Eks),
            "gke" => Ok(Service::Gke),
            "aks" => Ok(Service::Aks),
            "oke" => Ok(Service::Oke),
            _ => Err(CnsError::invalid_request(format!("unknown Service value '{}'", raw))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Any => "any",
            Service::Eks => "eks",
            Service::Gke => "gke",
            Service::Aks => "aks",
            Service::Oke => "oke",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Service {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Service {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Service::parse(&raw).map_err(serde::de::Error::custom)
    }
}

wildcard_axis!(Accelerator {
    H100 => "h100",
    Gb200 => "gb200",
    A100 => "a100",
    L40 => "l40",
});

wildcard_axis!(Intent {
    Training => "training",
    Inference => "inference",
});

wildcard_axis!(Os {
    Ubuntu => "ubuntu",
    Rhel => "rhel",
    Cos => "cos",
    AmazonLinux => "amazonlinux" | "al2" | "al2023",
});

/// Node count axis. `0` means "any" (cannot wildcard-match a count that is
/// itself given as a specific zero, since zero nodes is not a meaningful
/// deployment target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nodes(pub u32);

impl Nodes {
    pub fn is_any(&self) -> bool {
        self.0 == 0
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return Ok(Nodes(0));
        }
        let n: i64 = s
            .parse()
            .map_err(|_| CnsError::invalid_request(format!("invalid node count '{}'", raw)))?;
        if n < 0 {
            return Err(CnsError::invalid_request(format!("node count must not be negative: {}", raw)));
        }
        Ok(Nodes(n as u32))
    }
}

impl fmt::Display for Nodes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for Nodes {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Nodes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => {
                if n < 0 {
                    return Err(serde::de::Error::custom("node count must not be negative"));
                }
                Ok(Nodes(n as u32))
            }
            Raw::Str(s) => Nodes::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// The query/overlay criteria five-tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub accelerator: Accelerator,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub os: Os,
    #[serde(default)]
    pub nodes: Nodes,
}

impl Criteria {
    /// Number of non-wildcard axes. Governs merge order: higher specificity
    /// overlays are applied (and therefore win) later.
    pub fn specificity(&self) -> u8 {
        let mut n = 0;
        if !self.service.is_any() {
            n += 1;
        }
        if !self.accelerator.is_any() {
            n += 1;
        }
        if !self.intent.is_any() {
            n += 1;
        }
        if !self.os.is_any() {
            n += 1;
        }
        if !self.nodes.is_any() {
            n += 1;
        }
        n
    }

    /// Asymmetric match: `self` is the overlay's criteria (`R`), `query` is
    /// the caller's criteria (`Q`). A wildcard on `R` accepts any `Q`; a
    /// wildcard on `Q` only accepts a wildcard `R`.
    pub fn matches(&self, query: &Criteria) -> bool {
        field_matches(self.service.is_any(), &self.service, query.service.is_any(), &query.service)
            && field_matches(
                self.accelerator.is_any(),
                &self.accelerator,
                query.accelerator.is_any(),
                &query.accelerator,
            )
            && field_matches(self.intent.is_any(), &self.intent, query.intent.is_any(), &query.intent)
            && field_matches(self.os.is_any(), &self.os, query.os.is_any(), &query.os)
            && field_matches(self.nodes.is_any(), &self.nodes, query.nodes.is_any(), &query.nodes)
    }
}

fn field_matches<T: PartialEq>(r_any: bool, r: &T, q_any: bool, q: &T) -> bool {
    if r_any {
        true
    } else if q_any {
        false
    } else {
        r == q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_normalize_to_any_or_canonical() {
        assert!(Service::parse("").unwrap().is_any());
        assert!(Service::parse("ANY").unwrap().is_any());
        assert!(Service::parse("self-managed").unwrap().is_any());
        assert!(Service::parse("self").unwrap().is_any());
        assert!(Service::parse("vanilla").unwrap().is_any());
        assert_eq!(Os::parse("AL2").unwrap(), Os::AmazonLinux);
        assert_eq!(Os::parse("al2023").unwrap(), Os::AmazonLinux);
    }

    #[test]
    fn unknown_value_fails() {
        assert!(Service::parse("openshift").is_err());
        assert!(Nodes::parse("-3").is_err());
    }

    #[test]
    fn wildcard_overlay_matches_any_query() {
        let overlay = Criteria::default();
        let query = Criteria { accelerator: Accelerator::H100, ..Default::default() };
        assert!(overlay.matches(&query));
    }

    #[test]
    fn wildcard_query_does_not_pull_specific_overlay() {
        let overlay = Criteria { accelerator: Accelerator::H100, ..Default::default() };
        let query = Criteria::default();
        assert!(!overlay.matches(&query));
    }

    #[test]
    fn specific_query_matches_specific_overlay() {
        let overlay = Criteria { accelerator: Accelerator::H100, ..Default::default() };
        let query = Criteria { accelerator: Accelerator::H100, ..Default::default() };
        assert!(overlay.matches(&query));
    }

    #[test]
    fn specificity_counts_non_wildcard_axes() {
        let c = Criteria { service: Service::Eks, intent: Intent::Training, ..Default::default() };
        assert_eq!(c.specificity(), 2);
    }
}
