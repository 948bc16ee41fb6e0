//! Turns a rule's label constraints into a pod selector.
//!
//! Only equality requirements are supported, and they are always ANDed. There is no
//! inequality, set membership or existence operator.

use std::collections::BTreeMap;
use std::fmt;

use crate::crd::WILDCARD;
use crate::Error;

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

/// One `key == value` requirement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PodSelector {
    /// Selects every pod in the namespace.
    Everything,
    /// Selects pods carrying all of the listed labels. Never empty.
    MatchLabels(Vec<Requirement>),
}

impl PodSelector {
    /// Build a selector from a rule's label mapping.
    ///
    /// An empty mapping, or one whose only entry is `"*": "*"`, selects everything.
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Result<Self, Error> {
        if labels.is_empty() || is_wildcard_only(labels) {
            return Ok(PodSelector::Everything);
        }

        let requirements = labels
            .iter()
            .map(|(key, value)| {
                validate_label_key(key).map_err(|reason| Error::selector(key, value, reason))?;
                validate_label_value(value).map_err(|reason| Error::selector(key, value, reason))?;
                Ok(Requirement {
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(PodSelector::MatchLabels(requirements))
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, PodSelector::Everything)
    }

    /// Evaluate the selector against a pod's labels.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            PodSelector::Everything => true,
            PodSelector::MatchLabels(requirements) => requirements
                .iter()
                .all(|r| labels.get(&r.key).map_or(false, |v| *v == r.value)),
        }
    }

    /// The selector in API query form, `None` when no filtering is wanted.
    pub fn to_query(&self) -> Option<String> {
        match self {
            PodSelector::Everything => None,
            PodSelector::MatchLabels(_) => Some(self.to_string()),
        }
    }
}

impl fmt::Display for PodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodSelector::Everything => write!(f, "<everything>"),
            PodSelector::MatchLabels(requirements) => {
                let parts: Vec<String> = requirements
                    .iter()
                    .map(|r| format!("{}={}", r.key, r.value))
                    .collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

fn is_wildcard_only(labels: &BTreeMap<String, String>) -> bool {
    labels.len() == 1
        && labels
            .get(WILDCARD)
            .map_or(false, |value| value == WILDCARD)
}

/// A label key is an optional DNS subdomain prefix and a name, separated by `/`.
fn validate_label_key(key: &str) -> Result<(), String> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Err("prefix part must not be empty".to_string());
        }
        if prefix.len() > MAX_PREFIX_LEN {
            return Err(format!("prefix part must be no more than {MAX_PREFIX_LEN} characters"));
        }
        if !is_dns_subdomain(prefix) {
            return Err("prefix part must be a lowercase DNS subdomain".to_string());
        }
    }

    if name.is_empty() {
        return Err("name part must not be empty".to_string());
    }
    validate_name(name).map_err(|reason| format!("name part {reason}"))
}

fn validate_label_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    validate_name(value).map_err(|reason| format!("value {reason}"))
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.len() > MAX_NAME_LEN {
        return Err(format!("must be no more than {MAX_NAME_LEN} characters"));
    }
    let bytes = name.as_bytes();
    let edges_ok = bytes[0].is_ascii_alphanumeric() && bytes[bytes.len() - 1].is_ascii_alphanumeric();
    let inner_ok = bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if !edges_ok || !inner_ok {
        return Err(
            "must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

fn is_dns_subdomain(s: &str) -> bool {
    s.split('.').all(|label| {
        let bytes = label.as_bytes();
        !bytes.is_empty()
            && bytes[0].is_ascii_alphanumeric()
            && bytes[bytes.len() - 1].is_ascii_alphanumeric()
            && bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_labels_select_everything() {
        let selector = PodSelector::from_labels(&BTreeMap::new()).unwrap();
        assert_eq!(selector, PodSelector::Everything);
        assert_eq!(selector.matches(&BTreeMap::new()), true);
        assert_eq!(selector.matches(&labels(&[("app", "x")])), true);
        assert_eq!(selector.to_query(), None);
    }

    #[test]
    fn test_wildcard_pair_selects_everything() {
        let selector = PodSelector::from_labels(&labels(&[("*", "*")])).unwrap();
        assert!(selector.is_everything());
        assert_eq!(selector.matches(&labels(&[("anything", "goes")])), true);
    }

    #[test]
    fn test_wildcard_mixed_with_other_labels_is_rejected() {
        let err = PodSelector::from_labels(&labels(&[("*", "*"), ("app", "x")])).unwrap_err();
        assert!(matches!(err, Error::SelectorConstruction { ref key, .. } if key == "*"));
    }

    #[test]
    fn test_match_labels_are_anded() {
        let selector =
            PodSelector::from_labels(&labels(&[("app", "x"), ("tier", "web")])).unwrap();

        assert_eq!(selector.matches(&labels(&[("app", "x"), ("tier", "web")])), true);
        assert_eq!(
            selector.matches(&labels(&[("app", "x"), ("tier", "web"), ("extra", "1")])),
            true
        );
        assert_eq!(selector.matches(&labels(&[("app", "x")])), false);
        assert_eq!(selector.matches(&labels(&[("app", "y"), ("tier", "web")])), false);
        assert_eq!(selector.to_query().unwrap(), "app=x,tier=web");
    }

    #[test]
    fn test_empty_value_requires_empty_label() {
        let selector = PodSelector::from_labels(&labels(&[("app", "")])).unwrap();
        assert_eq!(selector.matches(&labels(&[("app", "")])), true);
        assert_eq!(selector.matches(&labels(&[("app", "x")])), false);
        assert_eq!(selector.matches(&BTreeMap::new()), false);
    }

    #[test]
    fn test_prefixed_key() {
        let selector =
            PodSelector::from_labels(&labels(&[("sidecar.istio.io/inject", "true")])).unwrap();
        assert_eq!(selector.to_string(), "sidecar.istio.io/inject=true");
    }

    #[test]
    fn test_invalid_keys() {
        for key in ["", "-app", "app-", "a b", "/app", "Example.com/app", "a/b/c", "app!"] {
            let result = PodSelector::from_labels(&labels(&[(key, "x")]));
            assert!(
                matches!(result, Err(Error::SelectorConstruction { .. })),
                "key {key:?} should be rejected"
            );
        }

        let long = "a".repeat(64);
        assert!(PodSelector::from_labels(&labels(&[(long.as_str(), "x")])).is_err());
    }

    #[test]
    fn test_invalid_values() {
        for value in ["-x", "x y", "*", "x/y"] {
            let result = PodSelector::from_labels(&labels(&[("app", value)]));
            assert!(result.is_err(), "value {value:?} should be rejected");
        }

        let longest = "v".repeat(63);
        assert!(PodSelector::from_labels(&labels(&[("app", longest.as_str())])).is_ok());

        let too_long = "v".repeat(64);
        let err = PodSelector::from_labels(&labels(&[("app", too_long.as_str())])).unwrap_err();
        assert!(matches!(err, Error::SelectorConstruction { ref reason, .. } if reason.contains("63")));
    }
}
