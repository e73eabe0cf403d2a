use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A single discrete option for an issue (e.g. `"low"` for `"price"`).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct Value(String);

impl Value {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// One negotiable dimension of a domain together with its possible values.
///
/// Value order is the order given at construction and is what the
/// symbolic-to-numeric mapping of the learner relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    name: String,
    values: Vec<Value>,
}

impl Issue {
    pub fn new<N, I, V>(name: N, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DomainError {
    #[display("domain has no issues")]
    NoIssues,
    #[display("issue '{issue}' is declared more than once")]
    DuplicateIssue { issue: String },
    #[display("issue '{issue}' has no values")]
    EmptyIssue { issue: String },
    #[display("value '{value}' of issue '{issue}' is declared more than once")]
    DuplicateValue { issue: String, value: Value },
}

/// The ordered set of issues a negotiation is about.
///
/// Immutable for the lifetime of a negotiation. Deserialization goes through the
/// same validation as [`Domain::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DomainRepr", into = "DomainRepr")]
pub struct Domain {
    name: String,
    issues: Vec<Issue>,
}

#[derive(Serialize, Deserialize)]
struct DomainRepr {
    name: String,
    issues: Vec<Issue>,
}

impl TryFrom<DomainRepr> for Domain {
    type Error = DomainError;

    fn try_from(repr: DomainRepr) -> Result<Self, Self::Error> {
        Self::new(repr.name, repr.issues)
    }
}

impl From<Domain> for DomainRepr {
    fn from(domain: Domain) -> Self {
        Self {
            name: domain.name,
            issues: domain.issues,
        }
    }
}

impl Domain {
    /// Creates a domain after checking that issue names and values are unique and
    /// that every issue has at least one value.
    pub fn new<N>(name: N, issues: Vec<Issue>) -> Result<Self, DomainError>
    where
        N: Into<String>,
    {
        if issues.is_empty() {
            return Err(DomainError::NoIssues);
        }
        let mut seen_issues = HashSet::new();
        for issue in &issues {
            if !seen_issues.insert(issue.name.as_str()) {
                return Err(DomainError::DuplicateIssue {
                    issue: issue.name.clone(),
                });
            }
            if issue.values.is_empty() {
                return Err(DomainError::EmptyIssue {
                    issue: issue.name.clone(),
                });
            }
            let mut seen_values = HashSet::new();
            for value in &issue.values {
                if !seen_values.insert(value) {
                    return Err(DomainError::DuplicateValue {
                        issue: issue.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(Self {
            name: name.into(),
            issues,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn issue_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.issues.iter().map(Issue::name)
    }

    #[must_use]
    pub fn issue(&self, name: &str) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.name == name)
    }

    /// Returns the values of `issue`, or `None` if the issue is not part of the domain.
    #[must_use]
    pub fn values(&self, issue: &str) -> Option<&[Value]> {
        self.issue(issue).map(Issue::values)
    }

    #[must_use]
    pub fn contains(&self, issue: &str, value: &Value) -> bool {
        self.issue(issue).is_some_and(|i| i.contains(value))
    }

    /// Number of complete bids in the domain, saturating at `u128::MAX`.
    #[must_use]
    pub fn bid_count(&self) -> u128 {
        self.issues.iter().fold(1u128, |acc, issue| {
            acc.saturating_mul(issue.values.len() as u128)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dinner() -> Domain {
        Domain::new(
            "dinner",
            vec![
                Issue::new("menu", ["fish", "meat"]),
                Issue::new("cost", ["2000 EUR", "5000 EUR", "9000 EUR"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_preserves_declaration_order() {
        let domain = dinner();
        assert_eq!(domain.issue_names().collect::<Vec<_>>(), ["menu", "cost"]);
        assert_eq!(
            domain.values("cost").unwrap(),
            &[
                Value::from("2000 EUR"),
                Value::from("5000 EUR"),
                Value::from("9000 EUR")
            ]
        );
        assert!(domain.values("drinks").is_none());
        assert!(domain.contains("menu", &"meat".into()));
        assert!(!domain.contains("menu", &"pasta".into()));
        assert_eq!(domain.bid_count(), 6);
    }

    #[test]
    fn test_rejects_malformed_domains() {
        assert_eq!(Domain::new("empty", vec![]), Err(DomainError::NoIssues));
        assert!(matches!(
            Domain::new(
                "dup",
                vec![Issue::new("a", ["x"]), Issue::new("a", ["y"])]
            ),
            Err(DomainError::DuplicateIssue { .. })
        ));
        assert!(matches!(
            Domain::new("dup", vec![Issue::new("a", ["x", "x"])]),
            Err(DomainError::DuplicateValue { .. })
        ));
        assert!(matches!(
            Domain::new("none", vec![Issue::new("a", Vec::<Value>::new())]),
            Err(DomainError::EmptyIssue { .. })
        ));
    }

    #[test]
    fn test_deserialization_is_validated() {
        let json = r#"{"name":"d","issues":[{"name":"a","values":["x","y"]}]}"#;
        let domain: Domain = serde_json::from_str(json).unwrap();
        assert_eq!(domain.issues().len(), 1);

        let json = r#"{"name":"d","issues":[{"name":"a","values":["x","x"]}]}"#;
        assert!(serde_json::from_str::<Domain>(json).is_err());
    }
}
