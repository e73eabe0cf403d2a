use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Bid, Domain, Value};

/// Tolerance used when checking that profile weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A linear-additive utility function over the bids of a domain.
///
/// Implemented both by static profiles ([`LinearAdditiveSpace`]) and by learned
/// opponent models. Lookups of issues or values outside the domain yield `0.0`.
pub trait UtilitySpace {
    fn domain(&self) -> &Domain;

    /// Relative importance of `issue`.
    fn weight(&self, issue: &str) -> f64;

    /// Utility of choosing `value` for `issue`, ignoring the issue weight.
    fn value_utility(&self, issue: &str, value: &Value) -> f64;

    /// Utilities of every value of `issue`, in domain order.
    fn value_utilities(&self, issue: &str) -> Vec<(Value, f64)> {
        self.domain()
            .values(issue)
            .unwrap_or_default()
            .iter()
            .map(|value| (value.clone(), self.value_utility(issue, value)))
            .collect()
    }

    /// Utility of a (possibly partial) bid, summed over the issues it assigns.
    fn utility(&self, bid: &Bid) -> f64 {
        bid.iter()
            .map(|(issue, value)| self.weight(issue) * self.value_utility(issue, value))
            .sum()
    }

    /// Best weighted contribution `issue` can make to the utility of a bid.
    fn max_issue_utility(&self, issue: &str) -> f64 {
        let best = self
            .value_utilities(issue)
            .into_iter()
            .map(|(_, utility)| utility)
            .fold(f64::NEG_INFINITY, f64::max);
        if best.is_finite() {
            self.weight(issue) * best
        } else {
            0.0
        }
    }

    /// Utility of the best complete bid.
    fn max_utility(&self) -> f64 {
        self.domain()
            .issue_names()
            .map(|issue| self.max_issue_utility(issue))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ProfileError {
    #[display("no weight given for issue '{issue}'")]
    MissingWeight { issue: String },
    #[display("no utility given for value '{value}' of issue '{issue}'")]
    MissingUtility { issue: String, value: Value },
    #[display("issue '{issue}' is not part of domain '{domain}'")]
    UnknownIssue { domain: String, issue: String },
    #[display("value '{value}' is not a value of issue '{issue}'")]
    UnknownValue { issue: String, value: Value },
    #[display("weight {weight} of issue '{issue}' is not a finite non-negative number")]
    InvalidWeight { issue: String, weight: f64 },
    #[display("utility {utility} of value '{value}' of issue '{issue}' is outside [0, 1]")]
    UtilityOutOfRange {
        issue: String,
        value: Value,
        utility: f64,
    },
    #[display("issue weights sum to {sum}, expected 1")]
    WeightsNotNormalized { sum: f64 },
    #[display("reservation bid is not a complete bid of the domain")]
    InvalidReservationBid,
}

/// A static linear-additive profile.
///
/// Weights are non-negative and sum to one, value utilities lie in `[0, 1]`, and
/// every issue and value of the domain is covered. Deserialization goes through the
/// same validation as [`LinearAdditiveSpace::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearAdditiveRepr", into = "LinearAdditiveRepr")]
pub struct LinearAdditiveSpace {
    name: String,
    domain: Domain,
    weights: BTreeMap<String, f64>,
    utilities: BTreeMap<String, BTreeMap<Value, f64>>,
    reservation_bid: Option<Bid>,
}

#[derive(Serialize, Deserialize)]
struct LinearAdditiveRepr {
    name: String,
    domain: Domain,
    weights: BTreeMap<String, f64>,
    utilities: BTreeMap<String, BTreeMap<Value, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reservation_bid: Option<Bid>,
}

impl TryFrom<LinearAdditiveRepr> for LinearAdditiveSpace {
    type Error = ProfileError;

    fn try_from(repr: LinearAdditiveRepr) -> Result<Self, Self::Error> {
        Self::new(
            repr.name,
            repr.domain,
            repr.weights,
            repr.utilities,
            repr.reservation_bid,
        )
    }
}

impl From<LinearAdditiveSpace> for LinearAdditiveRepr {
    fn from(space: LinearAdditiveSpace) -> Self {
        Self {
            name: space.name,
            domain: space.domain,
            weights: space.weights,
            utilities: space.utilities,
            reservation_bid: space.reservation_bid,
        }
    }
}

impl LinearAdditiveSpace {
    pub fn new<N>(
        name: N,
        domain: Domain,
        weights: BTreeMap<String, f64>,
        utilities: BTreeMap<String, BTreeMap<Value, f64>>,
        reservation_bid: Option<Bid>,
    ) -> Result<Self, ProfileError>
    where
        N: Into<String>,
    {
        for issue in weights.keys().chain(utilities.keys()) {
            if domain.issue(issue).is_none() {
                return Err(ProfileError::UnknownIssue {
                    domain: domain.name().to_owned(),
                    issue: issue.clone(),
                });
            }
        }

        let mut sum = 0.0;
        for issue in domain.issues() {
            let name = issue.name();
            let weight = *weights.get(name).ok_or_else(|| ProfileError::MissingWeight {
                issue: name.to_owned(),
            })?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(ProfileError::InvalidWeight {
                    issue: name.to_owned(),
                    weight,
                });
            }
            sum += weight;

            let issue_utilities = utilities.get(name);
            for value in issue.values() {
                let utility = issue_utilities
                    .and_then(|u| u.get(value))
                    .copied()
                    .ok_or_else(|| ProfileError::MissingUtility {
                        issue: name.to_owned(),
                        value: value.clone(),
                    })?;
                if !(0.0..=1.0).contains(&utility) {
                    return Err(ProfileError::UtilityOutOfRange {
                        issue: name.to_owned(),
                        value: value.clone(),
                        utility,
                    });
                }
            }
            if let Some(issue_utilities) = issue_utilities
                && let Some(value) = issue_utilities.keys().find(|v| !issue.contains(v))
            {
                return Err(ProfileError::UnknownValue {
                    issue: name.to_owned(),
                    value: value.clone(),
                });
            }
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ProfileError::WeightsNotNormalized { sum });
        }

        if let Some(bid) = &reservation_bid
            && !bid.is_complete(&domain)
        {
            return Err(ProfileError::InvalidReservationBid);
        }

        Ok(Self {
            name: name.into(),
            domain,
            weights,
            utilities,
            reservation_bid,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    #[must_use]
    pub fn reservation_bid(&self) -> Option<&Bid> {
        self.reservation_bid.as_ref()
    }
}

impl UtilitySpace for LinearAdditiveSpace {
    fn domain(&self) -> &Domain {
        &self.domain
    }

    fn weight(&self, issue: &str) -> f64 {
        self.weights.get(issue).copied().unwrap_or(0.0)
    }

    fn value_utility(&self, issue: &str, value: &Value) -> f64 {
        self.utilities
            .get(issue)
            .and_then(|u| u.get(value))
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Issue;

    fn domain() -> Domain {
        Domain::new(
            "d",
            vec![Issue::new("a", ["x", "y"]), Issue::new("b", ["x", "y"])],
        )
        .unwrap()
    }

    fn utilities(a: [f64; 2], b: [f64; 2]) -> BTreeMap<String, BTreeMap<Value, f64>> {
        BTreeMap::from([
            (
                "a".to_owned(),
                BTreeMap::from([("x".into(), a[0]), ("y".into(), a[1])]),
            ),
            (
                "b".to_owned(),
                BTreeMap::from([("x".into(), b[0]), ("y".into(), b[1])]),
            ),
        ])
    }

    fn weights(a: f64, b: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("a".to_owned(), a), ("b".to_owned(), b)])
    }

    #[test]
    fn test_partial_and_complete_utility() {
        let space = LinearAdditiveSpace::new(
            "p",
            domain(),
            weights(0.4, 0.6),
            utilities([1.0, 0.5], [0.0, 1.0]),
            None,
        )
        .unwrap();
        assert!((space.utility(&Bid::single("a", "y")) - 0.2).abs() < 1e-12);
        assert!((space.utility(&Bid::from_iter([("a", "x"), ("b", "y")])) - 1.0).abs() < 1e-12);
        assert_eq!(space.utility(&Bid::new()), 0.0);
        assert!((space.max_issue_utility("b") - 0.6).abs() < 1e-12);
        assert!((space.max_utility() - 1.0).abs() < 1e-12);
        assert_eq!(space.weight("unknown"), 0.0);
    }

    #[test]
    fn test_validation() {
        let err = LinearAdditiveSpace::new(
            "p",
            domain(),
            weights(0.4, 0.4),
            utilities([1.0, 0.5], [0.0, 1.0]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::WeightsNotNormalized { .. }));

        let err = LinearAdditiveSpace::new(
            "p",
            domain(),
            weights(0.5, 0.5),
            utilities([1.5, 0.5], [0.0, 1.0]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::UtilityOutOfRange { .. }));

        let mut missing = utilities([1.0, 0.5], [0.0, 1.0]);
        missing.get_mut("b").unwrap().remove(&Value::from("y"));
        let err =
            LinearAdditiveSpace::new("p", domain(), weights(0.5, 0.5), missing, None).unwrap_err();
        assert!(matches!(err, ProfileError::MissingUtility { .. }));

        let err = LinearAdditiveSpace::new(
            "p",
            domain(),
            weights(0.5, 0.5),
            utilities([1.0, 0.5], [0.0, 1.0]),
            Some(Bid::single("a", "x")),
        )
        .unwrap_err();
        assert_eq!(err, ProfileError::InvalidReservationBid);
    }

    #[test]
    fn test_json_roundtrip_keeps_validation() {
        let space = LinearAdditiveSpace::new(
            "p",
            domain(),
            weights(0.5, 0.5),
            utilities([1.0, 0.5], [0.0, 1.0]),
            None,
        )
        .unwrap();
        let json = serde_json::to_string(&space).unwrap();
        let decoded: LinearAdditiveSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, space);

        let broken = json.replace("0.5", "0.9");
        assert!(serde_json::from_str::<LinearAdditiveSpace>(&broken).is_err());
    }
}
