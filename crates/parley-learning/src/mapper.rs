//! Symbolic to numeric mapping of bids.
//!
//! The learner works on option vectors: dense arrays holding, per issue, the index
//! of the chosen value. [`OptionMapper`] fixes the issue and value indices once per
//! domain (declaration order) and converts between the two representations.

use std::collections::HashMap;

use parley_domain::{Bid, Domain, Value};

/// An observed bid does not fit the domain the mapper was built for.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DomainMismatchError {
    #[display("unknown issue '{issue}'")]
    UnknownIssue { issue: String },
    #[display("unknown value '{value}' for issue '{issue}'")]
    UnknownValue { issue: String, value: Value },
    #[display("bid does not assign issue '{issue}'")]
    MissingIssue { issue: String },
}

/// A possibly partial option vector.
///
/// Slots of issues absent from the source bid are `None`. Only complete vectors
/// (see [`OptionVector::complete`]) can be fed to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionVector(Vec<Option<usize>>);

impl OptionVector {
    #[must_use]
    pub fn slots(&self) -> &[Option<usize>] {
        &self.0
    }

    /// Returns the plain index vector if every slot is assigned.
    #[must_use]
    pub fn complete(&self) -> Option<Vec<usize>> {
        self.0.iter().copied().collect()
    }
}

/// Bidirectional mapping between `(issue, value)` pairs and dense indices.
#[derive(Debug, Clone)]
pub struct OptionMapper {
    issue_indices: HashMap<String, usize>,
    issue_names: Vec<String>,
    value_indices: Vec<HashMap<Value, usize>>,
    values: Vec<Vec<Value>>,
}

impl OptionMapper {
    #[must_use]
    pub fn new(domain: &Domain) -> Self {
        let mut issue_indices = HashMap::new();
        let mut issue_names = vec![];
        let mut value_indices = vec![];
        let mut values = vec![];

        for issue in domain.issues() {
            issue_indices.insert(issue.name().to_owned(), issue_names.len());
            issue_names.push(issue.name().to_owned());
            value_indices.push(
                issue
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (v.clone(), i))
                    .collect(),
            );
            values.push(issue.values().to_vec());
        }

        Self {
            issue_indices,
            issue_names,
            value_indices,
            values,
        }
    }

    /// Number of issues (slots of an option vector).
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.issue_names.len()
    }

    /// Number of values of the issue at `issue_index`.
    #[must_use]
    pub fn value_count(&self, issue_index: usize) -> usize {
        self.values[issue_index].len()
    }

    /// Value counts of all issues, in index order. This is the shape of the model.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.values.iter().map(Vec::len).collect()
    }

    pub fn issue_index(&self, issue: &str) -> Result<usize, DomainMismatchError> {
        self.issue_indices
            .get(issue)
            .copied()
            .ok_or_else(|| DomainMismatchError::UnknownIssue {
                issue: issue.to_owned(),
            })
    }

    #[must_use]
    pub fn issue_name(&self, issue_index: usize) -> &str {
        &self.issue_names[issue_index]
    }

    pub fn value_index(&self, issue_index: usize, value: &Value) -> Result<usize, DomainMismatchError> {
        self.value_indices[issue_index]
            .get(value)
            .copied()
            .ok_or_else(|| DomainMismatchError::UnknownValue {
                issue: self.issue_names[issue_index].clone(),
                value: value.clone(),
            })
    }

    #[must_use]
    pub fn value_from_index(&self, issue_index: usize, value_index: usize) -> &Value {
        &self.values[issue_index][value_index]
    }

    /// Encodes a (possibly partial) bid.
    pub fn to_vector(&self, bid: &Bid) -> Result<OptionVector, DomainMismatchError> {
        let mut slots = vec![None; self.issue_count()];
        for (issue, value) in bid {
            let issue_index = self.issue_index(issue)?;
            slots[issue_index] = Some(self.value_index(issue_index, value)?);
        }
        Ok(OptionVector(slots))
    }

    /// Encodes a bid that must assign every issue.
    pub fn to_options(&self, bid: &Bid) -> Result<Vec<usize>, DomainMismatchError> {
        let vector = self.to_vector(bid)?;
        vector.complete().ok_or_else(|| {
            let missing = vector
                .slots()
                .iter()
                .position(Option::is_none)
                .map_or_else(String::new, |i| self.issue_names[i].clone());
            DomainMismatchError::MissingIssue { issue: missing }
        })
    }

    /// Decodes a complete option vector back into a bid.
    #[must_use]
    pub fn to_bid(&self, options: &[usize]) -> Bid {
        assert_eq!(options.len(), self.issue_count());
        options
            .iter()
            .enumerate()
            .map(|(issue_index, &value_index)| {
                (
                    self.issue_names[issue_index].clone(),
                    self.values[issue_index][value_index].clone(),
                )
            })
            .collect()
    }
}
