use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Serialize};

use crate::{Domain, Value};

/// An assignment of values to issues.
///
/// A bid may be partial while it is being constructed; only complete bids (see
/// [`Bid::is_complete`]) are sent to other parties.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bid(BTreeMap<String, Value>);

impl Bid {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a partial bid assigning a single issue.
    pub fn single<I, V>(issue: I, value: V) -> Self
    where
        I: Into<String>,
        V: Into<Value>,
    {
        Self(BTreeMap::from([(issue.into(), value.into())]))
    }

    #[must_use]
    pub fn get(&self, issue: &str) -> Option<&Value> {
        self.0.get(issue)
    }

    #[must_use]
    pub fn contains_issue(&self, issue: &str) -> bool {
        self.0.contains_key(issue)
    }

    pub fn insert<I, V>(&mut self, issue: I, value: V) -> Option<Value>
    where
        I: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(issue.into(), value.into())
    }

    /// Returns a new bid containing the assignments of both bids.
    ///
    /// Assignments of `other` take precedence for issues present in both.
    #[must_use]
    pub fn merge(&self, other: &Bid) -> Bid {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(i, v)| (i.clone(), v.clone())));
        Self(merged)
    }

    pub fn issues(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.0.iter().map(|(i, v)| (i.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if every issue of `domain` is assigned a value of that issue
    /// and no other issue is present.
    #[must_use]
    pub fn is_complete(&self, domain: &Domain) -> bool {
        self.0.len() == domain.issues().len()
            && self
                .0
                .iter()
                .all(|(issue, value)| domain.contains(issue, value))
    }
}

impl<I, V> FromIterator<(I, V)> for Bid
where
    I: Into<String>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (I, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(i, v)| (i.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Bid {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
