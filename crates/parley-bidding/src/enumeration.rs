//! Deterministic search for the best bids of a utility space.
//!
//! Complete enumeration of a domain grows with the product of the value counts, so
//! [`best_bids`] runs a depth-first branch and bound: values of every issue are
//! visited best first, and a branch is cut as soon as its optimistic bound (current
//! utility plus the best contribution of every undecided issue) cannot beat the
//! worst bid that would still be kept.

use parley_domain::{Bid, UtilitySpace, Value};

struct Search {
    /// Per issue: its name and `(value, weighted utility)` sorted best first
    issues: Vec<(String, Vec<(Value, f64)>)>,
    /// `bound[i]` is the best achievable utility of issues `i..`
    bound: Vec<f64>,
    min_utility: f64,
    limit: usize,
    found: Vec<(f64, Vec<usize>)>,
}

impl Search {
    fn new<S>(space: &S, min_utility: f64, limit: usize) -> Self
    where
        S: UtilitySpace + ?Sized,
    {
        let issues: Vec<(String, Vec<(Value, f64)>)> = space
            .domain()
            .issue_names()
            .map(|issue| {
                let weight = space.weight(issue);
                let mut values: Vec<(Value, f64)> = space
                    .value_utilities(issue)
                    .into_iter()
                    .map(|(value, utility)| (value, weight * utility))
                    .collect();
                values.sort_by(|a, b| b.1.total_cmp(&a.1));
                (issue.to_owned(), values)
            })
            .collect();

        let mut bound = vec![0.0; issues.len() + 1];
        for (i, (_, values)) in issues.iter().enumerate().rev() {
            bound[i] = bound[i + 1] + values.first().map_or(0.0, |v| v.1);
        }

        Self {
            issues,
            bound,
            min_utility,
            limit,
            found: vec![],
        }
    }

    /// Lowest utility a new bid needs to be kept.
    fn floor(&self) -> f64 {
        match self.found.last() {
            Some((worst, _)) if self.found.len() >= self.limit => worst.max(self.min_utility),
            _ => self.min_utility,
        }
    }

    fn visit(&mut self, chosen: &mut Vec<usize>, utility: f64) {
        let depth = chosen.len();
        if depth == self.issues.len() {
            let position = self.found.partition_point(|(u, _)| *u >= utility);
            self.found.insert(position, (utility, chosen.clone()));
            self.found.truncate(self.limit);
            return;
        }

        for index in 0..self.issues[depth].1.len() {
            let contribution = self.issues[depth].1[index].1;
            let optimistic = utility + contribution + self.bound[depth + 1];
            if optimistic < self.floor() {
                // values are sorted, the rest are no better
                break;
            }
            chosen.push(index);
            self.visit(chosen, utility + contribution);
            chosen.pop();
        }
    }

    fn into_bids(self) -> Vec<Bid> {
        let Self { issues, found, .. } = self;
        found
            .into_iter()
            .map(|(_, chosen)| {
                chosen
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (issues[i].0.clone(), issues[i].1[v].0.clone()))
                    .collect()
            })
            .collect()
    }
}

/// Up to `limit` complete bids with utility at least `min_utility`, best first.
///
/// Bids of equal utility keep the order in which the search meets them.
#[must_use]
pub fn best_bids<S>(space: &S, min_utility: f64, limit: usize) -> Vec<Bid>
where
    S: UtilitySpace + ?Sized,
{
    if limit == 0 {
        return vec![];
    }
    let mut search = Search::new(space, min_utility, limit);
    search.visit(&mut vec![], 0.0);
    search.into_bids()
}

/// The best complete bid of `space`.
#[must_use]
pub fn extreme_bid<S>(space: &S) -> Bid
where
    S: UtilitySpace + ?Sized,
{
    space
        .domain()
        .issue_names()
        .filter_map(|issue| {
            space
                .value_utilities(issue)
                .into_iter()
                .reduce(|best, next| if next.1 > best.1 { next } else { best })
                .map(|(value, _)| (issue.to_owned(), value))
        })
        .collect()
}
