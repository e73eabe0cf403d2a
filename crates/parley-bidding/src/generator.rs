//! Constrained probabilistic construction of a complete bid.
//!
//! [`BidGenerator::generate_bid`] builds a bid one issue at a time. Issues are
//! visited in ascending order of our own weight. For each issue it computes how much
//! the issue must contribute for the final bid to still reach the requested utility,
//! assuming every later issue gets its best value:
//!
//! ```text
//! required = min_total_utility - utility(partial bid) - Σ_later max_issue_utility
//! ```
//!
//! Values contributing at least `required` are candidates, and the value with the
//! best own utility is always a candidate, so the candidate set is never empty. One
//! candidate is drawn with probability proportional to the summed utility the
//! coalition members' models assign to it.

use std::collections::BTreeMap;

use parley_domain::{Bid, PartyId, UtilitySpace, Value};
use rand::Rng;
use tracing::{debug, trace};

use crate::{
    BidGenerationError,
    coalition::{distance, select_coalition},
    sampling::draw_from_discrete,
};

/// Best possible additional utility from `issues`, each set to its best value.
#[must_use]
pub fn max_remaining_utility<'a, S, I>(space: &S, issues: I) -> f64
where
    S: UtilitySpace + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    issues
        .into_iter()
        .map(|issue| space.max_issue_utility(issue))
        .sum()
}

#[derive(Debug)]
pub struct BidGenerator<'a, S: ?Sized> {
    own: &'a S,
    powers: &'a BTreeMap<PartyId, u32>,
    min_coalition_power: u32,
}

impl<'a, S> BidGenerator<'a, S>
where
    S: UtilitySpace + ?Sized,
{
    #[must_use]
    pub fn new(own: &'a S, powers: &'a BTreeMap<PartyId, u32>, min_coalition_power: u32) -> Self {
        Self {
            own,
            powers,
            min_coalition_power,
        }
    }

    /// Issues in the order they are decided: ascending own weight, ties in domain order.
    #[must_use]
    pub fn draw_order(&self) -> Vec<&'a str> {
        let own: &'a S = self.own;
        let mut issues: Vec<&'a str> = own.domain().issue_names().collect();
        issues.sort_by(|a, b| own.weight(a).total_cmp(&own.weight(b)));
        issues
    }

    /// Selects the counterparts whose models bias the draw.
    pub fn coalition<M>(
        &self,
        opponents: &BTreeMap<PartyId, M>,
    ) -> Result<Vec<PartyId>, BidGenerationError>
    where
        M: UtilitySpace,
    {
        let mut distances = Vec::with_capacity(opponents.len());
        for (party, model) in opponents {
            if model.domain() != self.own.domain() {
                return Err(BidGenerationError::DomainMismatch {
                    party: party.clone(),
                });
            }
            distances.push((party.clone(), distance(self.own, model)));
        }
        select_coalition(&distances, self.powers, self.min_coalition_power)
    }

    /// Values of `issue` that keep `min_total_utility` reachable given `partial`.
    ///
    /// `remaining` are the issues still to be decided after `issue`.
    #[must_use]
    pub fn candidates(
        &self,
        issue: &str,
        partial: &Bid,
        remaining: &[&str],
        min_total_utility: f64,
    ) -> Vec<Value> {
        let current = self.own.utility(partial);
        let optimistic = max_remaining_utility(self.own, remaining.iter().copied());
        let required = min_total_utility - current - optimistic;

        let weight = self.own.weight(issue);
        let utilities = self.own.value_utilities(issue);
        let best = utilities
            .iter()
            .enumerate()
            .max_by(|(i, a), (j, b)| a.1.total_cmp(&b.1).then(j.cmp(i)))
            .map(|(i, _)| i);

        let candidates: Vec<Value> = utilities
            .iter()
            .enumerate()
            .filter(|(i, (_, utility))| weight * utility >= required || Some(*i) == best)
            .map(|(_, (value, _))| value.clone())
            .collect();
        trace!(issue, required, candidates = candidates.len(), "candidate values");
        candidates
    }

    /// Generates one complete bid.
    ///
    /// `opponents` holds the current utility space of every known counterpart. Every
    /// party in it must have a declared power.
    pub fn generate_bid<M, R>(
        &self,
        opponents: &BTreeMap<PartyId, M>,
        min_total_utility: f64,
        rng: &mut R,
    ) -> Result<Bid, BidGenerationError>
    where
        M: UtilitySpace,
        R: Rng + ?Sized,
    {
        let coalition = self.coalition(opponents)?;
        let members: Vec<&M> = coalition
            .iter()
            .filter_map(|party| opponents.get(party))
            .collect();

        let order = self.draw_order();
        let mut bid = Bid::new();
        for (position, &issue) in order.iter().enumerate() {
            let remaining = &order[position + 1..];
            let candidates = self.candidates(issue, &bid, remaining, min_total_utility);
            let masses: Vec<f64> = candidates
                .iter()
                .map(|value| {
                    members
                        .iter()
                        .map(|model| model.utility(&Bid::single(issue, value.clone())))
                        .sum()
                })
                .collect();
            let drawn = &candidates[draw_from_discrete(rng, &masses)];
            bid.insert(issue, drawn.clone());
        }

        debug!(
            coalition = ?coalition,
            min_total_utility,
            utility = self.own.utility(&bid),
            "generated bid"
        );
        Ok(bid)
    }
}

#[cfg(test)]
mod tests {
    use parley_domain::{Domain, Issue, LinearAdditiveSpace};
    use parley_learning::opponent::OpponentModel;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn domain() -> Domain {
        Domain::new(
            "d",
            vec![Issue::new("a", ["high", "low"]), Issue::new("b", ["high", "low"])],
        )
        .unwrap()
    }

    fn space(weights: [f64; 2], a: [f64; 2], b: [f64; 2]) -> LinearAdditiveSpace {
        let utilities = BTreeMap::from([
            (
                "a".to_owned(),
                BTreeMap::from([("high".into(), a[0]), ("low".into(), a[1])]),
            ),
            (
                "b".to_owned(),
                BTreeMap::from([("high".into(), b[0]), ("low".into(), b[1])]),
            ),
        ]);
        let weights = BTreeMap::from([("a".to_owned(), weights[0]), ("b".to_owned(), weights[1])]);
        LinearAdditiveSpace::new("p", domain(), weights, utilities, None).unwrap()
    }

    fn party(id: &str) -> PartyId {
        id.into()
    }

    #[test]
    fn test_only_feasible_bid_is_always_returned() {
        let own = space([0.5, 0.5], [0.9, 0.1], [0.9, 0.1]);
        // the counterpart prefers the values we cannot afford
        let opponents = BTreeMap::from([(party("bob"), space([0.5, 0.5], [0.0, 1.0], [0.0, 1.0]))]);
        let powers = BTreeMap::from([(party("bob"), 1)]);
        let generator = BidGenerator::new(&own, &powers, 1);

        let expected = Bid::from_iter([("a", "high"), ("b", "high")]);
        for seed in 0..100 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let bid = generator.generate_bid(&opponents, 0.85, &mut rng).unwrap();
            assert_eq!(bid, expected);
        }
    }

    #[test]
    fn test_bids_are_complete() {
        let own = space([0.3, 0.7], [0.2, 0.8], [1.0, 0.0]);
        let opponents = BTreeMap::from([
            (party("bob"), space([0.6, 0.4], [0.5, 0.5], [0.1, 0.9])),
            (party("eve"), space([0.1, 0.9], [1.0, 0.0], [0.3, 0.7])),
        ]);
        let powers = BTreeMap::from([(party("bob"), 2), (party("eve"), 2)]);
        let generator = BidGenerator::new(&own, &powers, 3);
        let mut rng = Pcg32::seed_from_u64(9);
        for _ in 0..50 {
            let bid = generator.generate_bid(&opponents, 0.3, &mut rng).unwrap();
            assert!(bid.is_complete(&domain()));
            assert_eq!(bid.len(), 2);
        }
    }

    #[test]
    fn test_draw_follows_coalition_preferences() {
        // any value is acceptable to us, the coalition only likes "low" on b
        let own = space([0.5, 0.5], [1.0, 0.5], [1.0, 0.5]);
        let opponents = BTreeMap::from([(party("bob"), space([0.0, 1.0], [0.5, 0.5], [0.0, 1.0]))]);
        let powers = BTreeMap::from([(party("bob"), 1)]);
        let generator = BidGenerator::new(&own, &powers, 1);
        let mut rng = Pcg32::seed_from_u64(4);
        for _ in 0..50 {
            let bid = generator.generate_bid(&opponents, 0.0, &mut rng).unwrap();
            assert_eq!(bid.get("b"), Some(&Value::from("low")));
        }
    }

    #[test]
    fn test_best_value_is_kept_when_threshold_is_infeasible() {
        let own = space([0.5, 0.5], [0.9, 0.1], [0.9, 0.1]);
        let powers = BTreeMap::new();
        let generator = BidGenerator::new(&own, &powers, 0);
        let candidates = generator.candidates("a", &Bid::new(), &["b"], 2.0);
        assert_eq!(candidates, vec![Value::from("high")]);

        let opponents: BTreeMap<PartyId, LinearAdditiveSpace> = BTreeMap::new();
        let mut rng = Pcg32::seed_from_u64(0);
        let bid = generator.generate_bid(&opponents, 2.0, &mut rng).unwrap();
        assert_eq!(bid, Bid::from_iter([("a", "high"), ("b", "high")]));
    }

    #[test]
    fn test_issues_are_drawn_least_important_first() {
        let own = space([0.7, 0.3], [1.0, 0.0], [1.0, 0.0]);
        let powers = BTreeMap::new();
        let generator = BidGenerator::new(&own, &powers, 0);
        assert_eq!(generator.draw_order(), vec!["b", "a"]);
        assert!((max_remaining_utility(&own, ["a", "b"]) - 1.0).abs() < 1e-12);
        assert!((max_remaining_utility(&own, ["b"]) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_infeasible_coalition_is_reported() {
        let own = space([0.5, 0.5], [0.9, 0.1], [0.9, 0.1]);
        let opponents = BTreeMap::from([(party("bob"), space([0.5, 0.5], [0.5, 0.5], [0.5, 0.5]))]);
        let powers = BTreeMap::from([(party("bob"), 1)]);
        let generator = BidGenerator::new(&own, &powers, 5);
        let mut rng = Pcg32::seed_from_u64(0);
        assert!(matches!(
            generator.generate_bid(&opponents, 0.5, &mut rng),
            Err(BidGenerationError::InfeasibleCoalition { .. })
        ));
    }

    #[test]
    fn test_untrained_opponent_models_can_be_used() {
        let own = space([0.5, 0.5], [0.9, 0.1], [0.9, 0.1]);
        let opponents = BTreeMap::from([(party("bob"), OpponentModel::new(&domain()))]);
        let powers = BTreeMap::from([(party("bob"), 2)]);
        let generator = BidGenerator::new(&own, &powers, 2);
        let mut rng = Pcg32::seed_from_u64(5);
        let bid = generator.generate_bid(&opponents, 0.6, &mut rng).unwrap();
        assert!(bid.is_complete(&domain()));
        assert!(own.utility(&bid) >= 0.6);
    }
}
