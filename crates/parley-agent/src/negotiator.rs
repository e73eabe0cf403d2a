use std::collections::BTreeMap;

use parley_bidding::{
    BidGenerationError,
    enumeration::{best_bids, extreme_bid},
    generator::BidGenerator,
};
use parley_domain::{Action, Bid, PartyId, Progress, UtilitySpace, Vote};
use parley_learning::{
    model::DegenerateNormalizationError,
    opponent::{OpponentModel, VoteLabelPolicy},
    trainer::Trainer,
};
use rand::Rng;
use tracing::{debug, info};

use crate::NegotiatorSettings;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum AgentError {
    #[display("failed to generate a bid: {_0}")]
    BidGeneration(BidGenerationError),
    #[display("failed to update an opponent model: {_0}")]
    Learning(DegenerateNormalizationError),
}

/// Our side of a negotiation.
///
/// Holds our own profile, the latest opponent model per counterpart and our last
/// votes. All updates go through `&mut self`; opponent models themselves are
/// immutable snapshots that are replaced on every observation.
#[derive(Debug, Clone)]
pub struct Negotiator<S> {
    me: PartyId,
    profile: S,
    settings: NegotiatorSettings,
    trainer: Trainer,
    label_policy: VoteLabelPolicy,
    opponents: BTreeMap<PartyId, OpponentModel>,
    opening_bids: Vec<Bid>,
    last_votes: Vec<Vote>,
}

impl<S> Negotiator<S>
where
    S: UtilitySpace,
{
    #[must_use]
    pub fn new(me: PartyId, profile: S, settings: NegotiatorSettings) -> Self {
        let schedule = settings.schedule;
        let opening_min = schedule.opening_band * profile.max_utility();
        let opening_bids = best_bids(
            &profile,
            opening_min,
            usize::try_from(schedule.opening_rounds).unwrap_or(usize::MAX),
        );
        debug!(
            %me,
            opening_bids = opening_bids.len(),
            opening_min,
            "prepared opening bids"
        );
        Self {
            me,
            profile,
            settings,
            trainer: Trainer::default(),
            label_policy: VoteLabelPolicy::default(),
            opponents: BTreeMap::new(),
            opening_bids,
            last_votes: vec![],
        }
    }

    /// Trainer used for opponent models created from now on.
    #[must_use]
    pub fn with_trainer(mut self, trainer: Trainer) -> Self {
        self.trainer = trainer;
        self
    }

    /// Vote labeling used for opponent models created from now on.
    #[must_use]
    pub fn with_label_policy(mut self, label_policy: VoteLabelPolicy) -> Self {
        self.label_policy = label_policy;
        self
    }

    #[must_use]
    pub fn me(&self) -> &PartyId {
        &self.me
    }

    #[must_use]
    pub fn profile(&self) -> &S {
        &self.profile
    }

    #[must_use]
    pub fn settings(&self) -> &NegotiatorSettings {
        &self.settings
    }

    #[must_use]
    pub fn opponents(&self) -> &BTreeMap<PartyId, OpponentModel> {
        &self.opponents
    }

    #[must_use]
    pub fn opponent(&self, party: &PartyId) -> Option<&OpponentModel> {
        self.opponents.get(party)
    }

    #[must_use]
    pub fn last_votes(&self) -> &[Vote] {
        &self.last_votes
    }

    /// Our own utility threshold at `progress`.
    #[must_use]
    pub fn threshold(&self, progress: &Progress) -> f64 {
        self.settings.schedule.threshold(progress)
    }

    /// Learns from an action of another party.
    ///
    /// Offers and votes update (or create) the model of the acting party. Our own
    /// actions and other action kinds are ignored.
    pub fn observe(&mut self, action: &Action, progress: &Progress) -> Result<(), AgentError> {
        let actor = action.actor();
        if *actor == self.me || !(action.is_offer() || action.is_votes()) {
            return Ok(());
        }

        let updated = match self.opponents.get(actor) {
            Some(model) => model.with_action(action, progress)?,
            None => {
                info!(party = %actor, "modeling new counterpart");
                OpponentModel::new(self.profile.domain())
                    .with_trainer(self.trainer)
                    .with_label_policy(self.label_policy)
                    .with_action(action, progress)?
            }
        };
        self.opponents.insert(actor.clone(), updated);
        Ok(())
    }

    /// Makes an offer for the round at `progress`.
    ///
    /// `powers` holds the declared power of every counterpart we have a model of.
    /// While no counterpart is modeled yet, generated bids only have to satisfy our
    /// own threshold.
    pub fn propose<R>(
        &self,
        progress: &Progress,
        powers: &BTreeMap<PartyId, u32>,
        rng: &mut R,
    ) -> Result<Action, AgentError>
    where
        R: Rng + ?Sized,
    {
        let schedule = &self.settings.schedule;
        let bid = if schedule.is_opening(progress) {
            usize::try_from(progress.round())
                .ok()
                .and_then(|round| self.opening_bids.get(round))
                .or_else(|| self.opening_bids.first())
                .cloned()
                .unwrap_or_else(|| extreme_bid(&self.profile))
        } else {
            let threshold = self.threshold(progress);
            // before anyone else has acted there is no coalition to appeal to
            let coalition_power = if self.opponents.is_empty() {
                0
            } else {
                self.settings.coalition_power()
            };
            let generator = BidGenerator::new(&self.profile, powers, coalition_power);
            generator.generate_bid(&self.opponents, threshold, rng)?
        };

        debug!(
            round = progress.round(),
            utility = self.profile.utility(&bid),
            "proposing bid"
        );
        Ok(Action::Offer {
            actor: self.me.clone(),
            bid,
        })
    }

    /// Votes for every distinct offered bid that reaches our vote threshold.
    pub fn vote(&mut self, offers: &[Bid], progress: &Progress) -> Action {
        let threshold = self.settings.schedule.vote_threshold(progress);
        let mut votes: Vec<Vote> = vec![];
        for bid in offers {
            if votes.iter().any(|v| v.bid == *bid) || self.profile.utility(bid) < threshold {
                continue;
            }
            votes.push(Vote {
                actor: self.me.clone(),
                bid: bid.clone(),
                min_power: self.settings.min_power,
                max_power: self.settings.max_power,
            });
        }
        debug!(
            offers = offers.len(),
            votes = votes.len(),
            threshold,
            "voting"
        );
        self.last_votes.clone_from(&votes);
        Action::Votes {
            actor: self.me.clone(),
            votes,
        }
    }

    /// Confirms the votes of the last voting phase.
    #[must_use]
    pub fn opt_in(&self) -> Action {
        Action::Votes {
            actor: self.me.clone(),
            votes: self.last_votes.clone(),
        }
    }
}
