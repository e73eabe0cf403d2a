use serde::{Deserialize, Serialize};

use crate::Bid;

/// Identity of a negotiating party.
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
pub struct PartyId(String);

impl PartyId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartyId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A conditional vote for a bid.
///
/// The voter accepts `bid` if the total power of the parties voting for it ends up
/// within `min_power..=max_power`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vote {
    pub actor: PartyId,
    pub bid: Bid,
    pub min_power: u32,
    pub max_power: u32,
}

/// An action observed in (or sent to) a negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Offer { actor: PartyId, bid: Bid },
    Votes { actor: PartyId, votes: Vec<Vote> },
    Accept { actor: PartyId, bid: Bid },
    EndNegotiation { actor: PartyId },
}

impl Action {
    #[must_use]
    pub fn actor(&self) -> &PartyId {
        match self {
            Action::Offer { actor, .. }
            | Action::Votes { actor, .. }
            | Action::Accept { actor, .. }
            | Action::EndNegotiation { actor } => actor,
        }
    }
}

/// Round-based negotiation progress.
///
/// Opaque to the learner; the negotiator derives its concession threshold from
/// [`Progress::fraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    round: u32,
    total_rounds: u32,
}

impl Progress {
    #[must_use]
    pub const fn new(total_rounds: u32) -> Self {
        Self {
            round: 0,
            total_rounds,
        }
    }

    #[must_use]
    pub const fn at(round: u32, total_rounds: u32) -> Self {
        let round = if round > total_rounds {
            total_rounds
        } else {
            round
        };
        Self {
            round,
            total_rounds,
        }
    }

    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub const fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    /// Fraction of the negotiation that has passed, in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total_rounds == 0 {
            return 1.0;
        }
        f64::from(self.round) / f64::from(self.total_rounds)
    }

    /// Returns the progress of the next round, saturating at the last round.
    #[must_use]
    pub const fn advance(self) -> Self {
        Self::at(self.round.saturating_add(1), self.total_rounds)
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.round >= self.total_rounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction_and_saturation() {
        let progress = Progress::new(4);
        assert_eq!(progress.fraction(), 0.0);
        let progress = progress.advance().advance();
        assert_eq!(progress.round(), 2);
        assert_eq!(progress.fraction(), 0.5);
        let progress = progress.advance().advance().advance();
        assert_eq!(progress.round(), 4);
        assert!(progress.is_finished());
        assert_eq!(Progress::new(0).fraction(), 1.0);
    }

    #[test]
    fn test_action_json_shape() {
        let action = Action::Offer {
            actor: "alice".into(),
            bid: Bid::single("menu", "fish"),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"type":"offer","actor":"alice","bid":{"menu":"fish"}}"#
        );
        let decoded: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.actor().as_str(), "alice");
        assert!(decoded.is_offer());
    }
}
