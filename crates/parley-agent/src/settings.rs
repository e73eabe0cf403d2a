use parley_domain::Progress;
use serde::{Deserialize, Serialize};

/// How fast we concede over the negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcessionSchedule {
    /// Utility required in the first round
    pub start_threshold: f64,
    /// Utility required in the last round
    pub end_threshold: f64,
    /// Number of opening rounds, in which we offer our own best bids (one per round)
    /// instead of generated ones
    pub opening_rounds: u32,
    /// Opening bids must reach this share of our maximum utility
    pub opening_band: f64,
    /// We vote for bids reaching this share of the current threshold
    pub vote_slack: f64,
}

impl Default for ConcessionSchedule {
    fn default() -> Self {
        Self {
            start_threshold: 0.9,
            end_threshold: 0.6,
            opening_rounds: 6,
            opening_band: 0.9,
            vote_slack: 0.9,
        }
    }
}

impl ConcessionSchedule {
    /// Utility threshold at `progress`, interpolated linearly between the start and
    /// end thresholds.
    #[must_use]
    pub fn threshold(&self, progress: &Progress) -> f64 {
        let f = progress.fraction();
        f * self.end_threshold + (1.0 - f) * self.start_threshold
    }

    #[must_use]
    pub fn vote_threshold(&self, progress: &Progress) -> f64 {
        self.vote_slack * self.threshold(progress)
    }

    #[must_use]
    pub fn is_opening(&self, progress: &Progress) -> bool {
        progress.round() < self.opening_rounds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorSettings {
    /// Smallest total power under which our votes accept a bid
    pub min_power: u32,
    /// Largest total power under which our votes accept a bid
    pub max_power: u32,
    /// Our own voting power
    pub power: u32,
    pub schedule: ConcessionSchedule,
}

impl Default for NegotiatorSettings {
    fn default() -> Self {
        Self {
            min_power: 2,
            max_power: u32::MAX,
            power: 1,
            schedule: ConcessionSchedule::default(),
        }
    }
}

impl NegotiatorSettings {
    /// Power the coalition must add to ours to reach `min_power`.
    #[must_use]
    pub fn coalition_power(&self) -> u32 {
        self.min_power.saturating_sub(self.power)
    }
}
