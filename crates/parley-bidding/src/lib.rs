//! Constructing offers that are good for us and attractive to a coalition.
//!
//! # How Bid Generation Works
//!
//! 1. **Coalition selection** - counterparts are ranked by how close their
//!    (learned) preferences are to ours, and the closest ones are taken until their
//!    summed power reaches the required coalition power ([`coalition`])
//! 2. **Draw order** - issues are decided from the least to the most important to us,
//!    so the issues that matter most are fixed last
//! 3. **Constrained draw** - for each issue only values that keep the utility
//!    threshold reachable are candidates, and one is drawn with probability
//!    proportional to how much the coalition is predicted to like it
//!    ([`generator`], [`sampling`])
//!
//! [`enumeration`] provides the deterministic counterpart used for opening offers:
//! the best complete bids of a utility space, found by branch and bound.
//!
//! # Current Limitations
//!
//! - **Greedy feasibility**: the per-issue threshold assumes every later issue is
//!   filled optimally, so a bid can end below the requested utility once an earlier
//!   draw had no feasible candidate
//! - **Static coalition**: the coalition is chosen once per bid and ignores how the
//!   drawn values change counterpart utilities

pub mod coalition;
pub mod enumeration;
pub mod generator;
pub mod sampling;

use parley_domain::PartyId;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BidGenerationError {
    /// Even all known counterparts together do not reach the required power.
    #[display("counterparts reach a total power of {available}, {required} required")]
    InfeasibleCoalition { required: u32, available: u64 },
    #[display("no power declared for party '{party}'")]
    UnknownPower { party: PartyId },
    #[display("utility space of party '{party}' is over a different domain")]
    DomainMismatch { party: PartyId },
}
