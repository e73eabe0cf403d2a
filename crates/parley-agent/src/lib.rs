//! A negotiating party built on the learner and the bid generator.
//!
//! [`Negotiator`] is the protocol-facing side of the workspace. It owns the registry
//! of the latest [`OpponentModel`](parley_learning::opponent::OpponentModel) snapshot
//! per counterpart and turns negotiation progress into offers and votes:
//!
//! - **Offer phase** - the first few rounds offer our own best bids; afterwards bids
//!   come from the coalition-biased [`BidGenerator`](parley_bidding::generator::BidGenerator)
//! - **Voting phase** - we vote for every offered bid that is close enough to our
//!   current concession threshold
//! - **Opt-in phase** - we repeat our last votes
//!
//! The concession threshold falls linearly from
//! [`ConcessionSchedule::start_threshold`] to [`ConcessionSchedule::end_threshold`]
//! over the rounds of the negotiation.

pub use self::{negotiator::*, settings::*};

mod negotiator;
mod settings;
