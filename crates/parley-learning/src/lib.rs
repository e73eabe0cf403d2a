//! Online learning of counterpart preferences.
//!
//! This crate infers a counterpart's linear-additive utility function from the offers
//! and votes it makes. Every observation becomes a weakly labeled training example,
//! and a small differentiable model is refit by gradient descent over the whole
//! example history each time a new observation arrives.
//!
//! # How Learning Works
//!
//! 1. **Mapping** - [`mapper::OptionMapper`] turns a bid into an option vector (one
//!    value index per issue)
//! 2. **Labeling** - offers are positive examples, votes are labeled by a
//!    [`opponent::VoteLabelPolicy`]
//! 3. **Training** - [`trainer::Trainer`] runs a fixed number of stochastic gradient
//!    passes over all examples
//! 4. **Publishing** - [`opponent::OpponentModel::with_action`] returns a new immutable
//!    snapshot wrapping the retrained parameters
//!
//! # Architecture
//!
//! ```text
//! Action (Offer / Votes)
//!     ↓ labeled by
//! VoteLabelPolicy
//!     ↓ encoded by
//! OptionMapper
//!     ↓ appended to
//! Training examples
//!     ↓ fit by
//! Trainer + UtilityModel
//!     ↓ published as
//! OpponentModel (implements UtilitySpace)
//! ```
//!
//! # Model
//!
//! ```text
//! prediction = Σᵢ (gᵢ / Σg) · clip(wᵢ[xᵢ], 0, 1)
//! loss       = elu((target - prediction)²)
//! ```
//!
//! The clip is gradient preserving: its backward pass is the identity, so a value
//! weight pushed out of `[0, 1]` still receives corrective gradient. See [`model`].
//!
//! # Current Limitations
//!
//! - **Full retraining**: every update replays the full history, so cost grows
//!   linearly with the number of observations
//! - **No convergence check**: training always stops after a fixed number of passes
//! - **Weak vote labels**: the default vote labeling treats nearly every vote as an
//!   acceptance; see [`opponent::VoteLabelPolicy`]

pub mod evaluation;
pub mod mapper;
pub mod model;
pub mod opponent;
pub mod trainer;
