//! Core negotiation vocabulary shared by the learner, the bid generator and the
//! negotiator.
//!
//! # Overview
//!
//! A negotiation happens over a [`Domain`]: an ordered list of issues, each with a
//! finite set of discrete [`Value`]s. Parties exchange [`Bid`]s (one value per issue)
//! through [`Action`]s, and judge bids with a [`UtilitySpace`]:
//!
//! ```text
//! utility(bid) = Σ weight(issue) · value_utility(issue, bid[issue])
//! ```
//!
//! The [`UtilitySpace`] capability has two implementations in this workspace:
//!
//! - [`LinearAdditiveSpace`] - a static profile loaded from JSON (our own preferences,
//!   or scripted counterparts in simulation)
//! - `OpponentModel` in `parley-learning` - a learned approximation of a counterpart
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use parley_domain::{Bid, Domain, Issue, LinearAdditiveSpace, UtilitySpace};
//!
//! let domain = Domain::new(
//!     "dinner",
//!     vec![
//!         Issue::new("menu", ["fish", "meat"]),
//!         Issue::new("cost", ["low", "high"]),
//!     ],
//! )
//! .unwrap();
//!
//! let weights = BTreeMap::from([("menu".to_owned(), 0.25), ("cost".to_owned(), 0.75)]);
//! let utilities = BTreeMap::from([
//!     (
//!         "menu".to_owned(),
//!         BTreeMap::from([("fish".into(), 1.0), ("meat".into(), 0.0)]),
//!     ),
//!     (
//!         "cost".to_owned(),
//!         BTreeMap::from([("low".into(), 1.0), ("high".into(), 0.2)]),
//!     ),
//! ]);
//! let profile = LinearAdditiveSpace::new("me", domain, weights, utilities, None).unwrap();
//!
//! let bid = Bid::from_iter([("menu", "fish"), ("cost", "high")]);
//! assert!((profile.utility(&bid) - 0.4).abs() < 1e-9);
//! ```

pub use self::{action::*, bid::*, domain::*, utility_space::*};

mod action;
mod bid;
mod domain;
mod utility_space;
