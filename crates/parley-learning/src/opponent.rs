//! Learned opponent model exposed as a linear-additive utility space.
//!
//! [`OpponentModel`] is an immutable snapshot: the domain mapping, the trained model
//! parameters and the accumulated example history. [`OpponentModel::with_action`]
//! never mutates the snapshot it is called on; it returns a new one. Whoever drives
//! the negotiation owns the "latest snapshot per counterpart" registry and swaps
//! entries itself.

use std::sync::Arc;

use parley_domain::{Action, Bid, Domain, Progress, UtilitySpace, Value, Vote};
use tracing::{debug, warn};

use crate::{
    mapper::{DomainMismatchError, OptionMapper},
    model::{DegenerateNormalizationError, ModelInit, UtilityModel},
    trainer::{Trainer, TrainingExample},
};

/// How an observed vote is turned into a training label.
///
/// Votes carry no explicit accept/reject signal, only the power range under which
/// the voter accepts the bid. Which ranges mean "the voter likes this bid" is an open
/// product question, so the rule is selectable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum VoteLabelPolicy {
    /// Positive if `min_power < max_power` or `min_power < u32::MAX`.
    ///
    /// This is the rule the agent has always used. It labels almost every vote as
    /// positive.
    #[default]
    PowerHeuristic,
    /// Every vote is a positive example.
    AlwaysAccepted,
    /// Votes produce no examples.
    Ignore,
}

impl VoteLabelPolicy {
    /// Returns the label for `vote`, or `None` if the vote yields no example.
    #[must_use]
    pub fn label(self, vote: &Vote) -> Option<bool> {
        match self {
            VoteLabelPolicy::PowerHeuristic => {
                Some(vote.min_power < vote.max_power || vote.min_power < u32::MAX)
            }
            VoteLabelPolicy::AlwaysAccepted => Some(true),
            VoteLabelPolicy::Ignore => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpponentModel {
    domain: Arc<Domain>,
    mapper: Arc<OptionMapper>,
    model: UtilityModel,
    examples: Arc<Vec<TrainingExample>>,
    trainer: Trainer,
    label_policy: VoteLabelPolicy,
    mean_loss: Option<f64>,
}

impl OpponentModel {
    pub const NAME: &'static str = "LinearAdditiveOpponentModel";

    /// Creates an untrained model with neutral weights.
    #[must_use]
    pub fn new(domain: &Domain) -> Self {
        let mapper = OptionMapper::new(domain);
        let model = UtilityModel::with_init(&mapper.shape(), ModelInit::default())
            .expect("a validated domain has at least one issue");
        Self {
            domain: Arc::new(domain.clone()),
            mapper: Arc::new(mapper),
            model,
            examples: Arc::new(vec![]),
            trainer: Trainer::default(),
            label_policy: VoteLabelPolicy::default(),
            mean_loss: None,
        }
    }

    #[must_use]
    pub fn with_trainer(mut self, trainer: Trainer) -> Self {
        self.trainer = trainer;
        self
    }

    #[must_use]
    pub fn with_label_policy(mut self, label_policy: VoteLabelPolicy) -> Self {
        self.label_policy = label_policy;
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    #[must_use]
    pub fn mapper(&self) -> &OptionMapper {
        &self.mapper
    }

    #[must_use]
    pub fn model(&self) -> &UtilityModel {
        &self.model
    }

    #[must_use]
    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    #[must_use]
    pub fn example_count(&self) -> usize {
        self.examples.len()
    }

    #[must_use]
    pub fn label_policy(&self) -> VoteLabelPolicy {
        self.label_policy
    }

    /// Mean training loss of the final pass of the last retraining.
    #[must_use]
    pub fn mean_loss(&self) -> Option<f64> {
        self.mean_loss
    }

    /// Predicted acceptance of a complete bid.
    pub fn predict(&self, bid: &Bid) -> Result<f64, DomainMismatchError> {
        let options = self.mapper.to_options(bid)?;
        Ok(self.model.predict(&options))
    }

    fn example_from(&self, bid: &Bid, accepted: bool) -> Option<TrainingExample> {
        match self.mapper.to_options(bid) {
            Ok(options) => Some(TrainingExample::new(options, accepted)),
            Err(err) => {
                warn!(%err, "skipping observation that does not fit the domain");
                None
            }
        }
    }

    /// Folds an observed action into the example history and retrains.
    ///
    /// Offers yield one positive example. Votes yield one example per vote, labeled
    /// by the [`VoteLabelPolicy`]. Other actions, and observations that do not fit
    /// the domain, add nothing; when nothing is added the snapshot is returned
    /// unchanged. `progress` is not used by the learner.
    pub fn with_action(
        &self,
        action: &Action,
        _progress: &Progress,
    ) -> Result<Self, DegenerateNormalizationError> {
        let derived: Vec<TrainingExample> = match action {
            Action::Offer { bid, .. } => self.example_from(bid, true).into_iter().collect(),
            Action::Votes { votes, .. } => votes
                .iter()
                .filter_map(|vote| {
                    let accepted = self.label_policy.label(vote)?;
                    self.example_from(&vote.bid, accepted)
                })
                .collect(),
            Action::Accept { .. } | Action::EndNegotiation { .. } => vec![],
        };

        if derived.is_empty() {
            return Ok(self.clone());
        }

        let mut examples = Vec::with_capacity(self.examples.len() + derived.len());
        examples.extend_from_slice(&self.examples);
        examples.extend(derived);

        let outcome = self.trainer.train(&self.model, &examples)?;
        debug!(
            actor = %action.actor(),
            examples = examples.len(),
            mean_loss = outcome.mean_loss.unwrap_or_default(),
            "updated opponent model"
        );

        Ok(Self {
            domain: Arc::clone(&self.domain),
            mapper: Arc::clone(&self.mapper),
            model: outcome.model,
            examples: Arc::new(examples),
            trainer: self.trainer,
            label_policy: self.label_policy,
            mean_loss: outcome.mean_loss,
        })
    }
}

impl UtilitySpace for OpponentModel {
    fn domain(&self) -> &Domain {
        &self.domain
    }

    fn weight(&self, issue: &str) -> f64 {
        self.mapper
            .issue_index(issue)
            .map_or(0.0, |i| self.model.weight(i))
    }

    fn value_utility(&self, issue: &str, value: &Value) -> f64 {
        let Ok(issue_index) = self.mapper.issue_index(issue) else {
            return 0.0;
        };
        self.mapper
            .value_index(issue_index, value)
            .map_or(0.0, |v| self.model.value_weight(issue_index, v))
    }

    fn value_utilities(&self, issue: &str) -> Vec<(Value, f64)> {
        let Ok(issue_index) = self.mapper.issue_index(issue) else {
            return vec![];
        };
        self.model
            .issue_value_weights(issue_index)
            .into_iter()
            .enumerate()
            .map(|(v, utility)| (self.mapper.value_from_index(issue_index, v).clone(), utility))
            .collect()
    }

    fn utility(&self, bid: &Bid) -> f64 {
        let weights = self.model.weights();
        bid.iter()
            .filter_map(|(issue, value)| {
                let issue_index = self.mapper.issue_index(issue).ok()?;
                let value_index = self.mapper.value_index(issue_index, value).ok()?;
                Some(weights[issue_index] * self.model.value_weight(issue_index, value_index))
            })
            .sum()
    }
}
