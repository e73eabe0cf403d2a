//! Fixed-schedule stochastic gradient descent over the example history.
//!
//! Training is intentionally simple: no minibatches, no shuffling, no convergence
//! check. [`Trainer::train`] runs `passes` passes over the examples in list order,
//! taking one gradient step per example, and returns a new model. The input model is
//! never modified, so snapshots that are still being read stay consistent.

use tracing::debug;

use crate::model::{DegenerateNormalizationError, UtilityModel};

/// One labeled option vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    /// Chosen value index per issue
    pub options: Vec<usize>,
    /// Whether the option vector is judged acceptable
    pub accepted: bool,
    /// True utility, known only for synthetic examples
    pub actual_utility: Option<f64>,
}

impl TrainingExample {
    #[must_use]
    pub fn new(options: Vec<usize>, accepted: bool) -> Self {
        Self {
            options,
            accepted,
            actual_utility: None,
        }
    }

    #[must_use]
    pub fn with_actual_utility(mut self, utility: f64) -> Self {
        self.actual_utility = Some(utility);
        self
    }

    /// Regression target of the label: `1.0` if accepted, else `0.0`.
    #[must_use]
    pub fn target(&self) -> f64 {
        if self.accepted { 1.0 } else { 0.0 }
    }
}

/// Gradient descent parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trainer {
    /// Step size of every gradient update
    pub learning_rate: f64,
    /// Number of passes over the full example list per training run
    pub passes: usize,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            passes: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub model: UtilityModel,
    /// Mean loss over the examples during the final pass, `None` if nothing was trained
    pub mean_loss: Option<f64>,
}

impl Trainer {
    /// Trains a copy of `model` on `examples`.
    ///
    /// # Panics
    ///
    /// Panics if an example does not have one option per model issue.
    pub fn train(
        &self,
        model: &UtilityModel,
        examples: &[TrainingExample],
    ) -> Result<TrainingOutcome, DegenerateNormalizationError> {
        let mut model = model.clone();
        let mut mean_loss = None;

        if examples.is_empty() || self.passes == 0 {
            return Ok(TrainingOutcome { model, mean_loss });
        }

        for _ in 0..self.passes {
            let mut total = 0.0;
            for example in examples {
                total += self.step(&mut model, example)?;
            }
            #[expect(clippy::cast_precision_loss)]
            let mean = total / examples.len() as f64;
            mean_loss = Some(mean);
        }

        debug!(
            examples = examples.len(),
            passes = self.passes,
            mean_loss = mean_loss.unwrap_or_default(),
            "trained utility model"
        );
        Ok(TrainingOutcome { model, mean_loss })
    }

    /// Takes one gradient step on a single example and returns its loss before the step.
    pub fn step(
        &self,
        model: &mut UtilityModel,
        example: &TrainingExample,
    ) -> Result<f64, DegenerateNormalizationError> {
        let (loss, gradient) = model.gradient(&example.options, example.target());
        model.apply_gradient(&gradient, self.learning_rate)?;
        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two issues with two values each; acceptance depends only on the first issue.
    fn separable_examples(repeats: usize) -> Vec<TrainingExample> {
        let grid = [
            (vec![0, 0], true),
            (vec![0, 1], true),
            (vec![1, 0], false),
            (vec![1, 1], false),
        ];
        (0..repeats)
            .flat_map(|_| grid.iter().cloned())
            .map(|(options, accepted)| TrainingExample::new(options, accepted))
            .collect()
    }

    #[test]
    fn test_training_does_not_touch_input_model() {
        let model = UtilityModel::new(&[2, 2]).unwrap();
        let outcome = Trainer::default()
            .train(&model, &separable_examples(5))
            .unwrap();
        assert_eq!(model, UtilityModel::new(&[2, 2]).unwrap());
        assert_ne!(outcome.model, model);
        assert!(outcome.mean_loss.is_some());
    }

    #[test]
    fn test_empty_history_is_a_no_op() {
        let model = UtilityModel::new(&[3]).unwrap();
        let outcome = Trainer::default().train(&model, &[]).unwrap();
        assert_eq!(outcome.model, model);
        assert_eq!(outcome.mean_loss, None);
    }

    #[test]
    fn test_learns_separable_preference() {
        let model = UtilityModel::new(&[2, 2]).unwrap();
        let examples = separable_examples(25);
        let outcome = Trainer::default().train(&model, &examples).unwrap();
        let trained = outcome.model;

        for example in &examples {
            let prediction = trained.predict(&example.options);
            assert_eq!(prediction > 0.5, example.accepted, "{example:?} => {prediction}");
        }
        let values = trained.issue_value_weights(0);
        assert!(values[0] > values[1]);
    }

    #[test]
    fn test_loss_decreases_with_more_passes() {
        let model = UtilityModel::new(&[2, 2]).unwrap();
        let examples = separable_examples(10);
        let short = Trainer {
            passes: 1,
            ..Trainer::default()
        }
        .train(&model, &examples)
        .unwrap();
        let long = Trainer {
            passes: 20,
            ..Trainer::default()
        }
        .train(&model, &examples)
        .unwrap();
        assert!(long.mean_loss.unwrap() < short.mean_loss.unwrap());
    }

    #[test]
    fn test_clipping_and_normalization_invariants_hold_for_out_of_range_weights() {
        let model = UtilityModel::from_parameters(
            vec![vec![3.0, -2.0], vec![-5.0, 4.0]],
            vec![1.0, 2.0],
        )
        .unwrap();
        let outcome = Trainer::default()
            .train(&model, &separable_examples(5))
            .unwrap();
        let trained = outcome.model;
        for issue in 0..2 {
            assert!(
                trained
                    .issue_value_weights(issue)
                    .iter()
                    .all(|w| (0.0..=1.0).contains(w))
            );
        }
        let sum: f64 = trained.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
