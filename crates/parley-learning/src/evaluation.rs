//! Measuring how well the learner recovers a known preference structure.
//!
//! [`HiddenPreferences`] is a randomly drawn linear-additive utility function with
//! an acceptance threshold. It produces labeled examples (accepted iff utility ≥
//! threshold) together with their true utility, which lets us measure both label
//! accuracy and utility error of a trained [`UtilityModel`].

use std::ops::RangeInclusive;

use rand::Rng;
use serde::Serialize;

use crate::{
    model::{DegenerateNormalizationError, UtilityModel},
    trainer::{Trainer, TrainingExample},
};

/// Range of values per generated issue.
const VALUES_PER_ISSUE: RangeInclusive<usize> = 2..=4;
/// Range of generated acceptance thresholds.
const THRESHOLD_RANGE: RangeInclusive<f64> = 0.3..=0.7;
/// Acceptable share of positive training examples for a balanced draw.
const BALANCED_POSITIVE_SHARE: RangeInclusive<f64> = 0.3..=0.7;
const MAX_BALANCE_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct HiddenPreferences {
    value_utilities: Vec<Vec<f64>>,
    weights: Vec<f64>,
    threshold: f64,
}

impl HiddenPreferences {
    /// Draws a random preference structure with an issue count from `issues`.
    ///
    /// # Panics
    ///
    /// Panics if `issues` is empty or starts at zero.
    pub fn random<R>(rng: &mut R, issues: RangeInclusive<usize>) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(*issues.start() > 0 && !issues.is_empty());
        let issue_count = rng.random_range(issues);
        let value_utilities = (0..issue_count)
            .map(|_| {
                let n = rng.random_range(VALUES_PER_ISSUE);
                (0..n).map(|_| rng.random::<f64>()).collect()
            })
            .collect();

        let mut weights: Vec<f64> = (0..issue_count).map(|_| rng.random::<f64>()).collect();
        let sum: f64 = weights.iter().sum();
        if sum > 0.0 {
            for w in &mut weights {
                *w /= sum;
            }
        }

        Self {
            value_utilities,
            weights,
            threshold: rng.random_range(THRESHOLD_RANGE),
        }
    }

    /// Draws preferences until `train_size` examples from them are neither too
    /// positive nor too negative, and returns both.
    pub fn random_balanced<R>(
        rng: &mut R,
        issues: RangeInclusive<usize>,
        train_size: usize,
    ) -> (Self, Vec<TrainingExample>)
    where
        R: Rng + ?Sized,
    {
        let mut attempt = 0;
        loop {
            let hidden = Self::random(rng, issues.clone());
            let examples = hidden.examples(rng, train_size);
            attempt += 1;
            let share = positive_share(&examples);
            if attempt >= MAX_BALANCE_ATTEMPTS || BALANCED_POSITIVE_SHARE.contains(&share) {
                return (hidden, examples);
            }
        }
    }

    /// Value count per issue.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.value_utilities.iter().map(Vec::len).collect()
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn utility(&self, options: &[usize]) -> f64 {
        options
            .iter()
            .enumerate()
            .map(|(i, &v)| self.weights[i] * self.value_utilities[i][v])
            .sum()
    }

    pub fn example<R>(&self, rng: &mut R) -> TrainingExample
    where
        R: Rng + ?Sized,
    {
        let options: Vec<usize> = self
            .value_utilities
            .iter()
            .map(|values| rng.random_range(0..values.len()))
            .collect();
        let utility = self.utility(&options);
        TrainingExample::new(options, utility >= self.threshold).with_actual_utility(utility)
    }

    pub fn examples<R>(&self, rng: &mut R, n: usize) -> Vec<TrainingExample>
    where
        R: Rng + ?Sized,
    {
        (0..n).map(|_| self.example(rng)).collect()
    }
}

#[expect(clippy::cast_precision_loss)]
fn positive_share(examples: &[TrainingExample]) -> f64 {
    if examples.is_empty() {
        return 0.0;
    }
    examples.iter().filter(|e| e.accepted).count() as f64 / examples.len() as f64
}

/// Share of examples whose label the model predicts at a 0.5 decision boundary.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn accuracy(model: &UtilityModel, examples: &[TrainingExample]) -> f64 {
    if examples.is_empty() {
        return 0.0;
    }
    let correct = examples
        .iter()
        .filter(|e| (model.predict(&e.options) - e.target()).abs() < 0.5)
        .count();
    correct as f64 / examples.len() as f64
}

/// Mean absolute difference between prediction and true utility, over the examples
/// that carry one.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean_abs_error(model: &UtilityModel, examples: &[TrainingExample]) -> Option<f64> {
    let errors: Vec<f64> = examples
        .iter()
        .filter_map(|e| {
            e.actual_utility
                .map(|actual| (model.predict(&e.options) - actual).abs())
        })
        .collect();
    if errors.is_empty() {
        return None;
    }
    Some(errors.iter().sum::<f64>() / errors.len() as f64)
}

/// Result of training on one hidden preference structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialReport {
    pub issues: usize,
    pub positive_share: f64,
    pub accuracy: f64,
    pub mean_abs_error: Option<f64>,
}

/// Draws balanced hidden preferences, trains a fresh model on `train_size`
/// examples and evaluates it on `test_size` fresh examples.
pub fn run_trial<R>(
    rng: &mut R,
    trainer: &Trainer,
    issues: RangeInclusive<usize>,
    train_size: usize,
    test_size: usize,
) -> Result<TrialReport, DegenerateNormalizationError>
where
    R: Rng + ?Sized,
{
    let (hidden, train) = HiddenPreferences::random_balanced(rng, issues, train_size);
    let model = UtilityModel::new(&hidden.shape())?;
    let trained = trainer.train(&model, &train)?.model;
    let test = hidden.examples(rng, test_size);

    Ok(TrialReport {
        issues: hidden.shape().len(),
        positive_share: positive_share(&train),
        accuracy: accuracy(&trained, &test),
        mean_abs_error: mean_abs_error(&trained, &test),
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_random_preferences_are_well_formed() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..20 {
            let hidden = HiddenPreferences::random(&mut rng, 2..=9);
            let shape = hidden.shape();
            assert!((2..=9).contains(&shape.len()));
            assert!(shape.iter().all(|n| VALUES_PER_ISSUE.contains(n)));
            assert!((hidden.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert!(THRESHOLD_RANGE.contains(&hidden.threshold()));
        }
    }

    #[test]
    fn test_examples_carry_consistent_labels() {
        let mut rng = Pcg32::seed_from_u64(11);
        let hidden = HiddenPreferences::random(&mut rng, 3..=3);
        for example in hidden.examples(&mut rng, 50) {
            let utility = example.actual_utility.unwrap();
            assert_eq!(utility, hidden.utility(&example.options));
            assert_eq!(example.accepted, utility >= hidden.threshold());
        }
    }

    #[test]
    fn test_accuracy_of_perfect_and_inverted_models() {
        let model = UtilityModel::from_parameters(vec![vec![1.0, 0.0]], vec![1.0]).unwrap();
        let examples = vec![
            TrainingExample::new(vec![0], true).with_actual_utility(1.0),
            TrainingExample::new(vec![1], false).with_actual_utility(0.0),
        ];
        assert_eq!(accuracy(&model, &examples), 1.0);
        assert_eq!(mean_abs_error(&model, &examples), Some(0.0));

        let inverted = UtilityModel::from_parameters(vec![vec![0.0, 1.0]], vec![1.0]).unwrap();
        assert_eq!(accuracy(&inverted, &examples), 0.0);
        assert_eq!(mean_abs_error(&inverted, &[TrainingExample::new(vec![0], true)]), None);
    }

    #[test]
    fn test_trial_on_single_issue_preferences_is_accurate() {
        // one issue: the label depends on a single value, which the model can match
        let mut rng = Pcg32::seed_from_u64(3);
        let trainer = Trainer {
            passes: 30,
            ..Trainer::default()
        };
        let report = run_trial(&mut rng, &trainer, 1..=1, 200, 100).unwrap();
        assert_eq!(report.issues, 1);
        assert!(report.accuracy >= 0.8, "{report:?}");
    }

    fn mean_accuracy(seed: u64, issues: RangeInclusive<usize>, train_size: usize) -> f64 {
        let mut rng = Pcg32::seed_from_u64(seed);
        let trainer = Trainer::default();
        let trials: u32 = 30;
        let mut total = 0.0;
        for _ in 0..trials {
            total += run_trial(&mut rng, &trainer, issues.clone(), train_size, 1000)
                .unwrap()
                .accuracy;
        }
        total / f64::from(trials)
    }

    #[test]
    fn test_average_accuracy_on_two_issue_preferences() {
        let mean = mean_accuracy(2024, 2..=2, 100);
        assert!(mean >= 0.8, "mean accuracy {mean}");
    }

    #[test]
    fn test_average_accuracy_on_small_preferences() {
        let mean = mean_accuracy(2025, 2..=4, 100);
        assert!(mean >= 0.8, "mean accuracy {mean}");
    }

    #[test]
    fn test_average_accuracy_on_random_preferences() {
        let mean = mean_accuracy(2026, 2..=9, 500);
        assert!(mean >= 0.8, "mean accuracy {mean}");
    }
}
