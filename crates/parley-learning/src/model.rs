//! Differentiable linear-additive utility model.
//!
//! The model holds, per issue `i` with `nᵢ` values, a value-weight vector `wᵢ`, and
//! one importance vector `g` over issues. For a complete option vector `x`:
//!
//! ```text
//! cᵢ = clip(wᵢ[xᵢ], 0, 1)          (gradient preserving)
//! ĝᵢ = gᵢ / Σⱼ gⱼ
//! p  = Σᵢ ĝᵢ · cᵢ
//! L  = elu((t - p)²)
//! ```
//!
//! Gradients are derived in closed form:
//!
//! ```text
//! ∂L/∂p        = elu'((t - p)²) · -2(t - p)
//! ∂L/∂wᵢ[xᵢ]   = ∂L/∂p · ĝᵢ              (clip passes the gradient through)
//! ∂L/∂gⱼ       = ∂L/∂p · (cⱼ - p) / Σg
//! ```
//!
//! # Clipping
//!
//! A plain clamp has zero gradient outside its range, which would freeze any weight
//! that overshoots. [`clip_preserving_gradient`] clamps in the forward pass only; the
//! backward pass treats it as the identity.
//!
//! # Normalization
//!
//! Importances are normalized by their sum without clipping. The model keeps the
//! invariant `|Σg| ≥ MIN_IMPORTANCE_SUM`: construction and every update check it and
//! report [`DegenerateNormalizationError`] instead of dividing by (near) zero.

use std::iter;

/// Smallest admissible absolute sum of the issue importances.
pub const MIN_IMPORTANCE_SUM: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("issue importances sum to {sum}, normalization is undefined")]
pub struct DegenerateNormalizationError {
    pub sum: f64,
}

/// Initial parameter values of a fresh model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInit {
    /// Initial weight of every value (a neutral utility)
    pub value_weight: f64,
    /// Initial importance of every issue (a uniform prior)
    pub issue_weight: f64,
}

impl Default for ModelInit {
    fn default() -> Self {
        Self {
            value_weight: 0.5,
            issue_weight: 1.0,
        }
    }
}

/// Clamps `x` to `[lo, hi]` in the forward pass.
///
/// In the backward pass this operation is the identity: the gradient with respect
/// to `x` is the incoming gradient, whether or not `x` was clamped. Equivalent to
/// `x + stop_gradient(clamp(x, lo, hi) - x)`.
#[must_use]
pub fn clip_preserving_gradient(x: f64, lo: f64, hi: f64) -> f64 {
    x.clamp(lo, hi)
}

/// Exponential linear unit.
#[must_use]
pub fn elu(x: f64) -> f64 {
    if x > 0.0 { x } else { x.exp_m1() }
}

fn elu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { x.exp() }
}

/// Gradient of the loss of one example with respect to every parameter.
///
/// Only one value weight per issue (the selected one) has a nonzero gradient, so
/// value gradients are stored sparsely as `(value_index, gradient)` per issue.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub value_weights: Vec<(usize, f64)>,
    pub importance: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UtilityModel {
    value_weights: Vec<Vec<f64>>,
    importance: Vec<f64>,
}

impl UtilityModel {
    /// Creates a model for a domain with the given shape (value count per issue),
    /// using the default initialization.
    pub fn new(shape: &[usize]) -> Result<Self, DegenerateNormalizationError> {
        Self::with_init(shape, ModelInit::default())
    }

    pub fn with_init(shape: &[usize], init: ModelInit) -> Result<Self, DegenerateNormalizationError> {
        let model = Self {
            value_weights: shape.iter().map(|&n| vec![init.value_weight; n]).collect(),
            importance: vec![init.issue_weight; shape.len()],
        };
        model.check_normalizable()?;
        Ok(model)
    }

    /// Builds a model from explicit raw parameters.
    pub fn from_parameters(
        value_weights: Vec<Vec<f64>>,
        importance: Vec<f64>,
    ) -> Result<Self, DegenerateNormalizationError> {
        assert_eq!(
            value_weights.len(),
            importance.len(),
            "one importance per issue is required"
        );
        let model = Self {
            value_weights,
            importance,
        };
        model.check_normalizable()?;
        Ok(model)
    }

    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.importance.len()
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.value_weights.iter().map(Vec::len).collect()
    }

    fn importance_sum(&self) -> f64 {
        self.importance.iter().sum()
    }

    fn check_normalizable(&self) -> Result<(), DegenerateNormalizationError> {
        let sum = self.importance_sum();
        if sum.is_finite() && sum.abs() >= MIN_IMPORTANCE_SUM {
            Ok(())
        } else {
            Err(DegenerateNormalizationError { sum })
        }
    }

    /// Normalized issue importances. They sum to one.
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        let sum = self.importance_sum();
        self.importance.iter().map(|g| g / sum).collect()
    }

    /// Normalized importance of one issue.
    #[must_use]
    pub fn weight(&self, issue_index: usize) -> f64 {
        self.importance[issue_index] / self.importance_sum()
    }

    /// Clipped weight of one value, in `[0, 1]`.
    #[must_use]
    pub fn value_weight(&self, issue_index: usize, value_index: usize) -> f64 {
        clip_preserving_gradient(self.value_weights[issue_index][value_index], 0.0, 1.0)
    }

    /// Clipped value weights of one issue, each in `[0, 1]`.
    #[must_use]
    pub fn issue_value_weights(&self, issue_index: usize) -> Vec<f64> {
        self.value_weights[issue_index]
            .iter()
            .map(|&w| clip_preserving_gradient(w, 0.0, 1.0))
            .collect()
    }

    /// Unclipped value weights of one issue.
    #[must_use]
    pub fn raw_value_weights(&self, issue_index: usize) -> &[f64] {
        &self.value_weights[issue_index]
    }

    #[must_use]
    pub fn raw_importance(&self) -> &[f64] {
        &self.importance
    }

    fn selected(&self, options: &[usize]) -> Vec<f64> {
        assert_eq!(
            options.len(),
            self.issue_count(),
            "option vector must have one slot per issue"
        );
        iter::zip(&self.value_weights, options)
            .map(|(weights, &option)| clip_preserving_gradient(weights[option], 0.0, 1.0))
            .collect()
    }

    /// Predicted utility (acceptance probability) of a complete option vector.
    #[must_use]
    pub fn predict(&self, options: &[usize]) -> f64 {
        let selected = self.selected(options);
        iter::zip(self.weights(), selected).map(|(g, c)| g * c).sum()
    }

    /// Loss of the prediction for `options` against `target`.
    #[must_use]
    pub fn loss(&self, options: &[usize], target: f64) -> f64 {
        let error = target - self.predict(options);
        elu(error * error)
    }

    /// Computes the loss and its gradient for one example.
    #[must_use]
    pub fn gradient(&self, options: &[usize], target: f64) -> (f64, Gradient) {
        let selected = self.selected(options);
        let sum = self.importance_sum();
        let weights = self.weights();
        let prediction: f64 = iter::zip(&weights, &selected).map(|(g, c)| g * c).sum();

        let error = target - prediction;
        let squared = error * error;
        let d_prediction = elu_derivative(squared) * -2.0 * error;

        let value_weights = iter::zip(options, &weights)
            .map(|(&option, g)| (option, d_prediction * g))
            .collect();
        let importance = selected
            .iter()
            .map(|c| d_prediction * (c - prediction) / sum)
            .collect();

        (
            elu(squared),
            Gradient {
                value_weights,
                importance,
            },
        )
    }

    /// Applies one gradient-descent step.
    ///
    /// If the step would make the importances non-normalizable, the model is left
    /// untouched and an error is returned.
    pub fn apply_gradient(
        &mut self,
        gradient: &Gradient,
        learning_rate: f64,
    ) -> Result<(), DegenerateNormalizationError> {
        let importance: Vec<f64> = iter::zip(&self.importance, &gradient.importance)
            .map(|(g, d)| g - learning_rate * d)
            .collect();
        let sum: f64 = importance.iter().sum();
        if !sum.is_finite() || sum.abs() < MIN_IMPORTANCE_SUM {
            return Err(DegenerateNormalizationError { sum });
        }

        self.importance = importance;
        for (weights, &(option, d)) in iter::zip(&mut self.value_weights, &gradient.value_weights) {
            weights[option] -= learning_rate * d;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_fresh_model_predicts_neutral_utility() {
        let model = UtilityModel::new(&[2, 3]).unwrap();
        assert_eq!(model.weights(), vec![0.5, 0.5]);
        assert_eq!(model.issue_value_weights(1), vec![0.5, 0.5, 0.5]);
        assert!((model.predict(&[0, 2]) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_rejects_degenerate_importances() {
        assert!(UtilityModel::new(&[]).is_err());
        let init = ModelInit {
            value_weight: 0.5,
            issue_weight: 0.0,
        };
        assert!(UtilityModel::with_init(&[2], init).is_err());
        assert!(UtilityModel::from_parameters(vec![vec![0.5], vec![0.5]], vec![1.0, -1.0]).is_err());
    }

    #[test]
    fn test_clip_bounds_forward_value() {
        let model =
            UtilityModel::from_parameters(vec![vec![-0.3, 1.7], vec![0.2]], vec![1.0, 1.0]).unwrap();
        assert_eq!(model.issue_value_weights(0), vec![0.0, 1.0]);
        assert!((model.predict(&[1, 0]) - 0.6).abs() < EPS);
    }

    #[test]
    fn test_single_entries_match_full_vectors() {
        let model =
            UtilityModel::from_parameters(vec![vec![-0.3, 1.7], vec![0.2]], vec![1.0, 3.0]).unwrap();
        for (i, weight) in model.weights().into_iter().enumerate() {
            assert!((model.weight(i) - weight).abs() < EPS);
            for (v, value_weight) in model.issue_value_weights(i).into_iter().enumerate() {
                assert_eq!(model.value_weight(i, v), value_weight);
            }
        }
        assert!((model.weight(1) - 0.75).abs() < EPS);
    }

    #[test]
    fn test_clipped_weight_still_receives_gradient() {
        let model =
            UtilityModel::from_parameters(vec![vec![1.5], vec![0.5]], vec![1.0, 1.0]).unwrap();
        // target 0 pushes the prediction down; the out-of-range weight must move
        let (_, gradient) = model.gradient(&[0, 0], 0.0);
        assert!(gradient.value_weights[0].1 > 0.0);

        let mut updated = model.clone();
        updated.apply_gradient(&gradient, 0.1).unwrap();
        assert!(updated.raw_value_weights(0)[0] < 1.5);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let model = UtilityModel::from_parameters(
            vec![vec![0.3, 0.8], vec![0.6, 0.1, 0.9]],
            vec![0.7, 1.4],
        )
        .unwrap();
        let options = [1, 2];
        let target = 0.0;
        let (_, gradient) = model.gradient(&options, target);
        let h = 1e-6;

        for issue in 0..2 {
            let mut values = vec![model.value_weights[0].clone(), model.value_weights[1].clone()];
            values[issue][options[issue]] += h;
            let plus = UtilityModel::from_parameters(values, model.importance.clone()).unwrap();
            let numeric = (plus.loss(&options, target) - model.loss(&options, target)) / h;
            assert!((numeric - gradient.value_weights[issue].1).abs() < 1e-4);

            let mut importance = model.importance.clone();
            importance[issue] += h;
            let plus =
                UtilityModel::from_parameters(model.value_weights.clone(), importance).unwrap();
            let numeric = (plus.loss(&options, target) - model.loss(&options, target)) / h;
            assert!((numeric - gradient.importance[issue]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_step_refuses_to_collapse_importances() {
        let mut model =
            UtilityModel::from_parameters(vec![vec![0.5], vec![0.5]], vec![0.5, 0.5]).unwrap();
        let gradient = Gradient {
            value_weights: vec![(0, 0.0), (0, 0.0)],
            importance: vec![1.0, 1.0],
        };
        let before = model.clone();
        assert!(model.apply_gradient(&gradient, 0.5).is_err());
        assert_eq!(model, before);
    }

    #[test]
    fn test_elu() {
        assert_eq!(elu(0.25), 0.25);
        assert_eq!(elu(0.0), 0.0);
        assert!(elu(-1.0) > -1.0 && elu(-1.0) < 0.0);
    }
}
