//! Drawing from unnormalized discrete distributions.

use rand::Rng;

/// Draws an index with probability proportional to `weights[index]`.
///
/// Draws a uniform number in `[0, total)` and walks the cumulative sum until it is
/// exceeded. Negative and non-finite weights count as zero. If no weight is positive
/// the draw is uniform over all indices.
///
/// # Panics
///
/// Panics if `weights` is empty.
pub fn draw_from_discrete<R>(rng: &mut R, weights: &[f64]) -> usize
where
    R: Rng + ?Sized,
{
    assert!(!weights.is_empty(), "cannot draw from an empty distribution");

    let mass = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().copied().map(mass).sum();
    if total <= 0.0 || !total.is_finite() {
        return rng.random_range(0..weights.len());
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        let w = mass(w);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = i;
        if target < cumulative {
            return i;
        }
    }
    // rounding can leave `target` just above the final cumulative sum
    last_positive
}
