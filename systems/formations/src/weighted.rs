//! Cumulative-weight inversion sampling.

use formation_defence_core::RandomSource;

/// Picks one of `items` with probability proportional to its weight.
///
/// Negative and non-finite weights count as zero. When every weight is zero
/// the pick is uniform. Returns `None` only when `items` is empty. Weights
/// missing for trailing items count as zero.
pub fn weighted_random_choice<'a, T, R>(
    items: &'a [T],
    weights: &[f64],
    random: &mut R,
) -> Option<&'a T>
where
    R: RandomSource + ?Sized,
{
    if items.is_empty() {
        return None;
    }

    let weight_at = |index: usize| weights.get(index).copied().map_or(0.0, usable_weight);
    let total: f64 = (0..items.len()).map(weight_at).sum();
    if total <= 0.0 {
        let index = (random.next_unit() * items.len() as f64).floor() as usize;
        return items.get(index.min(items.len() - 1));
    }

    let mut roll = random.next_unit() * total;
    for (index, item) in items.iter().enumerate() {
        roll -= weight_at(index);
        if roll <= 0.0 {
            return Some(item);
        }
    }
    items.last()
}

fn usable_weight(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.max(0.0)
    } else {
        0.0
    }
}
