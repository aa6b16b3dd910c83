//! Per-wave red/blue bias for automatically colored enemies.

use formation_defence_core::{EnemyColor, RandomSource};

/// Minimum gap between the start and end red probability of a wave.
pub const DEFAULT_MIN_COLOR_DIFFERENCE: f64 = 0.35;

const MAX_BIAS_ROLLS: u32 = 64;

/// Red probability drifting linearly from `start` to `end` across a wave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorBias {
    start: f64,
    end: f64,
}

impl ColorBias {
    /// Creates a bias from explicit endpoints.
    #[must_use]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Even odds for the whole wave.
    #[must_use]
    pub const fn neutral() -> Self {
        Self::new(0.5, 0.5)
    }

    /// Rolls endpoints until they differ by more than `min_difference`.
    ///
    /// After a bounded number of rerolls the end point is pushed to the far
    /// side of the start point instead.
    pub fn roll<R>(random: &mut R, min_difference: f64) -> Self
    where
        R: RandomSource + ?Sized,
    {
        let mut start = 0.5;
        for _ in 0..MAX_BIAS_ROLLS {
            start = random.next_unit();
            let end = random.next_unit();
            if (start - end).abs() > min_difference {
                return Self::new(start, end);
            }
        }
        let end = if start < 0.5 { 1.0 } else { 0.0 };
        Self::new(start, end)
    }

    /// Red probability at the first spawn.
    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// Red probability at the last spawn.
    #[must_use]
    pub const fn end(&self) -> f64 {
        self.end
    }

    /// Red probability after `spawned` of `expected` spawns.
    #[must_use]
    pub fn red_probability(&self, spawned: u32, expected: u32) -> f64 {
        let denominator = f64::from(expected) - 1.0;
        let progress = if denominator > 0.0 {
            f64::from(spawned) / denominator
        } else {
            1.0
        };
        self.start + (self.end - self.start) * progress
    }

    /// Draws the color of the next automatically colored enemy.
    pub fn resolve_color<R>(&self, spawned: u32, expected: u32, random: &mut R) -> EnemyColor
    where
        R: RandomSource + ?Sized,
    {
        if random.next_unit() < self.red_probability(spawned, expected) {
            EnemyColor::red()
        } else {
            EnemyColor::blue()
        }
    }
}

impl Default for ColorBias {
    fn default() -> Self {
        Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use formation_defence_core::SequenceRandom;

    use super::*;

    #[test]
    fn interpolates_across_the_wave() {
        let bias = ColorBias::new(0.2, 0.8);
        let mut random = SequenceRandom::new(vec![0.1, 0.5, 0.55, 0.9]);
        let colors: Vec<_> = (0..4)
            .map(|spawned| bias.resolve_color(spawned, 4, &mut random))
            .collect();
        assert_eq!(
            colors,
            vec![EnemyColor::red(), EnemyColor::blue(), EnemyColor::red(), EnemyColor::blue()]
        );
    }

    #[test]
    fn single_spawn_waves_use_end_probability() {
        let bias = ColorBias::new(0.0, 1.0);
        assert_eq!(bias.red_probability(0, 1), 1.0);
        assert_eq!(bias.red_probability(0, 0), 1.0);
    }

    #[test]
    fn rerolls_until_endpoints_separate() {
        let mut random = SequenceRandom::new(vec![0.4, 0.5, 0.3, 0.9]);
        let bias = ColorBias::roll(&mut random, DEFAULT_MIN_COLOR_DIFFERENCE);
        assert_eq!(bias, ColorBias::new(0.3, 0.9));
        assert_eq!(random.draws(), 4);
    }

    #[test]
    fn forces_separation_when_rolls_never_separate() {
        let mut random = SequenceRandom::constant(0.2);
        let bias = ColorBias::roll(&mut random, DEFAULT_MIN_COLOR_DIFFERENCE);
        assert_eq!(bias, ColorBias::new(0.2, 1.0));
    }
}
