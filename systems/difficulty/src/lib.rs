#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Difficulty budgets for authored and endless waves.
//!
//! The scaler multiplies a base difficulty by a configured multiplier. The
//! wave table resolves the pre-multiplier budget for any wave: authored waves
//! read their scheduled entry, later waves follow a linear ramp capped at a
//! configurable ceiling.

use formation_defence_core::WaveNumber;
use serde::{Deserialize, Serialize};

/// Multiplier used when no valid multiplier is configured.
pub const DEFAULT_MULTIPLIER: f64 = 1.0;

/// Scales `base` by `multiplier`, rounding to the nearest non-negative integer.
///
/// Non-finite bases are returned unchanged. Invalid multipliers read as
/// [`DEFAULT_MULTIPLIER`].
#[must_use]
pub fn scale_difficulty(base: f64, multiplier: f64) -> f64 {
    if !base.is_finite() {
        return base;
    }
    (base * sanitize_multiplier(multiplier)).max(0.0).round()
}

/// Replaces non-finite or non-positive multipliers with [`DEFAULT_MULTIPLIER`].
#[must_use]
pub fn sanitize_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier > 0.0 {
        multiplier
    } else {
        DEFAULT_MULTIPLIER
    }
}

/// Scales difficulties with a multiplier resolved from a local source and a global fallback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyScaler {
    multiplier: f64,
}

impl DifficultyScaler {
    /// Creates a scaler using the provided multiplier.
    #[must_use]
    pub fn new(multiplier: f64) -> Self {
        Self {
            multiplier: sanitize_multiplier(multiplier),
        }
    }

    /// Resolves the multiplier from `source`, falling back to `global`.
    ///
    /// A missing source defers to the global value; either being invalid ends
    /// at [`DEFAULT_MULTIPLIER`].
    #[must_use]
    pub fn from_sources(source: Option<f64>, global: Option<f64>) -> Self {
        let candidate = source.or(global).unwrap_or(DEFAULT_MULTIPLIER);
        if !(candidate.is_finite() && candidate > 0.0) {
            tracing::warn!(
                multiplier = candidate,
                "invalid difficulty multiplier, using default"
            );
        }
        Self::new(candidate)
    }

    /// Effective multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Scales a base difficulty.
    #[must_use]
    pub fn scale(&self, base: f64) -> f64 {
        scale_difficulty(base, self.multiplier)
    }
}

impl Default for DifficultyScaler {
    fn default() -> Self {
        Self::new(DEFAULT_MULTIPLIER)
    }
}

/// Linear difficulty ramp applied past the authored schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndlessDifficulty {
    /// First wave of the ramp. Defaults to the wave after the schedule.
    pub start_wave: Option<f64>,
    /// Difficulty at the first ramp wave. Defaults to the last scheduled value.
    pub base: Option<f64>,
    /// Difficulty gained per wave. Defaults to zero.
    pub growth: Option<f64>,
    /// Ceiling of the ramp. Unbounded when unset.
    pub max: Option<f64>,
}

/// Resolves the difficulty budget of any wave.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveDifficultyTable {
    schedule: Vec<f64>,
    endless: EndlessDifficulty,
    scaler: DifficultyScaler,
}

impl WaveDifficultyTable {
    /// Creates a table from the authored per-wave schedule, the endless ramp and a scaler.
    #[must_use]
    pub fn new(schedule: Vec<f64>, endless: EndlessDifficulty, scaler: DifficultyScaler) -> Self {
        Self {
            schedule,
            endless,
            scaler,
        }
    }

    /// Authored per-wave difficulties.
    #[must_use]
    pub fn schedule(&self) -> &[f64] {
        &self.schedule
    }

    /// Endless ramp parameters.
    #[must_use]
    pub const fn endless(&self) -> &EndlessDifficulty {
        &self.endless
    }

    /// Scaler applied to every resolved value.
    #[must_use]
    pub const fn scaler(&self) -> DifficultyScaler {
        self.scaler
    }

    /// Resolves the scaled difficulty budget of `wave`.
    #[must_use]
    pub fn resolve(&self, wave: WaveNumber) -> f64 {
        self.scaler.scale(self.resolve_unscaled(wave))
    }

    /// Resolves the difficulty of `wave` before the multiplier is applied.
    #[must_use]
    pub fn resolve_unscaled(&self, wave: WaveNumber) -> f64 {
        if let Some(scheduled) = self.scheduled(wave.index()) {
            return scheduled;
        }

        let last = self
            .schedule
            .len()
            .checked_sub(1)
            .and_then(|index| self.scheduled(index));
        let start_wave = finite(self.endless.start_wave)
            .unwrap_or_else(|| self.schedule.len() as f64 + 1.0);
        let wave = wave.as_f64();
        if wave < start_wave {
            return last.unwrap_or(0.0);
        }

        let base = finite(self.endless.base).or(last).unwrap_or(0.0);
        let growth = finite(self.endless.growth).unwrap_or(0.0);
        let max = finite(self.endless.max).unwrap_or(f64::INFINITY);
        let offset = (wave - start_wave).max(0.0);
        (base + growth * offset).round().max(0.0).min(max)
    }

    fn scheduled(&self, index: usize) -> Option<f64> {
        self.schedule
            .get(index)
            .copied()
            .filter(|value| value.is_finite())
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_base_passes_through() {
        assert!(scale_difficulty(f64::NAN, 2.0).is_nan());
        assert_eq!(scale_difficulty(f64::INFINITY, 2.0), f64::INFINITY);
    }

    #[test]
    fn invalid_multipliers_default_to_one() {
        assert_eq!(scale_difficulty(4.4, 0.0), 4.0);
        assert_eq!(scale_difficulty(4.6, f64::NAN), 5.0);
        assert_eq!(scale_difficulty(-3.0, 2.0), 0.0);
    }

    #[test]
    fn source_multiplier_takes_priority() {
        assert_eq!(DifficultyScaler::from_sources(Some(2.0), Some(3.0)).multiplier(), 2.0);
        assert_eq!(DifficultyScaler::from_sources(None, Some(3.0)).multiplier(), 3.0);
        assert_eq!(DifficultyScaler::from_sources(Some(-1.0), Some(3.0)).multiplier(), 1.0);
        assert_eq!(DifficultyScaler::from_sources(None, None).multiplier(), 1.0);
    }
}
