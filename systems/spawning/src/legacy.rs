//! Fixed-interval wave table used when no formation plan exists.

use formation_defence_core::WaveNumber;
use serde::{Deserialize, Serialize};

/// Cadence and size of one fixed-interval wave.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyWaveConfig {
    /// Seconds between spawn calls.
    pub interval: f64,
    /// Number of spawn calls in the wave.
    pub cycles: u32,
    /// Number of spawn calls that produce a tank.
    #[serde(default)]
    pub tanks_count: u32,
}

/// Growth applied to waves past the end of the table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyEndless {
    /// Interval multiplier per extra wave.
    pub interval_factor: f64,
    /// Lower bound of the interval.
    pub min_interval: f64,
    /// Spawn calls added per extra wave.
    pub cycles_increment: u32,
    /// Tanks added per extra wave.
    pub tanks_increment: u32,
}

/// Authored fixed-interval waves with an optional endless extension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegacyWaveTable {
    schedule: Vec<LegacyWaveConfig>,
    endless: Option<LegacyEndless>,
}

impl LegacyWaveTable {
    /// Creates a table.
    #[must_use]
    pub fn new(schedule: Vec<LegacyWaveConfig>, endless: Option<LegacyEndless>) -> Self {
        Self { schedule, endless }
    }

    /// Authored waves.
    #[must_use]
    pub fn schedule(&self) -> &[LegacyWaveConfig] {
        &self.schedule
    }

    /// Endless extension, if any.
    #[must_use]
    pub const fn endless(&self) -> Option<&LegacyEndless> {
        self.endless.as_ref()
    }

    /// Configuration of `wave`, or `None` when the table is empty.
    #[must_use]
    pub fn config_for_wave(&self, wave: WaveNumber) -> Option<LegacyWaveConfig> {
        if let Some(config) = self.schedule.get(wave.index()) {
            return Some(*config);
        }
        let last = *self.schedule.last()?;
        let Some(endless) = self.endless else {
            return Some(last);
        };

        let extra = wave.get() - self.schedule.len() as u32;
        let exponent = i32::try_from(extra).unwrap_or(i32::MAX);
        let interval =
            (last.interval * endless.interval_factor.powi(exponent)).max(endless.min_interval);
        let cycles = last
            .cycles
            .saturating_add(endless.cycles_increment.saturating_mul(extra));
        let tanks_count = last
            .tanks_count
            .saturating_add(endless.tanks_increment.saturating_mul(extra))
            .min(cycles);
        Some(LegacyWaveConfig {
            interval,
            cycles,
            tanks_count,
        })
    }
}
