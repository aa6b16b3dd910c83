#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! TOML configuration and bundled balance content.
//!
//! A [`GameConfig`] gathers everything the wave subsystem is tuned by: the
//! formation definitions, the difficulty tables, the fixed-interval fallback
//! waves and spawn placement. Every key is optional and falls back to the
//! built-in defaults; the game's own balance data ships as
//! [`GameConfig::bundled`].

mod error;

use std::{collections::BTreeMap, fs, path::Path};

use formation_defence_core::{EnemyType, SpawnPoint};
use formation_defence_system_difficulty::{DifficultyScaler, EndlessDifficulty, WaveDifficultyTable};
use formation_defence_system_formations::{
    FormationDefaults, FormationManager, FormationManagerConfig, PlanOptions,
    DEFAULT_FORMATION_GAP, DEFAULT_ITERATION_LIMIT,
};
use formation_defence_system_spawning::{
    Config as SpawningConfig, LegacyEndless, LegacyWaveConfig, LegacyWaveTable, SpawnLayout,
    DEFAULT_GROUP_SPACING, DEFAULT_MIN_COLOR_DIFFERENCE, DEFAULT_SPAWN_POINT,
    DEFAULT_SWARM_GROUP_SIZE,
};
use formation_defence_system_waves::Config as DirectorConfig;
use serde::{Deserialize, Serialize};

pub use error::ConfigError;

const BUNDLED: &str = include_str!("../assets/balance.toml");

/// Complete tuning of the wave subsystem.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Global difficulty multiplier, used when the formation section sets none.
    pub difficulty_multiplier: Option<f64>,
    /// Session seed. A fresh seed is drawn when unset.
    pub seed: Option<u64>,
    /// Formation content and difficulty budgets.
    pub formations: FormationsSection,
    /// Fixed-interval fallback waves.
    pub legacy: LegacySection,
    /// Spawn placement.
    pub spawn: SpawnSection,
    /// Automatic color selection.
    pub color: ColorSection,
}

/// `[formations]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormationsSection {
    /// Formation text in the definition format.
    pub definitions: String,
    /// Authored difficulty budget per wave, wave one first.
    pub wave_difficulty: Vec<f64>,
    /// Multiplier applied to every budget. Overrides the global multiplier.
    pub difficulty_multiplier: Option<f64>,
    /// Ramp applied past the authored budgets.
    pub endless_difficulty: EndlessDifficulty,
    /// Values applied to formations that leave them unspecified.
    pub defaults: FormationDefaultsSection,
    /// Maximum formation selections per wave.
    pub iteration_limit: u32,
}

impl Default for FormationsSection {
    fn default() -> Self {
        Self {
            definitions: String::new(),
            wave_difficulty: Vec::new(),
            difficulty_multiplier: None,
            endless_difficulty: EndlessDifficulty::default(),
            defaults: FormationDefaultsSection::default(),
            iteration_limit: DEFAULT_ITERATION_LIMIT,
        }
    }
}

/// `[formations.defaults]` table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormationDefaultsSection {
    /// Seconds inserted after formations without their own gap.
    pub formation_gap: f64,
    /// Weight of formations whose probability cannot be evaluated.
    pub minimum_weight: f64,
}

impl Default for FormationDefaultsSection {
    fn default() -> Self {
        Self {
            formation_gap: DEFAULT_FORMATION_GAP,
            minimum_weight: 0.0,
        }
    }
}

/// `[legacy]` table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacySection {
    /// Authored fixed-interval waves, wave one first.
    pub schedule: Vec<LegacyWaveConfig>,
    /// Growth past the end of the schedule.
    pub endless: Option<LegacyEndless>,
}

/// `[spawn]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnSection {
    /// Horizontal spawn position of types without their own point.
    pub default_x: f64,
    /// Vertical spawn position of types without their own point.
    pub default_y: f64,
    /// Gap between clustered members.
    pub group_spacing: f64,
    /// Enemies produced by one fixed-interval swarm spawn.
    pub swarm_group_size: u32,
    /// Dedicated spawn points keyed by enemy type.
    pub positions: BTreeMap<String, PointSection>,
}

impl Default for SpawnSection {
    fn default() -> Self {
        Self {
            default_x: DEFAULT_SPAWN_POINT.x,
            default_y: DEFAULT_SPAWN_POINT.y,
            group_spacing: DEFAULT_GROUP_SPACING,
            swarm_group_size: DEFAULT_SWARM_GROUP_SIZE,
            positions: BTreeMap::new(),
        }
    }
}

/// A point in a `[spawn.positions]` entry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointSection {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// `[color]` table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorSection {
    /// Minimum separation of a wave's start and end red probability.
    pub min_difference: f64,
}

impl Default for ColorSection {
    fn default() -> Self {
        Self {
            min_difference: DEFAULT_MIN_COLOR_DIFFERENCE,
        }
    }
}

impl GameConfig {
    /// The game's shipped balance data.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUNDLED)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the TOML document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Rejects values the runtime cannot work with.
    ///
    /// Difficulty multipliers are not checked here; invalid ones fall back to
    /// the neutral multiplier when the difficulty table is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let defaults = &self.formations.defaults;
        ensure(
            defaults.formation_gap.is_finite() && defaults.formation_gap >= 0.0,
            "formations.defaults.formation_gap",
            "must be a finite, non-negative number of seconds",
        )?;
        ensure(
            defaults.minimum_weight.is_finite() && defaults.minimum_weight >= 0.0,
            "formations.defaults.minimum_weight",
            "must be a finite, non-negative weight",
        )?;

        for (index, wave) in self.legacy.schedule.iter().enumerate() {
            ensure(
                wave.interval.is_finite() && wave.interval > 0.0,
                &format!("legacy.schedule[{index}].interval"),
                "must be a finite, positive number of seconds",
            )?;
            ensure(
                wave.cycles >= 1,
                &format!("legacy.schedule[{index}].cycles"),
                "must be at least 1",
            )?;
        }
        if let Some(endless) = &self.legacy.endless {
            ensure(
                endless.interval_factor.is_finite() && endless.interval_factor > 0.0,
                "legacy.endless.interval_factor",
                "must be a finite, positive factor",
            )?;
            ensure(
                endless.min_interval.is_finite() && endless.min_interval > 0.0,
                "legacy.endless.min_interval",
                "must be a finite, positive number of seconds",
            )?;
        }

        let spawn = &self.spawn;
        ensure(
            spawn.default_x.is_finite() && spawn.default_y.is_finite(),
            "spawn.default_x",
            "spawn coordinates must be finite",
        )?;
        ensure(
            spawn.group_spacing.is_finite(),
            "spawn.group_spacing",
            "must be finite",
        )?;
        ensure(
            spawn.swarm_group_size >= 1,
            "spawn.swarm_group_size",
            "must be at least 1",
        )?;
        for (name, point) in &spawn.positions {
            ensure(
                point.x.is_finite() && point.y.is_finite(),
                &format!("spawn.positions.{name}"),
                "spawn coordinates must be finite",
            )?;
        }

        ensure(
            (0.0..1.0).contains(&self.color.min_difference),
            "color.min_difference",
            "must lie in [0, 1)",
        )
    }

    /// Resolves the wave budgets, with the formation multiplier taking
    /// precedence over the global one.
    #[must_use]
    pub fn difficulty_table(&self) -> WaveDifficultyTable {
        let scaler = DifficultyScaler::from_sources(
            self.formations.difficulty_multiplier,
            self.difficulty_multiplier,
        );
        WaveDifficultyTable::new(
            self.formations.wave_difficulty.clone(),
            self.formations.endless_difficulty,
            scaler,
        )
    }

    /// Formation sources for a [`FormationManager`].
    #[must_use]
    pub fn formation_manager_config(&self) -> FormationManagerConfig {
        FormationManagerConfig {
            definitions: self.formations.definitions.clone(),
            formations: Vec::new(),
            defaults: FormationDefaults {
                formation_gap: self.formations.defaults.formation_gap,
                minimum_weight: self.formations.defaults.minimum_weight,
            },
        }
    }

    /// Builds the formation manager, or `None` when no formation is defined.
    #[must_use]
    pub fn formation_manager(&self) -> Option<FormationManager> {
        FormationManager::new(self.formation_manager_config(), self.difficulty_table())
    }

    /// Planner options derived from the formation section.
    #[must_use]
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            total_difficulty: None,
            iteration_limit: self.formations.iteration_limit,
        }
    }

    /// Fixed-interval fallback table.
    #[must_use]
    pub fn legacy_table(&self) -> LegacyWaveTable {
        LegacyWaveTable::new(self.legacy.schedule.clone(), self.legacy.endless)
    }

    /// Spawn points and group spacing.
    #[must_use]
    pub fn spawn_layout(&self) -> SpawnLayout {
        let default_point = SpawnPoint::new(self.spawn.default_x, self.spawn.default_y);
        self.spawn.positions.iter().fold(
            SpawnLayout::new(default_point, self.spawn.group_spacing),
            |layout, (name, point)| {
                layout.with_type_point(EnemyType::new(name), SpawnPoint::new(point.x, point.y))
            },
        )
    }

    /// Spawning system configuration.
    #[must_use]
    pub fn spawning_config(&self) -> SpawningConfig {
        SpawningConfig::new(self.spawn_layout()).with_swarm_group_size(self.spawn.swarm_group_size)
    }

    /// Wave director configuration. The configured seed wins over `fallback_seed`.
    #[must_use]
    pub fn director_config(&self, fallback_seed: u64) -> DirectorConfig {
        DirectorConfig {
            seed: self.seed.unwrap_or(fallback_seed),
            min_color_difference: self.color.min_difference,
            legacy: self.legacy_table(),
            spawning: self.spawning_config(),
            plan_options: self.plan_options(),
        }
    }
}

fn ensure(condition: bool, field: &str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        field: field.to_owned(),
        reason: reason.to_owned(),
    })
}
