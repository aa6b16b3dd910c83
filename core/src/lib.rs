#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Formation Defence wave subsystem.
//!
//! This crate defines the data that flows between the pure systems. Authored
//! [`Formation`] records are parsed once at load time and shared immutably.
//! The planner spends a wave's difficulty budget on formations and lays their
//! ships out as a time-ordered [`WavePlan`]. The spawn scheduler consumes the
//! plan's [`SpawnEvent`] values tick by tick and answers with [`Command`]
//! values for the enemy factory, while the wave controller broadcasts
//! [`Event`] values describing wave lifecycle transitions.

pub mod random;

use std::{cmp::Ordering, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

pub use random::{RandomSource, RngSource, SequenceRandom};

/// One-based index of a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32")]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// The opening wave.
    pub const FIRST: Self = Self(1);

    /// Creates a wave number, promoting zero to the first wave.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value == 0 {
            Self::FIRST
        } else {
            Self(value)
        }
    }

    /// Retrieves the one-based wave number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Zero-based index of the wave inside authored per-wave tables.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0.saturating_sub(1) as usize
    }

    /// Wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Numeric value used by difficulty curves and probability expressions.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl From<u32> for WaveNumber {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl Default for WaveNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for WaveNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slug identifying a formation.
///
/// Ordering is lexicographic and is used to break ties between spawn events
/// scheduled for the same instant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormationId(String);

impl FormationId {
    /// Wraps the provided slug.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrowed form of the slug.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercased, free-form enemy type tag such as `swarm` or `tank`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyType(String);

impl EnemyType {
    const SWARM: &'static str = "swarm";
    const TANK: &'static str = "tank";

    /// Creates a type tag, trimming and lowercasing the input.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self(tag.trim().to_lowercase())
    }

    /// The common, lightweight enemy variant.
    #[must_use]
    pub fn swarm() -> Self {
        Self(Self::SWARM.to_owned())
    }

    /// The heavier enemy variant.
    #[must_use]
    pub fn tank() -> Self {
        Self(Self::TANK.to_owned())
    }

    /// Reports whether this is the heavy variant.
    #[must_use]
    pub fn is_tank(&self) -> bool {
        self.0 == Self::TANK
    }

    /// Borrowed form of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnemyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercased color tag assigned to an enemy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyColor(String);

impl EnemyColor {
    const RED: &'static str = "red";
    const BLUE: &'static str = "blue";

    /// Creates a color tag, trimming and lowercasing the input.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self(tag.trim().to_lowercase())
    }

    /// Parses an authored color tag.
    ///
    /// Empty tags and the tokens `auto` and `random` mean "pick at spawn time"
    /// and yield `None`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let color = Self::new(tag);
        match color.as_str() {
            "" | "auto" | "random" => None,
            _ => Some(color),
        }
    }

    /// Red enemies.
    #[must_use]
    pub fn red() -> Self {
        Self(Self::RED.to_owned())
    }

    /// Blue enemies.
    #[must_use]
    pub fn blue() -> Self {
        Self(Self::BLUE.to_owned())
    }

    /// Borrowed form of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnemyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One enemy line inside a formation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipDescriptor {
    /// Type of enemy to spawn.
    pub enemy_type: EnemyType,
    /// Seconds after the formation starts at which the ship spawns.
    pub time: f64,
    /// Horizontal spawn position override.
    pub x: Option<f64>,
    /// Vertical spawn position override.
    pub y: Option<f64>,
    /// Fixed color, or `None` to pick automatically at spawn time.
    pub color: Option<EnemyColor>,
    /// Number of clustered enemies this line expands into.
    pub group_size: u32,
    /// Gap between clustered members.
    pub spacing: Option<f64>,
    /// Manual per-member placement offsets.
    pub offsets: Vec<f64>,
    /// Explicit per-member colors.
    pub colors: Vec<EnemyColor>,
}

impl ShipDescriptor {
    /// Creates a single-enemy descriptor spawning at the formation start.
    #[must_use]
    pub fn new(enemy_type: EnemyType) -> Self {
        Self {
            enemy_type,
            time: 0.0,
            x: None,
            y: None,
            color: None,
            group_size: 1,
            spacing: None,
            offsets: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Sanitises numeric fields so the descriptor upholds its invariants.
    ///
    /// Times become finite and non-negative, group sizes at least one, and
    /// non-finite optional numbers are dropped.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.time = if self.time.is_finite() {
            self.time.max(0.0)
        } else {
            0.0
        };
        self.x = self.x.filter(|value| value.is_finite());
        self.y = self.y.filter(|value| value.is_finite());
        self.spacing = self.spacing.filter(|value| value.is_finite());
        self.group_size = self.group_size.max(1);
        for offset in &mut self.offsets {
            if !offset.is_finite() {
                *offset = 0.0;
            }
        }
        self
    }
}

type WeightCallback = dyn Fn(WaveNumber, &Formation) -> f64 + Send + Sync;

/// Selection weight of a formation as a function of the wave.
#[derive(Clone)]
pub struct WeightFn(Arc<WeightCallback>);

impl WeightFn {
    /// Wraps an arbitrary weight function.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(WaveNumber, &Formation) -> f64 + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Weight that ignores its inputs.
    #[must_use]
    pub fn constant(weight: f64) -> Self {
        Self::new(move |_, _| weight)
    }

    /// Evaluates the weight for `formation` at `wave`.
    #[must_use]
    pub fn weight(&self, wave: WaveNumber, formation: &Formation) -> f64 {
        (self.0)(wave, formation)
    }
}

impl Default for WeightFn {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

impl fmt::Debug for WeightFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeightFn(..)")
    }
}

/// Raw ingredients of a formation prior to finalisation.
#[derive(Clone, Debug)]
pub struct FormationParts {
    /// Identifier of the formation.
    pub id: FormationId,
    /// Display label as authored.
    pub label: String,
    /// Authored difficulty; missing or non-positive values fall back to the ship count.
    pub difficulty: Option<f64>,
    /// Selection weight.
    pub probability: WeightFn,
    /// Ordered ship descriptors.
    pub ships: Vec<ShipDescriptor>,
    /// Spacing override after the formation, in seconds.
    pub gap: Option<f64>,
    /// Authored first eligible wave.
    pub min_wave: Option<f64>,
}

/// Immutable, authored cluster of enemies with relative spawn timing.
#[derive(Clone, Debug)]
pub struct Formation {
    id: FormationId,
    label: String,
    difficulty: f64,
    probability: WeightFn,
    ships: Vec<ShipDescriptor>,
    duration: f64,
    gap: Option<f64>,
    min_wave: WaveNumber,
}

impl Formation {
    /// Finalises a formation, returning `None` when it has no ships.
    #[must_use]
    pub fn new(parts: FormationParts) -> Option<Self> {
        if parts.ships.is_empty() {
            return None;
        }

        let ships: Vec<ShipDescriptor> = parts
            .ships
            .into_iter()
            .map(ShipDescriptor::normalized)
            .collect();
        let duration = ships.iter().fold(0.0_f64, |max, ship| max.max(ship.time));
        let difficulty = match parts.difficulty {
            Some(value) if value.is_finite() && value > 0.0 => value,
            _ => ships.len() as f64,
        };
        let min_wave = match parts.min_wave {
            Some(value) if value.is_finite() => {
                WaveNumber::new(value.floor().clamp(1.0, f64::from(u32::MAX)) as u32)
            }
            _ => WaveNumber::FIRST,
        };

        Some(Self {
            id: parts.id,
            label: parts.label,
            difficulty,
            probability: parts.probability,
            ships,
            duration,
            gap: parts.gap.filter(|gap| gap.is_finite()),
            min_wave,
        })
    }

    /// Identifier of the formation.
    #[must_use]
    pub fn id(&self) -> &FormationId {
        &self.id
    }

    /// Display label as authored.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Budget consumed when the formation is selected. Always positive.
    #[must_use]
    pub const fn difficulty(&self) -> f64 {
        self.difficulty
    }

    /// Ordered ship descriptors. Never empty.
    #[must_use]
    pub fn ships(&self) -> &[ShipDescriptor] {
        &self.ships
    }

    /// Largest ship time offset.
    #[must_use]
    pub const fn duration(&self) -> f64 {
        self.duration
    }

    /// Spacing override after the formation, if authored.
    #[must_use]
    pub const fn gap(&self) -> Option<f64> {
        self.gap
    }

    /// First wave at which the formation may be selected.
    #[must_use]
    pub const fn min_wave(&self) -> WaveNumber {
        self.min_wave
    }

    /// Evaluates the selection weight at `wave`.
    #[must_use]
    pub fn weight(&self, wave: WaveNumber) -> f64 {
        self.probability.weight(wave, self)
    }

    /// Reports whether the formation may be bought at `wave` with `remaining` budget.
    #[must_use]
    pub fn is_eligible(&self, wave: WaveNumber, remaining: f64) -> bool {
        self.difficulty <= remaining && self.min_wave <= wave
    }
}

/// Absolute spawn position in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl SpawnPoint {
    /// Creates a spawn point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One scheduled enemy-creation instruction inside a wave plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnEvent {
    /// Seconds from wave start.
    pub time: f64,
    /// Type of enemy to spawn.
    pub enemy_type: EnemyType,
    /// Fixed color, or `None` for automatic selection.
    pub color: Option<EnemyColor>,
    /// Horizontal position override.
    pub x: Option<f64>,
    /// Vertical position override.
    pub y: Option<f64>,
    /// Number of clustered enemies the event expands into.
    pub group_size: u32,
    /// Gap between clustered members.
    pub spacing: Option<f64>,
    /// Manual per-member placement offsets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offsets: Vec<f64>,
    /// Explicit per-member colors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<EnemyColor>,
    /// Formation the event originates from.
    pub formation_id: FormationId,
}

impl SpawnEvent {
    /// Creates a single-enemy event with automatic color and default position.
    #[must_use]
    pub fn new(time: f64, enemy_type: EnemyType, formation_id: FormationId) -> Self {
        Self {
            time,
            enemy_type,
            color: None,
            x: None,
            y: None,
            group_size: 1,
            spacing: None,
            offsets: Vec::new(),
            colors: Vec::new(),
            formation_id,
        }
    }

    /// Projects a ship descriptor onto the wave timeline.
    #[must_use]
    pub fn from_ship(
        ship: &ShipDescriptor,
        formation_start: f64,
        formation_id: &FormationId,
    ) -> Self {
        Self {
            time: formation_start + ship.time.max(0.0),
            enemy_type: ship.enemy_type.clone(),
            color: ship.color.clone(),
            x: ship.x,
            y: ship.y,
            group_size: ship.group_size.max(1),
            spacing: ship.spacing,
            offsets: ship.offsets.clone(),
            colors: ship.colors.clone(),
            formation_id: formation_id.clone(),
        }
    }

    /// Canonical ordering: time ascending, then formation id.
    #[must_use]
    pub fn schedule_order(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.formation_id.cmp(&other.formation_id))
    }
}

/// Concrete, time-ordered spawn schedule for one wave.
#[derive(Clone, Debug)]
pub struct WavePlan {
    wave: WaveNumber,
    total_difficulty: f64,
    remaining_difficulty: f64,
    events: Vec<SpawnEvent>,
    selections: Vec<Arc<Formation>>,
}

impl WavePlan {
    /// Assembles a plan, sorting events into canonical schedule order.
    ///
    /// The spent difficulty is derived from `selections`; `remaining_difficulty`
    /// is clamped to be non-negative.
    #[must_use]
    pub fn new(
        wave: WaveNumber,
        remaining_difficulty: f64,
        mut events: Vec<SpawnEvent>,
        selections: Vec<Arc<Formation>>,
    ) -> Self {
        events.sort_by(SpawnEvent::schedule_order);
        let total_difficulty = selections
            .iter()
            .map(|formation| formation.difficulty())
            .sum();
        Self {
            wave,
            total_difficulty,
            remaining_difficulty: remaining_difficulty.max(0.0),
            events,
            selections,
        }
    }

    /// Wave the plan was built for.
    #[must_use]
    pub const fn wave(&self) -> WaveNumber {
        self.wave
    }

    /// Sum of the selected formations' difficulties.
    #[must_use]
    pub const fn total_difficulty(&self) -> f64 {
        self.total_difficulty
    }

    /// Budget left unspent when no further formation fit.
    #[must_use]
    pub const fn remaining_difficulty(&self) -> f64 {
        self.remaining_difficulty
    }

    /// Number of spawn events, not counting group expansion.
    #[must_use]
    pub fn total_enemies(&self) -> usize {
        self.events.len()
    }

    /// Number of individual enemies once every event's group is expanded.
    #[must_use]
    pub fn total_spawns(&self) -> u32 {
        self.events
            .iter()
            .map(|event| event.group_size.max(1))
            .fold(0, u32::saturating_add)
    }

    /// Spawn events in schedule order.
    #[must_use]
    pub fn events(&self) -> &[SpawnEvent] {
        &self.events
    }

    /// Formations chosen for the wave, in selection order.
    #[must_use]
    pub fn selections(&self) -> &[Arc<Formation>] {
        &self.selections
    }

    /// Consumes the plan, yielding its events.
    #[must_use]
    pub fn into_events(self) -> Vec<SpawnEvent> {
        self.events
    }
}

/// How a wave's spawns are being driven.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnMode {
    /// Spawns follow a formation plan's event list.
    Scheduled,
    /// Spawns are issued on a fixed interval.
    Legacy,
}

/// Commands emitted towards the enemy factory.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests that a single enemy be materialised.
    SpawnEnemy {
        /// Type of enemy to create.
        enemy_type: EnemyType,
        /// Resolved color of the enemy.
        color: EnemyColor,
        /// Resolved spawn position.
        position: SpawnPoint,
    },
}

/// Wave lifecycle notifications.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A wave began spawning.
    WaveStarted {
        /// Wave that started.
        wave: WaveNumber,
        /// Scheduling mode chosen for the wave.
        mode: SpawnMode,
        /// Number of individual enemies the wave will spawn.
        expected_spawns: u32,
    },
    /// Every enemy of the wave spawned and none remain alive.
    WaveCompleted {
        /// Wave that completed.
        wave: WaveNumber,
        /// Number of enemies spawned during the wave.
        spawned: u32,
    },
}
