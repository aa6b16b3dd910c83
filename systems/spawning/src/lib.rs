#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Runtime spawn scheduler responsible for emitting enemy spawn commands.
//!
//! A wave runs in one of two modes. Scheduled waves replay a formation plan:
//! a cursor walks the time-sorted events and fires every event whose time has
//! been reached, expanding grouped events into one command per member.
//! Legacy waves spawn on a fixed interval and pick tanks from a burst
//! schedule. All mutable wave state lives in [`WaveRuntimeState`], owned by
//! the wave controller and lent to [`Spawning`] once per tick.

pub mod color;
pub mod layout;
pub mod legacy;
pub mod tank_burst;

use formation_defence_core::{
    Command, EnemyType, RandomSource, SpawnEvent, SpawnMode, SpawnPoint, WaveNumber,
    WavePlan,
};

pub use color::{ColorBias, DEFAULT_MIN_COLOR_DIFFERENCE};
pub use layout::{SpawnLayout, DEFAULT_GROUP_SPACING, DEFAULT_SPAWN_POINT};
pub use legacy::{LegacyEndless, LegacyWaveConfig, LegacyWaveTable};
pub use tank_burst::{sample_random_tank_indices, tank_indices_from_plan, TankBurstSchedule};

/// Number of swarm enemies produced by one fixed-interval swarm spawn.
pub const DEFAULT_SWARM_GROUP_SIZE: u32 = 3;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug)]
pub struct Config {
    layout: SpawnLayout,
    swarm_group_size: u32,
}

impl Config {
    /// Creates a new configuration using the provided spawn layout.
    #[must_use]
    pub fn new(layout: SpawnLayout) -> Self {
        Self {
            layout,
            swarm_group_size: DEFAULT_SWARM_GROUP_SIZE,
        }
    }

    /// Overrides the size of fixed-interval swarm groups.
    #[must_use]
    pub fn with_swarm_group_size(mut self, size: u32) -> Self {
        self.swarm_group_size = size.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(SpawnLayout::default())
    }
}

/// Spawn progress of the active wave.
#[derive(Clone, Debug, Default)]
pub struct WaveRuntimeState {
    wave: WaveNumber,
    in_progress: bool,
    wave_elapsed: f64,
    schedule: Option<Vec<SpawnEvent>>,
    cursor: usize,
    spawned: u32,
    expected_spawns: u32,
    spawn_interval: f64,
    spawn_timer: f64,
    tank_bursts: TankBurstSchedule,
    color_bias: ColorBias,
}

impl WaveRuntimeState {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts replaying `plan`.
    ///
    /// The wave expects one spawn per expanded group member. Tank positions
    /// are projected from the plan.
    pub fn begin_scheduled<R>(&mut self, plan: &WavePlan, color_bias: ColorBias, random: &mut R)
    where
        R: RandomSource + ?Sized,
    {
        self.restart_counters(plan.wave(), color_bias);
        self.schedule = Some(plan.events().to_vec());
        self.expected_spawns = plan.total_spawns();
        let _ = self
            .tank_bursts
            .prepare_for_wave(None, plan.wave(), None, Some(plan), random);
    }

    /// Starts a fixed-interval wave.
    ///
    /// The first spawn is due immediately. A missing config yields a wave
    /// that spawns nothing.
    pub fn begin_legacy<R>(
        &mut self,
        wave: WaveNumber,
        config: Option<LegacyWaveConfig>,
        color_bias: ColorBias,
        random: &mut R,
    ) where
        R: RandomSource + ?Sized,
    {
        self.restart_counters(wave, color_bias);
        self.schedule = None;
        self.expected_spawns = config.map_or(0, |config| config.cycles);
        self.spawn_interval = config.map_or(0.0, |config| config.interval);
        self.spawn_timer = self.spawn_interval;
        let _ = self
            .tank_bursts
            .prepare_for_wave(config.as_ref(), wave, None, None, random);
    }

    /// Marks the wave as no longer in progress.
    pub fn finish(&mut self) {
        self.in_progress = false;
    }

    /// Drops every trace of the current wave.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn restart_counters(&mut self, wave: WaveNumber, color_bias: ColorBias) {
        self.wave = wave;
        self.in_progress = true;
        self.wave_elapsed = 0.0;
        self.cursor = 0;
        self.spawned = 0;
        self.spawn_interval = 0.0;
        self.spawn_timer = 0.0;
        self.color_bias = color_bias;
    }

    /// Type of the next fixed-interval spawn, honouring an override.
    #[must_use]
    pub fn determine_enemy_type(&self, override_type: Option<&EnemyType>) -> EnemyType {
        self.tank_bursts
            .determine_enemy_type(override_type, self.spawned)
    }

    /// Wave the state belongs to.
    #[must_use]
    pub const fn wave(&self) -> WaveNumber {
        self.wave
    }

    /// Reports whether a wave is running.
    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Scheduling mode of the running wave.
    #[must_use]
    pub fn mode(&self) -> Option<SpawnMode> {
        if !self.in_progress {
            return None;
        }
        Some(match &self.schedule {
            Some(events) if !events.is_empty() => SpawnMode::Scheduled,
            _ => SpawnMode::Legacy,
        })
    }

    /// Seconds since the scheduled wave started.
    #[must_use]
    pub const fn wave_elapsed(&self) -> f64 {
        self.wave_elapsed
    }

    /// Sorted events of a scheduled wave.
    #[must_use]
    pub fn schedule(&self) -> Option<&[SpawnEvent]> {
        self.schedule.as_deref()
    }

    /// Index of the next unconsumed event.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Spawns issued so far.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Spawns the wave will issue in total.
    #[must_use]
    pub const fn expected_spawns(&self) -> u32 {
        self.expected_spawns
    }

    /// Reports whether every expected spawn has been issued.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.spawned >= self.expected_spawns
    }

    /// Seconds between fixed-interval spawns.
    #[must_use]
    pub const fn spawn_interval(&self) -> f64 {
        self.spawn_interval
    }

    /// Seconds accumulated towards the next fixed-interval spawn.
    #[must_use]
    pub const fn spawn_timer(&self) -> f64 {
        self.spawn_timer
    }

    /// Tank positions of the wave.
    #[must_use]
    pub const fn tank_bursts(&self) -> &TankBurstSchedule {
        &self.tank_bursts
    }

    /// Color bias of the wave.
    #[must_use]
    pub const fn color_bias(&self) -> ColorBias {
        self.color_bias
    }
}

/// Pure system that turns wave progress into spawn commands.
#[derive(Debug)]
pub struct Spawning {
    layout: SpawnLayout,
    swarm_group_size: u32,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            layout: config.layout,
            swarm_group_size: config.swarm_group_size,
        }
    }

    /// Spawn layout in use.
    #[must_use]
    pub const fn layout(&self) -> &SpawnLayout {
        &self.layout
    }

    /// Advances `state` by `dt` seconds and emits every spawn that became due.
    ///
    /// Negative and non-finite `dt` count as zero.
    pub fn spawn_enemies_if_needed<R>(
        &self,
        state: &mut WaveRuntimeState,
        dt: f64,
        random: &mut R,
        out: &mut Vec<Command>,
    ) where
        R: RandomSource + ?Sized,
    {
        if !state.in_progress {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        match state.mode() {
            Some(SpawnMode::Scheduled) => self.advance_schedule(state, dt, random, out),
            Some(SpawnMode::Legacy) => self.advance_interval(state, dt, random, out),
            None => {}
        }
    }

    fn advance_schedule<R>(
        &self,
        state: &mut WaveRuntimeState,
        dt: f64,
        random: &mut R,
        out: &mut Vec<Command>,
    )
    where
        R: RandomSource + ?Sized,
    {
        state.wave_elapsed += dt;
        loop {
            let event = match state.schedule.as_deref() {
                Some(events) => match events.get(state.cursor) {
                    Some(event) if event.time <= state.wave_elapsed => event.clone(),
                    _ => return,
                },
                None => return,
            };
            state.cursor += 1;
            tracing::trace!(
                wave = %state.wave,
                time = event.time,
                enemy_type = %event.enemy_type,
                group_size = event.group_size,
                "spawn event due"
            );
            self.emit_event(state, &event, random, out);
        }
    }

    fn emit_event<R>(
        &self,
        state: &mut WaveRuntimeState,
        event: &SpawnEvent,
        random: &mut R,
        out: &mut Vec<Command>,
    )
    where
        R: RandomSource + ?Sized,
    {
        let base = self.layout.point_for(&event.enemy_type);
        let origin = SpawnPoint::new(event.x.unwrap_or(base.x), event.y.unwrap_or(base.y));
        let size = event.group_size.max(1);

        for member in 0..size {
            let offset = self
                .layout
                .member_offset(member, size, &event.offsets, event.spacing);
            let color = match event.colors.get(member as usize).or(event.color.as_ref()) {
                Some(color) => color.clone(),
                None => state
                    .color_bias
                    .resolve_color(state.spawned, state.expected_spawns, random),
            };
            out.push(Command::SpawnEnemy {
                enemy_type: event.enemy_type.clone(),
                color,
                position: SpawnPoint::new(origin.x, origin.y + offset),
            });
            state.spawned = state.spawned.saturating_add(1);
        }
    }

    fn advance_interval<R>(
        &self,
        state: &mut WaveRuntimeState,
        dt: f64,
        random: &mut R,
        out: &mut Vec<Command>,
    )
    where
        R: RandomSource + ?Sized,
    {
        if state.is_exhausted() {
            return;
        }
        state.spawn_timer += dt;
        if state.spawn_timer >= state.spawn_interval {
            self.spawn_interval_enemy(state, None, random, out);
            state.spawn_timer = 0.0;
        }
    }

    /// Issues one fixed-interval spawn call, optionally forcing its type.
    ///
    /// Swarm calls produce a centred group; every call counts as one spawn.
    pub fn spawn_interval_enemy<R>(
        &self,
        state: &mut WaveRuntimeState,
        override_type: Option<&EnemyType>,
        random: &mut R,
        out: &mut Vec<Command>,
    ) where
        R: RandomSource + ?Sized,
    {
        let enemy_type = state.determine_enemy_type(override_type);
        let point = self.layout.point_for(&enemy_type);
        let size = if enemy_type == EnemyType::swarm() {
            self.swarm_group_size
        } else {
            1
        };

        for member in 0..size {
            let offset = self.layout.member_offset(member, size, &[], None);
            let color = state
                .color_bias
                .resolve_color(state.spawned, state.expected_spawns, random);
            out.push(Command::SpawnEnemy {
                enemy_type: enemy_type.clone(),
                color,
                position: SpawnPoint::new(point.x, point.y + offset),
            });
        }
        state.spawned = state.spawned.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use formation_defence_core::SequenceRandom;

    use super::*;

    #[test]
    fn zero_interval_spawns_once_per_tick() {
        let spawning = Spawning::new(Config::default());
        let mut state = WaveRuntimeState::new();
        let config = LegacyWaveConfig {
            interval: 0.0,
            cycles: 2,
            tanks_count: 0,
        };
        let mut random = SequenceRandom::constant(0.4);
        state.begin_legacy(WaveNumber::FIRST, Some(config), ColorBias::neutral(), &mut random);

        let mut commands = Vec::new();
        spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);
        assert_eq!(state.spawned(), 1);
        spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);
        spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);
        assert_eq!(state.spawned(), 2, "never exceeds the configured cycles");
    }

    #[test]
    fn idle_state_is_ignored() {
        let spawning = Spawning::new(Config::default());
        let mut state = WaveRuntimeState::new();
        let mut commands = Vec::new();
        let mut random = SequenceRandom::default();
        spawning.spawn_enemies_if_needed(&mut state, 10.0, &mut random, &mut commands);
        assert!(commands.is_empty());
        assert_eq!(state.mode(), None);
    }
}
