#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave controller that ties planning, spawning and completion together.
//!
//! Every wave draws from its own generator, seeded from the session seed and
//! the wave number, so a session replays identically for the same seed.

use formation_defence_core::{Command, Event, RngSource, SpawnMode, WaveNumber, WavePlan};
use formation_defence_system_formations::{FormationManager, PlanOptions};
use formation_defence_system_spawning::{
    ColorBias, Config as SpawningConfig, LegacyWaveTable, Spawning, WaveRuntimeState,
    DEFAULT_MIN_COLOR_DIFFERENCE,
};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Debug)]
pub struct Config {
    /// Session seed every per-wave generator is derived from.
    pub seed: u64,
    /// Minimum separation of the per-wave color bias endpoints.
    pub min_color_difference: f64,
    /// Fixed-interval waves used when no plan can be built.
    pub legacy: LegacyWaveTable,
    /// Spawn placement settings.
    pub spawning: SpawningConfig,
    /// Options forwarded to the planner.
    pub plan_options: PlanOptions,
}

impl Config {
    /// Creates a configuration with default tuning and the provided seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            min_color_difference: DEFAULT_MIN_COLOR_DIFFERENCE,
            legacy: LegacyWaveTable::default(),
            spawning: SpawningConfig::default(),
            plan_options: PlanOptions::default(),
        }
    }
}

/// Derives the generator seed of `wave` from the session seed.
#[must_use]
pub fn derive_wave_seed(global_seed: u64, wave: WaveNumber) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(wave.get().to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Plans `wave` exactly as a director running session `seed` would.
///
/// The color bias is rolled first so the planner sees the same draws.
#[must_use]
pub fn plan_for_seed(
    manager: &FormationManager,
    wave: WaveNumber,
    seed: u64,
    options: &PlanOptions,
    min_color_difference: f64,
) -> Option<WavePlan> {
    let mut random = RngSource::seeded(derive_wave_seed(seed, wave));
    let _ = ColorBias::roll(&mut random, min_color_difference);
    manager.plan_wave(wave, options, &mut random)
}

/// Owns the live wave and drives it one frame at a time.
#[derive(Debug)]
pub struct WaveDirector {
    seed: u64,
    min_color_difference: f64,
    legacy: LegacyWaveTable,
    plan_options: PlanOptions,
    formations: Option<FormationManager>,
    spawning: Spawning,
    state: WaveRuntimeState,
    current_wave: WaveNumber,
    plan: Option<WavePlan>,
    random: RngSource<ChaCha8Rng>,
}

impl WaveDirector {
    /// Creates a director positioned before wave one.
    ///
    /// Without a formation manager every wave runs on the fixed-interval table.
    #[must_use]
    pub fn new(config: Config, formations: Option<FormationManager>) -> Self {
        let Config {
            seed,
            min_color_difference,
            legacy,
            spawning,
            plan_options,
        } = config;
        Self {
            seed,
            min_color_difference,
            legacy,
            plan_options,
            formations,
            spawning: Spawning::new(spawning),
            state: WaveRuntimeState::new(),
            current_wave: WaveNumber::FIRST,
            plan: None,
            random: RngSource::seeded(derive_wave_seed(seed, WaveNumber::FIRST)),
        }
    }

    /// Starts the current wave.
    ///
    /// Returns `false` without side effects while a wave is still running.
    pub fn start_wave(&mut self, out: &mut Vec<Event>) -> bool {
        if self.state.is_in_progress() {
            tracing::debug!(wave = %self.current_wave, "wave already in progress");
            return false;
        }

        let wave = self.current_wave;
        self.random = RngSource::seeded(derive_wave_seed(self.seed, wave));
        let bias = ColorBias::roll(&mut self.random, self.min_color_difference);

        self.plan = self.formations.as_ref().and_then(|manager| {
            manager.plan_wave(wave, &self.plan_options, &mut self.random)
        });
        let mode = match &self.plan {
            Some(plan) => {
                self.state.begin_scheduled(plan, bias, &mut self.random);
                SpawnMode::Scheduled
            }
            None => {
                let config = self.legacy.config_for_wave(wave);
                self.state
                    .begin_legacy(wave, config, bias, &mut self.random);
                SpawnMode::Legacy
            }
        };

        let expected_spawns = self.state.expected_spawns();
        tracing::info!(%wave, ?mode, expected_spawns, "wave started");
        out.push(Event::WaveStarted {
            wave,
            mode,
            expected_spawns,
        });
        true
    }

    /// Advances the running wave by `dt` seconds.
    ///
    /// `live_enemies` counts the enemies alive before this tick. Spawns issued
    /// during the tick are added to it, so a wave never completes on the frame
    /// that releases its last enemies. The wave completes once every expected
    /// spawn was issued and the field is empty; the director then moves on to
    /// the next wave number.
    pub fn tick(
        &mut self,
        dt: f64,
        live_enemies: usize,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        if !self.state.is_in_progress() {
            return;
        }
        let issued_before = out_commands.len();
        self.spawning
            .spawn_enemies_if_needed(&mut self.state, dt, &mut self.random, out_commands);
        let alive = live_enemies + (out_commands.len() - issued_before);

        if self.state.is_exhausted() && alive == 0 {
            let wave = self.current_wave;
            let spawned = self.state.spawned();
            self.state.finish();
            self.current_wave = wave.next();
            tracing::info!(%wave, spawned, "wave completed");
            out_events.push(Event::WaveCompleted { wave, spawned });
        }
    }

    /// Abandons the running wave and returns to wave one.
    pub fn restart(&mut self) {
        self.state.reset();
        self.plan = None;
        self.current_wave = WaveNumber::FIRST;
        tracing::debug!("wave director restarted");
    }

    /// Wave that is running, or the next one to start.
    #[must_use]
    pub const fn current_wave(&self) -> WaveNumber {
        self.current_wave
    }

    /// Reports whether a wave is running.
    #[must_use]
    pub const fn is_wave_in_progress(&self) -> bool {
        self.state.is_in_progress()
    }

    /// Spawn progress of the current wave.
    #[must_use]
    pub const fn state(&self) -> &WaveRuntimeState {
        &self.state
    }

    /// Plan of the current wave, if it runs in scheduled mode.
    #[must_use]
    pub const fn plan(&self) -> Option<&WavePlan> {
        self.plan.as_ref()
    }

    /// Formation manager in use.
    #[must_use]
    pub const fn formations(&self) -> Option<&FormationManager> {
        self.formations.as_ref()
    }
}
