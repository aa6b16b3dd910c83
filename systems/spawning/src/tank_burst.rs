//! Spawn positions that produce the heavy enemy variant in fixed-interval waves.

use formation_defence_core::{EnemyType, RandomSource, WaveNumber, WavePlan};

use crate::legacy::LegacyWaveConfig;

/// One-based positions of every tank event in `plan`, in event order.
#[must_use]
pub fn tank_indices_from_plan(plan: &WavePlan) -> Vec<u32> {
    plan.events()
        .iter()
        .zip(1_u32..)
        .filter(|(event, _)| event.enemy_type.is_tank())
        .map(|(_, position)| position)
        .collect()
}

/// Picks `count` distinct positions in `1..=total` uniformly, sorted ascending.
pub fn sample_random_tank_indices<R>(total: u32, count: u32, random: &mut R) -> Vec<u32>
where
    R: RandomSource + ?Sized,
{
    if total == 0 || count == 0 {
        return Vec::new();
    }
    let mut positions: Vec<u32> = (1..=total).collect();
    for index in (1..positions.len()).rev() {
        let swap = ((random.next_unit() * (index + 1) as f64).floor() as usize).min(index);
        positions.swap(index, swap);
    }
    positions.truncate(count.min(total) as usize);
    positions.sort_unstable();
    positions
}

/// Tank positions prepared for a single wave.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TankBurstSchedule {
    positions: Vec<u32>,
    wave: Option<WaveNumber>,
}

impl TankBurstSchedule {
    /// Rebuilds the schedule for `wave` unless it was already prepared for it.
    ///
    /// A plan takes precedence and is projected directly. Without a plan the
    /// positions are sampled from `config`, over `total_spawns` when given and
    /// the configured cycles otherwise. A missing config leaves the wave
    /// without tanks. Returns whether the schedule was rebuilt.
    pub fn prepare_for_wave<R>(
        &mut self,
        config: Option<&LegacyWaveConfig>,
        wave: WaveNumber,
        total_spawns: Option<u32>,
        plan: Option<&WavePlan>,
        random: &mut R,
    ) -> bool
    where
        R: RandomSource + ?Sized,
    {
        if self.is_prepared_for(wave) {
            return false;
        }
        self.positions = match (plan, config) {
            (Some(plan), _) => tank_indices_from_plan(plan),
            (None, Some(config)) => sample_random_tank_indices(
                total_spawns.unwrap_or(config.cycles),
                config.tanks_count,
                random,
            ),
            (None, None) => Vec::new(),
        };
        self.wave = Some(wave);
        tracing::trace!(%wave, positions = ?self.positions, "tank burst schedule prepared");
        true
    }

    /// Reports whether the schedule belongs to `wave`.
    #[must_use]
    pub fn is_prepared_for(&self, wave: WaveNumber) -> bool {
        self.wave == Some(wave)
    }

    /// Wave the schedule was prepared for.
    #[must_use]
    pub const fn wave(&self) -> Option<WaveNumber> {
        self.wave
    }

    /// Sorted one-based tank positions.
    #[must_use]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Reports whether the one-based spawn `position` is a tank.
    #[must_use]
    pub fn contains(&self, position: u32) -> bool {
        self.positions.binary_search(&position).is_ok()
    }

    /// Type of the spawn that follows `spawned` earlier spawns.
    ///
    /// An override wins unconditionally.
    #[must_use]
    pub fn determine_enemy_type(
        &self,
        override_type: Option<&EnemyType>,
        spawned: u32,
    ) -> EnemyType {
        match override_type {
            Some(enemy_type) => enemy_type.clone(),
            None if self.contains(spawned.saturating_add(1)) => EnemyType::tank(),
            None => EnemyType::swarm(),
        }
    }
}
