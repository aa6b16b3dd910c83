//! Difficulty-budgeted formation planning.

use std::sync::Arc;

use formation_defence_core::{
    Formation, RandomSource, RngSource, SpawnEvent, WaveNumber, WavePlan,
};
use formation_defence_system_difficulty::WaveDifficultyTable;

use crate::{
    parser::{FormationDefaults, FormationDraft, FormationParser},
    weighted::weighted_random_choice,
};

/// Upper bound on selections per wave.
///
/// Content where every formation is free would otherwise keep the greedy loop
/// spinning forever; the cap turns that into a long but finite wave.
pub const DEFAULT_ITERATION_LIMIT: u32 = 200;

/// Sources of formations for a [`FormationManager`].
#[derive(Clone, Debug, Default)]
pub struct FormationManagerConfig {
    /// Formation text in the definition format.
    pub definitions: String,
    /// Pre-built drafts. When non-empty they replace the parsed definitions.
    pub formations: Vec<FormationDraft>,
    /// Defaults applied to every formation.
    pub defaults: FormationDefaults,
}

/// Per-call planning options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanOptions {
    /// Budget override. The difficulty table is consulted when unset.
    pub total_difficulty: Option<f64>,
    /// Maximum number of selections. Values below one read as one.
    pub iteration_limit: u32,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            total_difficulty: None,
            iteration_limit: DEFAULT_ITERATION_LIMIT,
        }
    }
}

impl PlanOptions {
    /// Options that spend exactly `budget`.
    #[must_use]
    pub fn with_budget(budget: f64) -> Self {
        Self {
            total_difficulty: Some(budget),
            ..Self::default()
        }
    }
}

/// Owns the active formation set and turns difficulty budgets into wave plans.
#[derive(Debug)]
pub struct FormationManager {
    formations: Vec<Arc<Formation>>,
    defaults: FormationDefaults,
    table: WaveDifficultyTable,
}

impl FormationManager {
    /// Builds a manager, returning `None` when no formation survives parsing.
    #[must_use]
    pub fn new(config: FormationManagerConfig, table: WaveDifficultyTable) -> Option<Self> {
        let FormationManagerConfig {
            definitions,
            formations: drafts,
            defaults,
        } = config;

        let mut parser = FormationParser::new();
        let parsed = parser.parse(&definitions, &defaults);
        let formations: Vec<Formation> = if drafts.is_empty() {
            parsed
        } else {
            drafts
                .into_iter()
                .filter_map(|draft| parser.finalize(draft, &defaults))
                .collect()
        };
        let formations: Vec<Arc<Formation>> = formations.into_iter().map(Arc::new).collect();

        if formations.is_empty() {
            tracing::warn!("no formations available, wave planning disabled");
            return None;
        }
        tracing::debug!(count = formations.len(), "formation manager ready");

        Some(Self {
            formations,
            defaults,
            table,
        })
    }

    /// Active formations in authored order.
    #[must_use]
    pub fn formations(&self) -> &[Arc<Formation>] {
        &self.formations
    }

    /// Defaults the manager was built with.
    #[must_use]
    pub const fn defaults(&self) -> &FormationDefaults {
        &self.defaults
    }

    /// Difficulty table consulted for budgets.
    #[must_use]
    pub const fn difficulty_table(&self) -> &WaveDifficultyTable {
        &self.table
    }

    /// Scaled difficulty budget of `wave`.
    #[must_use]
    pub fn resolve_budget(&self, wave: WaveNumber) -> f64 {
        self.table.resolve(wave)
    }

    /// Plans `wave`, drawing selections from `random`.
    ///
    /// Returns `None` when the budget is not positive or nothing fits it; the
    /// caller then falls back to fixed-interval spawning.
    pub fn plan_wave<R>(
        &self,
        wave: WaveNumber,
        options: &PlanOptions,
        random: &mut R,
    ) -> Option<WavePlan>
    where
        R: RandomSource + ?Sized,
    {
        let budget = options
            .total_difficulty
            .filter(|budget| budget.is_finite())
            .unwrap_or_else(|| self.resolve_budget(wave));
        if !(budget.is_finite() && budget > 0.0) {
            tracing::debug!(%wave, budget, "no positive budget, skipping formation plan");
            return None;
        }

        let limit = options.iteration_limit.max(1);
        let mut remaining = budget.floor();
        let mut selections: Vec<Arc<Formation>> = Vec::new();
        let mut iterations = 0;
        while remaining > 0.0 && iterations < limit {
            iterations += 1;
            let candidates: Vec<&Arc<Formation>> = self
                .formations
                .iter()
                .filter(|formation| formation.is_eligible(wave, remaining))
                .collect();
            let weights: Vec<f64> = candidates
                .iter()
                .map(|candidate| candidate.weight(wave))
                .collect();
            let Some(chosen) = weighted_random_choice(&candidates, &weights, random) else {
                break;
            };
            remaining -= chosen.difficulty();
            selections.push(Arc::clone(chosen));
        }

        if selections.is_empty() {
            tracing::debug!(%wave, budget, "no formation fits the budget");
            return None;
        }

        let events = self.lay_out(&selections);
        let plan = WavePlan::new(wave, remaining, events, selections);
        tracing::debug!(
            %wave,
            budget,
            spent = plan.total_difficulty(),
            remaining = plan.remaining_difficulty(),
            selections = plan.selections().len(),
            events = plan.total_enemies(),
            "planned wave"
        );
        Some(plan)
    }

    /// Plans `wave` using the thread-local generator.
    #[must_use]
    pub fn plan_wave_unseeded(&self, wave: WaveNumber, options: &PlanOptions) -> Option<WavePlan> {
        self.plan_wave(wave, options, &mut RngSource::thread())
    }

    fn lay_out(&self, selections: &[Arc<Formation>]) -> Vec<SpawnEvent> {
        let mut events = Vec::with_capacity(selections.iter().map(|f| f.ships().len()).sum());
        let mut cursor_time = 0.0;
        for formation in selections {
            let mut local_max = 0.0_f64;
            for ship in formation.ships() {
                events.push(SpawnEvent::from_ship(ship, cursor_time, formation.id()));
                local_max = local_max.max(ship.time);
            }
            let gap = formation.gap().unwrap_or(self.defaults.formation_gap);
            let gap = if gap.is_finite() { gap.max(0.0) } else { 0.0 };
            cursor_time += local_max + gap;
        }
        events
    }
}
