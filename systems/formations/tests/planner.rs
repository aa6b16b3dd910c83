use formation_defence_core::{
    EnemyColor, EnemyType, FormationId, RngSource, SequenceRandom, ShipDescriptor, WaveNumber,
};
use formation_defence_system_difficulty::{DifficultyScaler, EndlessDifficulty, WaveDifficultyTable};
use formation_defence_system_formations::{
    FormationDefaults, FormationDraft, FormationManager, FormationManagerConfig, PlanOptions,
};

const SAMPLE: &str = "
# Alpha Sweep | difficulty=2 | probability=2
swarm @0 y=600 color=red
swarm @0.5 y=640 color=blue
---
# Beta Strike | difficulty=1 | probability=5
 tank @0 y=580 color=blue
";

const ROSTER: &str = "
# Solo Scout | difficulty=1 | probability=Math.max(0.6, 1.4 - 0.05 * wave)
swarm @0
---
# Twin Column | difficulty=2 | probability=1.2
swarm @0 y=560
swarm @0 y=640
---
# Tank Escort | difficulty=4 | minWave=3 | probability=0.4 + wave * 0.05 | gap=1.1
tank @0.4
swarm @0 group=2
swarm @0.8 group=2
---
# Heavy Line | difficulty=7 | minWave=6 | probability=wave >= 8 ? 1.5 : 0.6
tank @0
tank @0.6
tank @1.2
";

fn table(schedule: Vec<f64>, multiplier: f64) -> WaveDifficultyTable {
    WaveDifficultyTable::new(
        schedule,
        EndlessDifficulty::default(),
        DifficultyScaler::new(multiplier),
    )
}

fn build(
    definitions: &str,
    defaults: FormationDefaults,
    table: WaveDifficultyTable,
) -> FormationManager {
    FormationManager::new(
        FormationManagerConfig {
            definitions: definitions.to_owned(),
            formations: Vec::new(),
            defaults,
        },
        table,
    )
    .expect("definitions contain formations")
}

#[test]
fn plans_wave_within_budget() {
    let defaults = FormationDefaults {
        formation_gap: 0.4,
        ..FormationDefaults::default()
    };
    let manager = build(SAMPLE, defaults, table(vec![3.0], 1.0));
    let mut random = SequenceRandom::new(vec![0.95, 0.2]);
    let plan = manager
        .plan_wave(WaveNumber::FIRST, &PlanOptions::default(), &mut random)
        .expect("budget of three buys formations");

    assert_eq!(plan.total_enemies(), 3);
    assert_eq!(plan.total_difficulty(), 3.0);
    assert_eq!(plan.remaining_difficulty(), 0.0);
    assert!(plan.events().iter().all(|event| event.time >= 0.0));
    assert_eq!(plan.events()[0].enemy_type, EnemyType::tank(), "beta strike leads the timeline");
    assert_eq!(plan.events()[1].enemy_type, EnemyType::swarm());
    assert_eq!(plan.events()[1].time, 0.4, "alpha starts after beta plus the gap");
    assert_eq!(plan.events()[2].time, 0.9);
}

#[test]
fn honours_minimum_wave() {
    let definitions = "
# Early Push | difficulty=2 | probability=5 | minWave=1
swarm @0 y=600 color=red
---
# Late Push | difficulty=2 | probability=5 | minWave=3
swarm @0 y=620 color=blue
---
";
    let manager = build(definitions, FormationDefaults::default(), table(vec![2.0, 2.0, 2.0], 1.0));

    let early = manager
        .plan_wave(WaveNumber::new(1), &PlanOptions::default(), &mut SequenceRandom::constant(0.1))
        .expect("early plan");
    assert_eq!(early.selections().len(), 1);
    assert!(early.selections()[0].label().starts_with("Early"));
    assert!(early.events().iter().all(|event| event.color == Some(EnemyColor::red())));

    let late = manager
        .plan_wave(WaveNumber::new(3), &PlanOptions::default(), &mut SequenceRandom::constant(0.9))
        .expect("late plan");
    assert_eq!(late.selections().len(), 1);
    assert!(late.selections()[0].label().starts_with("Late"));
    assert!(late.events().iter().all(|event| event.color == Some(EnemyColor::blue())));
}

#[test]
fn multiplier_scales_budget_before_selection() {
    let manager = build(
        "# Single | difficulty=1\nswarm\n",
        FormationDefaults::default(),
        table(vec![2.0], 3.0),
    );
    assert_eq!(manager.resolve_budget(WaveNumber::FIRST), 6.0);

    let plan = manager
        .plan_wave(WaveNumber::FIRST, &PlanOptions::default(), &mut SequenceRandom::constant(0.5))
        .expect("plan");
    assert_eq!(plan.selections().len(), 6);
    assert_eq!(plan.total_difficulty(), 6.0);
}

#[test]
fn non_finite_weights_are_never_selected() {
    let definitions = "
# Broken | difficulty=1 | probability=1/0
tank
---
# Healthy | difficulty=1 | probability=1
swarm
";
    let manager = build(definitions, FormationDefaults::default(), table(vec![12.0], 1.0));
    let mut random = SequenceRandom::new(vec![0.01, 0.37, 0.5, 0.73, 0.99]);
    let plan = manager
        .plan_wave(WaveNumber::FIRST, &PlanOptions::default(), &mut random)
        .expect("plan");
    assert_eq!(plan.selections().len(), 12);
    assert!(plan
        .selections()
        .iter()
        .all(|selection| selection.id() == &FormationId::new("healthy")));
}

#[test]
fn zero_budget_or_nothing_affordable_yields_no_plan() {
    let manager = build(ROSTER, FormationDefaults::default(), table(vec![0.0], 1.0));
    let mut random = RngSource::seeded(7);
    assert!(manager
        .plan_wave(WaveNumber::FIRST, &PlanOptions::default(), &mut random)
        .is_none());
    assert!(manager
        .plan_wave(WaveNumber::FIRST, &PlanOptions::with_budget(f64::NAN), &mut random)
        .is_none(), "non-finite override defers to the table");

    let expensive = build(
        "# Pricey | difficulty=5\ntank\n",
        FormationDefaults::default(),
        table(vec![4.0], 1.0),
    );
    assert!(expensive
        .plan_wave(WaveNumber::FIRST, &PlanOptions::default(), &mut random)
        .is_none());
}

#[test]
fn iteration_limit_bounds_selection() {
    let manager = build(
        "# Cheap | difficulty=1\nswarm\n",
        FormationDefaults::default(),
        table(Vec::new(), 1.0),
    );
    let options = PlanOptions {
        total_difficulty: Some(1_000.0),
        iteration_limit: 5,
    };
    let plan = manager
        .plan_wave(WaveNumber::FIRST, &options, &mut SequenceRandom::constant(0.5))
        .expect("plan");
    assert_eq!(plan.selections().len(), 5);
    assert_eq!(plan.remaining_difficulty(), 995.0);

    let clamped = PlanOptions {
        iteration_limit: 0,
        ..options
    };
    let plan = manager
        .plan_wave(WaveNumber::FIRST, &clamped, &mut SequenceRandom::constant(0.5))
        .expect("plan");
    assert_eq!(plan.selections().len(), 1);
}

#[test]
fn budget_is_floored_before_spending() {
    let manager = build(
        "# Pair | difficulty=2\nswarm\nswarm\n",
        FormationDefaults::default(),
        table(Vec::new(), 1.0),
    );
    let plan = manager
        .plan_wave(
            WaveNumber::FIRST,
            &PlanOptions::with_budget(5.9),
            &mut SequenceRandom::constant(0.5),
        )
        .expect("plan");
    assert_eq!(plan.total_difficulty(), 4.0);
    assert_eq!(plan.remaining_difficulty(), 1.0);
}

#[test]
fn plans_uphold_budget_ordering_and_eligibility() {
    let endless = EndlessDifficulty {
        start_wave: Some(4.0),
        base: Some(12.0),
        growth: Some(2.5),
        max: Some(40.0),
    };
    let table = WaveDifficultyTable::new(vec![4.0, 6.0, 9.0], endless, DifficultyScaler::new(1.25));
    let manager = build(ROSTER, FormationDefaults::default(), table);

    for seed in 0..40_u64 {
        let mut random = RngSource::seeded(seed);
        for wave in 1..=12 {
            let wave = WaveNumber::new(wave);
            let budget = manager.resolve_budget(wave);
            let Some(plan) = manager.plan_wave(wave, &PlanOptions::default(), &mut random) else {
                panic!("wave {wave} with budget {budget} should be plannable");
            };

            let spent: f64 = plan.selections().iter().map(|s| s.difficulty()).sum();
            assert_eq!(plan.total_difficulty(), spent);
            assert!(plan.total_difficulty() <= budget, "seed {seed} wave {wave} overspent");
            assert!(plan.selections().iter().all(|s| s.min_wave() <= wave));

            for pair in plan.events().windows(2) {
                assert!(pair[0].time <= pair[1].time, "events out of order");
                if pair[0].time == pair[1].time {
                    assert!(pair[0].formation_id <= pair[1].formation_id, "tie-break violated");
                }
            }
        }
    }
}

#[test]
fn same_seed_replays_same_plan() {
    let manager = build(ROSTER, FormationDefaults::default(), table(vec![18.0], 1.0));
    let run = |seed| {
        manager
            .plan_wave(WaveNumber::new(9), &PlanOptions::default(), &mut RngSource::seeded(seed))
            .expect("plan")
            .into_events()
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn prebuilt_drafts_take_priority() {
    let mut ship = ShipDescriptor::new(EnemyType::tank());
    ship.time = 0.25;
    let config = FormationManagerConfig {
        definitions: SAMPLE.to_owned(),
        formations: vec![FormationDraft {
            label: "Scripted".to_owned(),
            ships: vec![ship],
            ..FormationDraft::default()
        }],
        defaults: FormationDefaults::default(),
    };
    let manager = FormationManager::new(config, table(vec![3.0], 1.0)).expect("draft is valid");
    assert_eq!(manager.formations().len(), 1);
    assert_eq!(manager.formations()[0].id(), &FormationId::new("scripted"));
    assert_eq!(manager.formations()[0].difficulty(), 1.0);
}

#[test]
fn no_formations_yields_no_manager() {
    let config = FormationManagerConfig {
        definitions: "# Hollow\n---\n".to_owned(),
        ..FormationManagerConfig::default()
    };
    assert!(FormationManager::new(config, table(vec![3.0], 1.0)).is_none());
}

#[test]
fn formation_gap_override_and_default() {
    let definitions = "
# Lead | difficulty=1 | gap=2
swarm @0.5
---
# Follow | difficulty=1
tank @0
";
    let manager = build(definitions, FormationDefaults::default(), table(vec![2.0], 1.0));
    // Lead is picked first with the low roll, Follow second with the high roll.
    let plan = manager
        .plan_wave(
            WaveNumber::FIRST,
            &PlanOptions::default(),
            &mut SequenceRandom::new(vec![0.1, 0.9]),
        )
        .expect("plan");
    let times: Vec<f64> = plan.events().iter().map(|event| event.time).collect();
    assert_eq!(times, vec![0.5, 2.5]);
}
