use formation_defence_core::{
    Command, EnemyColor, EnemyType, FormationId, RngSource, SequenceRandom, SpawnEvent, SpawnMode,
    SpawnPoint, WaveNumber, WavePlan,
};
use formation_defence_system_spawning::{
    ColorBias, Config, LegacyWaveConfig, SpawnLayout, Spawning, WaveRuntimeState,
    DEFAULT_SPAWN_POINT,
};

fn event(time: f64, enemy_type: EnemyType) -> SpawnEvent {
    SpawnEvent::new(time, enemy_type, FormationId::new("test"))
}

fn scheduled(events: Vec<SpawnEvent>) -> WaveRuntimeState {
    let plan = WavePlan::new(WaveNumber::FIRST, 0.0, events, Vec::new());
    let mut state = WaveRuntimeState::new();
    state.begin_scheduled(&plan, ColorBias::neutral(), &mut SequenceRandom::default());
    state
}

fn enemy_types(commands: &[Command]) -> Vec<EnemyType> {
    commands
        .iter()
        .map(|command| match command {
            Command::SpawnEnemy { enemy_type, .. } => enemy_type.clone(),
        })
        .collect()
}

#[test]
fn executes_planned_formations() {
    let mut swarm = event(0.0, EnemyType::swarm());
    swarm.color = Some(EnemyColor::red());
    swarm.y = Some(540.0);
    let mut tank = event(0.8, EnemyType::tank());
    tank.color = Some(EnemyColor::blue());
    tank.y = Some(580.0);

    let spawning = Spawning::new(Config::default());
    let mut state = scheduled(vec![swarm, tank]);
    let mut random = SequenceRandom::constant(0.5);
    let mut commands = Vec::new();

    spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);
    assert_eq!(
        commands,
        vec![Command::SpawnEnemy {
            enemy_type: EnemyType::swarm(),
            color: EnemyColor::red(),
            position: SpawnPoint::new(DEFAULT_SPAWN_POINT.x, 540.0),
        }]
    );
    assert_eq!(state.spawned(), 1);

    spawning.spawn_enemies_if_needed(&mut state, 0.8, &mut random, &mut commands);
    assert_eq!(commands.len(), 2);
    assert_eq!(enemy_types(&commands)[1], EnemyType::tank());
    assert_eq!(state.spawned(), 2);
    assert!(state.is_exhausted());
}

#[test]
fn zero_dt_never_advances_the_cursor() {
    let spawning = Spawning::new(Config::default());
    let mut state = scheduled(vec![event(0.0, EnemyType::swarm()), event(0.5, EnemyType::tank())]);
    let mut random = SequenceRandom::constant(0.5);
    let mut commands = Vec::new();

    for _ in 0..10 {
        spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);
    }
    assert_eq!(state.cursor(), 1);
    assert_eq!(state.spawned(), 1);
    assert_eq!(commands.len(), 1);
}

#[test]
fn large_dt_catches_up_in_order() {
    let mut first = event(0.2, EnemyType::swarm());
    first.group_size = 2;
    let mut second = event(0.6, EnemyType::tank());
    second.group_size = 3;

    let spawning = Spawning::new(Config::default());
    let mut state = scheduled(vec![second, first]);
    assert_eq!(state.expected_spawns(), 5);

    let mut commands = Vec::new();
    let mut random = SequenceRandom::constant(0.5);
    spawning.spawn_enemies_if_needed(&mut state, 0.8, &mut random, &mut commands);

    assert_eq!(state.spawned(), 5, "spawned counts every group member");
    assert_eq!(state.cursor(), 2);
    assert_eq!(
        enemy_types(&commands),
        vec![
            EnemyType::swarm(),
            EnemyType::swarm(),
            EnemyType::tank(),
            EnemyType::tank(),
            EnemyType::tank(),
        ]
    );
}

#[test]
fn exhausted_schedule_is_a_no_op() {
    let spawning = Spawning::new(Config::default());
    let mut state = scheduled(vec![event(0.0, EnemyType::swarm())]);
    let mut random = SequenceRandom::constant(0.5);
    let mut commands = Vec::new();
    spawning.spawn_enemies_if_needed(&mut state, 1.0, &mut random, &mut commands);
    spawning.spawn_enemies_if_needed(&mut state, 100.0, &mut random, &mut commands);
    assert_eq!(commands.len(), 1);
}

#[test]
fn negative_and_non_finite_dt_are_ignored() {
    let spawning = Spawning::new(Config::default());
    let mut state = scheduled(vec![event(0.0, EnemyType::swarm()), event(0.5, EnemyType::swarm())]);
    let mut random = SequenceRandom::constant(0.5);
    let mut commands = Vec::new();
    spawning.spawn_enemies_if_needed(&mut state, -3.0, &mut random, &mut commands);
    spawning.spawn_enemies_if_needed(&mut state, f64::NAN, &mut random, &mut commands);
    spawning.spawn_enemies_if_needed(&mut state, f64::INFINITY, &mut random, &mut commands);
    assert_eq!(state.wave_elapsed(), 0.0);
    assert_eq!(state.spawned(), 1);
}

#[test]
fn groups_honour_offsets_spacing_and_member_colors() {
    let mut grouped = event(0.0, EnemyType::swarm());
    grouped.group_size = 3;
    grouped.y = Some(600.0);
    grouped.x = Some(-500.0);
    grouped.offsets = vec![-15.0];
    grouped.spacing = Some(30.0);
    grouped.colors = vec![EnemyColor::blue(), EnemyColor::red()];

    let spawning = Spawning::new(Config::default());
    let mut state = scheduled(vec![grouped]);
    // Only the third member has neither an explicit color nor an event color.
    let mut random = SequenceRandom::constant(0.9);
    let mut commands = Vec::new();
    spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);

    assert_eq!(
        commands,
        vec![
            Command::SpawnEnemy {
                enemy_type: EnemyType::swarm(),
                color: EnemyColor::blue(),
                position: SpawnPoint::new(-500.0, 585.0),
            },
            Command::SpawnEnemy {
                enemy_type: EnemyType::swarm(),
                color: EnemyColor::red(),
                position: SpawnPoint::new(-500.0, 600.0),
            },
            Command::SpawnEnemy {
                enemy_type: EnemyType::swarm(),
                color: EnemyColor::blue(),
                position: SpawnPoint::new(-500.0, 630.0),
            },
        ]
    );
    assert_eq!(random.draws(), 1);
}

#[test]
fn type_points_apply_when_event_has_no_position() {
    let layout = SpawnLayout::default()
        .with_type_point(EnemyType::tank(), SpawnPoint::new(-720.0, 590.0));
    let spawning = Spawning::new(Config::new(layout));
    let mut tank = event(0.0, EnemyType::tank());
    tank.color = Some(EnemyColor::red());
    tank.x = Some(-100.0);
    let mut state = scheduled(vec![tank]);
    let mut commands = Vec::new();
    let mut random = SequenceRandom::default();
    spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);
    assert_eq!(
        commands,
        vec![Command::SpawnEnemy {
            enemy_type: EnemyType::tank(),
            color: EnemyColor::red(),
            position: SpawnPoint::new(-100.0, 590.0),
        }]
    );
}

fn legacy(config: LegacyWaveConfig, bias: ColorBias) -> WaveRuntimeState {
    let mut state = WaveRuntimeState::new();
    state.begin_legacy(WaveNumber::new(2), Some(config), bias, &mut SequenceRandom::constant(0.5));
    state
}

#[test]
fn legacy_mode_respects_interval_and_progress() {
    let config = LegacyWaveConfig {
        interval: 0.67,
        cycles: 3,
        tanks_count: 0,
    };
    let spawning = Spawning::new(Config::default());
    let mut state = legacy(config, ColorBias::neutral());
    assert_eq!(state.mode(), Some(SpawnMode::Legacy));
    let mut random = SequenceRandom::constant(0.5);
    let mut commands = Vec::new();

    spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);
    assert_eq!(state.spawned(), 1, "first spawn is immediate");
    assert_eq!(commands.len(), 3, "a swarm spawn is a group of three");
    assert_eq!(state.spawn_timer(), 0.0);

    spawning.spawn_enemies_if_needed(&mut state, 0.2, &mut random, &mut commands);
    assert_eq!(state.spawn_timer(), 0.2);
    assert_eq!(state.spawned(), 1);

    spawning.spawn_enemies_if_needed(&mut state, 0.5, &mut random, &mut commands);
    assert_eq!(state.spawned(), 2);
    assert_eq!(state.spawn_timer(), 0.0, "timer resets rather than carrying over");

    for _ in 0..5 {
        spawning.spawn_enemies_if_needed(&mut state, 1.0, &mut random, &mut commands);
    }
    assert_eq!(state.spawned(), 3, "stops at the configured cycles");
    assert!(state.is_exhausted());
}

#[test]
fn legacy_swarm_groups_are_centred_and_colored_per_member() {
    let config = LegacyWaveConfig {
        interval: 1.0,
        cycles: 4,
        tanks_count: 0,
    };
    let spawning = Spawning::new(Config::default());
    let mut state = legacy(config, ColorBias::neutral());
    let mut random = SequenceRandom::new(vec![0.2, 0.8, 0.1]);
    let mut commands = Vec::new();
    spawning.spawn_enemies_if_needed(&mut state, 0.0, &mut random, &mut commands);

    let placed: Vec<(EnemyColor, f64)> = commands
        .iter()
        .map(|command| match command {
            Command::SpawnEnemy { color, position, .. } => (color.clone(), position.y),
        })
        .collect();
    assert_eq!(
        placed,
        vec![
            (EnemyColor::red(), 560.0),
            (EnemyColor::blue(), 600.0),
            (EnemyColor::red(), 640.0),
        ]
    );
}

#[test]
fn legacy_tanks_follow_burst_schedule() {
    let config = LegacyWaveConfig {
        interval: 0.5,
        cycles: 4,
        tanks_count: 4,
    };
    let spawning = Spawning::new(Config::default().with_swarm_group_size(1));
    let mut state = legacy(config, ColorBias::neutral());
    assert_eq!(state.tank_bursts().positions(), &[1, 2, 3, 4]);

    let mut commands = Vec::new();
    let mut random = SequenceRandom::constant(0.5);
    for _ in 0..8 {
        spawning.spawn_enemies_if_needed(&mut state, 0.5, &mut random, &mut commands);
    }
    assert_eq!(enemy_types(&commands), vec![EnemyType::tank(); 4]);
}

#[test]
fn override_type_bypasses_burst_schedule() {
    let config = LegacyWaveConfig {
        interval: 1.0,
        cycles: 2,
        tanks_count: 2,
    };
    let spawning = Spawning::new(Config::default());
    let mut state = legacy(config, ColorBias::neutral());
    let mut commands = Vec::new();
    spawning.spawn_interval_enemy(
        &mut state,
        Some(&EnemyType::swarm()),
        &mut SequenceRandom::constant(0.5),
        &mut commands,
    );
    assert_eq!(commands.len(), 3);
    assert_eq!(state.spawned(), 1);
    assert_eq!(state.determine_enemy_type(None), EnemyType::tank());
}

#[test]
fn missing_legacy_config_spawns_nothing() {
    let spawning = Spawning::new(Config::default());
    let mut state = WaveRuntimeState::new();
    let mut random = SequenceRandom::default();
    state.begin_legacy(WaveNumber::new(7), None, ColorBias::neutral(), &mut random);
    let mut commands = Vec::new();
    spawning.spawn_enemies_if_needed(&mut state, 5.0, &mut random, &mut commands);
    assert!(commands.is_empty());
    assert!(state.is_exhausted());
    assert!(state.tank_bursts().positions().is_empty());
}

#[test]
fn deterministic_replay_produces_identical_sequence() {
    fn replay(seed: u64) -> Vec<Command> {
        let mut events = Vec::new();
        for index in 0..12 {
            let enemy_type = if index % 4 == 0 {
                EnemyType::tank()
            } else {
                EnemyType::swarm()
            };
            let mut spawn = event(f64::from(index) * 0.3, enemy_type);
            spawn.group_size = 1 + index % 3;
            events.push(spawn);
        }
        let plan = WavePlan::new(WaveNumber::new(4), 0.0, events, Vec::new());
        let mut random = RngSource::seeded(seed);
        let mut state = WaveRuntimeState::new();
        let bias = ColorBias::roll(&mut random, 0.35);
        state.begin_scheduled(&plan, bias, &mut random);

        let spawning = Spawning::new(Config::default());
        let mut commands = Vec::new();
        for _ in 0..60 {
            spawning.spawn_enemies_if_needed(&mut state, 1.0 / 15.0, &mut random, &mut commands);
        }
        assert!(state.is_exhausted(), "four seconds cover every event");
        commands
    }

    let first = replay(0x4d59_5df4_d0f3_3173);
    let second = replay(0x4d59_5df4_d0f3_3173);
    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.len(), 24);
}
