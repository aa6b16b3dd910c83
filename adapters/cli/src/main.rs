#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for inspecting and simulating formation waves.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use formation_defence_config::GameConfig;
use formation_defence_core::{
    Command, EnemyColor, Event, SpawnEvent, SpawnMode, WaveNumber, WavePlan,
};
use formation_defence_system_formations::PlanOptions;
use formation_defence_system_waves::{plan_for_seed, WaveDirector};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Frames after which a simulated wave is considered stuck.
const MAX_SIMULATED_FRAMES: u64 = 5_000_000;

#[derive(Debug, Parser)]
#[command(name = "formation-defence")]
#[command(about = "Plan, inspect and simulate formation-driven enemy waves")]
struct Cli {
    /// TOML configuration file. The bundled balance data is used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log planner and scheduler decisions.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// List the parsed formations.
    Formations,
    /// Plan a single wave.
    Plan {
        /// Wave number, starting at 1.
        #[arg(long, default_value_t = 1)]
        wave: u32,
        /// Session seed. A random seed is used when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Spend this budget instead of the wave's resolved difficulty.
        #[arg(long)]
        budget: Option<f64>,
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the difficulty budget of each wave.
    Curve {
        /// Number of waves to print.
        #[arg(long, default_value_t = 30)]
        waves: u32,
    },
    /// Run waves frame by frame and summarise each one.
    Simulate {
        /// Number of waves to run.
        #[arg(long, default_value_t = 5)]
        waves: u32,
        /// Session seed. A random seed is used when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Frame duration in seconds.
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,
        /// Seconds an enemy stays alive after spawning.
        #[arg(long, default_value_t = 4.0)]
        enemy_lifetime: f64,
    },
}

/// Entry point for the formation-defence command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => GameConfig::bundled().context("bundled configuration is invalid")?,
    };

    match cli.command {
        CliCommand::Formations => list_formations(&config),
        CliCommand::Plan {
            wave,
            seed,
            budget,
            json,
        } => plan(&config, wave, seed, budget, json),
        CliCommand::Curve { waves } => curve(&config, waves),
        CliCommand::Simulate {
            waves,
            seed,
            dt,
            enemy_lifetime,
        } => simulate(&config, waves, seed, dt, enemy_lifetime),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_seed(config: &GameConfig, seed: Option<u64>) -> u64 {
    seed.or(config.seed).unwrap_or_else(rand::random)
}

fn wave_number(wave: u32) -> Result<WaveNumber> {
    if wave == 0 {
        bail!("waves are numbered from 1");
    }
    Ok(WaveNumber::new(wave))
}

fn list_formations(config: &GameConfig) -> Result<()> {
    let manager = config
        .formation_manager()
        .context("configuration defines no formations")?;
    println!(
        "{:<24} {:<24} {:>6} {:>5} {:>5} {:>8} {:>6}",
        "id", "label", "cost", "min", "ships", "duration", "gap"
    );
    for formation in manager.formations() {
        let gap = formation
            .gap()
            .map_or_else(|| "-".to_owned(), |gap| format!("{gap:.2}"));
        println!(
            "{:<24} {:<24} {:>6} {:>5} {:>5} {:>8.2} {:>6}",
            formation.id().as_str(),
            formation.label(),
            formation.difficulty(),
            formation.min_wave().get(),
            formation.ships().len(),
            formation.duration(),
            gap
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    wave: u32,
    seed: u64,
    budget: f64,
    total_difficulty: f64,
    remaining_difficulty: f64,
    total_enemies: usize,
    total_spawns: u32,
    selections: Vec<&'a str>,
    events: &'a [SpawnEvent],
}

impl<'a> PlanReport<'a> {
    fn new(plan: &'a WavePlan, seed: u64, budget: f64) -> Self {
        Self {
            wave: plan.wave().get(),
            seed,
            budget,
            total_difficulty: plan.total_difficulty(),
            remaining_difficulty: plan.remaining_difficulty(),
            total_enemies: plan.total_enemies(),
            total_spawns: plan.total_spawns(),
            selections: plan
                .selections()
                .iter()
                .map(|formation| formation.id().as_str())
                .collect(),
            events: plan.events(),
        }
    }
}

fn plan(
    config: &GameConfig,
    wave: u32,
    seed: Option<u64>,
    budget: Option<f64>,
    json: bool,
) -> Result<()> {
    let wave = wave_number(wave)?;
    let manager = config
        .formation_manager()
        .context("configuration defines no formations")?;
    let seed = resolve_seed(config, seed);
    let options = PlanOptions {
        total_difficulty: budget,
        ..config.plan_options()
    };
    let budget = budget.unwrap_or_else(|| manager.resolve_budget(wave));

    let planned = plan_for_seed(
        &manager,
        wave,
        seed,
        &options,
        config.color.min_difference,
    );
    let Some(plan) = planned else {
        if json {
            println!("null");
        } else {
            println!(
                "wave {wave}: no formation fits budget {budget}; \
                 fixed-interval spawning applies"
            );
        }
        return Ok(());
    };

    if json {
        let report = PlanReport::new(&plan, seed, budget);
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialise wave plan")?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "wave {wave} (seed {seed}): budget {budget}, spent {}, remaining {}",
        plan.total_difficulty(),
        plan.remaining_difficulty()
    );
    for formation in plan.selections() {
        println!("  + {} (cost {})", formation.label(), formation.difficulty());
    }
    for event in plan.events() {
        let color = event.color.as_ref().map_or("auto", EnemyColor::as_str);
        let y = event
            .y
            .map_or_else(|| "-".to_owned(), |y| format!("{y}"));
        println!(
            "  {:>7.2}s {:<6} x{} color={:<5} y={:<5} [{}]",
            event.time,
            event.enemy_type.as_str(),
            event.group_size,
            color,
            y,
            event.formation_id.as_str()
        );
    }
    Ok(())
}

fn curve(config: &GameConfig, waves: u32) -> Result<()> {
    let table = config.difficulty_table();
    let legacy = config.legacy_table();
    println!(
        "{:>5} {:>8} {:>8} {:>9} {:>7} {:>6}",
        "wave", "base", "budget", "interval", "cycles", "tanks"
    );
    for wave in (1..=waves).map(WaveNumber::new) {
        let fallback = legacy.config_for_wave(wave);
        println!(
            "{:>5} {:>8} {:>8} {:>9} {:>7} {:>6}",
            wave.get(),
            table.resolve_unscaled(wave),
            table.resolve(wave),
            fallback.map_or_else(|| "-".to_owned(), |config| format!("{:.3}", config.interval)),
            fallback.map_or_else(|| "-".to_owned(), |config| config.cycles.to_string()),
            fallback.map_or_else(|| "-".to_owned(), |config| config.tanks_count.to_string()),
        );
    }
    Ok(())
}

#[derive(Debug, Default)]
struct WaveSummary {
    mode: Option<SpawnMode>,
    expected: u32,
    enemies: usize,
    tanks: usize,
    red: usize,
    seconds: f64,
}

fn simulate(
    config: &GameConfig,
    waves: u32,
    seed: Option<u64>,
    dt: f64,
    enemy_lifetime: f64,
) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {dt}");
    }
    if !(enemy_lifetime.is_finite() && enemy_lifetime >= 0.0) {
        bail!("--enemy-lifetime must be a non-negative number of seconds, got {enemy_lifetime}");
    }

    let seed = resolve_seed(config, seed);
    let mut director =
        WaveDirector::new(config.director_config(seed), config.formation_manager());
    let mut live: Vec<f64> = Vec::new();
    let mut commands = Vec::new();
    let mut events = Vec::new();
    println!("simulating {waves} waves with seed {seed}");

    for _ in 0..waves {
        let wave = director.current_wave();
        let mut summary = WaveSummary::default();
        if !director.start_wave(&mut events) {
            bail!("wave {wave} could not be started");
        }

        let mut frames = 0_u64;
        while director.is_wave_in_progress() {
            frames += 1;
            if frames > MAX_SIMULATED_FRAMES {
                bail!("wave {wave} did not complete within {MAX_SIMULATED_FRAMES} frames");
            }
            for remaining in &mut live {
                *remaining -= dt;
            }
            live.retain(|remaining| *remaining > 0.0);

            director.tick(dt, live.len(), &mut commands, &mut events);
            summary.seconds += dt;

            for command in commands.drain(..) {
                let Command::SpawnEnemy {
                    enemy_type, color, ..
                } = command;
                summary.enemies += 1;
                summary.tanks += usize::from(enemy_type.is_tank());
                summary.red += usize::from(color == EnemyColor::red());
                live.push(enemy_lifetime);
            }

            for event in events.drain(..) {
                match event {
                    Event::WaveStarted {
                        mode,
                        expected_spawns,
                        ..
                    } => {
                        summary.mode = Some(mode);
                        summary.expected = expected_spawns;
                    }
                    Event::WaveCompleted { .. } => {}
                }
            }
        }

        let selections = director
            .plan()
            .map_or(0, |plan| plan.selections().len());
        println!(
            "wave {:>3}: {:<9} expected {:>3} spawns, {:>3} enemies \
             ({} tanks, {} red), {} formations, {:.1}s",
            wave.get(),
            summary.mode.map_or("-", |mode| match mode {
                SpawnMode::Scheduled => "scheduled",
                SpawnMode::Legacy => "legacy",
            }),
            summary.expected,
            summary.enemies,
            summary.tanks,
            summary.red,
            selections,
            summary.seconds
        );
    }
    Ok(())
}
