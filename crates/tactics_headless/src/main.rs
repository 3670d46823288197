//! Headless tactics runner.
//!
//! This binary runs encounters without graphics, controlled via JSON on
//! stdin/stdout. Designed for scripted controllers and CI checks.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p tactics_headless -- run --scenario infiltration
//!
//! # Show a path on the map
//! cargo run -p tactics_headless -- path --from 1,4 --to 9,4
//!
//! # Show a unit's movement range
//! cargo run -p tactics_headless -- range --unit 1 --ap 6
//!
//! # Print turn order for a few rounds
//! cargo run -p tactics_headless -- rounds --count 3 --seed 7
//!
//! # Split a long move into per-round segments
//! cargo run -p tactics_headless -- plan --unit 1 --to 18,9
//!
//! # Verify determinism
//! cargo run -p tactics_headless -- verify --seed 12345 --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_core::grid::TilePos;
use tactics_core::session::TacticalSession;
use tactics_core::units::UnitId;
use tactics_headless::{
    ascii_visualizer::{render_ascii, AsciiConfig, Overlay},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
    verify::verify_determinism,
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless tactics runner for scripted testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Built-in scenario name or path to a RON scenario file
    #[arg(short, long, global = true, default_value = "infiltration")]
    scenario: String,

    /// Initiative seed (defaults to the scenario's own)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive JSON-lines session
    Run {
        /// Output state after every state-changing command
        #[arg(long)]
        auto_state: bool,
    },

    /// Find a path and draw it
    Path {
        /// Start tile as x,y
        #[arg(long, value_parser = parse_tile)]
        from: TilePos,

        /// Goal tile as x,y
        #[arg(long, value_parser = parse_tile)]
        to: TilePos,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Draw a unit's movement range
    Range {
        /// Unit id
        #[arg(short, long)]
        unit: UnitId,

        /// AP budget (defaults to the unit's max AP)
        #[arg(long)]
        ap: Option<u32>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the turn queue for several rounds
    Rounds {
        /// Number of rounds
        #[arg(short, long, default_value = "3")]
        count: u32,
    },

    /// Split a move into per-round segments
    Plan {
        /// Unit id
        #[arg(short, long)]
        unit: UnitId,

        /// Destination tile as x,y
        #[arg(long, value_parser = parse_tile)]
        to: TilePos,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Turns per run
        #[arg(short, long, default_value = "60")]
        turns: u32,
    },
}

fn parse_tile(s: &str) -> Result<TilePos, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{s}'"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in '{s}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in '{s}': {e}"))?;
    Ok(TilePos::new(x, y))
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let scenario = match Scenario::resolve(&cli.scenario) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Run { auto_state }) => cmd_run(&scenario, cli.seed, auto_state),
        Some(Commands::Path { from, to, no_color }) => {
            cmd_path(&scenario, cli.seed, from, to, !no_color);
        }
        Some(Commands::Range { unit, ap, no_color }) => {
            cmd_range(&scenario, cli.seed, unit, ap, !no_color);
        }
        Some(Commands::Rounds { count }) => cmd_rounds(&scenario, cli.seed, count),
        Some(Commands::Plan { unit, to }) => cmd_plan(&scenario, cli.seed, unit, to),
        Some(Commands::Verify { runs, turns }) => {
            cmd_verify(&scenario, cli.seed.unwrap_or(12345), runs, turns);
        }
        None => cmd_run(&scenario, cli.seed, false),
    }
}

fn build_session(scenario: &Scenario, seed: Option<u64>) -> TacticalSession {
    match scenario.build_session(seed) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to build scenario '{}': {}", scenario.name, e);
            std::process::exit(1);
        }
    }
}

/// Run an interactive session over stdin/stdout
fn cmd_run(scenario: &Scenario, seed: Option<u64>, auto_state: bool) {
    tracing::info!("Starting headless runner: {}", scenario.name);

    let mut runner = HeadlessRunner::new(build_session(scenario, seed), scenario.name.clone())
        .with_config(HeadlessConfig {
            auto_state_output: auto_state,
        });

    if let Err(e) = runner.run() {
        eprintln!("I/O error: {}", e);
        std::process::exit(1);
    }
}

/// Find and draw a path
fn cmd_path(scenario: &Scenario, seed: Option<u64>, from: TilePos, to: TilePos, use_color: bool) {
    let mut session = build_session(scenario, seed);
    let path = session.find_path(from, to);

    let overlay = Overlay {
        path: path.as_ref(),
        range: None,
    };
    let config = AsciiConfig {
        use_color,
        ..AsciiConfig::default()
    };
    print!("{}", render_ascii(&session, &overlay, &config));

    match path {
        Some(path) => println!(
            "path {} -> {}: {} steps, cost {:.3}",
            from,
            to,
            path.steps(),
            path.cost().to_num::<f64>()
        ),
        None => {
            println!("no path {} -> {}", from, to);
            std::process::exit(2);
        }
    }
}

/// Draw a movement range
fn cmd_range(scenario: &Scenario, seed: Option<u64>, unit: UnitId, ap: Option<u32>, use_color: bool) {
    let session = build_session(scenario, seed);
    let Some(kind) = session.roster().get(unit).map(|u| u.kind) else {
        eprintln!("No unit {} in scenario '{}'", unit, scenario.name);
        std::process::exit(1);
    };
    let ap = ap.unwrap_or_else(|| session.scheduler().max_ap(kind));

    let range = match session.movement_range_with(unit, ap) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Range failed: {}", e);
            std::process::exit(1);
        }
    };

    let overlay = Overlay {
        path: None,
        range: Some(&range),
    };
    let config = AsciiConfig {
        use_color,
        ..AsciiConfig::default()
    };
    print!("{}", render_ascii(&session, &overlay, &config));
    println!("unit {} with {} AP reaches {} tiles", unit, ap, range.len());
}

/// Print turn order for several rounds
fn cmd_rounds(scenario: &Scenario, seed: Option<u64>, count: u32) {
    let mut session = build_session(scenario, seed);
    if session.begin_encounter().is_none() {
        println!("no units to schedule");
        return;
    }

    for _ in 0..count {
        let scheduler = session.scheduler();
        println!("round {}", scheduler.round());
        for (slot, entry) in scheduler.queue().iter().enumerate() {
            println!(
                "  {:>2}. unit {:>3} {:?}/{:?} speed {:>2} initiative {:>3} ap {:>2}",
                slot + 1,
                entry.unit,
                entry.team,
                entry.kind,
                entry.speed,
                entry.initiative,
                entry.max_ap
            );
        }

        let round = scheduler.round();
        while session.scheduler().round() == round {
            if session.end_turn().is_none() {
                println!("encounter over");
                return;
            }
        }
    }
}

/// Print a multi-round movement plan
fn cmd_plan(scenario: &Scenario, seed: Option<u64>, unit: UnitId, to: TilePos) {
    let mut session = build_session(scenario, seed);

    // Start turns until the unit is active so it has AP to plan with.
    let mut active = session.begin_encounter();
    let mut guard = session.roster().len();
    while active.is_some() && active != Some(unit) && guard > 0 {
        active = session.end_turn();
        guard -= 1;
    }
    if active != Some(unit) {
        eprintln!("Unit {} never became active", unit);
        std::process::exit(1);
    }

    match session.plan_move(unit, to) {
        Ok(plan) => {
            for segment in plan.segments() {
                println!(
                    "round +{}: {} tiles, ends at {}, {} AP",
                    segment.round_offset,
                    segment.tiles.len(),
                    segment
                        .end()
                        .map_or_else(|| "-".to_string(), |p| p.to_string()),
                    segment.ap_cost()
                );
            }
            println!(
                "{} rounds, total cost {:.3}",
                plan.rounds(),
                plan.total_cost().to_num::<f64>()
            );
        }
        Err(e) => {
            eprintln!("Plan failed: {}", e);
            std::process::exit(2);
        }
    }
}

/// Verify determinism
fn cmd_verify(scenario: &Scenario, seed: u64, runs: u32, turns: u32) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs, {} turns)",
        scenario.name,
        seed,
        runs,
        turns
    );

    match verify_determinism(scenario, seed, runs, turns) {
        Ok(true) => eprintln!("PASS: All {} runs produced identical results", runs),
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: {}", e);
            std::process::exit(1);
        }
    }
}
