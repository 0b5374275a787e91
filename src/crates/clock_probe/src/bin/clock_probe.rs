use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use clock_probe_harness::{
    replay_suite, Color, EngineConfig, GameRecord, GameSuite, HarnessResult, ProtocolDriver,
    ReplayReport,
};

/// Replay scripted games against a UCI engine and record its time allocation per move.
#[derive(Parser, Debug)]
#[command(name = "clock-probe", version)]
struct Cli {
    /// Engine binary to spawn.
    #[arg(long)]
    engine: PathBuf,

    /// Extra argument passed to the engine (repeatable).
    #[arg(long = "engine-arg")]
    engine_args: Vec<String>,

    /// JSON game suite. Without it the built-in reference game is replayed.
    #[arg(long)]
    games: Option<PathBuf>,

    /// Probed side for the reference game.
    #[arg(long, value_enum)]
    color: Option<Side>,

    /// Initial clock budget for the reference game.
    #[arg(long)]
    time_ms: Option<u64>,

    /// Per-move increment for the reference game.
    #[arg(long)]
    increment_ms: Option<u64>,

    /// Fail a query when the engine takes longer than this to reply.
    #[arg(long)]
    reply_timeout_ms: Option<u64>,

    /// Write the JSON reports here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    White,
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    run(cli)
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("tracing init error: {err}"))
}

fn run(cli: Cli) -> Result<()> {
    let games = load_games(&cli)?;

    let mut config = EngineConfig::new(&cli.engine);
    for arg in &cli.engine_args {
        config = config.with_arg(arg.clone());
    }
    if let Some(ms) = cli.reply_timeout_ms {
        config = config.with_reply_timeout(Duration::from_millis(ms));
    }

    let mut driver = ProtocolDriver::start(&config)
        .with_context(|| format!("failed to start engine {}", cli.engine.display()))?;
    let replayed = replay_suite(&mut driver, &games.games);
    let reports = settle(replayed, driver.shutdown())?;

    for report in &reports {
        summarize(report);
    }

    let json = serde_json::to_string_pretty(&reports)?;
    match &cli.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Prefer the replay error over a shutdown error so the cause of an abort is kept.
fn settle<T>(replayed: HarnessResult<T>, shutdown: HarnessResult<()>) -> Result<T> {
    match (replayed, shutdown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(anyhow!(err).context("engine shutdown failed")),
        (Err(err), Ok(())) => Err(anyhow!(err).context("replay aborted")),
        (Err(err), Err(shutdown_err)) => {
            warn!(error = %shutdown_err, "engine shutdown failed after aborted replay");
            Err(anyhow!(err).context("replay aborted"))
        }
    }
}

fn load_games(cli: &Cli) -> Result<GameSuite> {
    if let Some(path) = &cli.games {
        return GameSuite::from_file(path)
            .with_context(|| format!("failed to load games from {}", path.display()));
    }

    let mut game = GameRecord::reference_game();
    if let Some(side) = cli.color {
        game = game.with_probed_color(side.into());
    }
    if let Some(ms) = cli.time_ms {
        game = game.with_initial_time(ms);
    }
    if let Some(ms) = cli.increment_ms {
        game = game.with_increment(ms);
    }
    Ok(GameSuite::default().with_game(game))
}

fn summarize(report: &ReplayReport) {
    let total: i64 = report.samples.iter().map(|sample| sample.allocated_ms).sum();
    info!(
        game = %report.name,
        side = %report.probed_color,
        outcome = ?report.outcome,
        moves = report.probed_plies,
        total_ms = total,
        remaining_ms = report.remaining_ms,
        "game summary"
    );
}
