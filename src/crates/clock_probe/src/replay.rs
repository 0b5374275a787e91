use serde::Serialize;
use tracing::{info, warn};

use crate::clock::{ClockState, ClockVerdict};
use crate::config::{Color, GameRecord};
use crate::error::HarnessResult;
use crate::protocol::ProtocolDriver;
use crate::recorder::{ResultRecorder, TimeSample};

/// Progress of a single game replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    NotStarted,
    Replaying,
    Completed,
    Forfeited,
}

/// Terminal outcome of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayOutcome {
    Completed,
    Forfeited,
}

/// Result of replaying one game, ready to hand to a plotter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub name: String,
    pub probed_color: Color,
    pub outcome: ReplayOutcome,
    pub samples: Vec<TimeSample>,
    pub remaining_ms: i64,
    pub probed_plies: u32,
}

/// Walks a game's plies, querying the engine on every ply of the probed side.
#[derive(Debug)]
pub struct GameReplayer<'a> {
    game: &'a GameRecord,
    state: ReplayState,
}

impl<'a> GameReplayer<'a> {
    pub fn new(game: &'a GameRecord) -> Self {
        Self {
            game,
            state: ReplayState::NotStarted,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Replay the game from a fresh engine session and clock.
    ///
    /// Errors leave the replayer in [`ReplayState::Replaying`].
    pub fn run(&mut self, driver: &mut ProtocolDriver) -> HarnessResult<ReplayReport> {
        let game = self.game;
        game.validate()?;

        let side = game.probed_color();
        let increment_ms = game.increment_ms();
        let mut clock = ClockState::new(
            i64::try_from(game.initial_time_ms()).unwrap_or(i64::MAX),
            i64::try_from(increment_ms).unwrap_or(i64::MAX),
        );
        let mut recorder = ResultRecorder::new();
        let mut history: Vec<&str> = Vec::with_capacity(game.moves().len());

        info!(game = game.name(), %side, plies = game.moves().len(), "replay started");
        self.state = ReplayState::Replaying;
        driver.reset_game()?;

        let mut outcome = ReplayOutcome::Completed;
        for (ply, token) in game.moves().iter().enumerate() {
            history.push(token);
            if Color::of_ply(ply) != side {
                continue;
            }

            driver.set_position(&history)?;
            let allocated_ms =
                driver.query_time_allocation(clock.remaining_ms(), increment_ms, side)?;
            recorder.record(ply, allocated_ms);

            if clock.charge(allocated_ms) == ClockVerdict::Forfeit {
                warn!(
                    game = game.name(),
                    ply,
                    allocated_ms,
                    remaining_ms = clock.remaining_ms(),
                    "probed side ran out of time"
                );
                outcome = ReplayOutcome::Forfeited;
                break;
            }
        }

        self.state = match outcome {
            ReplayOutcome::Completed => ReplayState::Completed,
            ReplayOutcome::Forfeited => ReplayState::Forfeited,
        };
        info!(
            game = game.name(),
            ?outcome,
            samples = recorder.len(),
            remaining_ms = clock.remaining_ms(),
            "replay finished"
        );

        Ok(ReplayReport {
            name: game.name().to_string(),
            probed_color: side,
            outcome,
            samples: recorder.into_samples(),
            remaining_ms: clock.remaining_ms(),
            probed_plies: clock.probed_plies(),
        })
    }
}

/// Replay a single game against the engine behind `driver`.
pub fn replay_game(driver: &mut ProtocolDriver, game: &GameRecord) -> HarnessResult<ReplayReport> {
    GameReplayer::new(game).run(driver)
}

/// Replay games one after another on the same engine; the first error aborts the rest.
pub fn replay_suite(
    driver: &mut ProtocolDriver,
    games: &[GameRecord],
) -> HarnessResult<Vec<ReplayReport>> {
    games.iter().map(|game| replay_game(driver, game)).collect()
}
