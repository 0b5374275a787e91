//! Utilities for spawning a UCI chess engine and probing its time management.
//!
//! A scripted game is replayed move by move. On every ply of the probed side the
//! harness sends the position and a `ctpm` time query, records the think time the
//! engine reports, and charges it against a simulated clock until the game ends
//! or the clock runs out.
//!
//! Typical usage:
//! ```no_run
//! use clock_probe_harness::{replay_game, Color, EngineConfig, GameRecord, ProtocolDriver};
//!
//! let config = EngineConfig::new("/path/to/engine");
//! let moves = "e2e4 e7e5 g1f3";
//! let game = GameRecord::from_movetext("opening", moves, Color::Black, 10_000);
//!
//! let mut driver = ProtocolDriver::start(&config).expect("engine should launch");
//! let report = replay_game(&mut driver, &game).expect("replay should finish");
//! for sample in &report.samples {
//!     println!("ply {} -> {} ms", sample.ply, sample.allocated_ms);
//! }
//! driver.shutdown().expect("engine should exit");
//! ```

mod clock;
mod config;
mod error;
mod process;
mod protocol;
mod recorder;
mod replay;

pub use clock::{ClockState, ClockVerdict};
pub use config::{Color, EngineConfig, GameRecord, GameSuite};
pub use error::{HarnessError, HarnessResult, PipeName};
pub use process::{EngineProcess, LogLine, LogStream};
pub use protocol::{
    encode_position, encode_time_query, parse_allocation, ProtocolDriver, TIME_QUERY_COMMAND,
};
pub use recorder::{ResultRecorder, TimeSample};
pub use replay::{
    replay_game, replay_suite, GameReplayer, ReplayOutcome, ReplayReport, ReplayState,
};
