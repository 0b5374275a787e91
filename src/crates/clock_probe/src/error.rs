use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Result alias for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Pipe of the engine process that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeName {
    Command,
    Reply,
    Diagnostic,
}

impl fmt::Display for PipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipeName::Command => "command",
            PipeName::Reply => "reply",
            PipeName::Diagnostic => "diagnostic",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while spawning or driving the engine process.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to spawn engine: {0}")]
    EngineStart(String),
    #[error("engine terminated early with status {0}")]
    EngineExited(ExitStatus),
    #[error("engine closed its {0} pipe")]
    PipeClosed(PipeName),
    #[error("engine did not reply within {0:?}")]
    ReplyTimeout(Duration),
    #[error("engine session already shut down")]
    ShutDown,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed engine reply {line:?}: {reason}")]
    MalformedReply { line: String, reason: String },
    #[error("invalid game record: {0}")]
    InvalidGame(String),
    #[error("failed to parse game file: {0}")]
    GameFile(#[from] serde_json::Error),
}

impl HarnessError {
    pub(crate) fn engine_start(err: impl Into<String>) -> Self {
        HarnessError::EngineStart(err.into())
    }

    pub(crate) fn malformed(line: impl Into<String>, reason: impl Into<String>) -> Self {
        HarnessError::MalformedReply {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_game(message: impl Into<String>) -> Self {
        HarnessError::InvalidGame(message.into())
    }

    /// True for failures of the engine process or its pipes.
    pub fn is_process_error(&self) -> bool {
        matches!(
            self,
            HarnessError::EngineStart(_)
                | HarnessError::EngineExited(_)
                | HarnessError::PipeClosed(_)
                | HarnessError::ReplyTimeout(_)
                | HarnessError::ShutDown
                | HarnessError::Io(_)
        )
    }

    /// True when a reply line could not be decoded.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, HarnessError::MalformedReply { .. })
    }
}
