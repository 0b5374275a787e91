//! UCI-flavoured command framing and reply decoding on top of [`EngineProcess`].

use crate::config::{Color, EngineConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::process::EngineProcess;

/// Command asking the engine how long it would think in the current position.
pub const TIME_QUERY_COMMAND: &str = "ctpm";

const NEW_GAME_COMMAND: &str = "ucinewgame";
const REPLY_DELIMITER: char = ':';

/// Render the position command for a move history starting at the initial position.
pub fn encode_position<S: AsRef<str>>(moves: &[S]) -> String {
    let mut line = String::from("position startpos moves");
    for token in moves {
        line.push(' ');
        line.push_str(token.as_ref());
    }
    line
}

/// Render the time query. The increment field is only present when `increment_ms` is nonzero.
pub fn encode_time_query(remaining_ms: i64, increment_ms: u64, side: Color) -> String {
    let mut line = format!("{TIME_QUERY_COMMAND} {} {remaining_ms}", side.time_field());
    if increment_ms != 0 {
        line.push_str(&format!(" {} {increment_ms}", side.increment_field()));
    }
    line
}

/// Decode a `<label>:<integer>` reply into milliseconds.
///
/// Only the text after the first delimiter is considered, trimmed of whitespace.
pub fn parse_allocation(line: &str) -> HarnessResult<i64> {
    let (_, value) = line
        .split_once(REPLY_DELIMITER)
        .ok_or_else(|| HarnessError::malformed(line, "missing ':' delimiter"))?;
    let value = value.trim();
    let allocated: i64 = value.parse().map_err(|err| {
        HarnessError::malformed(line, format!("{value:?} is not an integer: {err}"))
    })?;
    if allocated < 0 {
        return Err(HarnessError::malformed(line, "negative allocation"));
    }
    Ok(allocated)
}

/// Issues protocol-shaped requests to a single engine process.
///
/// At most one reply is ever outstanding: every query writes its command and
/// reads the answer before returning.
pub struct ProtocolDriver {
    process: EngineProcess,
}

impl ProtocolDriver {
    /// Spawn the engine described by `config` and wrap it.
    pub fn start(config: &EngineConfig) -> HarnessResult<Self> {
        Ok(Self::new(EngineProcess::start(config)?))
    }

    pub fn new(process: EngineProcess) -> Self {
        Self { process }
    }

    /// Reset the engine's session state. No reply is expected.
    pub fn reset_game(&mut self) -> HarnessResult<()> {
        self.process.send_line(NEW_GAME_COMMAND)
    }

    /// Send the full move history played so far. No reply is expected.
    pub fn set_position<S: AsRef<str>>(&mut self, moves_played: &[S]) -> HarnessResult<()> {
        self.process.send_line(&encode_position(moves_played))
    }

    /// Ask for the think time the engine would allocate to its next move.
    pub fn query_time_allocation(
        &mut self,
        remaining_ms: i64,
        increment_ms: u64,
        side: Color,
    ) -> HarnessResult<i64> {
        self.process
            .send_line(&encode_time_query(remaining_ms, increment_ms, side))?;
        let reply = self.process.read_line()?;
        parse_allocation(&reply)
    }

    pub fn process(&self) -> &EngineProcess {
        &self.process
    }

    /// Shut the underlying engine down. Safe to call more than once.
    pub fn shutdown(&mut self) -> HarnessResult<()> {
        self.process.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_lists_full_history() {
        let moves = ["e2e4", "e7e5", "g1f3"];
        assert_eq!(
            encode_position(&moves),
            "position startpos moves e2e4 e7e5 g1f3"
        );
    }

    #[test]
    fn time_query_omits_zero_increment() {
        assert_eq!(encode_time_query(10_000, 0, Color::Black), "ctpm btime 10000");
        assert_eq!(encode_time_query(750, 0, Color::White), "ctpm wtime 750");
    }

    #[test]
    fn time_query_carries_side_specific_increment() {
        assert_eq!(
            encode_time_query(5_000, 100, Color::White),
            "ctpm wtime 5000 winc 100"
        );
        assert_eq!(
            encode_time_query(5_000, 100, Color::Black),
            "ctpm btime 5000 binc 100"
        );
    }

    #[test]
    fn parses_value_after_first_delimiter() {
        assert_eq!(parse_allocation("info:1234").unwrap(), 1234);
        assert_eq!(parse_allocation("time allocated: 87 \r").unwrap(), 87);
    }

    #[test]
    fn rejects_missing_delimiter() {
        let err = parse_allocation("noDelimiterHere").expect_err("must fail");
        assert!(err.is_protocol_error());
    }

    #[test]
    fn rejects_non_numeric_value() {
        let err = parse_allocation("x: not-a-number").expect_err("must fail");
        assert!(err.is_protocol_error());
        // Only the first delimiter splits; the rest belongs to the value.
        assert!(parse_allocation("a:1:2").is_err());
    }

    #[test]
    fn rejects_negative_allocation() {
        let err = parse_allocation("info:-5").expect_err("must fail");
        assert!(matches!(err, HarnessError::MalformedReply { .. }));
    }
}
