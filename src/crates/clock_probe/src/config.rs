use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// Process-level configuration for launching the engine binary.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the engine binary to spawn.
    pub binary_path: PathBuf,
    /// Additional CLI arguments passed through to the engine.
    pub extra_args: Vec<String>,
    /// Extra environment variables applied to the child process.
    pub env: BTreeMap<String, String>,
    /// Optional working directory override for the child process.
    pub working_directory: Option<PathBuf>,
    /// Upper bound on a single reply read. `None` blocks until the engine answers.
    pub reply_timeout: Option<Duration>,
    /// How long shutdown waits for the engine to exit after its command pipe closes.
    pub shutdown_grace: Duration,
}

impl EngineConfig {
    /// Create a new config targeting a specific engine binary.
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            extra_args: Vec::new(),
            env: BTreeMap::new(),
            working_directory: None,
            reply_timeout: None,
            shutdown_grace: Duration::from_secs(2),
        }
    }

    /// Add a passthrough CLI argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Add an environment variable override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Override the working directory for the spawned process.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Fail reply reads that take longer than `timeout`.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// Override the grace period granted to the engine during shutdown.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// Side to move. White moves on even plies, black on odd plies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Side that plays the ply at `index` of a game starting from the initial position.
    pub fn of_ply(index: usize) -> Self {
        if index % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Protocol field carrying this side's remaining clock time.
    pub fn time_field(self) -> &'static str {
        match self {
            Color::White => "wtime",
            Color::Black => "btime",
        }
    }

    /// Protocol field carrying this side's increment.
    pub fn increment_field(self) -> &'static str {
        match self {
            Color::White => "winc",
            Color::Black => "binc",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// Scripted game replayed against the engine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    name: String,
    moves: Vec<String>,
    probed_color: Color,
    initial_time_ms: u64,
    #[serde(default)]
    increment_ms: u64,
}

const REFERENCE_MOVES: &str = "g1f3 d7d5 g2g3 g7g6 f1g2 f8g7 e1g1 e7e5 c2c4 d5d4 b1a3 g8e7 \
    d2d3 e8g8 b2b4 a7a5 b4b5 b8d7 a3c2 f8e8 c1a3 e7f5 a1b1 d7b6 b1c1 g7h6 c1a1 b6a4 d1e1 a8a7 \
    f3d2 f5d6 e2e4 a7a8 f2f3 b7b6 f3f4 e5f4 e4e5 c8b7 g2b7 d6b7 g3f4 b7c5 a3c5 a4c5 d2e4 c5d3 \
    e1g3 d3f4 f1f4 e8e5 e4f6 g8g7 f4e4 e5e4 f6e4 g7g8 a1d1 h6g7 g3f3 a5a4 g1g2 c7c5 b5c6 a8c8 \
    c2b4 g7e5 e4g3 d8e7 b4d5 e7d8 d1f1 c8c6 f3f7 g8h8 f1e1";

impl GameRecord {
    /// Build a record without increment.
    pub fn new<I, S>(
        name: impl Into<String>,
        moves: I,
        probed_color: Color,
        initial_time_ms: u64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            moves: moves.into_iter().map(Into::into).collect(),
            probed_color,
            initial_time_ms,
            increment_ms: 0,
        }
    }

    /// Build a record from a space-separated move token string.
    pub fn from_movetext(
        name: impl Into<String>,
        movetext: &str,
        probed_color: Color,
        initial_time_ms: u64,
    ) -> Self {
        Self::new(name, movetext.split_whitespace(), probed_color, initial_time_ms)
    }

    /// Ten second game probing black, used when no game file is supplied.
    ///
    /// Sampling follows ply parity for the probed side: black is queried on its 38
    /// odd plies (indices 1 to 75) and never on white's 39 even plies.
    pub fn reference_game() -> Self {
        Self::from_movetext("reference", REFERENCE_MOVES, Color::Black, 10_000)
    }

    /// Set the per-move increment. Zero disables it.
    pub fn with_increment(mut self, increment_ms: u64) -> Self {
        self.increment_ms = increment_ms;
        self
    }

    /// Copy of this record probing a different side.
    pub fn with_probed_color(mut self, color: Color) -> Self {
        self.probed_color = color;
        self
    }

    /// Copy of this record with a different initial budget.
    pub fn with_initial_time(mut self, initial_time_ms: u64) -> Self {
        self.initial_time_ms = initial_time_ms;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn probed_color(&self) -> Color {
        self.probed_color
    }

    pub fn initial_time_ms(&self) -> u64 {
        self.initial_time_ms
    }

    pub fn increment_ms(&self) -> u64 {
        self.increment_ms
    }

    /// Number of plies that belong to the probed side.
    pub fn probed_plies(&self) -> usize {
        (0..self.moves.len())
            .filter(|&index| Color::of_ply(index) == self.probed_color)
            .count()
    }

    /// Reject records that cannot be framed into a single protocol line.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.name.trim().is_empty() {
            return Err(HarnessError::invalid_game("game name is empty"));
        }
        if i64::try_from(self.initial_time_ms).is_err()
            || i64::try_from(self.increment_ms).is_err()
        {
            return Err(HarnessError::invalid_game(format!(
                "{}: time values exceed the supported range",
                self.name
            )));
        }
        for (index, token) in self.moves.iter().enumerate() {
            if token.is_empty() || token.chars().any(char::is_whitespace) {
                return Err(HarnessError::invalid_game(format!(
                    "{}: move {index} ({token:?}) is not a single token",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Ordered set of games replayed one after another against a single engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSuite {
    pub games: Vec<GameRecord>,
}

impl GameSuite {
    /// Add a game to the end of the suite.
    pub fn with_game(mut self, game: GameRecord) -> Self {
        self.games.push(game);
        self
    }

    /// Parse a suite from JSON and validate every record.
    pub fn from_json(text: &str) -> HarnessResult<Self> {
        let suite: GameSuite = serde_json::from_str(text)?;
        for game in &suite.games {
            game.validate()?;
        }
        Ok(suite)
    }

    /// Read and parse a JSON suite file.
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ply_parity_decides_side() {
        assert_eq!(Color::of_ply(0), Color::White);
        assert_eq!(Color::of_ply(1), Color::Black);
        assert_eq!(Color::of_ply(76), Color::White);
    }

    #[test]
    fn field_names_follow_color() {
        assert_eq!(Color::White.time_field(), "wtime");
        assert_eq!(Color::White.increment_field(), "winc");
        assert_eq!(Color::Black.time_field(), "btime");
        assert_eq!(Color::Black.increment_field(), "binc");
    }

    #[test]
    fn reference_game_matches_recorded_script() {
        let game = GameRecord::reference_game();
        assert_eq!(game.moves().len(), 77);
        assert_eq!(game.moves()[0], "g1f3");
        assert_eq!(game.moves()[76], "f1e1");
        assert_eq!(game.probed_color(), Color::Black);
        assert_eq!(game.initial_time_ms(), 10_000);
        assert_eq!(game.increment_ms(), 0);
        assert_eq!(game.probed_plies(), 38);
        game.validate().expect("reference game is valid");
    }

    #[test]
    fn validate_rejects_multi_token_moves() {
        let game = GameRecord::new("bad", ["e2e4", "e7e5 g1f3"], Color::White, 1_000);
        let err = game.validate().expect_err("embedded space must be rejected");
        assert!(matches!(err, HarnessError::InvalidGame(_)));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let game = GameRecord::new("  ", ["e2e4"], Color::White, 1_000);
        assert!(game.validate().is_err());
    }

    #[test]
    fn suite_parses_with_default_increment() {
        let suite = GameSuite::from_json(
            r#"{"games": [
                {"name": "short", "moves": ["e2e4", "e7e5"], "probed_color": "black", "initial_time_ms": 5000},
                {"name": "inc", "moves": ["d2d4"], "probed_color": "white", "initial_time_ms": 3000, "increment_ms": 50}
            ]}"#,
        )
        .expect("suite should parse");

        assert_eq!(suite.games.len(), 2);
        assert_eq!(suite.games[0].increment_ms(), 0);
        assert_eq!(suite.games[0].probed_color(), Color::Black);
        assert_eq!(suite.games[1].increment_ms(), 50);
    }

    #[test]
    fn suite_loads_from_file_and_validates() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"games": [{{"name": "spaced", "moves": ["e2e4 e7e5"], "probed_color": "white", "initial_time_ms": 1000}}]}}"#
        )
        .expect("write suite");

        let err = GameSuite::from_file(file.path()).expect_err("multi-token move is rejected");
        assert!(matches!(err, HarnessError::InvalidGame(_)));
    }

    #[test]
    fn suite_rejects_unknown_color() {
        let err = GameSuite::from_json(
            r#"{"games": [
                {"name": "x", "moves": [], "probed_color": "red", "initial_time_ms": 1}
            ]}"#,
        )
        .expect_err("unknown color must fail");
        assert!(matches!(err, HarnessError::GameFile(_)));
    }

    #[test]
    fn engine_config_builder_accumulates() {
        let config = EngineConfig::new("/bin/engine")
            .with_arg("--uci")
            .with_env("KEY", "VALUE")
            .with_reply_timeout(Duration::from_millis(250));
        assert_eq!(config.extra_args, vec!["--uci".to_string()]);
        assert_eq!(config.env.get("KEY").map(String::as_str), Some("VALUE"));
        assert_eq!(config.reply_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.shutdown_grace, Duration::from_secs(2));
    }
}
