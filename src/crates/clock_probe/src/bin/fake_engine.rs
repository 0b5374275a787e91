//! Scripted stand-in for a UCI engine, driven by environment variables:
//!
//! - `FAKE_ENGINE_REPLIES`: `;`-separated reply lines for successive `ctpm`
//!   queries. The last entry repeats once the script runs out.
//! - `FAKE_ENGINE_TRANSCRIPT`: file that receives every command line read.
//! - `FAKE_ENGINE_EXIT_AFTER`: exit without replying to query number N + 1.
//! - `FAKE_ENGINE_SILENT`: read commands but never reply.
//! - `FAKE_ENGINE_REPLY_DELAY_MS`: sleep this long before every reply.
//! - `FAKE_ENGINE_INVALID_UTF8_AT`: answer query number N (0-based) with bytes
//!   that are not valid UTF-8.

use std::env;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

const DEFAULT_REPLY: &str = "time:0";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let replies: Vec<String> = env::var("FAKE_ENGINE_REPLIES")
        .map(|script| script.split(';').map(str::to_string).collect())
        .unwrap_or_default();
    let exit_after: Option<usize> = env::var("FAKE_ENGINE_EXIT_AFTER")
        .ok()
        .and_then(|value| value.parse().ok());
    let silent = env::var_os("FAKE_ENGINE_SILENT").is_some();
    let reply_delay = env::var("FAKE_ENGINE_REPLY_DELAY_MS")
        .ok()
        .and_then(|value| value.parse().ok())
        .map(Duration::from_millis);
    let invalid_at: Option<usize> = env::var("FAKE_ENGINE_INVALID_UTF8_AT")
        .ok()
        .and_then(|value| value.parse().ok());
    let mut transcript = match env::var_os("FAKE_ENGINE_TRANSCRIPT") {
        Some(path) => Some(File::create(path)?),
        None => None,
    };

    eprintln!("fake engine ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut answered = 0usize;

    for line in stdin.lock().lines() {
        let line = line?;
        if let Some(file) = transcript.as_mut() {
            writeln!(file, "{line}")?;
            file.flush()?;
        }

        let command = line.split_whitespace().next().unwrap_or("");
        match command {
            "ctpm" => {
                if exit_after.is_some_and(|limit| answered >= limit) {
                    eprintln!("fake engine exiting after {answered} replies");
                    return Ok(());
                }
                if silent {
                    continue;
                }
                if let Some(delay) = reply_delay {
                    thread::sleep(delay);
                }
                if invalid_at == Some(answered) {
                    stdout.write_all(b"time:\xff\n")?;
                } else {
                    let reply = replies
                        .get(answered)
                        .or_else(|| replies.last())
                        .map(String::as_str)
                        .unwrap_or(DEFAULT_REPLY);
                    writeln!(stdout, "{reply}")?;
                }
                stdout.flush()?;
                answered += 1;
            }
            "quit" => break,
            _ => {}
        }
    }

    Ok(())
}
