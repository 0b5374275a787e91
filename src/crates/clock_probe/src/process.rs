use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{HarnessError, HarnessResult, PipeName};

/// Origin of a captured transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Command,
    Reply,
    Diagnostic,
}

/// Single captured line with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub stream: LogStream,
    pub line: String,
}

/// Handle to a running engine process and its three standard streams.
///
/// The reply and diagnostic pipes are drained by background readers; replies are
/// handed out one line per [`EngineProcess::read_line`] call, diagnostics are kept
/// in an in-memory buffer. Dropping the handle performs the same shutdown as
/// [`EngineProcess::shutdown`].
pub struct EngineProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    replies: Option<mpsc::Receiver<String>>,
    transcript: Arc<Mutex<Vec<LogLine>>>,
    readers: Vec<thread::JoinHandle<()>>,
    reply_timeout: Option<Duration>,
    shutdown_grace: Duration,
    closed: bool,
}

impl EngineProcess {
    /// Spawn the engine with piped stdin, stdout and stderr.
    pub fn start(config: &EngineConfig) -> HarnessResult<Self> {
        let mut cmd = Command::new(&config.binary_path);
        cmd.args(&config.extra_args);
        if let Some(dir) = &config.working_directory {
            cmd.current_dir(dir);
        }
        cmd.envs(&config.env);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|err| {
            HarnessError::engine_start(format!("{}: {err}", config.binary_path.display()))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::engine_start("failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::engine_start("failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HarnessError::engine_start("failed to capture stderr"))?;

        let transcript = Arc::new(Mutex::new(Vec::new()));
        let (reply_tx, reply_rx) = mpsc::channel();
        let readers = vec![
            spawn_reply_reader(stdout, reply_tx),
            spawn_diagnostic_reader(stderr, transcript.clone()),
        ];

        debug!(binary = %config.binary_path.display(), pid = child.id(), "engine started");

        Ok(Self {
            child,
            stdin: Some(stdin),
            replies: Some(reply_rx),
            transcript,
            readers,
            reply_timeout: config.reply_timeout,
            shutdown_grace: config.shutdown_grace,
            closed: false,
        })
    }

    /// Write one line to the command pipe and flush it.
    pub fn send_line(&mut self, text: &str) -> HarnessResult<()> {
        if self.closed {
            return Err(HarnessError::ShutDown);
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or(HarnessError::PipeClosed(PipeName::Command))?;

        let written = stdin
            .write_all(text.as_bytes())
            .and_then(|()| stdin.write_all(b"\n"))
            .and_then(|()| stdin.flush());
        if let Err(err) = written {
            return Err(self.classify_write_error(err));
        }

        debug!(command = text, "-> engine");
        self.capture(LogStream::Command, text);
        Ok(())
    }

    /// Block until the engine writes one full line on its reply pipe.
    ///
    /// End-of-stream is reported as [`HarnessError::PipeClosed`]. When a reply
    /// timeout is configured, waiting longer fails with [`HarnessError::ReplyTimeout`].
    /// Either failure shuts the engine down, so a late reply can never be taken
    /// as the answer to a later request.
    pub fn read_line(&mut self) -> HarnessResult<String> {
        if self.closed {
            return Err(HarnessError::ShutDown);
        }
        let replies = self
            .replies
            .as_ref()
            .ok_or(HarnessError::PipeClosed(PipeName::Reply))?;

        let received = match self.reply_timeout {
            None => replies
                .recv()
                .map_err(|_| HarnessError::PipeClosed(PipeName::Reply)),
            Some(timeout) => replies.recv_timeout(timeout).map_err(|err| match err {
                mpsc::RecvTimeoutError::Timeout => HarnessError::ReplyTimeout(timeout),
                mpsc::RecvTimeoutError::Disconnected => HarnessError::PipeClosed(PipeName::Reply),
            }),
        };
        let line = match received {
            Ok(line) => line,
            Err(err) => return Err(self.abandon(err)),
        };

        debug!(reply = %line, "<- engine");
        self.capture(LogStream::Reply, &line);
        Ok(line)
    }

    /// Lines the engine wrote to its diagnostic pipe so far.
    pub fn diagnostics(&self) -> Vec<String> {
        self.transcript
            .lock()
            .map(|buffer| {
                buffer
                    .iter()
                    .filter(|line| line.stream == LogStream::Diagnostic)
                    .map(|line| line.line.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every captured line across commands, replies and diagnostics.
    pub fn transcript(&self) -> Vec<LogLine> {
        self.transcript
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed
    }

    /// OS process id of the engine.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Close the command, reply and diagnostic pipes in that order and wait for exit.
    ///
    /// Calling this again after the first call is a no-op.
    pub fn shutdown(&mut self) -> HarnessResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Closing stdin is the engine's cue to exit.
        self.stdin.take();
        self.replies.take();

        let start = Instant::now();
        let mut exited = false;
        while start.elapsed() < self.shutdown_grace {
            if let Some(status) = self.child.try_wait()? {
                debug!(%status, "engine exited");
                exited = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if !exited {
            warn!(grace = ?self.shutdown_grace, "engine ignored closed command pipe; killing");
            let _ = self.child.kill();
            self.child.wait()?;
        }

        for handle in self.readers.drain(..) {
            let _ = handle.join();
        }
        Ok(())
    }

    fn abandon(&mut self, err: HarnessError) -> HarnessError {
        warn!(error = %err, "abandoning engine session");
        if let Err(shutdown_err) = self.shutdown() {
            warn!(error = %shutdown_err, "engine shutdown failed");
        }
        err
    }

    fn classify_write_error(&mut self, err: std::io::Error) -> HarnessError {
        if let Ok(Some(status)) = self.child.try_wait() {
            return HarnessError::EngineExited(status);
        }
        match err.kind() {
            ErrorKind::BrokenPipe => HarnessError::PipeClosed(PipeName::Command),
            _ => HarnessError::Io(err),
        }
    }

    fn capture(&self, stream: LogStream, line: &str) {
        if let Ok(mut buffer) = self.transcript.lock() {
            buffer.push(LogLine {
                stream,
                line: line.to_string(),
            });
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn spawn_reply_reader<R: Read + Send + 'static>(
    reader: R,
    tx: mpsc::Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf_reader = BufReader::new(reader);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match buf_reader.read_until(b'\n', &mut raw) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            // Undecodable bytes stay in the line so the reply parser rejects it.
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}

fn spawn_diagnostic_reader<R: Read + Send + 'static>(
    reader: R,
    buffer: Arc<Mutex<Vec<LogLine>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let buf_reader = BufReader::new(reader);
        for line in buf_reader.lines().map_while(Result::ok) {
            let line = line.trim().to_string();
            debug!(diagnostic = %line, "engine stderr");
            if let Ok(mut guard) = buffer.lock() {
                guard.push(LogLine {
                    stream: LogStream::Diagnostic,
                    line,
                });
            }
        }
    })
}
