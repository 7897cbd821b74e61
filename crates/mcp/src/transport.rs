//! Child-process transport (spawn, framing, teardown).

use std::collections::HashMap;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::framing::{self, Frame, MAX_LINE_SIZE};

/// How long `close` waits for the server to exit on its own before killing it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Configuration for launching a server process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// A spawned server process and its pipe pair.
///
/// stdin and stdout are piped; stderr stays attached to ours so the server's
/// diagnostics remain visible.
pub struct Transport {
    config: ServerConfig,
    process: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    stdout: Mutex<BufReader<ChildStdout>>,
    closed: CancellationToken,
}

impl Transport {
    /// Spawn the configured command.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut process = cmd.spawn().map_err(Error::Launch)?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Launch(io::Error::other("failed to capture stdin")))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Launch(io::Error::other("failed to capture stdout")))?;

        tracing::debug!(
            server = %config.name,
            command = %config.command,
            pid = process.id(),
            "spawned server"
        );

        Ok(Self {
            config,
            process: Mutex::new(process),
            stdin: Mutex::new(Some(stdin)),
            stdout: Mutex::new(BufReader::new(stdout)),
            closed: CancellationToken::new(),
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Write one message line to the server.
    pub async fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(Error::Write(closed_pipe()));
        }

        let mut stdin = self.stdin.lock().await;
        let stdin = stdin.as_mut().ok_or_else(|| Error::Write(closed_pipe()))?;
        framing::write_message(stdin, message).await
    }

    /// Wait for the next message line from the server.
    ///
    /// Resolves with `EndOfStream` when the server closes its output or when
    /// the transport is closed while waiting.
    pub async fn receive<T: DeserializeOwned>(&self) -> Result<T> {
        let mut stdout = self.stdout.lock().await;

        let frame = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(Error::EndOfStream),
            frame = framing::read_frame(&mut *stdout, MAX_LINE_SIZE) => frame?,
        };

        match frame.ok_or(Error::EndOfStream)? {
            Frame::Line(bytes) => serde_json::from_slice(&bytes).map_err(Error::Parse),
            Frame::TooLarge { size } => Err(Error::OutputTooLarge {
                size,
                max: MAX_LINE_SIZE,
            }),
        }
    }

    /// Check if the server process is still running.
    pub async fn is_running(&self) -> bool {
        let mut process = self.process.lock().await;
        matches!(process.try_wait(), Ok(None))
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Terminate the server and reap it. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        self.closed.cancel();

        // Dropping stdin gives a well-behaved server end of input.
        self.stdin.lock().await.take();

        let mut process = self.process.lock().await;
        match timeout(SHUTDOWN_GRACE, process.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(server = %self.config.name, %status, "server exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(server = %self.config.name, error = %e, "failed to wait for server");
            }
            Err(_) => {
                tracing::warn!(server = %self.config.name, "server did not exit, killing");
                if let Err(e) = process.kill().await {
                    tracing::warn!(server = %self.config.name, error = %e, "failed to kill server");
                }
            }
        }

        Ok(())
    }
}

fn closed_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "transport closed")
}
