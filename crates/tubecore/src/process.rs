//! Process execution with streamed output
//!
//! Launches yt-dlp (or any other tool) without a shell, drains stdout and
//! stderr concurrently while the child runs, and hands every non-empty line to
//! the caller in arrival order. `run` returns once the child has exited and
//! both pipes are at EOF.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::events::{LogLine, StreamKind};

/// Hide the console window yt-dlp would otherwise open on Windows.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Read buffer size for each pipe
const READ_CHUNK: usize = 8192;

/// One subprocess launch: program plus arguments, no shell interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Short program name for messages ("yt-dlp" rather than the full path).
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Arguments as a single pre-formatted string. Flags and lowercase words
    /// stay bare, everything else (paths, selectors, links) is double-quoted.
    /// Used for logging only; the OS receives `args` as a vector.
    pub fn command_line(&self) -> String {
        self.args.iter().map(|arg| quote_arg(arg)).collect::<Vec<_>>().join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    let bare_word = arg.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let plain = !arg.is_empty() && (arg.starts_with('-') || bare_word) && !arg.contains(char::is_whitespace);
    if plain {
        arg.to_string()
    } else {
        format!("\"{}\"", arg.replace('"', "\\\""))
    }
}

/// How a launch ended.
///
/// A non-zero exit code is reported here but callers treat it like success;
/// tool failures show up through their stderr lines instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Ran to completion. `code` is `None` when killed by a signal.
    Exited { code: Option<i32> },
    /// The OS refused to start the program; `message` is the OS reason.
    LaunchFailed { message: String },
    Cancelled,
}

impl ExitOutcome {
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExitOutcome::LaunchFailed { .. })
    }
}

/// Line callback. Called on the runner's task, one line at a time.
pub type LineHandler<'a> = dyn FnMut(LogLine) + Send + 'a;

/// Anything that can run an [`Invocation`] to completion while streaming its
/// output. [`ProcessRunner`] is the real one.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
        on_line: &mut LineHandler<'_>,
    ) -> ExitOutcome;
}

/// Runs real subprocesses via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
        on_line: &mut LineHandler<'_>,
    ) -> ExitOutcome {
        let name = invocation.program_name();
        log::debug!(
            "Running {} {}",
            invocation.program.display(),
            invocation.command_line()
        );

        let mut child = match Self::command(invocation).spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = e.to_string();
                let err = AppError::launch(&name, e);
                log::error!("{}", err);
                on_line(LogLine::launch(err.to_string()));
                return ExitOutcome::LaunchFailed { message };
            }
        };

        // Both pipes feed one queue so the handler sees lines serially.
        let (tx, mut rx) = mpsc::unbounded_channel::<LogLine>();
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump_lines(stdout, StreamKind::Stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump_lines(stderr, StreamKind::Stderr, tx.clone())));
        }
        drop(tx);

        let mut cancelled = false;
        loop {
            tokio::select! {
                line = rx.recv() => match line {
                    Some(line) => on_line(line),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    log::info!("Cancelling {} (pid {:?})", name, child.id());
                    if let Err(e) = child.start_kill() {
                        log::warn!("Failed to kill {}: {}", name, e);
                    }
                    cancelled = true;
                    break;
                }
            }
        }

        for pump in pumps {
            if cancelled {
                pump.abort();
            } else if let Err(e) = pump.await {
                log::warn!("Output reader for {} ended abnormally: {}", name, e);
            }
        }

        let status = child.wait().await;
        if cancelled {
            return ExitOutcome::Cancelled;
        }

        match status {
            Ok(status) => {
                log::debug!("{} exited with {}", name, status);
                ExitOutcome::Exited { code: status.code() }
            }
            Err(e) => {
                let message = format!("Failed to wait for {}: {}", name, e);
                log::error!("{}", message);
                on_line(LogLine::stderr(message));
                ExitOutcome::Exited { code: None }
            }
        }
    }
}

/// Read a pipe to EOF, forwarding each non-empty line.
async fn pump_lines<R>(mut reader: R, stream: StreamKind, tx: mpsc::UnboundedSender<LogLine>)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::default();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for text in splitter.push(&buf[..n]) {
                    if tx.send(LogLine { text, stream }).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("Error reading {}: {}", stream, e);
                break;
            }
        }
    }
    if let Some(text) = splitter.finish() {
        let _ = tx.send(LogLine { text, stream });
    }
}

/// Splits a byte stream into lines on `\n`, `\r\n` or a lone `\r`.
///
/// yt-dlp redraws its progress line with bare carriage returns, so every
/// redraw becomes its own line. Empty segments are dropped and invalid UTF-8
/// is replaced rather than failing the stream.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush whatever is left once the stream is closed.
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}
