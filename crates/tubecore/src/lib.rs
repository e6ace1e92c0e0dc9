//! tubecore - the engine behind tubefetch
//!
//! Drives yt-dlp (with ffmpeg for merging and transcoding) as a subprocess,
//! streams its output into a UI event channel, extracts download progress and
//! runs batches of links one after another. Nothing in here draws anything;
//! front-ends consume [`events::UiEvent`]s.
//!
//! # Module Structure
//!
//! - `config`: tool paths, output directory, log file
//! - `error`: `AppError` / `AppResult`
//! - `events`: the UI event channel
//! - `logging`: console + file logger
//! - `process`: subprocess launch with streamed output
//! - `progress`: percentage extraction and the text progress bar
//! - `update`: yt-dlp self-update
//! - `batch`: job splitting, argument building, sequential execution
//! - `worker`: spawning the above off the UI loop

pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod process;
pub mod progress;
pub mod update;
pub mod worker;

// Re-export commonly used types for convenience
pub use batch::{BatchOrchestrator, BatchReport, Job, OutputMode};
pub use config::{AppConfig, ConfigOverrides, Tool};
pub use error::{AppError, AppResult};
pub use events::{ui_channel, Notice, NoticeLevel, UiEvent, UiReceiver, UiSender};
pub use process::{CommandRunner, ExitOutcome, Invocation, ProcessRunner};
pub use update::UpdateChecker;
pub use worker::Session;
