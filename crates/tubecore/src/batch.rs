//! Batch download orchestration
//!
//! Turns a block of pasted links into an ordered list of jobs and runs them
//! one at a time through the [`CommandRunner`]. Every stdout line is checked
//! for a progress percentage; every line goes to the log view.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, Tool};
use crate::error::AppError;
use crate::events::{LogLine, StreamKind, UiSender};
use crate::process::{CommandRunner, ExitOutcome, Invocation};
use crate::progress;

pub const BATCH_FINISHED: &str = "✅ All downloads completed.";

/// What to produce from each link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum OutputMode {
    /// Best video + best audio merged into MP4
    #[default]
    #[strum(serialize = "video")]
    VideoMerged,
    /// Best audio transcoded to MP3
    #[strum(serialize = "audio")]
    AudioExtracted,
}

impl OutputMode {
    /// Format-specific yt-dlp arguments.
    fn format_args(self) -> &'static [&'static str] {
        match self {
            OutputMode::VideoMerged => &["-f", "bv*+ba/best", "--merge-output-format", "mp4"],
            OutputMode::AudioExtracted => &[
                "-f",
                "bestaudio",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
            ],
        }
    }
}

/// One link to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub locator: String,
    pub mode: OutputMode,
}

impl Job {
    pub fn new(locator: impl Into<String>, mode: OutputMode) -> Self {
        Self {
            locator: locator.into(),
            mode,
        }
    }

    /// yt-dlp invocation for this job.
    pub fn invocation(&self, config: &AppConfig) -> Invocation {
        Invocation::new(&config.downloader)
            .args(self.mode.format_args().iter().copied())
            .arg("--ffmpeg-location")
            .arg(config.transcoder_dir().to_string_lossy())
            .arg("-o")
            .arg(config.output_template().to_string_lossy())
            .arg(self.locator.as_str())
    }
}

/// Split pasted input into job locators: one per non-blank line, in order.
///
/// Lines are trimmed, so `"a\r\n\r\nb\r\n"` yields `["a", "b"]`. Locators are
/// not validated; yt-dlp reports anything it can't handle.
pub fn split_jobs(raw: &str) -> Vec<&str> {
    raw.lines().map(str::trim).filter(|line| !line.is_empty()).collect()
}

/// Build the job list, or `EmptyInput` if there is nothing to do.
pub fn plan_jobs(raw: &str, mode: OutputMode) -> Result<Vec<Job>, AppError> {
    let jobs: Vec<Job> = split_jobs(raw).into_iter().map(|l| Job::new(l, mode)).collect();
    if jobs.is_empty() {
        Err(AppError::EmptyInput)
    } else {
        Ok(jobs)
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Jobs handed to the runner, whatever their outcome
    pub jobs_started: usize,
    /// The batch stopped early because of cancellation
    pub cancelled: bool,
}

pub struct BatchOrchestrator {
    config: Arc<AppConfig>,
    runner: Arc<dyn CommandRunner>,
}

impl BatchOrchestrator {
    pub fn new(config: Arc<AppConfig>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Check the input and both tools, posting a warning for the first problem.
    fn preflight(&self, raw_input: &str, mode: OutputMode, ui: &UiSender) -> Option<Vec<Job>> {
        let jobs = match plan_jobs(raw_input, mode) {
            Ok(jobs) => jobs,
            Err(e) => {
                log::debug!("Batch rejected: {}", e);
                ui.warn("Nothing to download", "Enter the links to download.");
                return None;
            }
        };

        for tool in [Tool::Downloader, Tool::Transcoder] {
            if let Err(e) = self.config.require(tool) {
                log::debug!("Batch rejected: {}", e);
                ui.warn(
                    "File missing",
                    format!("{} is not in the application folder.", tool.file_name()),
                );
                return None;
            }
        }
        Some(jobs)
    }

    /// Download every link in `raw_input`, strictly one after another.
    ///
    /// A failing job doesn't stop the batch. Unless preflight rejected the
    /// input, the batch always ends with the completion line and a progress
    /// reset, even when cancelled part way.
    pub async fn run_batch(
        &self,
        raw_input: &str,
        mode: OutputMode,
        ui: &UiSender,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let Some(jobs) = self.preflight(raw_input, mode, ui) else {
            return report;
        };

        log::info!("Starting batch of {} {} download(s)", jobs.len(), mode);
        for job in &jobs {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            ui.log(format!("> Downloading: {}", job.locator));
            report.jobs_started += 1;

            let outcome = self
                .runner
                .run(&job.invocation(&self.config), cancel, &mut |line| on_job_line(ui, &line))
                .await;
            log::debug!("{} finished: {:?}", job.locator, outcome);

            if outcome == ExitOutcome::Cancelled {
                report.cancelled = true;
                break;
            }
        }

        ui.log(BATCH_FINISHED);
        ui.progress(0.0);
        log::info!(
            "Batch finished: {}/{} started{}",
            report.jobs_started,
            jobs.len(),
            if report.cancelled { ", cancelled" } else { "" }
        );
        report
    }
}

fn on_job_line(ui: &UiSender, line: &LogLine) {
    ui.log_line(line);
    if line.stream == StreamKind::Stdout {
        if let Some(percent) = progress::extract(&line.text) {
            ui.progress(percent);
        }
    }
}
