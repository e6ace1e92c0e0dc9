//! yt-dlp self-update
//!
//! Runs `yt-dlp -U` (or `--update-to <channel>`) through the shared
//! [`CommandRunner`] so its output lands in the log view like any download.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, Tool};
use crate::events::{StreamKind, UiSender};
use crate::process::{CommandRunner, ExitOutcome, Invocation};

pub const UPDATE_STARTED: &str = "[yt-dlp Checking for updates...]";
pub const UPDATE_FINISHED: &str = "✅ yt-dlp update check complete.";

/// yt-dlp exits with 100 when it was installed by pip and can't replace itself.
const EXIT_PIP_MANAGED: i32 = 100;

pub struct UpdateChecker {
    config: Arc<AppConfig>,
    runner: Arc<dyn CommandRunner>,
}

impl UpdateChecker {
    pub fn new(config: Arc<AppConfig>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Update arguments for the configured channel.
    pub fn update_args(&self) -> Vec<String> {
        match &self.config.update_channel {
            Some(channel) => vec!["--update-to".to_string(), channel.clone()],
            None => vec!["-U".to_string()],
        }
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::new(&self.config.downloader).args(self.update_args())
    }

    /// Ask yt-dlp to update itself, streaming its output to the log view.
    ///
    /// Nothing here is fatal. A missing yt-dlp posts an error notice and
    /// returns `None` without launching anything. A launch failure is logged
    /// once, in place of the completion line; the runner's own launch line is
    /// dropped.
    pub async fn check_for_updates(&self, ui: &UiSender, cancel: &CancellationToken) -> Option<ExitOutcome> {
        if let Err(e) = self.config.require(Tool::Downloader) {
            ui.error(
                "File missing",
                format!("{}. Place {} in the application folder.", e, Tool::Downloader.file_name()),
            );
            return None;
        }

        ui.log(UPDATE_STARTED);
        let outcome = self
            .runner
            .run(&self.invocation(), cancel, &mut |line| {
                if line.stream != StreamKind::Launch {
                    ui.log_line(&line);
                }
            })
            .await;

        match &outcome {
            ExitOutcome::Exited { code } => {
                if *code == Some(EXIT_PIP_MANAGED) {
                    log::info!("yt-dlp is installed via pip. Use 'pip install --upgrade yt-dlp' to update.");
                } else if *code != Some(0) {
                    log::warn!("yt-dlp update check exited with {:?}", code);
                }
                ui.log(UPDATE_FINISHED);
            }
            ExitOutcome::LaunchFailed { message } => {
                ui.log_error(format!("Failed to run yt-dlp update: {}", message));
            }
            ExitOutcome::Cancelled => {
                ui.log("yt-dlp update check cancelled.");
            }
        }
        Some(outcome)
    }
}
