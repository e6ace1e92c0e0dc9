//! Background execution
//!
//! The front-end never awaits a subprocess on its own loop. A [`Session`]
//! bundles the shared configuration, the runner, the UI sender and the
//! cancellation token, and spawns the update check and batches as tokio tasks.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::batch::{BatchOrchestrator, BatchReport, OutputMode};
use crate::config::AppConfig;
use crate::events::UiSender;
use crate::process::{CommandRunner, ExitOutcome, ProcessRunner};
use crate::update::UpdateChecker;

#[derive(Clone)]
pub struct Session {
    config: Arc<AppConfig>,
    runner: Arc<dyn CommandRunner>,
    ui: UiSender,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(config: AppConfig, runner: Arc<dyn CommandRunner>, ui: UiSender) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            ui,
            cancel: CancellationToken::new(),
        }
    }

    /// Session backed by real subprocesses.
    pub fn with_process_runner(config: AppConfig, ui: UiSender) -> Self {
        Self::new(config, Arc::new(ProcessRunner::new()), ui)
    }

    /// Token shared by every task this session spawns.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Kill the running subprocess and skip any remaining jobs.
    pub fn cancel(&self) {
        log::info!("Cancellation requested");
        self.cancel.cancel();
    }

    pub fn update_checker(&self) -> UpdateChecker {
        UpdateChecker::new(Arc::clone(&self.config), Arc::clone(&self.runner))
    }

    pub fn orchestrator(&self) -> BatchOrchestrator {
        BatchOrchestrator::new(Arc::clone(&self.config), Arc::clone(&self.runner))
    }

    pub fn spawn_update_check(&self) -> JoinHandle<Option<ExitOutcome>> {
        let checker = self.update_checker();
        let ui = self.ui.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move { checker.check_for_updates(&ui, &cancel).await })
    }

    pub fn spawn_batch(&self, raw_input: String, mode: OutputMode) -> JoinHandle<BatchReport> {
        let orchestrator = self.orchestrator();
        let ui = self.ui.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move { orchestrator.run_batch(&raw_input, mode, &ui, &cancel).await })
    }

    /// Update check (optional) followed by the batch, on one task so only one
    /// subprocess is alive at a time.
    pub fn spawn_update_then_batch(
        &self,
        check_updates: bool,
        raw_input: String,
        mode: OutputMode,
    ) -> JoinHandle<BatchReport> {
        let checker = self.update_checker();
        let orchestrator = self.orchestrator();
        let ui = self.ui.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if check_updates {
                checker.check_for_updates(&ui, &cancel).await;
            }
            orchestrator.run_batch(&raw_input, mode, &ui, &cancel).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{drain, ui_channel, LogLine, UiEvent};
    use crate::process::{Invocation, LineHandler};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Tracks how many runs overlap.
    #[derive(Default)]
    struct OverlapRunner {
        active: AtomicUsize,
        max_active: AtomicUsize,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl CommandRunner for OverlapRunner {
        async fn run(
            &self,
            invocation: &Invocation,
            _cancel: &CancellationToken,
            on_line: &mut LineHandler<'_>,
        ) -> ExitOutcome {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
            on_line(LogLine::stdout(format!("ran {}", invocation.command_line())));
            tokio::task::yield_now().await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            ExitOutcome::Exited { code: Some(0) }
        }
    }

    fn ready_config(dir: &std::path::Path) -> AppConfig {
        let config = AppConfig::for_base_dir(dir);
        std::fs::write(&config.downloader, b"").unwrap();
        std::fs::write(&config.transcoder, b"").unwrap();
        config
    }

    #[tokio::test]
    async fn test_update_then_batch_runs_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(OverlapRunner::default());
        let (ui, mut rx) = ui_channel();
        let session = Session::new(ready_config(dir.path()), runner.clone(), ui);

        let report = session
            .spawn_update_then_batch(true, "a\nb".to_string(), OutputMode::AudioExtracted)
            .await
            .unwrap();

        assert_eq!(report.jobs_started, 2);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 3);
        assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);

        let events = drain(&mut rx);
        assert_eq!(events.first(), Some(&UiEvent::Log("[yt-dlp Checking for updates...]".to_string())));
        assert_eq!(events.last(), Some(&UiEvent::Progress(0.0)));
    }

    #[tokio::test]
    async fn test_cancelled_session_starts_no_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(OverlapRunner::default());
        let (ui, _rx) = ui_channel();
        let session = Session::new(ready_config(dir.path()), runner.clone(), ui);

        session.cancel();
        let report = session.spawn_batch("a\nb".to_string(), OutputMode::VideoMerged).await.unwrap();

        assert_eq!(report, BatchReport { jobs_started: 0, cancelled: true });
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sender_outlives_session_only_through_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let (ui, mut rx) = ui_channel();
        let session = Session::new(ready_config(dir.path()), Arc::new(OverlapRunner::default()), ui);

        let handle = session.spawn_update_check();
        drop(session);
        assert!(handle.await.unwrap().is_some());

        // Every sender is gone once the task finishes, so the channel closes.
        let mut seen = 0;
        while rx.recv().await.is_some() {
            seen += 1;
        }
        assert!(seen >= 2);
    }
}
