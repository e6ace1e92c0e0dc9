//! tubefetch - batch downloader front-end
//!
//! Resolves the configuration, starts logging, then hands the work to a
//! background session while this task renders the event stream.

mod cli;
mod ui;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use crossterm::tty::IsTty;
use dotenvy::dotenv;
use tokio::signal;
use tubecore::logging::init_logger;
use tubecore::{ui_channel, AppConfig, Session};

use crate::cli::{Cli, Commands};
use crate::ui::ConsoleUi;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env if present
    let _ = dotenv();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.paths.overrides()).context("Failed to resolve configuration")?;

    init_logger(&config.log_file)?;
    log::info!("tubefetch {} starting", env!("CARGO_PKG_VERSION"));
    config
        .ensure_output_dir()
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let (ui_tx, ui_rx) = ui_channel();
    let session = Session::with_process_runner(config, ui_tx);

    // Ctrl-C kills the running download and skips the rest of the batch.
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    let summary = match cli.command {
        Commands::Download {
            urls,
            input,
            mode,
            no_update_check,
        } => {
            if urls.is_empty() && input.is_none() && io::stdin().is_tty() {
                eprintln!("Paste links, one per line, then press Ctrl-D:");
            }
            let raw = tokio::task::spawn_blocking(move || cli::read_input(&urls, input.as_deref(), io::stdin().lock()))
                .await?
                .context("Failed to read links")?;

            let worker = session.spawn_update_then_batch(!no_update_check, raw, mode.into());
            // Only the worker holds a sender now; the UI loop ends with it.
            drop(session);
            let summary = ConsoleUi::stdio().run(ui_rx).await?;
            let report = worker.await?;
            log::info!("Download command finished: {:?}", report);
            summary
        }
        Commands::Update => {
            let worker = session.spawn_update_check();
            drop(session);
            let summary = ConsoleUi::stdio().run(ui_rx).await?;
            worker.await?;
            summary
        }
    };

    Ok(if summary.blocked() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
