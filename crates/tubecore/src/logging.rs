//! Logger initialization (console + file)

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use simplelog::*;

/// Initialize logger for both console and file output
///
/// The terminal only shows warnings and errors so it doesn't fight the
/// progress bar. The file gets everything from debug up, including every tool
/// line posted to the log view (target `tool`), and is appended to across runs.
pub fn init_logger(log_file_path: &Path) -> Result<()> {
    let log_file = open_log_file(log_file_path)?;

    let term_config = ConfigBuilder::new().add_filter_ignore_str("tool").build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Warn, term_config, TerminalMode::Stderr, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    log::debug!("Logging to {}", log_file_path.display());
    Ok(())
}

/// Open (or create) the log file for appending, creating parent directories.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    let file = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open log file")?;
    Ok(file.into_parts().0)
}
