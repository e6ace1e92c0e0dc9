use std::path::PathBuf;

use thiserror::Error;

use crate::config::Tool;

/// Centralized error types for tubecore
///
/// Every failure the core can detect maps onto one of these variants. None of
/// them is fatal to the application: callers turn them into a notice or an
/// `[ERROR]` log line at the point of detection.
///
/// # Example
///
/// ```
/// use tubecore::error::AppError;
///
/// let err = AppError::EmptyInput;
/// assert_eq!(err.to_string(), "No links to download");
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// yt-dlp or ffmpeg is not where the configuration says it is
    #[error("{tool} not found at {}", path.display())]
    MissingExecutable { tool: Tool, path: PathBuf },

    /// The batch input was empty after trimming
    #[error("No links to download")]
    EmptyInput,

    /// The executable exists but the OS refused to start it
    #[error("Failed to start {program}: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (bad override values, unresolvable home dir)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Build a launch error from the program path and the spawn failure.
    pub fn launch(program: impl Into<String>, source: std::io::Error) -> Self {
        AppError::ProcessLaunch {
            program: program.into(),
            source,
        }
    }
}
