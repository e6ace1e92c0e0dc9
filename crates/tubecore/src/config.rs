//! Runtime configuration
//!
//! Paths to the two external tools, the output directory and the log file are
//! resolved once at startup into an [`AppConfig`] that is handed to every
//! component. Resolution order per value: explicit override (CLI flag), then
//! environment variable, then the default next to the application executable.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Environment variable overriding the yt-dlp location
pub const YTDL_BIN_ENV: &str = "YTDL_BIN";
/// Environment variable overriding the ffmpeg location
pub const FFMPEG_BIN_ENV: &str = "FFMPEG_BIN";
/// Environment variable overriding the output directory (supports `~`)
pub const DOWNLOAD_FOLDER_ENV: &str = "DOWNLOAD_FOLDER";
/// Environment variable overriding the log file path (supports `~`)
pub const LOG_FILE_PATH_ENV: &str = "LOG_FILE_PATH";
/// Environment variable selecting a yt-dlp update channel (`stable`, `nightly`, `master`)
pub const UPDATE_CHANNEL_ENV: &str = "YTDL_UPDATE_CHANNEL";

/// Output directory name created next to the executable
pub const DEFAULT_OUTPUT_DIR: &str = "download";
/// Log file name created next to the executable
pub const DEFAULT_LOG_FILE: &str = "tubefetch.log";

/// The two external executables the application drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Tool {
    #[strum(serialize = "yt-dlp")]
    Downloader,
    #[strum(serialize = "ffmpeg")]
    Transcoder,
}

impl Tool {
    /// Platform file name of the bundled executable.
    pub fn file_name(self) -> &'static str {
        match self {
            #[cfg(windows)]
            Tool::Downloader => "yt-dlp.exe",
            #[cfg(windows)]
            Tool::Transcoder => "ffmpeg.exe",
            #[cfg(not(windows))]
            Tool::Downloader => "yt-dlp",
            #[cfg(not(windows))]
            Tool::Transcoder => "ffmpeg",
        }
    }

    /// Environment variable that overrides this tool's location.
    pub fn env_var(self) -> &'static str {
        match self {
            Tool::Downloader => YTDL_BIN_ENV,
            Tool::Transcoder => FFMPEG_BIN_ENV,
        }
    }
}

/// Values supplied on the command line. `None` falls through to the
/// environment, then to the defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub downloader: Option<String>,
    pub transcoder: Option<String>,
    pub output_dir: Option<String>,
    pub log_file: Option<String>,
    pub update_channel: Option<String>,
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub downloader: PathBuf,
    pub transcoder: PathBuf,
    pub output_dir: PathBuf,
    pub log_file: PathBuf,
    /// `None` means the stable channel (`yt-dlp -U`)
    pub update_channel: Option<String>,
}

impl AppConfig {
    /// Defaults: everything lives next to `base_dir`.
    pub fn for_base_dir(base_dir: &Path) -> Self {
        Self {
            downloader: base_dir.join(Tool::Downloader.file_name()),
            transcoder: base_dir.join(Tool::Transcoder.file_name()),
            output_dir: base_dir.join(DEFAULT_OUTPUT_DIR),
            log_file: base_dir.join(DEFAULT_LOG_FILE),
            update_channel: None,
        }
    }

    /// Resolve against the executable's directory and the process environment.
    pub fn load(overrides: ConfigOverrides) -> AppResult<Self> {
        Self::resolve(&app_dir(), overrides, |key| env::var(key).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve<F>(base_dir: &Path, overrides: ConfigOverrides, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::for_base_dir(base_dir);
        let pick = |flag: Option<String>, key: &str| flag.or_else(|| lookup(key)).filter(|v| !v.trim().is_empty());

        if let Some(value) = pick(overrides.downloader, YTDL_BIN_ENV) {
            config.downloader = resolve_program(&value)?;
        }
        if let Some(value) = pick(overrides.transcoder, FFMPEG_BIN_ENV) {
            config.transcoder = resolve_program(&value)?;
        }
        if let Some(value) = pick(overrides.output_dir, DOWNLOAD_FOLDER_ENV) {
            config.output_dir = expand_path(&value)?;
        }
        if let Some(value) = pick(overrides.log_file, LOG_FILE_PATH_ENV) {
            config.log_file = expand_path(&value)?;
        }
        config.update_channel = pick(overrides.update_channel, UPDATE_CHANNEL_ENV)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.eq_ignore_ascii_case("stable"));

        log::debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    pub fn tool_path(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Downloader => &self.downloader,
            Tool::Transcoder => &self.transcoder,
        }
    }

    /// Path of the tool, or `MissingExecutable` if it isn't there.
    pub fn require(&self, tool: Tool) -> AppResult<&Path> {
        let path = self.tool_path(tool);
        if path.is_file() {
            Ok(path)
        } else {
            Err(AppError::MissingExecutable {
                tool,
                path: path.to_path_buf(),
            })
        }
    }

    /// Directory holding ffmpeg, passed to yt-dlp as `--ffmpeg-location`.
    pub fn transcoder_dir(&self) -> PathBuf {
        match self.transcoder.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// yt-dlp output template: one file per title inside the output directory.
    pub fn output_template(&self) -> PathBuf {
        self.output_dir.join("%(title)s.%(ext)s")
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_output_dir(&self) -> AppResult<()> {
        if !self.output_dir.is_dir() {
            fs_err::create_dir_all(&self.output_dir)?;
            log::info!("📁 Created output directory {}", self.output_dir.display());
        }
        Ok(())
    }
}

/// Directory the running executable lives in.
pub fn app_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn expand_path(value: &str) -> AppResult<PathBuf> {
    shellexpand::full(value.trim())
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| AppError::Config(format!("cannot expand '{}': {}", value, e)))
}

/// A bare program name (`yt-dlp`) is looked up on PATH; anything with a
/// directory component is taken as a path.
fn resolve_program(value: &str) -> AppResult<PathBuf> {
    let path = expand_path(value)?;
    if path.components().count() == 1 && !path.is_file() {
        if let Ok(found) = which::which(&path) {
            return Ok(found);
        }
    }
    Ok(path)
}
