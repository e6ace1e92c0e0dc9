use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tubecore::{ConfigOverrides, OutputMode};

#[derive(Parser, Debug)]
#[command(name = "tubefetch")]
#[command(author, version, about = "Batch video and audio downloader driving yt-dlp and ffmpeg", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Location overrides. Each falls back to its environment variable, then to
/// the folder this executable lives in.
#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// Path to yt-dlp [env: YTDL_BIN]
    #[arg(long = "yt-dlp", value_name = "PATH", global = true)]
    pub downloader: Option<String>,

    /// Path to ffmpeg [env: FFMPEG_BIN]
    #[arg(long = "ffmpeg", value_name = "PATH", global = true)]
    pub transcoder: Option<String>,

    /// Where downloads are saved [env: DOWNLOAD_FOLDER]
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output_dir: Option<String>,

    /// Log file, appended to on every run [env: LOG_FILE_PATH]
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    /// yt-dlp update channel: stable, nightly or master [env: YTDL_UPDATE_CHANNEL]
    #[arg(long, value_name = "CHANNEL", global = true)]
    pub update_channel: Option<String>,
}

impl PathArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            downloader: self.downloader.clone(),
            transcoder: self.transcoder.clone(),
            output_dir: self.output_dir.clone(),
            log_file: self.log_file.clone(),
            update_channel: self.update_channel.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download links one after another (checks for a yt-dlp update first)
    Download {
        /// Links to download. Read from --input or stdin when none are given
        urls: Vec<String>,

        /// File with one link per line
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Merged MP4 video or MP3 audio
        #[arg(short, long, value_enum, default_value_t = ModeArg::Video)]
        mode: ModeArg,

        /// Skip the yt-dlp update check
        #[arg(long)]
        no_update_check: bool,
    },

    /// Update yt-dlp and exit
    Update,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Video,
    Audio,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Video => OutputMode::VideoMerged,
            ModeArg::Audio => OutputMode::AudioExtracted,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Gather the raw multi-line input: positional links, then the input file.
/// `stdin` is only read when neither was given.
pub fn read_input(urls: &[String], input: Option<&Path>, mut stdin: impl Read) -> Result<String> {
    let mut raw = urls.join("\n");
    if let Some(path) = input {
        if !raw.is_empty() {
            raw.push('\n');
        }
        raw.push_str(&fs_err::read_to_string(path)?);
    }
    if urls.is_empty() && input.is_none() {
        stdin.read_to_string(&mut raw)?;
    }
    Ok(raw)
}
