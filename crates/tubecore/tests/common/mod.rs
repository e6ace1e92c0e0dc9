//! Shared fixtures for tubecore integration tests
//!
//! Builds an application folder in a temp dir with shell-script stand-ins for
//! yt-dlp and ffmpeg. The fake yt-dlp appends its arguments to `calls.log`
//! and prints progress the way the real one does.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use tempfile::TempDir;
use tubecore::config::{AppConfig, Tool};
use tubecore::events::{UiEvent, UiReceiver};

/// Spawning while another test is still writing its script can fail with
/// ETXTBSY, so process tests take this lock.
pub static PROCESS_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

const FAKE_YTDLP: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/calls.log"
case "$1" in
  -U|--update-to)
    echo "Latest version: 2024.08.06"
    echo "yt-dlp is up to date (2024.08.06)"
    exit 0
    ;;
esac
for last; do :; done
echo "[download] Destination: $last"
printf '[download]  25.0%% of 1.00MiB at 1.00MiB/s ETA 00:01\r[download] 100.0%% of 1.00MiB in 00:01\n'
echo "WARNING: fake warning for $last" >&2
exit 0
"#;

const FAKE_FFMPEG: &str = "#!/bin/sh\nexit 0\n";

pub struct AppFolder {
    pub dir: TempDir,
    pub config: AppConfig,
}

impl AppFolder {
    /// Folder with both tools present and executable.
    pub fn ready() -> Self {
        let folder = Self::empty();
        folder.install(Tool::Downloader, FAKE_YTDLP, 0o755);
        folder.install(Tool::Transcoder, FAKE_FFMPEG, 0o755);
        folder
    }

    /// Folder with no tools at all.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::for_base_dir(dir.path());
        Self { dir, config }
    }

    pub fn install(&self, tool: Tool, script: &str, mode: u32) {
        let path = self.config.tool_path(tool).to_path_buf();
        write_script(&path, script, mode);
    }

    pub fn remove(&self, tool: Tool) {
        fs::remove_file(self.config.tool_path(tool)).unwrap();
    }

    /// One entry per fake yt-dlp run: its arguments joined by spaces.
    pub fn calls(&self) -> Vec<String> {
        match fs::read_to_string(self.calls_log()) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn calls_log(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }
}

fn write_script(path: &Path, script: &str, mode: u32) {
    fs::write(path, script).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Everything queued on the channel so far, without waiting.
pub fn drain(rx: &mut UiReceiver) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn logs(events: &[UiEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Log(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

pub fn progress(events: &[UiEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

pub fn notices(events: &[UiEvent]) -> usize {
    events.iter().filter(|e| matches!(e, UiEvent::Notice(_))).count()
}
