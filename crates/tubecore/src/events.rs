//! UI event channel
//!
//! Workers never touch the UI directly. They post [`UiEvent`]s through a
//! cloneable [`UiSender`]; the front-end owns the single [`UiReceiver`] and
//! applies events in the order they were sent.

use tokio::sync::mpsc;

/// Prefix put in front of every line that came from a tool's stderr or from a
/// failure the core caught.
pub const ERROR_PREFIX: &str = "[ERROR] ";

/// Where a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
    /// Written by the runner itself when the program could not be started.
    Launch,
}

/// One line of subprocess output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub stream: StreamKind,
}

impl LogLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stream: StreamKind::Stdout,
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stream: StreamKind::Stderr,
        }
    }

    pub fn launch(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stream: StreamKind::Launch,
        }
    }

    /// Text as it appears in the log view: stderr and launch lines carry `[ERROR] `.
    pub fn display_text(&self) -> String {
        match self.stream {
            StreamKind::Stdout => self.text.clone(),
            StreamKind::Stderr | StreamKind::Launch => format!("{}{}", ERROR_PREFIX, self.text),
        }
    }
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A blocking, user-facing message (a modal dialog in a windowed front-end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Append a line to the log view
    Log(String),
    /// Set the progress indicator, 0..=100
    Progress(f64),
    /// Show a notice to the user
    Notice(Notice),
}

/// Producer handle held by worker tasks.
#[derive(Debug, Clone)]
pub struct UiSender {
    tx: mpsc::UnboundedSender<UiEvent>,
}

/// The only consumer; owned by the front-end.
pub type UiReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Create the event channel.
pub fn ui_channel() -> (UiSender, UiReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiSender { tx }, rx)
}

impl UiSender {
    fn post(&self, event: UiEvent) {
        // The receiver is gone only while the front-end is shutting down.
        if self.tx.send(event).is_err() {
            log::debug!("UI channel closed, dropping event");
        }
    }

    /// Append a line to the log view (and to the log file).
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!(target: "tool", "{}", message);
        self.post(UiEvent::Log(message));
    }

    /// Append an `[ERROR]`-prefixed line.
    pub fn log_error(&self, message: impl AsRef<str>) {
        self.log(format!("{}{}", ERROR_PREFIX, message.as_ref()));
    }

    /// Forward a captured subprocess line.
    pub fn log_line(&self, line: &LogLine) {
        self.log(line.display_text());
    }

    pub fn progress(&self, percent: f64) {
        self.post(UiEvent::Progress(percent));
    }

    pub fn warn(&self, title: impl Into<String>, message: impl Into<String>) {
        self.notice(NoticeLevel::Warning, title, message);
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.notice(NoticeLevel::Error, title, message);
    }

    fn notice(&self, level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) {
        let notice = Notice {
            level,
            title: title.into(),
            message: message.into(),
        };
        match level {
            NoticeLevel::Warning => log::warn!("{}: {}", notice.title, notice.message),
            NoticeLevel::Error => log::error!("{}: {}", notice.title, notice.message),
        }
        self.post(UiEvent::Notice(notice));
    }
}

/// Drain everything currently queued without waiting.
#[cfg(test)]
pub(crate) fn drain(rx: &mut UiReceiver) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
