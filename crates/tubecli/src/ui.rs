//! Console front-end: the single consumer of the UI event channel.
//!
//! Log lines go to stdout. The progress bar and notices go to stderr so the
//! log stays clean when stdout is redirected to a file.

use std::io::{self, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use tubecore::events::{Notice, NoticeLevel, UiEvent, UiReceiver};
use tubecore::progress::{parse_download_stats, DownloadStats, ProgressBar};

/// What the user was told during the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub warnings: usize,
    pub errors: usize,
}

impl Summary {
    /// A notice means something stopped the requested work.
    pub fn blocked(&self) -> bool {
        self.warnings + self.errors > 0
    }
}

pub struct ConsoleUi<O: Write, E: Write> {
    out: O,
    err: E,
    bar: ProgressBar,
    /// Draw the bar at all (stderr is a terminal)
    live_progress: bool,
    percent: f64,
    stats: Option<DownloadStats>,
    bar_visible: bool,
    summary: Summary,
}

impl ConsoleUi<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        let live = io::stderr().is_tty();
        Self::new(io::stdout(), io::stderr(), live)
    }
}

impl<O: Write, E: Write> ConsoleUi<O, E> {
    pub fn new(out: O, err: E, live_progress: bool) -> Self {
        Self {
            out,
            err,
            bar: ProgressBar::default(),
            live_progress,
            percent: 0.0,
            stats: None,
            bar_visible: false,
            summary: Summary::default(),
        }
    }

    /// Apply events until every sender is dropped.
    pub async fn run(mut self, mut rx: UiReceiver) -> io::Result<Summary> {
        while let Some(event) = rx.recv().await {
            self.apply(event)?;
        }
        self.hide_bar()?;
        self.out.flush()?;
        Ok(self.summary)
    }

    pub fn apply(&mut self, event: UiEvent) -> io::Result<()> {
        match event {
            UiEvent::Log(line) => {
                if let Some(stats) = parse_download_stats(&line) {
                    self.stats = Some(stats);
                }
                self.hide_bar()?;
                writeln!(self.out, "{}", line)?;
                self.out.flush()?;
                self.draw_bar()
            }
            UiEvent::Progress(percent) => {
                self.percent = percent;
                if percent <= 0.0 {
                    // Reset between batches
                    self.stats = None;
                    self.hide_bar()
                } else {
                    self.draw_bar()
                }
            }
            UiEvent::Notice(notice) => {
                self.hide_bar()?;
                self.show_notice(&notice)?;
                self.draw_bar()
            }
        }
    }

    fn show_notice(&mut self, notice: &Notice) -> io::Result<()> {
        let icon = match notice.level {
            NoticeLevel::Warning => {
                self.summary.warnings += 1;
                "⚠️ "
            }
            NoticeLevel::Error => {
                self.summary.errors += 1;
                "❌"
            }
        };
        writeln!(self.err, "{} {}: {}", icon, notice.title, notice.message)?;
        self.err.flush()
    }

    fn draw_bar(&mut self) -> io::Result<()> {
        if !self.live_progress || self.percent <= 0.0 {
            return Ok(());
        }
        let rendered = self.bar.render_with_stats(self.percent, self.stats.as_ref());
        clear_line(&mut self.err)?;
        write!(self.err, "{}", rendered)?;
        self.err.flush()?;
        self.bar_visible = true;
        Ok(())
    }

    fn hide_bar(&mut self) -> io::Result<()> {
        if self.bar_visible {
            clear_line(&mut self.err)?;
            self.err.flush()?;
            self.bar_visible = false;
        }
        Ok(())
    }
}

/// Return to column 0 and erase the line the bar lives on.
fn clear_line(w: &mut impl Write) -> io::Result<()> {
    queue!(w, MoveToColumn(0), Clear(ClearType::CurrentLine))
}
