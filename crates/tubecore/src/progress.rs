//! Progress parsing for yt-dlp output
//!
//! [`extract`] is the single source of the percentage shown in the UI.
//! [`parse_download_stats`] pulls the optional extras (size, speed, ETA) out of
//! the same `[download]` lines for display next to the bar.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<1-3 digits>.<1 digit>%` anywhere in the line, e.g. "45.2%" or "100.0%".
#[allow(clippy::unwrap_used)]
static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3}\.\d)%").unwrap());

/// Recognize an embedded percentage and clamp it to at most 100.
///
/// Returns `None` when the line carries no percentage; the caller keeps the
/// previously displayed value.
///
/// # Example
///
/// ```
/// use tubecore::progress::extract;
///
/// assert_eq!(extract("[download]  45.2% of 10.00MiB at 1.00MiB/s ETA 00:05"), Some(45.2));
/// assert_eq!(extract("[download] Destination: clip.mp4"), None);
/// ```
pub fn extract(line: &str) -> Option<f64> {
    let captures = PERCENT_RE.captures(line)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    Some(value.min(100.0))
}

/// Extra details yt-dlp prints on its progress lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadStats {
    pub total_size: Option<u64>,
    pub speed_bytes: Option<u64>,
    pub eta_seconds: Option<u64>,
}

impl DownloadStats {
    pub fn is_empty(&self) -> bool {
        self.total_size.is_none() && self.speed_bytes.is_none() && self.eta_seconds.is_none()
    }
}

/// Parse size, speed and ETA from a yt-dlp progress line
/// Example: "[download]  45.2% of ~10.00MiB at 500.00KiB/s ETA 00:10"
pub fn parse_download_stats(line: &str) -> Option<DownloadStats> {
    if !line.contains("[download]") || !line.contains('%') {
        return None;
    }

    let mut stats = DownloadStats::default();
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        let Some(next) = parts.get(i + 1) else {
            break;
        };
        match *part {
            "of" => stats.total_size = parse_size(next),
            "at" => stats.speed_bytes = parse_size(next),
            "ETA" => stats.eta_seconds = parse_eta(next),
            _ => {}
        }
    }

    if stats.is_empty() {
        log::trace!("No stats on progress line: {}", line);
        None
    } else {
        Some(stats)
    }
}

/// Parse "10.00MiB", "~1.2GiB" or "500.00KiB/s" into bytes.
fn parse_size(size_str: &str) -> Option<u64> {
    let size_str = size_str.trim_start_matches('~').trim_end_matches("/s");
    let units: [(&str, f64); 4] = [
        ("GiB", 1024.0 * 1024.0 * 1024.0),
        ("MiB", 1024.0 * 1024.0),
        ("KiB", 1024.0),
        ("B", 1.0),
    ];
    units.iter().find_map(|(suffix, scale)| {
        size_str
            .strip_suffix(suffix)
            .and_then(|number| number.parse::<f64>().ok())
            .map(|n| (n * scale) as u64)
    })
}

/// Parse "00:10", "1:23" or "1:02:03" into seconds.
fn parse_eta(eta_str: &str) -> Option<u64> {
    let mut total = 0u64;
    let mut fields = 0;
    for field in eta_str.split(':') {
        total = total.checked_mul(60)?.checked_add(field.parse::<u64>().ok()?)?;
        fields += 1;
    }
    (2..=3).contains(&fields).then_some(total)
}

/// Classic text progress bar: `[█████░░░░░]  45.2%`.
#[derive(Debug, Clone, Copy)]
pub struct ProgressBar {
    width: usize,
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self { width: 20 }
    }
}

impl ProgressBar {
    pub fn with_width(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    /// Render the bar for `percent` (clamped to 0..=100).
    pub fn render(&self, percent: f64) -> String {
        let percent = percent.clamp(0.0, 100.0);
        let filled = ((percent / 100.0) * self.width as f64).floor() as usize;
        let empty = self.width - filled.min(self.width);
        format!("[{}{}] {:>5.1}%", "█".repeat(filled), "░".repeat(empty), percent)
    }

    /// Bar plus any stats we have, e.g. `[██░░] 50.0% of 10.0 MiB at 1.0 MiB/s ETA 0:05`.
    pub fn render_with_stats(&self, percent: f64, stats: Option<&DownloadStats>) -> String {
        let mut out = self.render(percent);
        if let Some(stats) = stats {
            if let Some(total) = stats.total_size {
                out.push_str(&format!(" of {}", format_size(total)));
            }
            if let Some(speed) = stats.speed_bytes {
                out.push_str(&format!(" at {}/s", format_size(speed)));
            }
            if let Some(eta) = stats.eta_seconds {
                out.push_str(&format!(" ETA {}", format_eta(eta)));
            }
        }
        out
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB * KIB {
        format!("{:.1} GiB", b / (KIB * KIB * KIB))
    } else if b >= KIB * KIB {
        format!("{:.1} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

fn format_eta(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ==================== extract Tests ====================

    #[test]
    fn test_extract_typical_download_line() {
        assert_eq!(extract("[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10"), Some(45.2));
        assert_eq!(extract("[download] 100.0% of 3.10MiB in 00:02"), Some(100.0));
        assert_eq!(extract("[download]   0.0% of ~1.00GiB"), Some(0.0));
    }

    #[test]
    fn test_extract_no_match_yields_none() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("[youtube] abc: Downloading webpage"), None);
        assert_eq!(extract("[download] Destination: Some Title.mp4"), None);
        // Integer percentages do not match the one-decimal pattern
        assert_eq!(extract("done 45%"), None);
        assert_eq!(extract("45.25 percent"), None);
    }

    #[test]
    fn test_extract_clamps_above_hundred() {
        assert_eq!(extract("weird 150.0%"), Some(100.0));
        assert_eq!(extract("999.9%"), Some(100.0));
        // Unanchored: the last three digits before the dot still match
        assert_eq!(extract("1234.5%"), Some(100.0));
    }

    #[test]
    fn test_extract_first_match_wins() {
        assert_eq!(extract("video 12.5% audio 80.0%"), Some(12.5));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let line = "[download]  67.3% of 5.00MiB";
        assert_eq!(extract(line), extract(line));
    }

    #[test]
    fn test_extract_values_up_to_hundred_pass_through() {
        for (whole, tenth) in [(0u32, 0u32), (7, 5), (42, 1), (99, 9), (100, 0)] {
            let line = format!("[download] {}.{}% of 1.00MiB", whole, tenth);
            let expected: f64 = format!("{}.{}", whole, tenth).parse().unwrap();
            assert_eq!(extract(&line), Some(expected), "line {:?}", line);
        }
    }

    // ==================== parse_download_stats Tests ====================

    #[test]
    fn test_parse_stats_full_line() {
        let stats = parse_download_stats("[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10").unwrap();
        assert_eq!(stats.total_size, Some(10 * 1024 * 1024));
        assert_eq!(stats.speed_bytes, Some(500 * 1024));
        assert_eq!(stats.eta_seconds, Some(10));
    }

    #[test]
    fn test_parse_stats_estimated_size_and_long_eta() {
        let stats = parse_download_stats("[download]   3.0% of ~1.50GiB at 2.00MiB/s ETA 1:02:03").unwrap();
        assert_eq!(stats.total_size, Some((1.5 * 1024.0 * 1024.0 * 1024.0) as u64));
        assert_eq!(stats.eta_seconds, Some(3723));
    }

    #[test]
    fn test_parse_stats_ignores_other_lines() {
        assert_eq!(parse_download_stats("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_download_stats("[download] Destination: a.mp4"), None);
        assert_eq!(parse_download_stats("[download] 10.0%"), None);
    }

    #[test]
    fn test_parse_stats_oversized_eta_is_dropped() {
        // A title echoed on a Destination line can contain anything.
        let stats = parse_download_stats("[download] Destination: clip 50.0% ETA 18446744073709551615:00.mp4");
        assert_eq!(stats, None);

        let stats = parse_download_stats("[download]  50.0% of 1.00MiB ETA 99999999999999999:59:59").unwrap();
        assert_eq!(stats.total_size, Some(1024 * 1024));
        assert_eq!(stats.eta_seconds, None);
    }

    #[test]
    fn test_parse_stats_unknown_speed() {
        let stats = parse_download_stats("[download]  10.0% of 2.00MiB at Unknown B/s ETA Unknown").unwrap();
        assert_eq!(stats.total_size, Some(2 * 1024 * 1024));
        assert_eq!(stats.speed_bytes, None);
        assert_eq!(stats.eta_seconds, None);
    }

    // ==================== ProgressBar Tests ====================

    #[test]
    fn test_progress_bar_classic() {
        let bar = ProgressBar::with_width(10);
        assert_eq!(bar.render(0.0), "[░░░░░░░░░░]   0.0%");
        assert_eq!(bar.render(50.0), "[█████░░░░░]  50.0%");
        assert_eq!(bar.render(100.0), "[██████████] 100.0%");
    }

    #[test]
    fn test_progress_bar_clamps() {
        let bar = ProgressBar::with_width(10);
        assert_eq!(bar.render(150.0), "[██████████] 100.0%");
        assert_eq!(bar.render(-5.0), "[░░░░░░░░░░]   0.0%");
    }

    #[test]
    fn test_progress_bar_with_stats() {
        let bar = ProgressBar::with_width(4);
        let stats = DownloadStats {
            total_size: Some(10 * 1024 * 1024),
            speed_bytes: Some(1024 * 1024),
            eta_seconds: Some(65),
        };
        assert_eq!(
            bar.render_with_stats(50.0, Some(&stats)),
            "[██░░]  50.0% of 10.0 MiB at 1.0 MiB/s ETA 1:05"
        );
        assert_eq!(bar.render_with_stats(50.0, None), "[██░░]  50.0%");
    }
}
