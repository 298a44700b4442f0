//! Crash report and window readiness markers in game stdout

use once_cell::sync::Lazy;
use regex::Regex;

pub const CRASH_REPORT_HEADER: &str = "---- Minecraft Crash Report ----";

/// Upper bound on inline crash report text kept from stdout
pub const MAX_INLINE_CRASH_REPORT: usize = 256 * 1024;

static CRASH_SAVED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Crash report saved to|This crash report has been saved to):\s*(?:#@!@#)?\s*(.+)")
        .expect("crash location regex")
});

static WINDOW_READY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Backend library: LWJGL|LWJGL Version|Created: \d+x\d+x\d+ minecraft:textures")
        .expect("window ready regex")
});

/// Keep the first non-empty line of a reported crash path, truncated after
/// its last `.txt`, so `"C:\logs\crash.txt\nTail"` becomes `"C:\logs\crash.txt"`.
pub fn normalize_crash_report_location(raw: &str) -> String {
    let line = raw
        .split(['\r', '\n'])
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    match line.rfind(".txt") {
        Some(idx) => line[..idx + ".txt".len()].trim_end().to_string(),
        None => line.to_string(),
    }
}

/// Crash report path announced on a stdout line
pub fn crash_report_location(line: &str) -> Option<String> {
    CRASH_SAVED_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| normalize_crash_report_location(m.as_str()))
        .filter(|p| !p.is_empty())
}

/// Longest prefix of `text` within `max` bytes that ends on a char boundary
fn clip(text: &str, max: usize) -> &str {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub fn is_window_ready(line: &str) -> bool {
    WINDOW_READY_RE.is_match(line)
}

/// Accumulates stdout text and tracks crash and readiness markers across
/// chunk boundaries.
#[derive(Debug, Default)]
pub struct StdoutScanner {
    partial: String,
    window_ready: bool,
    crash_location: Option<String>,
    crash_report: Option<String>,
    /// No more lines belong to the inline report
    crash_report_closed: bool,
}

/// What a single chunk revealed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub window_ready: bool,
}

impl StdoutScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text. Only complete lines are inspected.
    pub fn feed(&mut self, text: &str) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        self.partial.push_str(text);

        while let Some(idx) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=idx).collect();
            self.scan_line(&line, &mut outcome);
        }
        outcome
    }

    /// Scan whatever is left without a trailing newline
    pub fn finish(&mut self) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.scan_line(&line, &mut outcome);
        }
        outcome
    }

    fn scan_line(&mut self, line: &str, outcome: &mut ScanOutcome) {
        let location = crash_report_location(line);

        if let Some(ref mut report) = self.crash_report {
            // The "saved to" announcement follows the printed report
            if location.is_some() {
                self.crash_report_closed = true;
            }
            if !self.crash_report_closed {
                let room = MAX_INLINE_CRASH_REPORT.saturating_sub(report.len());
                let kept = clip(line, room);
                report.push_str(kept);
                if kept.len() < line.len() {
                    log::warn!("[launch] Inline crash report truncated");
                    self.crash_report_closed = true;
                }
            }
        } else if let Some(idx) = line.find(CRASH_REPORT_HEADER) {
            let report = clip(&line[idx..], MAX_INLINE_CRASH_REPORT);
            self.crash_report_closed = report.len() < line.len() - idx;
            self.crash_report = Some(report.to_string());
        }

        if self.crash_location.is_none() {
            if let Some(location) = location {
                log::info!("[launch] Crash report saved to {}", location);
                self.crash_location = Some(location);
            }
        }

        if !self.window_ready && is_window_ready(line) {
            self.window_ready = true;
            outcome.window_ready = true;
        }
    }

    pub fn crash_location(&self) -> Option<&str> {
        self.crash_location.as_deref()
    }

    pub fn into_crash(self) -> (Option<String>, Option<String>) {
        (self.crash_report, self.crash_location)
    }
}
