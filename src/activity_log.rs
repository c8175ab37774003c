//! The user-facing activity log.
//!
//! An append-only list of `[timestamp] action` lines kept in memory for the
//! lifetime of a session and shown on demand. It is deliberately separate
//! from `tracing`: tracing output is for operators and may be filtered away,
//! while this log is what the person holding the camera gets to see. Every
//! entry is mirrored to `tracing::info!` as well.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

/// One log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub action: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.at.format("%d/%m/%Y, %H:%M:%S"), self.action)
    }
}

/// Append-only, in-memory activity log.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `action` stamped with the current local time.
    pub fn record(&mut self, action: impl Into<String>) {
        self.record_at(Local::now(), action);
    }

    /// Append `action` with an explicit timestamp.
    pub fn record_at(&mut self, at: DateTime<Local>, action: impl Into<String>) {
        let action = action.into();
        info!(target: "doccapture::activity", "{}", action);
        self.entries.push(LogEntry { at, action });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, one per line, oldest first.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn render_is_oldest_first() {
        let mut log = ActivityLog::new();
        let t = Local.with_ymd_and_hms(2024, 2, 1, 9, 30, 5).unwrap();
        log.record_at(t, "Captured ID FRONT");
        log.record_at(t, "Captured ID BACK");
        assert_eq!(
            log.render(),
            "[01/02/2024, 09:30:05] Captured ID FRONT\n[01/02/2024, 09:30:05] Captured ID BACK"
        );
    }

    #[test]
    fn empty_log_renders_empty() {
        let log = ActivityLog::new();
        assert!(log.is_empty());
        assert_eq!(log.render(), "");
    }

    #[test]
    fn record_appends() {
        let mut log = ActivityLog::new();
        log.record("Cache cleared");
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].action, "Cache cleared");
    }
}
