//! Bounded append-only activity log.
//!
//! Every user-visible event (messages sent and received, connection
//! changes, errors) lands here rather than being thrown across component
//! boundaries. The log keeps a fixed number of entries and evicts the
//! oldest beyond the cap.

use std::collections::VecDeque;

use time::macros::format_description;
use time::OffsetDateTime;

/// Maximum number of retained log entries.
const MAX_ENTRIES: usize = 1000;

/// Category of a log entry, used for styling in the log view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
    /// An outbound publish.
    Sent,
    /// An inbound message.
    Received,
}

impl LogKind {
    /// Short tag shown in front of the entry text.
    pub fn tag(&self) -> &'static str {
        match self {
            LogKind::Info => "info",
            LogKind::Success => "ok",
            LogKind::Warning => "warn",
            LogKind::Error => "error",
            LogKind::Sent => "sent",
            LogKind::Received => "recv",
        }
    }
}

/// One timestamped log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Wall-clock time of day, preformatted as `HH:MM:SS`.
    pub timestamp: String,
    pub kind: LogKind,
    pub text: String,
}

/// Append-only log with a fixed capacity.
#[derive(Debug, Default)]
pub struct Logbook {
    entries: VecDeque<LogEntry>,
}

impl Logbook {
    pub fn new() -> Self {
        Self { entries: VecDeque::new() }
    }

    /// Append an entry, evicting the oldest when past the cap.
    pub fn add(&mut self, kind: LogKind, text: impl Into<String>) {
        self.entries.push_back(LogEntry {
            timestamp: current_time_of_day(),
            kind,
            text: text.into(),
        });
        while self.entries.len() > MAX_ENTRIES {
            self.entries.pop_front();
        }
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

/// Format the current local (or UTC when indeterminate) time as `HH:MM:SS`.
fn current_time_of_day() -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&format).unwrap_or_else(|_| "--:--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_iterate() {
        let mut log = Logbook::new();
        log.add(LogKind::Info, "first");
        log.add(LogKind::Error, "second");

        assert_eq!(log.len(), 2);
        let texts: Vec<_> = log.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(log.iter().next().unwrap().kind, LogKind::Info);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut log = Logbook::new();
        for i in 0..MAX_ENTRIES + 10 {
            log.add(LogKind::Info, format!("entry {}", i));
        }
        assert_eq!(log.len(), MAX_ENTRIES);
        // The first ten entries were evicted.
        assert_eq!(log.iter().next().unwrap().text, "entry 10");
    }

    #[test]
    fn test_clear() {
        let mut log = Logbook::new();
        log.add(LogKind::Info, "entry");
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_timestamp_shape() {
        let mut log = Logbook::new();
        log.add(LogKind::Info, "entry");
        let ts = &log.iter().next().unwrap().timestamp;
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
        assert_eq!(ts.as_bytes()[5], b':');
    }
}
