//! Shared status region written by admin actions and the send command.
//!
//! Each write carries a [`LogTicket`] obtained when the request was
//! issued. Clearing actions open a new epoch; their tickets are scoped
//! to it, so a result for a view the operator has since replaced is
//! dropped instead of landing on top of the newer one. Appending
//! actions get unscoped tickets and always land.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Clear the region when the request is issued.
    Clear,
    /// Append to whatever the region holds.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogTicket {
    epoch: u64,
    scoped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    entries: Vec<StatusEntry>,
    epoch: u64,
    capacity: Option<usize>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the log to the most recent `capacity` entries.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Start a request against the region.
    pub fn open(&mut self, mode: LogMode) -> LogTicket {
        match mode {
            LogMode::Clear => {
                self.entries.clear();
                self.epoch += 1;
                LogTicket {
                    epoch: self.epoch,
                    scoped: true,
                }
            }
            LogMode::Append => LogTicket {
                epoch: self.epoch,
                scoped: false,
            },
        }
    }

    pub fn is_live(&self, ticket: &LogTicket) -> bool {
        !ticket.scoped || ticket.epoch == self.epoch
    }

    /// Write a line; returns `false` if the ticket's epoch has been cleared.
    pub fn write(&mut self, ticket: &LogTicket, level: LogLevel, text: impl Into<String>) -> bool {
        if !self.is_live(ticket) {
            tracing::debug!(
                ticket_epoch = ticket.epoch,
                epoch = self.epoch,
                "Dropping status line from a cleared view"
            );
            return false;
        }
        self.push(level, text);
        true
    }

    /// Append a line outside of any request (validation errors and the like).
    pub fn push(&mut self, level: LogLevel, text: impl Into<String>) {
        if let Some(cap) = self.capacity {
            if self.entries.len() >= cap {
                self.entries.remove(0);
            }
        }
        self.entries.push(StatusEntry {
            timestamp: Utc::now(),
            level,
            text: text.into(),
        });
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&StatusEntry> {
        self.entries.last()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_mode_empties_region_on_open() {
        let mut log = StatusLog::new();
        let t = log.open(LogMode::Append);
        log.write(&t, LogLevel::Info, "partition on");
        let t = log.open(LogMode::Clear);
        assert!(log.entries().is_empty());
        log.write(&t, LogLevel::Info, "Leader: a");
        assert_eq!(log.texts(), vec!["Leader: a"]);
    }

    #[test]
    fn append_mode_accumulates() {
        let mut log = StatusLog::new();
        let a = log.open(LogMode::Append);
        let b = log.open(LogMode::Append);
        log.write(&a, LogLevel::Info, "one");
        log.write(&b, LogLevel::Info, "two");
        assert_eq!(log.texts(), vec!["one", "two"]);
    }

    #[test]
    fn scoped_write_after_newer_clear_is_dropped() {
        let mut log = StatusLog::new();
        let heartbeats = log.open(LogMode::Clear);
        let leader = log.open(LogMode::Clear);
        assert!(log.write(&leader, LogLevel::Info, "Leader: a"));
        assert!(!log.write(&heartbeats, LogLevel::Info, "Heartbeat: x"));
        assert_eq!(log.texts(), vec!["Leader: a"]);
    }

    #[test]
    fn unscoped_write_survives_clear() {
        let mut log = StatusLog::new();
        let partition = log.open(LogMode::Append);
        log.open(LogMode::Clear);
        assert!(log.write(&partition, LogLevel::Success, "partitionMode=enabled"));
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn capacity_limit_drops_oldest() {
        let mut log = StatusLog::with_capacity_limit(2);
        log.push(LogLevel::Info, "a");
        log.push(LogLevel::Info, "b");
        log.push(LogLevel::Info, "c");
        assert_eq!(log.texts(), vec!["b", "c"]);
    }
}
