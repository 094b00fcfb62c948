//! Pipeline log entries.
//!
//! Every step of a pipeline reports through [`LogCollector`], which forwards
//! to the `log` facade and keeps a copy of the entry. The copies end up in
//! the report so a presenter can show diagnostics without a logger attached.

use serde::{Deserialize, Serialize};

/// Log level for presenter display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

pub fn log_info(msg: impl AsRef<str>) {
    log::info!("{}", msg.as_ref());
}

pub fn log_success(msg: impl AsRef<str>) {
    log::info!("✓ {}", msg.as_ref());
}

pub fn log_warning(msg: impl AsRef<str>) {
    log::warn!("{}", msg.as_ref());
}

pub fn log_error(msg: impl AsRef<str>) {
    log::error!("{}", msg.as_ref());
}

/// Forwards entries to the `log` facade and keeps them in order.
#[derive(Debug, Default)]
pub struct LogCollector {
    entries: Vec<LogEntry>,
}

impl LogCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Info, msg));
    }

    pub fn success(&mut self, msg: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Success, msg));
    }

    pub fn warning(&mut self, msg: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Warning, msg));
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Error, msg));
    }

    fn push(&mut self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info => log_info(&entry.message),
            LogLevel::Success => log_success(&entry.message),
            LogLevel::Warning => log_warning(&entry.message),
            LogLevel::Error => log_error(&entry.message),
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_keeps_order() {
        let mut log = LogCollector::new();
        log.info("Reading source");
        log.warning("3 rows dropped");
        log.success("Done");

        let levels: Vec<LogLevel> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warning, LogLevel::Success]);
        assert_eq!(log.into_entries()[1].message, "3 rows dropped");
    }

    #[test]
    fn test_entry_serialization() {
        let entry = LogEntry::new(LogLevel::Warning, "careful");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["message"], "careful");
    }
}
