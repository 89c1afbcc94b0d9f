//! Error log for recoverable conditions
//!
//! Resolution failures, parse problems, configuration problems and runtime
//! validation results do not abort an operation. They are collected here in
//! report order, de-duplicated by message, and mirrored to `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Severity of a reported condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorLevel {
    Error,
    Warn,
    Info,
    /// Result reported by the runtime's mapping validation
    Validation,
}

impl ErrorLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorLevel::Error => "ERROR",
            ErrorLevel::Warn => "WARN",
            ErrorLevel::Info => "INFO",
            ErrorLevel::Validation => "VALIDATION",
        }
    }
}

/// One reported condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub message: String,
    pub level: ErrorLevel,
    /// Mapping the condition belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn new(level: ErrorLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            mapping_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorLevel::Error, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(ErrorLevel::Warn, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ErrorLevel::Info, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorLevel::Validation, message)
    }

    pub fn with_mapping(mut self, mapping_id: Uuid) -> Self {
        self.mapping_id = Some(mapping_id);
        self
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.message)
    }
}

/// Ordered, de-duplicated log of reported conditions
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Vec<ErrorInfo>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a condition; returns `false` if the same message was already logged
    pub fn report(&mut self, info: ErrorInfo) -> bool {
        if self.entries.iter().any(|e| e.message == info.message) {
            debug!(message = %info.message, "Suppressing duplicate error report");
            return false;
        }
        match info.level {
            ErrorLevel::Error => error!(mapping_id = ?info.mapping_id, "{}", info.message),
            ErrorLevel::Warn | ErrorLevel::Validation => {
                warn!(mapping_id = ?info.mapping_id, level = info.level.as_str(), "{}", info.message)
            }
            ErrorLevel::Info => info!(mapping_id = ?info.mapping_id, "{}", info.message),
        }
        self.entries.push(info);
        true
    }

    pub fn error(&mut self, message: impl Into<String>) -> bool {
        self.report(ErrorInfo::error(message))
    }

    pub fn warn(&mut self, message: impl Into<String>) -> bool {
        self.report(ErrorInfo::warn(message))
    }

    pub fn info(&mut self, message: impl Into<String>) -> bool {
        self.report(ErrorInfo::info(message))
    }

    pub fn entries(&self) -> &[ErrorInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries at the given level
    pub fn at_level(&self, level: ErrorLevel) -> impl Iterator<Item = &ErrorInfo> {
        self.entries.iter().filter(move |e| e.level == level)
    }

    pub fn has_errors(&self) -> bool {
        self.at_level(ErrorLevel::Error).next().is_some()
    }

    /// Whether any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop the entries scoped to one mapping
    pub fn clear_mapping(&mut self, mapping_id: Uuid) {
        self.entries.retain(|e| e.mapping_id != Some(mapping_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_deduplicates_by_message() {
        let mut log = ErrorLog::new();
        assert!(log.error("Could not find field '/a'"));
        assert!(!log.warn("Could not find field '/a'"));
        assert!(log.info("Loaded"));
        assert_eq!(log.len(), 2);
        assert!(log.has_errors());
        assert!(log.contains("/a"));
    }

    #[test]
    fn test_clear_mapping() {
        let mut log = ErrorLog::new();
        let id = Uuid::new_v4();
        log.report(ErrorInfo::validation("bad type").with_mapping(id));
        log.error("unrelated");
        log.clear_mapping(id);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].message, "unrelated");
    }
}
