//! Append-only audit trail of human-readable events.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Receiver of audit messages. Ordering is emission order; no acknowledgment.
pub trait AuditSink {
    fn record(&mut self, message: String);
}

/// In-memory audit log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditLog {
    events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn messages(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl AuditSink for AuditLog {
    fn record(&mut self, message: String) {
        log::debug!("audit: {message}");
        self.events.push(AuditEvent {
            message,
            timestamp: Utc::now(),
        });
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&mut self, _message: String) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_emission_order() {
        let mut log = AuditLog::new();
        log.record("first".into());
        log.record("second".into());
        assert_eq!(log.messages(), vec!["first", "second"]);
        assert!(log.events()[0].timestamp <= log.events()[1].timestamp);
    }
}
