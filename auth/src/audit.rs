//! Structured audit logging for authentication decisions.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    Denied,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub principal: Option<String>,
    pub path: String,
    pub outcome: AuditOutcome,
}

/// Emits one `tracing` event per authentication decision. A real deployment
/// can route this through a `tracing_subscriber` layer to a SIEM; this
/// crate only guarantees the event shape, not the sink.
#[derive(Debug, Clone, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn record(&self, event: AuditEvent) {
        match event.outcome {
            AuditOutcome::Allowed => tracing::info!(
                principal = event.principal.as_deref().unwrap_or("unknown"),
                path = %event.path,
                "auth allowed"
            ),
            AuditOutcome::Denied => tracing::warn!(
                path = %event.path,
                "auth denied"
            ),
        }
    }
}
