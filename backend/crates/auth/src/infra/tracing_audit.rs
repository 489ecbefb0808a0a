//! Audit sink writing to the `audit` tracing target

use tracing::field::display;

use crate::domain::audit::{AuditEvent, AuditSink};

/// Emits each event as one structured log line under `target: "audit"`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let user_id = event.user_id.as_ref().map(display);
        let email = event.email.as_deref();

        if event.kind.is_failure() {
            tracing::warn!(
                target: "audit",
                event = event.kind.as_str(),
                client_id = %event.client_id,
                user_id,
                email,
                reason = event.reason,
                "Auth event"
            );
        } else {
            tracing::info!(
                target: "audit",
                event = event.kind.as_str(),
                client_id = %event.client_id,
                user_id,
                email,
                "Auth event"
            );
        }
    }
}
