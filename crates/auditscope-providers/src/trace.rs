//! Provider that emits events as tracing records.

use auditscope_core::{AuditDataProvider, AuditEvent, EventId, ProviderError};
use tracing::{info, warn};

/// Logs every insert and replace as a structured tracing event.
///
/// Events whose environment recorded an error are logged at `WARN`, the
/// rest at `INFO`. Nothing is retained, so `get_event` is unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDataProvider;

impl TracingDataProvider {
    /// Creates a new tracing provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn emit(action: &'static str, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
        let json = event.to_json()?;

        match event.environment.error.as_deref() {
            Some(error) => warn!(
                action,
                event_id = %id,
                event_type = event.event_type(),
                error,
                audit_event = %json,
                "Audit event"
            ),
            None => info!(
                action,
                event_id = %id,
                event_type = event.event_type(),
                audit_event = %json,
                "Audit event"
            ),
        }

        Ok(())
    }
}

impl AuditDataProvider for TracingDataProvider {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError> {
        let id = EventId::new_v7();
        Self::emit("insert", &id, event)?;
        Ok(id)
    }

    fn replace_event(&self, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
        Self::emit("replace", id, event)
    }
}
