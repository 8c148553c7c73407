//! Provider that persists nothing.

use auditscope_core::{AuditDataProvider, AuditEvent, EventId, ProviderError};

/// Accepts every call and stores nothing.
///
/// Inserts still return distinct ids so scopes behave as they would against
/// a real backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDataProvider;

impl NullDataProvider {
    /// Creates a new null provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditDataProvider for NullDataProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    fn insert_event(&self, _event: &AuditEvent) -> Result<EventId, ProviderError> {
        Ok(EventId::new_v7())
    }

    fn replace_event(&self, _id: &EventId, _event: &AuditEvent) -> Result<(), ProviderError> {
        Ok(())
    }

    fn get_event(&self, _id: &EventId) -> Result<Option<AuditEvent>, ProviderError> {
        Ok(None)
    }
}
