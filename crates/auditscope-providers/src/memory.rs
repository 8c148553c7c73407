//! In-memory data provider.

use auditscope_core::{AuditDataProvider, AuditEvent, EventId, ProviderError};
use parking_lot::RwLock;
use tracing::debug;

/// Keeps every event in memory, keyed by a v7 UUID.
///
/// Events are returned by [`events`](Self::events) in insertion order.
/// Replacing an event keeps its position.
#[derive(Debug, Default)]
pub struct InMemoryDataProvider {
    events: RwLock<Vec<(EventId, AuditEvent)>>,
}

impl InMemoryDataProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored event in insertion order.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Returns every stored `(id, event)` pair in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(EventId, AuditEvent)> {
        self.events.read().clone()
    }

    /// Returns the number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Removes every stored event.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl AuditDataProvider for InMemoryDataProvider {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError> {
        let id = EventId::new_v7();
        self.events.write().push((id.clone(), event.clone()));
        debug!(event_id = %id, event_type = event.event_type(), "Stored event in memory");
        Ok(id)
    }

    fn replace_event(&self, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
        let mut events = self.events.write();
        let slot = events
            .iter_mut()
            .find(|(stored, _)| stored == id)
            .ok_or_else(|| ProviderError::NotFound { id: id.to_string() })?;
        slot.1 = event.clone();
        Ok(())
    }

    fn get_event(&self, id: &EventId) -> Result<Option<AuditEvent>, ProviderError> {
        Ok(self
            .events
            .read()
            .iter()
            .find(|(stored, _)| stored == id)
            .map(|(_, e)| e.clone()))
    }
}
