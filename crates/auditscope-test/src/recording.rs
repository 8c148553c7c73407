//! Recording data provider.
//!
//! [`RecordingProvider`] remembers every call made to it, in order, together
//! with a snapshot of the event it was handed. Tests assert on the call
//! sequence to check creation-policy behavior, and can switch on failures to
//! exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use auditscope_core::{AuditDataProvider, AuditEvent, EventId, ProviderError};
use parking_lot::Mutex;
use tracing::debug;

/// The kind of a recorded provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `insert_event`
    Insert,
    /// `replace_event`
    Replace,
    /// `get_event`
    Get,
}

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// What was called.
    pub kind: CallKind,
    /// The id returned by an insert or passed to a replace/get.
    pub id: EventId,
    /// The event as it was when the provider saw it. `None` for gets.
    pub event: Option<AuditEvent>,
}

/// A provider that records calls and stores events by integer id.
///
/// Ids start at 1 and increase with every successful insert.
///
/// # Examples
///
/// ```rust
/// use auditscope_core::{AuditDataProvider, AuditEvent};
/// use auditscope_test::{CallKind, RecordingProvider};
///
/// let provider = RecordingProvider::new();
/// let id = provider.insert_event(&AuditEvent::new("test")).unwrap();
/// provider.replace_event(&id, &AuditEvent::new("test")).unwrap();
///
/// assert_eq!(provider.call_kinds(), [CallKind::Insert, CallKind::Replace]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<RecordedCall>>,
    stored: Mutex<HashMap<EventId, AuditEvent>>,
    next_id: AtomicI64,
    fail_insert: AtomicBool,
    fail_replace: AtomicBool,
}

impl RecordingProvider {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent inserts fail with a backend error.
    pub fn set_fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent replaces fail with a backend error.
    pub fn set_fail_replace(&self, fail: bool) {
        self.fail_replace.store(fail, Ordering::SeqCst);
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the kinds of every recorded call in order.
    #[must_use]
    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.calls.lock().iter().map(|c| c.kind).collect()
    }

    /// Returns the number of calls of `kind`.
    #[must_use]
    pub fn count(&self, kind: CallKind) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }

    /// Returns the number of inserts.
    #[must_use]
    pub fn insert_count(&self) -> usize {
        self.count(CallKind::Insert)
    }

    /// Returns the number of replaces.
    #[must_use]
    pub fn replace_count(&self) -> usize {
        self.count(CallKind::Replace)
    }

    /// Returns the ids returned by inserts, in order.
    #[must_use]
    pub fn inserted_ids(&self) -> Vec<EventId> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.kind == CallKind::Insert)
            .map(|c| c.id.clone())
            .collect()
    }

    /// Returns the event snapshot of the last insert or replace.
    #[must_use]
    pub fn last_event(&self) -> Option<AuditEvent> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|c| c.event.clone())
    }

    /// Returns the currently stored version of an event.
    #[must_use]
    pub fn stored(&self, id: &EventId) -> Option<AuditEvent> {
        self.stored.lock().get(id).cloned()
    }

    /// Forgets all calls and stored events. Ids keep increasing.
    pub fn clear(&self) {
        self.calls.lock().clear();
        self.stored.lock().clear();
    }

    fn record(&self, kind: CallKind, id: EventId, event: Option<AuditEvent>) {
        debug!(?kind, event_id = %id, "Recorded provider call");
        self.calls.lock().push(RecordedCall { kind, id, event });
    }
}

impl AuditDataProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(ProviderError::Backend("insert failure injected".to_string()));
        }
        let id = EventId::Int(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.stored.lock().insert(id.clone(), event.clone());
        self.record(CallKind::Insert, id.clone(), Some(event.clone()));
        Ok(id)
    }

    fn replace_event(&self, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(ProviderError::Backend("replace failure injected".to_string()));
        }
        {
            let mut stored = self.stored.lock();
            let slot = stored
                .get_mut(id)
                .ok_or_else(|| ProviderError::NotFound { id: id.to_string() })?;
            *slot = event.clone();
        }
        self.record(CallKind::Replace, id.clone(), Some(event.clone()));
        Ok(())
    }

    fn get_event(&self, id: &EventId) -> Result<Option<AuditEvent>, ProviderError> {
        self.record(CallKind::Get, id.clone(), None);
        Ok(self.stored(id))
    }
}
