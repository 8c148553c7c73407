//! Data provider contract.
//!
//! A data provider is the persistence sink behind a scope. Implementations
//! must be safe to call concurrently from independent scopes, and every
//! insert must return an id distinct from every other insert.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cancellation::Cancellation;
use crate::error::ProviderError;
use crate::event::{AuditEvent, EventId};

/// Pluggable persistence backend for audit events.
///
/// Only [`insert_event`](Self::insert_event) and
/// [`replace_event`](Self::replace_event) are required. The async methods
/// default to checking the cancellation token and delegating to the sync
/// ones; backends with real async I/O should override them.
#[async_trait]
pub trait AuditDataProvider: Send + Sync + Debug {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Persists a new event and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be stored.
    fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError>;

    /// Overwrites the event stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be stored.
    fn replace_event(&self, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError>;

    /// Reads back a stored event.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unsupported`] unless the backend overrides it.
    fn get_event(&self, id: &EventId) -> Result<Option<AuditEvent>, ProviderError> {
        let _ = id;
        Err(ProviderError::Unsupported {
            provider: self.name(),
            operation: "get_event",
        })
    }

    /// Async form of [`insert_event`](Self::insert_event).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] if `cancel` is already set.
    async fn insert_event_async(
        &self,
        event: &AuditEvent,
        cancel: &Cancellation,
    ) -> Result<EventId, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        self.insert_event(event)
    }

    /// Async form of [`replace_event`](Self::replace_event).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] if `cancel` is already set.
    async fn replace_event_async(
        &self,
        id: &EventId,
        event: &AuditEvent,
        cancel: &Cancellation,
    ) -> Result<(), ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        self.replace_event(id, event)
    }

    /// Async form of [`get_event`](Self::get_event).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] if `cancel` is already set.
    async fn get_event_async(
        &self,
        id: &EventId,
        cancel: &Cancellation,
    ) -> Result<Option<AuditEvent>, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        self.get_event(id)
    }

    /// Produces the value stored as a target's "old" snapshot.
    ///
    /// The snapshot must not share state with the live value.
    fn clone_value(&self, value: &Value) -> Value {
        value.clone()
    }
}

impl dyn AuditDataProvider {
    /// Reads back a stored event and deserializes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot read events or the stored
    /// event does not match `T`.
    pub fn get_event_as<T: DeserializeOwned>(
        &self,
        id: &EventId,
    ) -> Result<Option<T>, ProviderError> {
        self.get_event(id)?.map(convert_event).transpose()
    }

    /// Async form of [`get_event_as`](Self::get_event_as).
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot read events or the stored
    /// event does not match `T`.
    pub async fn get_event_as_async<T: DeserializeOwned>(
        &self,
        id: &EventId,
        cancel: &Cancellation,
    ) -> Result<Option<T>, ProviderError> {
        self.get_event_async(id, cancel)
            .await?
            .map(convert_event)
            .transpose()
    }
}

fn convert_event<T: DeserializeOwned>(event: AuditEvent) -> Result<T, ProviderError> {
    let value = serde_json::to_value(event)?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct VecProvider {
        events: Mutex<Vec<AuditEvent>>,
    }

    impl AuditDataProvider for VecProvider {
        fn name(&self) -> &'static str {
            "vec"
        }

        fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError> {
            let mut events = self.events.lock();
            events.push(event.clone());
            Ok(EventId::Int(i64::try_from(events.len() - 1).unwrap()))
        }

        fn replace_event(&self, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
            let EventId::Int(index) = id else {
                return Err(ProviderError::NotFound { id: id.to_string() });
            };
            let mut events = self.events.lock();
            let slot = events
                .get_mut(usize::try_from(*index).unwrap())
                .ok_or_else(|| ProviderError::NotFound { id: id.to_string() })?;
            *slot = event.clone();
            Ok(())
        }
    }

    #[test]
    fn test_get_event_unsupported_by_default() {
        let provider = VecProvider::default();
        let err = provider.get_event(&EventId::Int(0)).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Unsupported { provider: "vec", operation: "get_event" }
        ));
    }

    #[tokio::test]
    async fn test_async_defaults_delegate_to_sync() {
        let provider = VecProvider::default();
        let cancel = Cancellation::new();

        let id = provider
            .insert_event_async(&AuditEvent::new("a"), &cancel)
            .await
            .unwrap();
        provider
            .replace_event_async(&id, &AuditEvent::new("b"), &cancel)
            .await
            .unwrap();

        assert_eq!(provider.events.lock()[0].event_type(), "b");
    }

    #[tokio::test]
    async fn test_async_defaults_observe_cancellation() {
        let provider = VecProvider::default();
        let cancel = Cancellation::new();
        cancel.cancel();

        let err = provider
            .insert_event_async(&AuditEvent::new("a"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled));
        assert!(provider.events.lock().is_empty());
    }

    #[test]
    fn test_get_event_as_on_dyn_provider() {
        #[derive(Deserialize)]
        struct Summary {
            event_type: String,
        }

        #[derive(Debug, Default)]
        struct Single;

        impl AuditDataProvider for Single {
            fn name(&self) -> &'static str {
                "single"
            }

            fn insert_event(&self, _event: &AuditEvent) -> Result<EventId, ProviderError> {
                Ok(EventId::Int(1))
            }

            fn replace_event(&self, _id: &EventId, _event: &AuditEvent) -> Result<(), ProviderError> {
                Ok(())
            }

            fn get_event(&self, _id: &EventId) -> Result<Option<AuditEvent>, ProviderError> {
                Ok(Some(AuditEvent::new("Order:Update")))
            }
        }

        let provider: Arc<dyn AuditDataProvider> = Arc::new(Single);
        let summary: Summary = provider.get_event_as(&EventId::Int(1)).unwrap().unwrap();
        assert_eq!(summary.event_type, "Order:Update");
    }
}
