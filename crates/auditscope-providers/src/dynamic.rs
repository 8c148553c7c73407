//! Closure-backed data provider.

use std::fmt;
use std::sync::Arc;

use auditscope_core::{AuditDataProvider, AuditEvent, EventId, ProviderError};

type InsertFn = Arc<dyn Fn(&AuditEvent) -> Result<EventId, ProviderError> + Send + Sync>;
type ReplaceFn = Arc<dyn Fn(&EventId, &AuditEvent) -> Result<(), ProviderError> + Send + Sync>;
type GetFn = Arc<dyn Fn(&EventId) -> Result<Option<AuditEvent>, ProviderError> + Send + Sync>;

/// Delegates persistence to caller-supplied closures.
///
/// Without an insert closure, inserts succeed and return a fresh v7 UUID.
/// Without a replace closure, replaces succeed and do nothing. Without a
/// get closure, reads are unsupported.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use auditscope_core::{AuditDataProvider, AuditEvent, EventId};
/// use auditscope_providers::DynamicDataProvider;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let provider = DynamicDataProvider::builder()
///     .on_insert_and_replace(move |event| {
///         sink.lock().unwrap().push(event.event_type().to_string());
///     })
///     .build();
///
/// let id = provider.insert_event(&AuditEvent::new("Login"))?;
/// provider.replace_event(&id, &AuditEvent::new("Login"))?;
/// assert_eq!(seen.lock().unwrap().len(), 2);
/// # Ok::<(), auditscope_core::ProviderError>(())
/// ```
#[derive(Clone, Default)]
pub struct DynamicDataProvider {
    on_insert: Option<InsertFn>,
    on_replace: Option<ReplaceFn>,
    on_get: Option<GetFn>,
}

impl DynamicDataProvider {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> DynamicDataProviderBuilder {
        DynamicDataProviderBuilder::default()
    }
}

impl fmt::Debug for DynamicDataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicDataProvider")
            .field("on_insert", &self.on_insert.is_some())
            .field("on_replace", &self.on_replace.is_some())
            .field("on_get", &self.on_get.is_some())
            .finish()
    }
}

impl AuditDataProvider for DynamicDataProvider {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError> {
        match &self.on_insert {
            Some(insert) => insert(event),
            None => Ok(EventId::new_v7()),
        }
    }

    fn replace_event(&self, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
        match &self.on_replace {
            Some(replace) => replace(id, event),
            None => Ok(()),
        }
    }

    fn get_event(&self, id: &EventId) -> Result<Option<AuditEvent>, ProviderError> {
        match &self.on_get {
            Some(get) => get(id),
            None => Err(ProviderError::Unsupported {
                provider: self.name(),
                operation: "get_event",
            }),
        }
    }
}

/// Builder for a [`DynamicDataProvider`].
#[derive(Default)]
pub struct DynamicDataProviderBuilder {
    provider: DynamicDataProvider,
}

impl DynamicDataProviderBuilder {
    /// Sets the insert closure.
    #[must_use]
    pub fn on_insert<F>(mut self, insert: F) -> Self
    where
        F: Fn(&AuditEvent) -> Result<EventId, ProviderError> + Send + Sync + 'static,
    {
        self.provider.on_insert = Some(Arc::new(insert));
        self
    }

    /// Sets the replace closure.
    #[must_use]
    pub fn on_replace<F>(mut self, replace: F) -> Self
    where
        F: Fn(&EventId, &AuditEvent) -> Result<(), ProviderError> + Send + Sync + 'static,
    {
        self.provider.on_replace = Some(Arc::new(replace));
        self
    }

    /// Sets the get closure.
    #[must_use]
    pub fn on_get<F>(mut self, get: F) -> Self
    where
        F: Fn(&EventId) -> Result<Option<AuditEvent>, ProviderError> + Send + Sync + 'static,
    {
        self.provider.on_get = Some(Arc::new(get));
        self
    }

    /// Runs `action` on every insert and replace.
    ///
    /// Inserts return a fresh v7 UUID.
    #[must_use]
    pub fn on_insert_and_replace<F>(self, action: F) -> Self
    where
        F: Fn(&AuditEvent) + Send + Sync + 'static,
    {
        let action = Arc::new(action);
        let on_replace = Arc::clone(&action);
        self.on_insert(move |event| {
            action(event);
            Ok(EventId::new_v7())
        })
        .on_replace(move |_, event| {
            on_replace(event);
            Ok(())
        })
    }

    /// Builds the provider.
    #[must_use]
    pub fn build(self) -> DynamicDataProvider {
        self.provider
    }
}

impl fmt::Debug for DynamicDataProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicDataProviderBuilder")
            .field("provider", &self.provider)
            .finish()
    }
}
