//! Per-call scope options.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::event::AuditEvent;
use crate::policy::EventCreationPolicy;
use crate::provider::AuditDataProvider;

/// Produces the current serialized value of the audited object.
pub type TargetGetter = Arc<dyn Fn() -> Result<Value, serde_json::Error> + Send + Sync>;

/// The audited object: its type name and how to read its current value.
#[derive(Clone)]
pub struct TargetSource {
    type_name: String,
    getter: TargetGetter,
}

impl TargetSource {
    /// Creates a target source from a getter returning a serializable value.
    #[must_use]
    pub fn new<T, F>(getter: F) -> Self
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            type_name: short_type_name::<T>(),
            getter: Arc::new(move || serde_json::to_value(getter())),
        }
    }

    /// Creates a target source from an already-serializing getter.
    #[must_use]
    pub fn from_getter(type_name: impl Into<String>, getter: TargetGetter) -> Self {
        Self {
            type_name: type_name.into(),
            getter,
        }
    }

    /// Returns the audited type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Reads and serializes the current value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn snapshot(&self) -> Result<Value, serde_json::Error> {
        (self.getter)()
    }
}

impl fmt::Debug for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetSource")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base_end = full.find('<').unwrap_or(full.len());
    let start = full[..base_end].rfind("::").map_or(0, |i| i + 2);
    full[start..].to_string()
}

/// Configuration for one scope, resolved against the [`AuditConfig`](crate::AuditConfig)
/// defaults when the scope is created.
///
/// Factories read options by reference and never modify them.
///
/// # Examples
///
/// ```rust
/// use auditscope_core::{AuditScopeOptions, EventCreationPolicy};
/// use serde_json::json;
///
/// let options = AuditScopeOptions::new("Order:Update")
///     .with_creation_policy(EventCreationPolicy::InsertOnStartReplaceOnEnd)
///     .with_extra_field("OrderId", json!(42))
///     .with_reference_id("req-1");
///
/// assert_eq!(options.event_type(), Some("Order:Update"));
/// ```
#[derive(Clone, Default)]
pub struct AuditScopeOptions {
    event_type: Option<String>,
    creation_policy: Option<EventCreationPolicy>,
    data_provider: Option<Arc<dyn AuditDataProvider>>,
    target: Option<TargetSource>,
    extra_fields: Map<String, Value>,
    audit_event: Option<AuditEvent>,
    reference_id: Option<String>,
    create_and_save: bool,
    calling_location: Option<&'static Location<'static>>,
}

impl AuditScopeOptions {
    /// Creates options for the given event type.
    ///
    /// Records the caller's source location for the event environment.
    #[must_use]
    #[track_caller]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            calling_location: Some(Location::caller()),
            ..Self::default()
        }
    }

    /// Sets the event type.
    #[must_use]
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Overrides the default creation policy.
    #[must_use]
    pub const fn with_creation_policy(mut self, policy: EventCreationPolicy) -> Self {
        self.creation_policy = Some(policy);
        self
    }

    /// Overrides the default data provider.
    #[must_use]
    pub fn with_data_provider(mut self, provider: Arc<dyn AuditDataProvider>) -> Self {
        self.data_provider = Some(provider);
        self
    }

    /// Sets the audited object.
    ///
    /// `getter` is called once at creation for the "old" snapshot and again
    /// on every save and at completion for the "new" snapshot.
    #[must_use]
    pub fn with_target<T, F>(mut self, getter: F) -> Self
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.target = Some(TargetSource::new(getter));
        self
    }

    /// Sets the audited object from a prepared [`TargetSource`].
    #[must_use]
    pub fn with_target_source(mut self, target: TargetSource) -> Self {
        self.target = Some(target);
        self
    }

    /// Seeds a custom field on the event.
    ///
    /// Keys in [`RESERVED_FIELDS`](crate::RESERVED_FIELDS) make scope
    /// creation fail with [`AuditError::ReservedField`](crate::AuditError::ReservedField).
    #[must_use]
    pub fn with_extra_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_fields.insert(key.into(), value);
        self
    }

    /// Seeds several custom fields on the event.
    #[must_use]
    pub fn with_extra_fields(mut self, fields: Map<String, Value>) -> Self {
        self.extra_fields.extend(fields);
        self
    }

    /// Uses a pre-built event instead of creating a new one.
    #[must_use]
    pub fn with_audit_event(mut self, event: AuditEvent) -> Self {
        self.audit_event = Some(event);
        self
    }

    /// Sets a caller correlation id copied onto the event.
    #[must_use]
    pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    /// Completes the scope immediately after creation with a single insert.
    #[must_use]
    pub const fn with_create_and_save(mut self, create_and_save: bool) -> Self {
        self.create_and_save = create_and_save;
        self
    }

    /// Sets the source location recorded in the event environment.
    #[must_use]
    pub const fn with_calling_location(mut self, location: &'static Location<'static>) -> Self {
        self.calling_location = Some(location);
        self
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// Returns the creation policy override.
    #[must_use]
    pub const fn creation_policy(&self) -> Option<EventCreationPolicy> {
        self.creation_policy
    }

    /// Returns the data provider override.
    #[must_use]
    pub const fn data_provider(&self) -> Option<&Arc<dyn AuditDataProvider>> {
        self.data_provider.as_ref()
    }

    /// Returns the audited object source.
    #[must_use]
    pub const fn target(&self) -> Option<&TargetSource> {
        self.target.as_ref()
    }

    /// Returns the fields seeded on the event.
    #[must_use]
    pub const fn extra_fields(&self) -> &Map<String, Value> {
        &self.extra_fields
    }

    /// Returns the pre-built event.
    #[must_use]
    pub const fn audit_event(&self) -> Option<&AuditEvent> {
        self.audit_event.as_ref()
    }

    /// Returns the reference id.
    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    /// Returns true if the scope completes right after creation.
    #[must_use]
    pub const fn is_create_and_save(&self) -> bool {
        self.create_and_save
    }

    /// Returns the recorded source location.
    #[must_use]
    pub const fn calling_location(&self) -> Option<&'static Location<'static>> {
        self.calling_location
    }
}

impl fmt::Debug for AuditScopeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditScopeOptions")
            .field("event_type", &self.event_type)
            .field("creation_policy", &self.creation_policy)
            .field("data_provider", &self.data_provider.as_ref().map(|p| p.name()))
            .field("target", &self.target)
            .field("extra_fields", &self.extra_fields)
            .field("reference_id", &self.reference_id)
            .field("create_and_save", &self.create_and_save)
            .finish_non_exhaustive()
    }
}
