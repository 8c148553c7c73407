//! Error types for audit scope operations.
//!
//! [`AuditError`] is what scope creation, save and dispose return.
//! [`ProviderError`] is what data providers return; it passes through
//! [`AuditError::Provider`] unchanged so callers can match on the
//! backend-specific failure.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`AuditError`] as the error type.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Boxed error returned by lifecycle hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Lifecycle hook points invoked by the scope engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// After the event is built, before any start-time persistence.
    ScopeCreated,
    /// Immediately before each provider insert/replace call.
    EventSaving,
    /// Immediately after each successful provider insert/replace call.
    EventSaved,
    /// After completion persistence, when the scope becomes terminal.
    ScopeDisposed,
}

impl HookKind {
    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ScopeCreated => "on_scope_created",
            Self::EventSaving => "on_event_saving",
            Self::EventSaved => "on_event_saved",
            Self::ScopeDisposed => "on_scope_disposed",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while driving an audit scope.
#[derive(Error, Debug)]
pub enum AuditError {
    /// No usable configuration for the requested operation.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Reason the configuration is unusable.
        reason: String,
    },

    /// The data provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The operation is not legal in the scope's current state.
    #[error("Cannot {operation} an audit scope that is {state}")]
    InvalidScopeState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the scope was in.
        state: &'static str,
    },

    /// A registered lifecycle hook failed.
    #[error("Lifecycle hook {hook} failed: {source}")]
    Hook {
        /// Hook point that failed.
        hook: HookKind,
        /// Error returned by the hook.
        #[source]
        source: HookError,
    },

    /// The audited target could not be serialized into a snapshot.
    #[error("Failed to snapshot audit target: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A custom field key collides with one of the event's own fields.
    #[error("Custom field '{key}' is reserved by the audit event")]
    ReservedField {
        /// Rejected key.
        key: String,
    },

    /// The operation was cancelled before the provider was called.
    #[error("Audit scope {operation} was cancelled")]
    Cancelled {
        /// Operation that was cancelled.
        operation: &'static str,
    },
}

impl AuditError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns true if this error originated in the data provider.
    #[must_use]
    pub const fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

impl From<CustomFieldError> for AuditError {
    fn from(err: CustomFieldError) -> Self {
        match err {
            CustomFieldError::Reserved { key } => Self::ReservedField { key },
            CustomFieldError::Serialization(e) => Self::Serialization(e),
        }
    }
}

/// Errors from writing a custom field onto an [`AuditEvent`](crate::AuditEvent).
#[derive(Error, Debug)]
pub enum CustomFieldError {
    /// The key is one of the event's own serialized fields.
    #[error("Custom field '{key}' is reserved by the audit event")]
    Reserved {
        /// Rejected key.
        key: String,
    },

    /// The value could not be serialized.
    #[error("Failed to serialize custom field: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by [`AuditDataProvider`](crate::AuditDataProvider) implementations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider does not implement this operation.
    #[error("Data provider '{provider}' does not support {operation}")]
    Unsupported {
        /// Provider name.
        provider: &'static str,
        /// Unsupported operation.
        operation: &'static str,
    },

    /// No event is stored under the given id.
    #[error("Audit event not found: {id}")]
    NotFound {
        /// Requested event id.
        id: String,
    },

    /// The call observed a cancellation request.
    #[error("Data provider call was cancelled")]
    Cancelled,

    /// Serialization error.
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific error.
    #[error("Backend error: {0}")]
    Backend(String),
}
