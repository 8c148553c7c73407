//! # Auditscope Core
//!
//! Lifecycle engine for audit scopes.
//!
//! An [`AuditScope`] wraps one audited operation. It builds an
//! [`AuditEvent`], snapshots the audited object before and after, and hands
//! the event to an [`AuditDataProvider`] at the points dictated by its
//! [`EventCreationPolicy`]:
//!
//! | Policy | Creation | Explicit save | Completion |
//! |---|---|---|---|
//! | `InsertOnStartReplaceOnEnd` | insert | replace | replace |
//! | `InsertOnStartInsertOnEnd` | insert | ignored | insert |
//! | `InsertOnEnd` | nothing | ignored | insert |
//! | `Manual` | nothing | insert, then replace | nothing |
//!
//! Defaults live in an [`AuditConfig`], either passed to a
//! [`DefaultScopeFactory`] or installed process-wide through [`global`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use auditscope_core::{
//!     AuditConfig, AuditDataProvider, AuditEvent, AuditScopeFactory, AuditScopeOptions,
//!     DefaultScopeFactory, EventCreationPolicy, EventId, ProviderError,
//! };
//!
//! #[derive(Debug)]
//! struct Discard;
//!
//! impl AuditDataProvider for Discard {
//!     fn name(&self) -> &'static str { "discard" }
//!     fn insert_event(&self, _: &AuditEvent) -> Result<EventId, ProviderError> {
//!         Ok(EventId::new_v7())
//!     }
//!     fn replace_event(&self, _: &EventId, _: &AuditEvent) -> Result<(), ProviderError> {
//!         Ok(())
//!     }
//! }
//!
//! let factory = DefaultScopeFactory::new(Arc::new(
//!     AuditConfig::builder().data_provider(Arc::new(Discard)).build(),
//! ));
//!
//! let options = AuditScopeOptions::new("Order:Update")
//!     .with_creation_policy(EventCreationPolicy::InsertOnStartReplaceOnEnd);
//! let mut scope = factory.create(&options)?;
//! assert!(scope.event_id().is_some());
//!
//! scope.comment("Status Updated");
//! scope.dispose()?;
//! # Ok::<(), auditscope_core::AuditError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cancellation;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod global;
pub mod options;
pub mod policy;
pub mod provider;
pub mod scope;
pub mod template;


pub use cancellation::Cancellation;
pub use clock::{Clock, SystemClock};
pub use config::{AuditConfig, AuditConfigBuilder, ScopeHook, ScopeHooks};
pub use error::{AuditError, CustomFieldError, HookError, HookKind, ProviderError, Result};
pub use event::{AuditEvent, AuditEventEnvironment, AuditTarget, EventId, RESERVED_FIELDS};
pub use factory::{AuditScopeFactory, DefaultScopeFactory, ResolvedScope};
pub use options::{AuditScopeOptions, TargetGetter, TargetSource};
pub use policy::{CompletionAction, EventCreationPolicy, ParsePolicyError, SaveAction};
pub use provider::AuditDataProvider;
pub use scope::{AuditScope, ScopeState};
pub use template::EventTypeTemplate;
