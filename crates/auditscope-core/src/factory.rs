//! Scope factory: option resolution and scope construction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancellation::Cancellation;
use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::options::AuditScopeOptions;
use crate::policy::EventCreationPolicy;
use crate::provider::AuditDataProvider;
use crate::scope::AuditScope;

/// Creates and starts audit scopes.
///
/// This is the single entry point integrations use to open a scope.
#[async_trait]
pub trait AuditScopeFactory: Send + Sync {
    /// Creates a scope and performs its start-time persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if options cannot be resolved, a hook fails, or the
    /// start-time provider call fails.
    fn create(&self, options: &AuditScopeOptions) -> Result<AuditScope>;

    /// Async form of [`create`](Self::create).
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Cancelled`] if `cancel` is set before the
    /// start-time provider call, otherwise the same errors as `create`.
    async fn create_async(
        &self,
        options: &AuditScopeOptions,
        cancel: &Cancellation,
    ) -> Result<AuditScope>;
}

/// Options merged with configuration defaults.
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    /// Effective creation policy.
    pub policy: EventCreationPolicy,
    /// Effective data provider.
    pub provider: Option<Arc<dyn AuditDataProvider>>,
    /// Configuration the scope runs under.
    pub config: Arc<AuditConfig>,
}

/// Factory resolving options against an [`AuditConfig`].
///
/// Per-call policy and provider take precedence over the configuration
/// defaults. Create-and-save options always run as
/// [`EventCreationPolicy::InsertOnEnd`].
#[derive(Debug, Clone)]
pub struct DefaultScopeFactory {
    config: Arc<AuditConfig>,
}

impl Default for DefaultScopeFactory {
    fn default() -> Self {
        Self::new(Arc::new(AuditConfig::default()))
    }
}

impl DefaultScopeFactory {
    /// Creates a factory over the given configuration.
    #[must_use]
    pub const fn new(config: Arc<AuditConfig>) -> Self {
        Self { config }
    }

    /// Returns the configuration this factory resolves against.
    #[must_use]
    pub const fn config(&self) -> &Arc<AuditConfig> {
        &self.config
    }

    /// Merges `options` with the configuration defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Configuration`] if no event type is given, or
    /// if the effective policy inserts on start and no data provider is
    /// available while auditing is enabled.
    pub fn resolve(&self, options: &AuditScopeOptions) -> Result<ResolvedScope> {
        let has_event_type = options
            .event_type()
            .or_else(|| options.audit_event().map(crate::AuditEvent::event_type))
            .is_some_and(|event_type| !event_type.is_empty());
        if !has_event_type {
            return Err(AuditError::configuration("an event type is required"));
        }

        let policy = if options.is_create_and_save() {
            EventCreationPolicy::InsertOnEnd
        } else {
            options
                .creation_policy()
                .unwrap_or_else(|| self.config.creation_policy())
        };

        let provider = options
            .data_provider()
            .or_else(|| self.config.data_provider())
            .cloned();

        if provider.is_none() && policy.inserts_on_start() && !self.config.audit_disabled() {
            return Err(AuditError::configuration(format!(
                "no data provider configured for policy {policy}"
            )));
        }

        Ok(ResolvedScope {
            policy,
            provider,
            config: Arc::clone(&self.config),
        })
    }
}

#[async_trait]
impl AuditScopeFactory for DefaultScopeFactory {
    fn create(&self, options: &AuditScopeOptions) -> Result<AuditScope> {
        let resolved = self.resolve(options)?;
        let mut scope = AuditScope::prepare(options, resolved)?.start()?;

        if options.is_create_and_save() {
            scope.dispose()?;
        }

        Ok(scope)
    }

    async fn create_async(
        &self,
        options: &AuditScopeOptions,
        cancel: &Cancellation,
    ) -> Result<AuditScope> {
        if cancel.is_cancelled() {
            return Err(AuditError::Cancelled { operation: "create" });
        }

        let resolved = self.resolve(options)?;
        let mut scope = AuditScope::prepare(options, resolved)?
            .start_async(cancel)
            .await?;

        if options.is_create_and_save() {
            scope.dispose_async(cancel).await?;
        }

        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::event::{AuditEvent, EventId};

    #[derive(Debug)]
    struct Noop;

    impl AuditDataProvider for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn insert_event(&self, _event: &AuditEvent) -> std::result::Result<EventId, ProviderError> {
            Ok(EventId::Int(0))
        }

        fn replace_event(
            &self,
            _id: &EventId,
            _event: &AuditEvent,
        ) -> std::result::Result<(), ProviderError> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_prefers_per_call_overrides() {
        let config = AuditConfig::builder()
            .creation_policy(EventCreationPolicy::InsertOnEnd)
            .data_provider(Arc::new(Noop))
            .build();
        let factory = DefaultScopeFactory::new(Arc::new(config));

        let options = AuditScopeOptions::new("test")
            .with_creation_policy(EventCreationPolicy::Manual);
        let resolved = factory.resolve(&options).unwrap();

        assert_eq!(resolved.policy, EventCreationPolicy::Manual);
        assert_eq!(resolved.provider.unwrap().name(), "noop");
    }

    #[test]
    fn test_resolve_falls_back_to_config() {
        let config = AuditConfig::builder()
            .creation_policy(EventCreationPolicy::InsertOnStartInsertOnEnd)
            .data_provider(Arc::new(Noop))
            .build();
        let factory = DefaultScopeFactory::new(Arc::new(config));

        let resolved = factory.resolve(&AuditScopeOptions::new("test")).unwrap();
        assert_eq!(resolved.policy, EventCreationPolicy::InsertOnStartInsertOnEnd);
        assert!(resolved.provider.is_some());
    }

    #[test]
    fn test_resolve_requires_provider_for_start_insert() {
        let factory = DefaultScopeFactory::default();
        let options = AuditScopeOptions::new("test")
            .with_creation_policy(EventCreationPolicy::InsertOnStartReplaceOnEnd);

        let err = factory.resolve(&options).unwrap_err();
        assert!(matches!(err, AuditError::Configuration { .. }));
    }

    #[test]
    fn test_resolve_allows_missing_provider_when_nothing_inserts_on_start() {
        let factory = DefaultScopeFactory::default();
        for policy in [EventCreationPolicy::InsertOnEnd, EventCreationPolicy::Manual] {
            let options = AuditScopeOptions::new("test").with_creation_policy(policy);
            assert!(factory.resolve(&options).is_ok(), "{policy}");
        }
    }

    #[test]
    fn test_resolve_allows_missing_provider_when_disabled() {
        let config = AuditConfig::builder().audit_disabled(true).build();
        let factory = DefaultScopeFactory::new(Arc::new(config));
        let options = AuditScopeOptions::new("test")
            .with_creation_policy(EventCreationPolicy::InsertOnStartReplaceOnEnd);

        assert!(factory.resolve(&options).is_ok());
    }

    #[test]
    fn test_resolve_requires_event_type() {
        let factory = DefaultScopeFactory::default();
        let err = factory.resolve(&AuditScopeOptions::default()).unwrap_err();
        assert!(matches!(err, AuditError::Configuration { .. }));

        let options = AuditScopeOptions::default().with_audit_event(AuditEvent::new("prebuilt"));
        assert!(factory.resolve(&options).is_ok());
    }

    #[test]
    fn test_create_and_save_forces_insert_on_end() {
        let factory = DefaultScopeFactory::new(Arc::new(
            AuditConfig::builder().data_provider(Arc::new(Noop)).build(),
        ));
        let options = AuditScopeOptions::new("test")
            .with_creation_policy(EventCreationPolicy::Manual)
            .with_create_and_save(true);

        assert_eq!(
            factory.resolve(&options).unwrap().policy,
            EventCreationPolicy::InsertOnEnd
        );
    }
}
