//! Ready-made factory wiring for tests.

use std::sync::Arc;

use auditscope_core::{
    AuditConfig, AuditConfigBuilder, AuditScope, AuditScopeFactory, AuditScopeOptions,
    DefaultScopeFactory, EventCreationPolicy, Result,
};

use crate::clock::ManualClock;
use crate::recording::RecordingProvider;

/// A factory wired to a [`RecordingProvider`] and a [`ManualClock`].
///
/// # Examples
///
/// ```rust
/// use auditscope_core::{AuditScopeOptions, EventCreationPolicy};
/// use auditscope_test::{CallKind, Harness};
///
/// let harness = Harness::new(EventCreationPolicy::InsertOnEnd);
/// let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
/// scope.dispose().unwrap();
///
/// assert_eq!(harness.provider.call_kinds(), [CallKind::Insert]);
/// ```
#[derive(Debug, Clone)]
pub struct Harness {
    /// Provider every scope persists to.
    pub provider: Arc<RecordingProvider>,
    /// Clock every scope reads.
    pub clock: ManualClock,
    /// Factory creating the scopes.
    pub factory: DefaultScopeFactory,
}

impl Harness {
    /// Creates a harness whose configuration defaults to `policy`.
    #[must_use]
    pub fn new(policy: EventCreationPolicy) -> Self {
        Self::with_config(|builder| builder.creation_policy(policy))
    }

    /// Creates a harness, letting `configure` add hooks or other settings.
    ///
    /// The provider and clock are installed before `configure` runs.
    #[must_use]
    pub fn with_config<F>(configure: F) -> Self
    where
        F: FnOnce(AuditConfigBuilder) -> AuditConfigBuilder,
    {
        let provider = Arc::new(RecordingProvider::new());
        let clock = ManualClock::new();
        let builder = AuditConfig::builder()
            .data_provider(provider.clone())
            .clock(Arc::new(clock.clone()));
        let factory = DefaultScopeFactory::new(Arc::new(configure(builder).build()));

        Self {
            provider,
            clock,
            factory,
        }
    }

    /// Creates a scope through the harness factory.
    ///
    /// # Errors
    ///
    /// See [`AuditScopeFactory::create`].
    pub fn create(&self, options: &AuditScopeOptions) -> Result<AuditScope> {
        self.factory.create(options)
    }
}
