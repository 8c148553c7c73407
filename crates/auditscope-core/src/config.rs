//! Audit configuration context.
//!
//! [`AuditConfig`] carries the defaults a factory falls back to when the
//! per-call [`AuditScopeOptions`](crate::AuditScopeOptions) leave something
//! unset, plus the lifecycle hooks every scope runs. Each scope keeps the
//! `Arc<AuditConfig>` it was created with.

use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{HookError, HookKind};
use crate::policy::EventCreationPolicy;
use crate::provider::AuditDataProvider;
use crate::scope::AuditScope;

/// A lifecycle hook.
///
/// Hooks run synchronously in registration order. Returning an error aborts
/// the scope operation that triggered the hook. Hooks may mutate the scope's
/// event but must not call `save` or `dispose` on it.
///
/// Hooks should report failure through their `Result` rather than panic. A
/// scope completed by `Drop` while its thread is already unwinding contains
/// a hook panic and logs it, so the completion write is kept but later hooks
/// are skipped.
pub type ScopeHook = Arc<dyn Fn(&mut AuditScope) -> Result<(), HookError> + Send + Sync>;

/// Hooks registered per [`HookKind`].
#[derive(Clone, Default)]
pub struct ScopeHooks {
    on_scope_created: Vec<ScopeHook>,
    on_event_saving: Vec<ScopeHook>,
    on_event_saved: Vec<ScopeHook>,
    on_scope_disposed: Vec<ScopeHook>,
}

impl ScopeHooks {
    /// Returns the hooks registered for `kind`, in registration order.
    #[must_use]
    pub fn get(&self, kind: HookKind) -> &[ScopeHook] {
        match kind {
            HookKind::ScopeCreated => &self.on_scope_created,
            HookKind::EventSaving => &self.on_event_saving,
            HookKind::EventSaved => &self.on_event_saved,
            HookKind::ScopeDisposed => &self.on_scope_disposed,
        }
    }

    /// Appends a hook for `kind`.
    pub fn push(&mut self, kind: HookKind, hook: ScopeHook) {
        match kind {
            HookKind::ScopeCreated => self.on_scope_created.push(hook),
            HookKind::EventSaving => self.on_event_saving.push(hook),
            HookKind::EventSaved => self.on_event_saved.push(hook),
            HookKind::ScopeDisposed => self.on_scope_disposed.push(hook),
        }
    }

    /// Removes every registered hook.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Returns the total number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.on_scope_created.len()
            + self.on_event_saving.len()
            + self.on_event_saved.len()
            + self.on_scope_disposed.len()
    }

    /// Returns true if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ScopeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHooks")
            .field("on_scope_created", &self.on_scope_created.len())
            .field("on_event_saving", &self.on_event_saving.len())
            .field("on_event_saved", &self.on_event_saved.len())
            .field("on_scope_disposed", &self.on_scope_disposed.len())
            .finish()
    }
}

/// Defaults and hooks shared by the scopes a factory creates.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    data_provider: Option<Arc<dyn AuditDataProvider>>,
    creation_policy: EventCreationPolicy,
    audit_disabled: bool,
    capture_environment: bool,
    clock: Arc<dyn Clock>,
    hooks: ScopeHooks,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            data_provider: None,
            creation_policy: EventCreationPolicy::default(),
            audit_disabled: false,
            capture_environment: true,
            clock: Arc::new(SystemClock),
            hooks: ScopeHooks::default(),
        }
    }
}

impl AuditConfig {
    /// Creates a configuration with no default provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for configuring a context.
    #[must_use]
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder::new()
    }

    /// Returns the default data provider.
    #[must_use]
    pub const fn data_provider(&self) -> Option<&Arc<dyn AuditDataProvider>> {
        self.data_provider.as_ref()
    }

    /// Returns the default event creation policy.
    #[must_use]
    pub const fn creation_policy(&self) -> EventCreationPolicy {
        self.creation_policy
    }

    /// Returns true if scopes must not persist anything.
    #[must_use]
    pub const fn audit_disabled(&self) -> bool {
        self.audit_disabled
    }

    /// Returns true if environment metadata is recorded on new events.
    #[must_use]
    pub const fn capture_environment(&self) -> bool {
        self.capture_environment
    }

    /// Returns the clock used for event timestamps.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Returns the registered lifecycle hooks.
    #[must_use]
    pub const fn hooks(&self) -> &ScopeHooks {
        &self.hooks
    }

    /// Sets the default data provider.
    pub fn set_data_provider(&mut self, provider: Arc<dyn AuditDataProvider>) {
        self.data_provider = Some(provider);
    }

    /// Removes the default data provider.
    pub fn clear_data_provider(&mut self) {
        self.data_provider = None;
    }

    /// Sets the default event creation policy.
    pub fn set_creation_policy(&mut self, policy: EventCreationPolicy) {
        self.creation_policy = policy;
    }

    /// Enables or disables persistence for new scopes.
    pub fn set_audit_disabled(&mut self, disabled: bool) {
        self.audit_disabled = disabled;
    }

    /// Enables or disables environment capture.
    pub fn set_capture_environment(&mut self, capture: bool) {
        self.capture_environment = capture;
    }

    /// Sets the clock.
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Registers a lifecycle hook.
    pub fn add_hook<F>(&mut self, kind: HookKind, hook: F)
    where
        F: Fn(&mut AuditScope) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.push(kind, Arc::new(hook));
    }

    /// Removes every lifecycle hook.
    pub fn reset_hooks(&mut self) {
        self.hooks.clear();
    }
}

/// Builder for an [`AuditConfig`].
///
/// # Examples
///
/// ```rust
/// use auditscope_core::{AuditConfig, EventCreationPolicy};
///
/// let config = AuditConfig::builder()
///     .creation_policy(EventCreationPolicy::Manual)
///     .on_scope_created(|scope| {
///         scope.comment("created");
///         Ok(())
///     })
///     .build();
///
/// assert_eq!(config.creation_policy(), EventCreationPolicy::Manual);
/// assert_eq!(config.hooks().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default data provider.
    #[must_use]
    pub fn data_provider(mut self, provider: Arc<dyn AuditDataProvider>) -> Self {
        self.config.set_data_provider(provider);
        self
    }

    /// Sets the default event creation policy.
    #[must_use]
    pub fn creation_policy(mut self, policy: EventCreationPolicy) -> Self {
        self.config.set_creation_policy(policy);
        self
    }

    /// Disables persistence.
    #[must_use]
    pub fn audit_disabled(mut self, disabled: bool) -> Self {
        self.config.set_audit_disabled(disabled);
        self
    }

    /// Enables or disables environment capture.
    #[must_use]
    pub fn capture_environment(mut self, capture: bool) -> Self {
        self.config.set_capture_environment(capture);
        self
    }

    /// Sets the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.set_clock(clock);
        self
    }

    /// Registers a hook run after the event is built.
    #[must_use]
    pub fn on_scope_created<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AuditScope) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.add_hook(HookKind::ScopeCreated, hook);
        self
    }

    /// Registers a hook run before each provider call.
    #[must_use]
    pub fn on_event_saving<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AuditScope) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.add_hook(HookKind::EventSaving, hook);
        self
    }

    /// Registers a hook run after each successful provider call.
    #[must_use]
    pub fn on_event_saved<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AuditScope) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.add_hook(HookKind::EventSaved, hook);
        self
    }

    /// Registers a hook run when the scope becomes terminal.
    #[must_use]
    pub fn on_scope_disposed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AuditScope) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.add_hook(HookKind::ScopeDisposed, hook);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> AuditConfig {
        self.config
    }
}
