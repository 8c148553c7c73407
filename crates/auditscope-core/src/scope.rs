//! The audit scope state machine.
//!
//! A scope goes `Active -> Disposed`. While active it accepts comments,
//! custom fields and explicit saves. Disposal stamps the end date, takes the
//! final target snapshot, performs the completion-time persistence dictated
//! by the [`EventCreationPolicy`] and runs the disposal hooks.
//!
//! Dropping an active scope disposes it synchronously, including while
//! unwinding from a panic. Errors on that path can only be logged; call
//! [`AuditScope::dispose`] or [`AuditScope::dispose_async`] to observe them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::cancellation::Cancellation;
use crate::config::AuditConfig;
use crate::error::{AuditError, HookKind, Result};
use crate::event::{AuditEvent, AuditEventEnvironment, AuditTarget, EventId};
use crate::factory::ResolvedScope;
use crate::global;
use crate::options::{AuditScopeOptions, TargetSource};
use crate::policy::{CompletionAction, EventCreationPolicy, SaveAction};
use crate::provider::AuditDataProvider;

/// Lifecycle state of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Accepting mutations and saves.
    Active,
    /// Terminal; saves fail and disposal is a no-op.
    Disposed,
}

impl ScopeState {
    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disposed => "disposed",
        }
    }
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited operation, from creation to disposal.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use auditscope_core::{
///     AuditConfig, AuditDataProvider, AuditEvent, AuditScopeFactory, AuditScopeOptions,
///     DefaultScopeFactory, EventId, ProviderError,
/// };
///
/// #[derive(Debug)]
/// struct StdoutProvider;
///
/// impl AuditDataProvider for StdoutProvider {
///     fn name(&self) -> &'static str { "stdout" }
///
///     fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError> {
///         println!("{}", event.to_json()?);
///         Ok(EventId::new_v7())
///     }
///
///     fn replace_event(&self, _id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
///         println!("{}", event.to_json()?);
///         Ok(())
///     }
/// }
///
/// let config = AuditConfig::builder().data_provider(Arc::new(StdoutProvider)).build();
/// let factory = DefaultScopeFactory::new(Arc::new(config));
///
/// let mut scope = factory.create(&AuditScopeOptions::new("Order:Update"))?;
/// scope.comment("Status Updated");
/// scope.set_custom_field("OrderId", &42)?;
/// scope.dispose()?;
/// # Ok::<(), auditscope_core::AuditError>(())
/// ```
pub struct AuditScope {
    event: AuditEvent,
    policy: EventCreationPolicy,
    provider: Option<Arc<dyn AuditDataProvider>>,
    config: Arc<AuditConfig>,
    target: Option<TargetSource>,
    event_id: Option<EventId>,
    state: ScopeState,
    discarded: bool,
    disabled: bool,
}

impl AuditScope {
    /// Creates a scope through the process-wide factory.
    ///
    /// # Errors
    ///
    /// See [`AuditScopeFactory::create`](crate::AuditScopeFactory::create).
    #[track_caller]
    pub fn create(options: &AuditScopeOptions) -> Result<Self> {
        let options = with_location(options, Location::caller());
        global::scope_factory().create(&options)
    }

    /// Async form of [`create`](Self::create).
    ///
    /// # Errors
    ///
    /// See [`AuditScopeFactory::create_async`](crate::AuditScopeFactory::create_async).
    #[track_caller]
    pub fn create_async<'a>(
        options: &AuditScopeOptions,
        cancel: &'a Cancellation,
    ) -> impl std::future::Future<Output = Result<Self>> + Send + 'a {
        let options = with_location(options, Location::caller());
        async move {
            let factory = global::scope_factory();
            factory.create_async(&options, cancel).await
        }
    }

    /// Creates a scope for an event type and audited object.
    ///
    /// `policy` and `provider` fall back to the process-wide defaults when
    /// `None`.
    ///
    /// # Errors
    ///
    /// See [`AuditScopeFactory::create`](crate::AuditScopeFactory::create).
    #[track_caller]
    pub fn create_for<T, F>(
        event_type: &str,
        target: F,
        policy: Option<EventCreationPolicy>,
        provider: Option<Arc<dyn AuditDataProvider>>,
    ) -> Result<Self>
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut options = AuditScopeOptions::new(event_type)
            .with_target(target)
            .with_calling_location(Location::caller());
        if let Some(policy) = policy {
            options = options.with_creation_policy(policy);
        }
        if let Some(provider) = provider {
            options = options.with_data_provider(provider);
        }
        global::scope_factory().create(&options)
    }

    /// Records a single event immediately through the process-wide factory.
    ///
    /// # Errors
    ///
    /// See [`AuditScopeFactory::create`](crate::AuditScopeFactory::create).
    #[track_caller]
    pub fn log(event_type: &str, fields: Map<String, Value>) -> Result<Self> {
        let options = AuditScopeOptions::new(event_type)
            .with_extra_fields(fields)
            .with_create_and_save(true)
            .with_calling_location(Location::caller());
        global::scope_factory().create(&options)
    }

    /// Builds the scope and its event without touching the provider.
    pub(crate) fn prepare(options: &AuditScopeOptions, resolved: ResolvedScope) -> Result<Self> {
        let ResolvedScope {
            policy,
            provider,
            config,
        } = resolved;

        let mut event = match options.audit_event() {
            Some(prebuilt) => {
                let mut event = prebuilt.clone();
                if let Some(event_type) = options.event_type() {
                    event.set_event_type(event_type.to_string());
                }
                event
            }
            None => AuditEvent::starting_at(
                options.event_type().unwrap_or_default(),
                config.clock().now(),
            ),
        };

        if config.capture_environment() && event.environment.is_empty() {
            event.environment = AuditEventEnvironment::capture(options.calling_location());
        }
        if let Some(reference_id) = options.reference_id() {
            event.set_reference_id(reference_id.to_string());
        }
        for (key, value) in options.extra_fields() {
            event.set_custom_value(key.clone(), value.clone())?;
        }

        let target = options.target().cloned();
        if let Some(source) = &target {
            let current = source.snapshot()?;
            let old = provider
                .as_ref()
                .map_or_else(|| current.clone(), |p| p.clone_value(&current));
            event.set_target(AuditTarget {
                type_name: source.type_name().to_string(),
                old: Some(old),
                new: None,
            });
        }

        let disabled = config.audit_disabled();
        Ok(Self {
            event,
            policy,
            provider,
            config,
            target,
            event_id: None,
            state: ScopeState::Active,
            discarded: false,
            disabled,
        })
    }

    /// Runs the creation hooks and the start-time persistence.
    pub(crate) fn start(mut self) -> Result<Self> {
        match self.try_start() {
            Ok(()) => Ok(self),
            Err(err) => {
                self.abandon();
                Err(err)
            }
        }
    }

    /// Async form of [`start`](Self::start).
    pub(crate) async fn start_async(mut self, cancel: &Cancellation) -> Result<Self> {
        match self.try_start_async(cancel).await {
            Ok(()) => Ok(self),
            Err(err) => {
                self.abandon();
                Err(err)
            }
        }
    }

    fn try_start(&mut self) -> Result<()> {
        self.run_hooks(HookKind::ScopeCreated)?;
        debug!(
            event_type = self.event.event_type(),
            policy = %self.policy,
            disabled = self.disabled,
            "Audit scope created"
        );

        if self.policy.inserts_on_start() && !self.disabled {
            self.insert()?;
        }
        Ok(())
    }

    async fn try_start_async(&mut self, cancel: &Cancellation) -> Result<()> {
        self.run_hooks(HookKind::ScopeCreated)?;
        debug!(
            event_type = self.event.event_type(),
            policy = %self.policy,
            disabled = self.disabled,
            "Audit scope created"
        );

        if self.policy.inserts_on_start() && !self.disabled {
            self.insert_async("create", cancel).await?;
        }
        Ok(())
    }

    /// Marks a scope that failed to start as terminal so `Drop` leaves it alone.
    fn abandon(&mut self) {
        self.state = ScopeState::Disposed;
    }

    /// Returns the event being built.
    #[must_use]
    pub const fn event(&self) -> &AuditEvent {
        &self.event
    }

    /// Returns the event for direct mutation.
    pub fn event_mut(&mut self) -> &mut AuditEvent {
        &mut self.event
    }

    /// Returns the id returned by the most recent insert.
    #[must_use]
    pub const fn event_id(&self) -> Option<&EventId> {
        self.event_id.as_ref()
    }

    /// Returns the effective creation policy.
    #[must_use]
    pub const fn policy(&self) -> EventCreationPolicy {
        self.policy
    }

    /// Returns the effective data provider.
    #[must_use]
    pub fn data_provider(&self) -> Option<&Arc<dyn AuditDataProvider>> {
        self.provider.as_ref()
    }

    /// Returns the configuration the scope was created with.
    #[must_use]
    pub const fn config(&self) -> &Arc<AuditConfig> {
        &self.config
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ScopeState {
        self.state
    }

    /// Returns true if [`discard`](Self::discard) was called.
    #[must_use]
    pub const fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Returns true if auditing was disabled when the scope was created.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Inserts or overwrites a custom field.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ReservedField`] if `key` is one of the event's
    /// own fields, or [`AuditError::Serialization`] if `value` cannot be
    /// serialized.
    pub fn set_custom_field<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        self.event.set_custom_field(key, value)?;
        Ok(())
    }

    /// Appends a comment.
    pub fn comment(&mut self, text: impl Into<String>) {
        self.event.add_comment(text);
    }

    /// Records the error the audited operation ended with.
    pub fn record_error(&mut self, error: &dyn fmt::Display) {
        self.event.environment.error = Some(error.to_string());
    }

    /// Replaces the audited object, taking a fresh "old" snapshot now.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Serialization`] if the value cannot be serialized.
    pub fn set_target<T, F>(&mut self, getter: F) -> Result<()>
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let source = TargetSource::new(getter);
        let current = source.snapshot()?;
        let old = self
            .provider
            .as_ref()
            .map_or_else(|| current.clone(), |p| p.clone_value(&current));
        self.event.set_target(AuditTarget {
            type_name: source.type_name().to_string(),
            old: Some(old),
            new: None,
        });
        self.target = Some(source);
        Ok(())
    }

    /// Suppresses all further persistence and clears the target snapshot.
    ///
    /// Records already written (such as the start-time insert) remain.
    pub fn discard(&mut self) {
        self.discarded = true;
        self.event.clear_target();
        debug!(event_type = self.event.event_type(), "Audit scope discarded");
    }

    /// Performs the policy's explicit-save behavior.
    ///
    /// Under `InsertOnStartReplaceOnEnd` every call replaces the stored
    /// event. Under `Manual` the first call inserts and later calls replace.
    /// The other policies ignore explicit saves, as does a discarded or
    /// disabled scope.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidScopeState`] after disposal, and
    /// propagates hook and provider errors.
    pub fn save(&mut self) -> Result<()> {
        let Some(action) = self.pending_save("save")? else {
            return Ok(());
        };

        self.refresh_target()?;
        match action {
            SaveAction::Ignore => Ok(()),
            SaveAction::Replace => self.replace(),
            SaveAction::InsertOrReplace if self.event_id.is_some() => self.replace(),
            SaveAction::InsertOrReplace => self.insert(),
        }
    }

    /// Async form of [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Same as [`save`](Self::save), plus [`AuditError::Cancelled`] if
    /// `cancel` is set before the provider call.
    pub async fn save_async(&mut self, cancel: &Cancellation) -> Result<()> {
        let Some(action) = self.pending_save("save")? else {
            return Ok(());
        };

        self.refresh_target()?;
        match action {
            SaveAction::Ignore => Ok(()),
            SaveAction::Replace => self.replace_async("save", cancel).await,
            SaveAction::InsertOrReplace if self.event_id.is_some() => {
                self.replace_async("save", cancel).await
            }
            SaveAction::InsertOrReplace => self.insert_async("save", cancel).await,
        }
    }

    /// Returns the provider action an explicit save should take, if any.
    fn pending_save(&self, operation: &'static str) -> Result<Option<SaveAction>> {
        self.ensure_active(operation)?;

        if self.discarded || self.disabled {
            debug!(
                event_type = self.event.event_type(),
                discarded = self.discarded,
                disabled = self.disabled,
                "Save skipped"
            );
            return Ok(None);
        }

        match self.policy.save_action() {
            SaveAction::Ignore => {
                debug!(
                    event_type = self.event.event_type(),
                    policy = %self.policy,
                    "Save ignored by creation policy"
                );
                Ok(None)
            }
            action => Ok(Some(action)),
        }
    }

    /// Completes the scope.
    ///
    /// Calling it again after the first call has no effect.
    ///
    /// # Errors
    ///
    /// Propagates target snapshot, hook and provider errors. The scope is
    /// terminal even when an error is returned.
    pub fn dispose(&mut self) -> Result<()> {
        let Some(action) = self.begin_dispose()? else {
            return Ok(());
        };

        match action {
            CompletionAction::Nothing => {}
            CompletionAction::Insert => self.insert()?,
            CompletionAction::Replace => self.replace()?,
        }

        self.finish_dispose()
    }

    /// Async form of [`dispose`](Self::dispose).
    ///
    /// # Errors
    ///
    /// Same as [`dispose`](Self::dispose), plus [`AuditError::Cancelled`] if
    /// `cancel` is set before the provider call. A cancelled disposal
    /// persists nothing and still leaves the scope terminal.
    pub async fn dispose_async(&mut self, cancel: &Cancellation) -> Result<()> {
        let Some(action) = self.begin_dispose()? else {
            return Ok(());
        };

        match action {
            CompletionAction::Nothing => {}
            CompletionAction::Insert => self.insert_async("dispose", cancel).await?,
            CompletionAction::Replace => self.replace_async("dispose", cancel).await?,
        }

        self.finish_dispose()
    }

    /// Moves the scope to `Disposed` and stamps the event.
    ///
    /// Returns `None` if the scope was already disposed.
    fn begin_dispose(&mut self) -> Result<Option<CompletionAction>> {
        if self.state == ScopeState::Disposed {
            return Ok(None);
        }
        self.state = ScopeState::Disposed;

        let end_date = self.config.clock().now();
        self.event.complete(end_date);

        if self.discarded || self.disabled {
            return Ok(Some(CompletionAction::Nothing));
        }

        self.refresh_target()?;
        Ok(Some(self.policy.completion_action()))
    }

    fn finish_dispose(&mut self) -> Result<()> {
        self.run_hooks(HookKind::ScopeDisposed)?;
        debug!(
            event_type = self.event.event_type(),
            event_id = ?self.event_id,
            duration_ms = self.event.duration_ms(),
            "Audit scope disposed"
        );
        Ok(())
    }

    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        match self.state {
            ScopeState::Active => Ok(()),
            state => Err(AuditError::InvalidScopeState {
                operation,
                state: state.as_str(),
            }),
        }
    }

    fn refresh_target(&mut self) -> Result<()> {
        if let Some(source) = &self.target {
            let current = source.snapshot()?;
            self.event.set_target_new(current);
        }
        Ok(())
    }

    fn require_provider(&self) -> Result<Arc<dyn AuditDataProvider>> {
        self.provider.clone().ok_or_else(|| {
            AuditError::configuration(format!(
                "no data provider configured for event type '{}'",
                self.event.event_type()
            ))
        })
    }

    fn require_event_id(&self, operation: &'static str) -> Result<EventId> {
        self.event_id
            .clone()
            .ok_or(AuditError::InvalidScopeState {
                operation,
                state: "not yet persisted",
            })
    }

    fn insert(&mut self) -> Result<()> {
        let provider = self.require_provider()?;
        self.run_hooks(HookKind::EventSaving)?;

        let id = provider.insert_event(&self.event)?;
        debug!(
            event_type = self.event.event_type(),
            provider = provider.name(),
            event_id = %id,
            "Audit event inserted"
        );
        self.event_id = Some(id);

        self.run_hooks(HookKind::EventSaved)
    }

    fn replace(&mut self) -> Result<()> {
        let provider = self.require_provider()?;
        let id = self.require_event_id("replace")?;
        self.run_hooks(HookKind::EventSaving)?;

        provider.replace_event(&id, &self.event)?;
        debug!(
            event_type = self.event.event_type(),
            provider = provider.name(),
            event_id = %id,
            "Audit event replaced"
        );

        self.run_hooks(HookKind::EventSaved)
    }

    async fn insert_async(&mut self, operation: &'static str, cancel: &Cancellation) -> Result<()> {
        let provider = self.require_provider()?;
        self.run_hooks(HookKind::EventSaving)?;
        if cancel.is_cancelled() {
            return Err(AuditError::Cancelled { operation });
        }

        let id = provider.insert_event_async(&self.event, cancel).await?;
        debug!(
            event_type = self.event.event_type(),
            provider = provider.name(),
            event_id = %id,
            "Audit event inserted"
        );
        self.event_id = Some(id);

        self.run_hooks(HookKind::EventSaved)
    }

    async fn replace_async(&mut self, operation: &'static str, cancel: &Cancellation) -> Result<()> {
        let provider = self.require_provider()?;
        let id = self.require_event_id("replace")?;
        self.run_hooks(HookKind::EventSaving)?;
        if cancel.is_cancelled() {
            return Err(AuditError::Cancelled { operation });
        }

        provider.replace_event_async(&id, &self.event, cancel).await?;
        debug!(
            event_type = self.event.event_type(),
            provider = provider.name(),
            event_id = %id,
            "Audit event replaced"
        );

        self.run_hooks(HookKind::EventSaved)
    }

    fn run_hooks(&mut self, kind: HookKind) -> Result<()> {
        let config = Arc::clone(&self.config);
        for hook in config.hooks().get(kind) {
            hook(self).map_err(|source| AuditError::Hook { hook: kind, source })?;
        }
        Ok(())
    }
}

fn with_location(
    options: &AuditScopeOptions,
    location: &'static Location<'static>,
) -> AuditScopeOptions {
    if options.calling_location().is_some() {
        options.clone()
    } else {
        options.clone().with_calling_location(location)
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        if self.state == ScopeState::Disposed {
            return;
        }

        let unwinding = std::thread::panicking();
        if unwinding && self.event.environment.error.is_none() {
            self.event.environment.error = Some("panicked".to_string());
        }

        let result = if unwinding {
            match panic::catch_unwind(AssertUnwindSafe(|| self.dispose())) {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        event_type = self.event.event_type(),
                        "Lifecycle hook panicked while completing audit scope on drop"
                    );
                    return;
                }
            }
        } else {
            self.dispose()
        };

        if let Err(err) = result {
            error!(
                event_type = self.event.event_type(),
                error = %err,
                "Failed to complete audit scope on drop"
            );
        }
    }
}

impl fmt::Debug for AuditScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditScope")
            .field("event_type", &self.event.event_type())
            .field("policy", &self.policy)
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("event_id", &self.event_id)
            .field("state", &self.state)
            .field("discarded", &self.discarded)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}
