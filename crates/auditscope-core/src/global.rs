//! Process-wide default configuration.
//!
//! Libraries that cannot thread an [`AuditConfig`] through their call
//! stack use these functions. Updates replace the shared `Arc`; scopes
//! already created keep the configuration they started with. Concurrent
//! reconfiguration is the caller's responsibility to serialize.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::config::AuditConfig;
use crate::factory::{AuditScopeFactory, DefaultScopeFactory};

static CONFIG: Lazy<RwLock<Arc<AuditConfig>>> =
    Lazy::new(|| RwLock::new(Arc::new(AuditConfig::default())));

static SCOPE_FACTORY: Lazy<RwLock<Option<Arc<dyn AuditScopeFactory>>>> =
    Lazy::new(|| RwLock::new(None));

/// Returns the current process-wide configuration.
#[must_use]
pub fn config() -> Arc<AuditConfig> {
    Arc::clone(&CONFIG.read())
}

/// Replaces the process-wide configuration.
pub fn set_config(config: AuditConfig) {
    *CONFIG.write() = Arc::new(config);
}

/// Applies `update` to a copy of the current configuration and installs it.
///
/// # Examples
///
/// ```rust
/// use auditscope_core::{global, EventCreationPolicy};
///
/// global::configure(|config| config.set_creation_policy(EventCreationPolicy::Manual));
/// assert_eq!(global::config().creation_policy(), EventCreationPolicy::Manual);
/// global::reset();
/// ```
pub fn configure<F>(update: F)
where
    F: FnOnce(&mut AuditConfig),
{
    let mut guard = CONFIG.write();
    let mut next = AuditConfig::clone(&guard);
    update(&mut next);
    *guard = Arc::new(next);
}

/// Installs a custom process-wide scope factory.
pub fn set_scope_factory(factory: Arc<dyn AuditScopeFactory>) {
    *SCOPE_FACTORY.write() = Some(factory);
}

/// Returns the process-wide scope factory.
///
/// Falls back to a [`DefaultScopeFactory`] over [`config()`] when no
/// custom factory is installed.
#[must_use]
pub fn scope_factory() -> Arc<dyn AuditScopeFactory> {
    if let Some(factory) = SCOPE_FACTORY.read().as_ref() {
        return Arc::clone(factory);
    }
    Arc::new(DefaultScopeFactory::new(config()))
}

/// Restores the default configuration and removes any custom factory.
pub fn reset() {
    *CONFIG.write() = Arc::new(AuditConfig::default());
    *SCOPE_FACTORY.write() = None;
}
