//! Integration tests for the process-wide configuration.
//!
//! Global state is shared by every test in a binary, so everything touching
//! it lives in one test function.

use std::sync::Arc;

use auditscope_core::{
    global, AuditConfig, AuditDataProvider, AuditScope, AuditScopeOptions, Cancellation,
    DefaultScopeFactory, EventCreationPolicy,
};
use auditscope_providers::InMemoryDataProvider;
use auditscope_test::{order_target, shared_order, target_new, CallKind, OrderStatus, RecordingProvider};
use serde_json::json;

#[tokio::test]
async fn global_configuration_lifecycle() {
    global::reset();

    // Scopes keep the configuration they were created with.
    let first = Arc::new(RecordingProvider::new());
    global::set_config(
        AuditConfig::builder()
            .data_provider(first.clone())
            .creation_policy(EventCreationPolicy::InsertOnStartReplaceOnEnd)
            .build(),
    );
    let mut scope = AuditScope::create(&AuditScopeOptions::new("Order:Update")).unwrap();

    let second = Arc::new(RecordingProvider::new());
    global::configure(|config| {
        config.set_data_provider(second.clone());
        config.set_creation_policy(EventCreationPolicy::InsertOnEnd);
    });
    scope.dispose().unwrap();

    assert_eq!(first.call_kinds(), [CallKind::Insert, CallKind::Replace]);
    assert!(second.calls().is_empty());
    assert_eq!(global::config().creation_policy(), EventCreationPolicy::InsertOnEnd);

    // create_for picks up the new defaults.
    let order = shared_order(5);
    let mut scope = AuditScope::create_for("Order:Ship", order_target(&order), None, None).unwrap();
    order.lock().status = OrderStatus::Shipped;
    scope.dispose().unwrap();

    assert_eq!(second.call_kinds(), [CallKind::Insert]);
    let event = second.last_event().unwrap();
    assert_eq!(target_new(&event, "Status"), json!("Shipped"));
    assert!(event
        .environment
        .calling_location
        .as_deref()
        .is_some_and(|l| l.contains("global_config.rs")));

    // log writes one completed event.
    let mut fields = serde_json::Map::new();
    fields.insert("user".to_string(), json!("alice"));
    AuditScope::log("Login", fields).unwrap();
    assert_eq!(second.insert_count(), 2);
    assert_eq!(second.last_event().unwrap().event_type(), "Login");

    // A per-call provider wins over the global default.
    let memory = Arc::new(InMemoryDataProvider::new());
    let provider: Arc<dyn AuditDataProvider> = memory.clone();
    let mut scope = AuditScope::create_for(
        "Order:Cancel",
        order_target(&order),
        Some(EventCreationPolicy::Manual),
        Some(provider),
    )
    .unwrap();
    scope.save().unwrap();
    scope.dispose().unwrap();
    assert_eq!(memory.len(), 1);
    assert_eq!(second.insert_count(), 2);

    // A custom factory replaces the default one.
    let isolated = Arc::new(RecordingProvider::new());
    global::set_scope_factory(Arc::new(DefaultScopeFactory::new(Arc::new(
        AuditConfig::builder().data_provider(isolated.clone()).build(),
    ))));
    let cancel = Cancellation::new();
    let mut scope = AuditScope::create_async(&AuditScopeOptions::new("Async"), &cancel)
        .await
        .unwrap();
    scope.dispose_async(&cancel).await.unwrap();
    assert_eq!(isolated.call_kinds(), [CallKind::Insert]);
    assert_eq!(second.insert_count(), 2);

    // Disabling auditing stops all persistence.
    global::reset();
    global::configure(|config| {
        config.set_data_provider(second.clone());
        config.set_audit_disabled(true);
    });
    let mut scope = AuditScope::create(&AuditScopeOptions::new("Disabled")).unwrap();
    scope.save().unwrap();
    scope.dispose().unwrap();
    assert_eq!(second.insert_count(), 2);

    global::reset();
    assert!(global::config().data_provider().is_none());
}
