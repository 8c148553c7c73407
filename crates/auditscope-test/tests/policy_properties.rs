//! Integration tests for creation-policy behavior.
//!
//! Each test drives scopes through the public factory API and checks the
//! exact provider call sequence recorded by `RecordingProvider`.

use std::collections::HashSet;
use std::sync::Arc;

use auditscope_core::{
    AuditError, AuditScopeFactory, AuditScopeOptions, Cancellation, EventCreationPolicy, EventId,
    HookKind, ScopeState,
};
use auditscope_test::{
    assert_calls, assert_custom_field, assert_no_calls, order_target, shared_order, target_new,
    target_old, CallKind, Harness, OrderStatus,
};
use chrono::Duration;
use proptest::prelude::*;
use serde_json::json;

fn options(policy: EventCreationPolicy) -> AuditScopeOptions {
    AuditScopeOptions::new("test").with_creation_policy(policy)
}

#[test]
fn insert_on_start_replace_on_end_never_inserts_twice() {
    for saves in 0..5 {
        let harness = Harness::new(EventCreationPolicy::InsertOnStartReplaceOnEnd);
        let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
        for _ in 0..saves {
            scope.save().unwrap();
        }
        scope.dispose().unwrap();

        assert_eq!(harness.provider.insert_count(), 1);
        assert_eq!(harness.provider.replace_count(), saves + 1);
        for call in harness.provider.calls() {
            assert_eq!(call.id, EventId::Int(1));
        }
    }
}

#[test]
fn manual_without_save_makes_no_calls() {
    let harness = Harness::new(EventCreationPolicy::Manual);
    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
    scope.comment("not persisted");
    scope.set_custom_field("k", &1).unwrap();
    scope.dispose().unwrap();

    assert_no_calls(&harness.provider);
}

#[test]
fn insert_on_start_insert_on_end_writes_two_events() {
    let harness = Harness::new(EventCreationPolicy::InsertOnStartInsertOnEnd);
    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
    scope.save().unwrap();
    scope.dispose().unwrap();

    assert_calls(&harness.provider, &[CallKind::Insert, CallKind::Insert]);
    let ids = harness.provider.inserted_ids();
    assert_ne!(ids[0], ids[1]);

    let first = harness.provider.stored(&ids[0]).unwrap();
    let second = harness.provider.stored(&ids[1]).unwrap();
    assert!(first.end_date().is_none());
    assert!(second.end_date().is_some());
}

#[test]
fn insert_on_end_makes_one_call_at_dispose() {
    let harness = Harness::new(EventCreationPolicy::InsertOnEnd);
    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
    scope.save().unwrap();
    assert_no_calls(&harness.provider);

    scope.dispose().unwrap();
    assert_calls(&harness.provider, &[CallKind::Insert]);
}

#[test]
fn discard_suppresses_completion_for_every_policy() {
    for policy in EventCreationPolicy::ALL {
        let harness = Harness::new(policy);
        let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
        let before = harness.provider.calls().len();

        scope.discard();
        scope.save().unwrap();
        scope.dispose().unwrap();

        assert_eq!(harness.provider.calls().len(), before, "{policy}");
        let expected_start = usize::from(policy.inserts_on_start());
        assert_eq!(before, expected_start, "{policy}");
    }
}

#[test]
fn before_snapshot_is_isolated_from_later_mutation() {
    let harness = Harness::new(EventCreationPolicy::InsertOnEnd);
    let order = shared_order(1);

    let mut scope = harness
        .create(&AuditScopeOptions::new("Order:Update").with_target(order_target(&order)))
        .unwrap();
    order.lock().status = OrderStatus::Shipped;
    order.lock().items = 3;
    scope.dispose().unwrap();

    let event = harness.provider.last_event().unwrap();
    assert_eq!(target_old(&event, "Status"), json!("Created"));
    assert_eq!(target_old(&event, "Items"), json!(1));
    assert_eq!(target_new(&event, "Status"), json!("Shipped"));
    assert_eq!(target_new(&event, "Items"), json!(3));
    assert_eq!(event.target().unwrap().type_name, "Order");
}

#[test]
fn order_update_scenario() {
    let harness = Harness::new(EventCreationPolicy::InsertOnStartReplaceOnEnd);
    let order = shared_order(42);

    let mut scope = harness
        .create(&AuditScopeOptions::new("Order:Update").with_target(order_target(&order)))
        .unwrap();

    order.lock().status = OrderStatus::Submitted;
    scope.comment("Status Updated");
    harness.clock.advance(Duration::milliseconds(250));
    scope.dispose().unwrap();

    assert_calls(&harness.provider, &[CallKind::Insert, CallKind::Replace]);
    let calls = harness.provider.calls();
    assert_eq!(calls[0].id, calls[1].id);

    let inserted = calls[0].event.clone().unwrap();
    assert_eq!(inserted.event_type(), "Order:Update");
    assert_eq!(target_old(&inserted, "Status"), json!("Created"));
    assert!(inserted.target().unwrap().new.is_none());
    assert!(inserted.comments().is_empty());

    let replaced = calls[1].event.clone().unwrap();
    assert_eq!(target_old(&replaced, "Status"), json!("Created"));
    assert_eq!(target_new(&replaced, "Status"), json!("Submitted"));
    assert_eq!(replaced.comments(), ["Status Updated"]);
    assert_eq!(replaced.duration_ms(), Some(250));
}

#[test]
fn manual_save_inserts_then_replaces() {
    let harness = Harness::new(EventCreationPolicy::Manual);
    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();

    scope.save().unwrap();
    scope.set_custom_field("step", &2).unwrap();
    scope.save().unwrap();
    scope.dispose().unwrap();

    assert_calls(&harness.provider, &[CallKind::Insert, CallKind::Replace]);
    let stored = harness.provider.stored(&EventId::Int(1)).unwrap();
    assert_custom_field(&stored, "step", &2);
}

#[test]
fn per_call_policy_overrides_config() {
    let harness = Harness::new(EventCreationPolicy::InsertOnEnd);
    let mut scope = harness
        .create(&options(EventCreationPolicy::InsertOnStartReplaceOnEnd))
        .unwrap();
    assert_eq!(scope.policy(), EventCreationPolicy::InsertOnStartReplaceOnEnd);
    scope.dispose().unwrap();

    assert_calls(&harness.provider, &[CallKind::Insert, CallKind::Replace]);
}

#[test]
fn failed_start_insert_returns_error_and_never_completes() {
    let harness = Harness::new(EventCreationPolicy::InsertOnStartReplaceOnEnd);
    harness.provider.set_fail_insert(true);

    let err = harness.create(&AuditScopeOptions::new("test")).unwrap_err();
    assert!(err.is_provider());

    harness.provider.set_fail_insert(false);
    assert_no_calls(&harness.provider);
}

#[test]
fn failed_completion_leaves_scope_disposed_and_skips_disposed_hooks() {
    let disposed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&disposed);
    let harness = Harness::with_config(|builder| {
        builder
            .creation_policy(EventCreationPolicy::InsertOnStartReplaceOnEnd)
            .on_scope_disposed(move |_| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
    });

    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
    harness.provider.set_fail_replace(true);

    assert!(scope.dispose().unwrap_err().is_provider());
    assert_eq!(scope.state(), ScopeState::Disposed);
    assert!(scope.dispose().is_ok());
    assert_eq!(disposed.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_calls(&harness.provider, &[CallKind::Insert]);
}

#[test]
fn saving_hook_enriches_every_persisted_version() {
    let harness = Harness::with_config(|builder| {
        builder
            .creation_policy(EventCreationPolicy::InsertOnStartReplaceOnEnd)
            .on_event_saving(|scope| {
                let count = scope
                    .event()
                    .custom_field_as::<u32>("saves")
                    .ok()
                    .flatten()
                    .unwrap_or(0);
                scope.set_custom_field("saves", &(count + 1))?;
                Ok(())
            })
    });

    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
    scope.dispose().unwrap();

    let calls = harness.provider.calls();
    assert_custom_field(calls[0].event.as_ref().unwrap(), "saves", &1);
    assert_custom_field(calls[1].event.as_ref().unwrap(), "saves", &2);
}

#[test]
fn failing_saving_hook_blocks_the_provider_call() {
    let harness = Harness::with_config(|builder| {
        builder
            .creation_policy(EventCreationPolicy::Manual)
            .on_event_saving(|_| Err("storage quota exceeded".into()))
    });

    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
    let err = scope.save().unwrap_err();

    assert!(matches!(err, AuditError::Hook { hook: HookKind::EventSaving, .. }));
    assert!(err.to_string().contains("storage quota exceeded"));
    assert_no_calls(&harness.provider);
    scope.discard();
}

#[test]
fn log_records_a_single_completed_event() {
    let harness = Harness::new(EventCreationPolicy::InsertOnStartReplaceOnEnd);
    let mut fields = serde_json::Map::new();
    fields.insert("user".to_string(), json!("alice"));

    let scope = harness
        .create(
            &AuditScopeOptions::new("Login")
                .with_extra_fields(fields)
                .with_reference_id("req-7")
                .with_create_and_save(true),
        )
        .unwrap();

    assert_eq!(scope.state(), ScopeState::Disposed);
    assert_calls(&harness.provider, &[CallKind::Insert]);
    let event = harness.provider.last_event().unwrap();
    assert_custom_field(&event, "user", "alice");
    assert_eq!(event.reference_id(), Some("req-7"));
    assert!(event.end_date().is_some());
}

#[test]
fn environment_records_calling_location_and_error() {
    let harness = Harness::new(EventCreationPolicy::InsertOnEnd);
    let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
    scope.record_error(&"payment declined");
    scope.dispose().unwrap();

    let event = harness.provider.last_event().unwrap();
    let location = event.environment.calling_location.clone().unwrap();
    assert!(location.contains("policy_properties.rs"), "{location}");
    assert_eq!(event.environment.error.as_deref(), Some("payment declined"));
    assert!(event.environment.process_id.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scopes_receive_distinct_ids() {
    const SCOPES: usize = 50;
    let harness = Arc::new(Harness::new(EventCreationPolicy::InsertOnStartReplaceOnEnd));

    let tasks = (0..SCOPES).map(|i| {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            let cancel = Cancellation::new();
            let options = AuditScopeOptions::new("Order:Create").with_extra_field("n", json!(i));
            let mut scope = harness.factory.create_async(&options, &cancel).await?;
            scope.save_async(&cancel).await?;
            let id = scope.event_id().cloned();
            scope.discard();
            scope.dispose_async(&cancel).await?;
            Ok::<_, AuditError>(id)
        })
    });

    let ids: HashSet<EventId> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().unwrap())
        .collect();

    assert_eq!(ids.len(), SCOPES);
    assert_eq!(harness.provider.insert_count(), SCOPES);
    assert_eq!(harness.provider.replace_count(), SCOPES);
    assert_eq!(harness.provider.calls().len(), 2 * SCOPES);
}

#[tokio::test]
async fn cancelled_save_makes_no_call() {
    let harness = Harness::new(EventCreationPolicy::Manual);
    let cancel = Cancellation::new();
    let mut scope = harness
        .factory
        .create_async(&AuditScopeOptions::new("test"), &cancel)
        .await
        .unwrap();

    cancel.cancel();
    let err = scope.save_async(&cancel).await.unwrap_err();
    assert!(matches!(err, AuditError::Cancelled { operation: "save" }));
    assert_no_calls(&harness.provider);
    assert_eq!(scope.state(), ScopeState::Active);
    scope.dispose().unwrap();
}

proptest! {
    #[test]
    fn custom_field_writes_round_trip(
        writes in prop::collection::vec(("[a-c]", any::<i32>()), 1..20),
    ) {
        let harness = Harness::new(EventCreationPolicy::InsertOnEnd);
        let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
        for (key, value) in &writes {
            scope.set_custom_field(key.clone(), value).unwrap();
        }
        scope.dispose().unwrap();

        let event = harness.provider.last_event().unwrap();
        for (key, _) in &writes {
            let last = writes.iter().rev().find(|(k, _)| k == key).map(|(_, v)| json!(v));
            prop_assert_eq!(event.custom_field(key).cloned(), last);
        }
    }

    #[test]
    fn replace_count_tracks_saves(saves in 0usize..10) {
        let harness = Harness::new(EventCreationPolicy::InsertOnStartReplaceOnEnd);
        let mut scope = harness.create(&AuditScopeOptions::new("test")).unwrap();
        for _ in 0..saves {
            scope.save().unwrap();
        }
        scope.dispose().unwrap();

        prop_assert_eq!(harness.provider.insert_count(), 1);
        prop_assert_eq!(harness.provider.replace_count(), saves + 1);
    }
}
