//! Assertion helpers for audit tests.
//!
//! These panic with a descriptive message, like the `assert_*` macros.

use auditscope_core::AuditEvent;
use serde::Serialize;
use serde_json::Value;

use crate::recording::{CallKind, RecordingProvider};

/// Asserts the exact sequence of provider calls.
///
/// # Panics
///
/// Panics if the recorded sequence differs from `expected`.
#[track_caller]
pub fn assert_calls(provider: &RecordingProvider, expected: &[CallKind]) {
    let actual = provider.call_kinds();
    assert_eq!(actual, expected, "unexpected provider call sequence");
}

/// Asserts that no provider call was made.
///
/// # Panics
///
/// Panics if any call was recorded.
#[track_caller]
pub fn assert_no_calls(provider: &RecordingProvider) {
    assert_calls(provider, &[]);
}

/// Asserts that a custom field holds the serialized form of `expected`.
///
/// # Panics
///
/// Panics if the field is missing or holds a different value.
#[track_caller]
pub fn assert_custom_field<T: Serialize + ?Sized>(event: &AuditEvent, key: &str, expected: &T) {
    let expected = serde_json::to_value(expected).unwrap_or(Value::Null);
    assert_eq!(
        event.custom_field(key),
        Some(&expected),
        "custom field '{key}' mismatch"
    );
}

/// Returns a field of the target's old snapshot.
///
/// # Panics
///
/// Panics if the event has no target or no old snapshot.
#[must_use]
#[track_caller]
pub fn target_old(event: &AuditEvent, field: &str) -> Value {
    let old = event
        .target()
        .and_then(|t| t.old.as_ref())
        .unwrap_or_else(|| panic!("event '{}' has no old target snapshot", event.event_type()));
    old[field].clone()
}

/// Returns a field of the target's new snapshot.
///
/// # Panics
///
/// Panics if the event has no target or no new snapshot.
#[must_use]
#[track_caller]
pub fn target_new(event: &AuditEvent, field: &str) -> Value {
    let new = event
        .target()
        .and_then(|t| t.new.as_ref())
        .unwrap_or_else(|| panic!("event '{}' has no new target snapshot", event.event_type()));
    new[field].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditscope_core::AuditDataProvider;

    #[test]
    fn test_assert_custom_field() {
        let mut event = AuditEvent::new("test");
        event.set_custom_value("OrderId", serde_json::json!(42)).unwrap();
        assert_custom_field(&event, "OrderId", &42);
    }

    #[test]
    #[should_panic(expected = "unexpected provider call sequence")]
    fn test_assert_calls_mismatch() {
        let provider = RecordingProvider::new();
        provider.insert_event(&AuditEvent::new("test")).unwrap();
        assert_calls(&provider, &[CallKind::Replace]);
    }

    #[test]
    #[should_panic(expected = "has no old target snapshot")]
    fn test_target_old_without_target() {
        let _ = target_old(&AuditEvent::new("test"), "Status");
    }
}
