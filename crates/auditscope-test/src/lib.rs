//! # Auditscope Test
//!
//! Test tooling for code built on `auditscope-core`.
//!
//! This crate provides:
//!
//! - [`RecordingProvider`] - records every provider call, with failure injection
//! - [`FixedClock`] and [`ManualClock`] - deterministic timestamps
//! - [`Harness`] - a factory wired to both
//! - Order fixtures for before/after snapshot tests
//! - Assertion helpers for call sequences and event contents
//!
//! ## Example
//!
//! ```rust
//! use auditscope_core::{AuditScopeOptions, EventCreationPolicy};
//! use auditscope_test::{assert_calls, order_target, shared_order, CallKind, Harness, OrderStatus};
//!
//! let harness = Harness::new(EventCreationPolicy::InsertOnStartReplaceOnEnd);
//! let order = shared_order(1);
//!
//! let options = AuditScopeOptions::new("Order:Update").with_target(order_target(&order));
//! let mut scope = harness.create(&options).unwrap();
//! order.lock().status = OrderStatus::Submitted;
//! scope.dispose().unwrap();
//!
//! assert_calls(&harness.provider, &[CallKind::Insert, CallKind::Replace]);
//! ```

pub mod assertions;
pub mod clock;
pub mod fixtures;
pub mod harness;
pub mod recording;

pub use assertions::{assert_calls, assert_custom_field, assert_no_calls, target_new, target_old};
pub use clock::{epoch, FixedClock, ManualClock};
pub use fixtures::{order_target, shared_order, Order, OrderStatus, SharedOrder};
pub use harness::Harness;
pub use recording::{CallKind, RecordedCall, RecordingProvider};
