//! Audited-object fixtures.
//!
//! The order fixture models the canonical scenario: an order is created,
//! an audit scope opens on it, the order is submitted inside the scope and
//! the scope records both states.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Just created.
    Created,
    /// Submitted by the customer.
    Submitted,
    /// Handed to the carrier.
    Shipped,
}

/// A sample audited object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    /// Order id.
    pub id: u64,
    /// Current status.
    pub status: OrderStatus,
    /// Line item count.
    pub items: u32,
}

impl Order {
    /// Creates an order in the `Created` status.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            status: OrderStatus::Created,
            items: 1,
        }
    }
}

/// An order shared between a test and the scope auditing it.
pub type SharedOrder = Arc<Mutex<Order>>;

/// Creates a shared order in the `Created` status.
#[must_use]
pub fn shared_order(id: u64) -> SharedOrder {
    Arc::new(Mutex::new(Order::new(id)))
}

/// Returns a target getter reading the current state of `order`.
///
/// # Examples
///
/// ```rust
/// use auditscope_core::AuditScopeOptions;
/// use auditscope_test::{order_target, shared_order};
///
/// let order = shared_order(1);
/// let options = AuditScopeOptions::new("Order:Update").with_target(order_target(&order));
/// assert_eq!(options.target().unwrap().type_name(), "Order");
/// ```
pub fn order_target(order: &SharedOrder) -> impl Fn() -> Order + Send + Sync + 'static {
    let order = Arc::clone(order);
    move || order.lock().clone()
}
