//! Demo command implementation.
//!
//! Opens a scope on an order, submits the order inside the scope and
//! completes it, writing through the file provider.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use auditscope_core::{
    AuditConfig, AuditDataProvider, AuditScopeFactory, AuditScopeOptions, Cancellation,
    DefaultScopeFactory, EventCreationPolicy, EventId,
};
use auditscope_providers::FileDataProvider;
use auditscope_test::{order_target, shared_order, OrderStatus};
use clap::Args;
use parking_lot::Mutex;
use tracing::info;

use super::EventDirArgs;

/// Arguments for the demo command.
#[derive(Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pub dir: EventDirArgs,

    /// Event creation policy
    #[arg(
        short,
        long,
        env = "AUDITSCOPE_POLICY",
        default_value = "insert_on_start_replace_on_end"
    )]
    pub policy: EventCreationPolicy,

    /// Id of the demo order
    #[arg(long, default_value_t = 1)]
    pub order_id: u64,
}

/// Runs the demo command.
pub async fn run(args: &DemoArgs) -> Result<()> {
    let dir = args.dir.resolve();
    info!(dir = %dir.display(), policy = %args.policy, "Running order update demo");

    let written = run_scenario(&dir, args.policy, args.order_id).await?;

    println!("Policy: {}", args.policy);
    if written.is_empty() {
        println!("No events were written.");
    }
    for id in &written {
        println!("Wrote {}", dir.join(id.to_string()).display());
    }
    Ok(())
}

/// Runs the scenario and returns the id of every provider write, in order.
async fn run_scenario(dir: &Path, policy: EventCreationPolicy, order_id: u64) -> Result<Vec<EventId>> {
    let provider: Arc<dyn AuditDataProvider> = Arc::new(FileDataProvider::in_directory(dir));
    let written = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&written);
    let config = AuditConfig::builder()
        .data_provider(provider)
        .on_event_saved(move |scope| {
            if let Some(id) = scope.event_id() {
                sink.lock().push(id.clone());
            }
            Ok(())
        })
        .build();
    let factory = DefaultScopeFactory::new(Arc::new(config));

    let order = shared_order(order_id);
    let options = AuditScopeOptions::new("Order:Update")
        .with_creation_policy(policy)
        .with_target(order_target(&order));

    let cancel = Cancellation::new();
    let mut scope = factory
        .create_async(&options, &cancel)
        .await
        .context("Failed to open audit scope")?;

    order.lock().status = OrderStatus::Submitted;
    scope.comment("Status Updated");
    scope.set_custom_field("OrderId", &order_id)?;
    if policy == EventCreationPolicy::Manual {
        scope.save_async(&cancel).await?;
    }
    scope
        .dispose_async(&cancel)
        .await
        .context("Failed to complete audit scope")?;

    let ids = written.lock().clone();
    Ok(ids)
}
