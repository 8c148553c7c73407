//! Show command implementation.

use anyhow::{bail, Result};
use auditscope_core::{AuditDataProvider, AuditEvent, EventId};
use auditscope_providers::FileDataProvider;
use clap::Args;
use tracing::info;

use super::EventDirArgs;

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Event id (the file name printed by `list`)
    pub id: String,

    #[command(flatten)]
    pub dir: EventDirArgs,
}

/// Runs the show command.
pub fn run(args: &ShowArgs) -> Result<()> {
    let dir = args.dir.resolve();
    info!(id = %args.id, dir = %dir.display(), "Showing audit event");

    let event = load(&FileDataProvider::in_directory(&dir), &args.id)?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

fn load(provider: &FileDataProvider, id: &str) -> Result<AuditEvent> {
    let id = EventId::from(normalize_id(id));
    match provider.get_event(&id)? {
        Some(event) => Ok(event),
        None => bail!(
            "Audit event {id} not found in {}",
            provider.directory().display()
        ),
    }
}

/// Accepts ids with or without the `.json` extension.
fn normalize_id(id: &str) -> String {
    if id.ends_with(".json") {
        id.to_string()
    } else {
        format!("{id}.json")
    }
}
