//! List command implementation.

use anyhow::{Context, Result};
use auditscope_core::{AuditEvent, EventId};
use auditscope_providers::FileDataProvider;
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{EventDirArgs, OutputFormat};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub dir: EventDirArgs,

    /// Only show events of this type
    #[arg(short, long)]
    pub event_type: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// One row of the listing.
#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub event_type: String,
    pub start_date: String,
    pub duration_ms: Option<i64>,
    pub comments: usize,
}

impl EventSummary {
    fn new(id: &EventId, event: &AuditEvent) -> Self {
        Self {
            id: id.to_string(),
            event_type: event.event_type().to_string(),
            start_date: event.start_date().to_rfc3339(),
            duration_ms: event.duration_ms(),
            comments: event.comments().len(),
        }
    }
}

/// Runs the list command.
pub fn run(args: &ListArgs) -> Result<()> {
    let dir = args.dir.resolve();
    info!(dir = %dir.display(), "Listing audit events");

    let summaries = collect(&FileDataProvider::in_directory(&dir), args.event_type.as_deref())?;

    match args.format {
        OutputFormat::Text => print_text(&summaries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
    }

    Ok(())
}

fn collect(provider: &FileDataProvider, event_type: Option<&str>) -> Result<Vec<EventSummary>> {
    let events = provider
        .list()
        .with_context(|| format!("Failed to read events from {}", provider.directory().display()))?;

    Ok(events
        .iter()
        .filter(|(_, event)| event_type.map_or(true, |t| event.event_type() == t))
        .map(|(id, event)| EventSummary::new(id, event))
        .collect())
}

fn print_text(summaries: &[EventSummary]) {
    if summaries.is_empty() {
        println!("No audit events found.");
        println!();
        println!("Run 'auditscope demo' to record a sample scope.");
        return;
    }

    for summary in summaries {
        let duration = summary
            .duration_ms
            .map_or_else(|| "open".to_string(), |ms| format!("{ms}ms"));
        println!(
            "{}  {:<20} {}  {:>8}  {} comment(s)",
            summary.id, summary.event_type, summary.start_date, duration, summary.comments
        );
    }
    println!();
    println!("{} event(s)", summaries.len());
}
