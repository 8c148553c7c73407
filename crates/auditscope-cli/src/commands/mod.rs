//! CLI commands and argument parsing.

pub mod demo;
pub mod list;
pub mod show;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Auditscope - audit scope lifecycle engine
#[derive(Parser)]
#[command(name = "auditscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List events stored by the file provider
    List(list::ListArgs),

    /// Print one stored event
    Show(show::ShowArgs),

    /// Run the order update scenario against the file provider
    Demo(demo::DemoArgs),

    /// Print version information
    Version,
}

/// Location of the event directory.
#[derive(Args, Debug, Clone)]
pub struct EventDirArgs {
    /// Directory holding one JSON file per event
    #[arg(short, long, env = "AUDITSCOPE_DIR")]
    pub dir: Option<PathBuf>,
}

impl EventDirArgs {
    /// Returns the configured directory or the per-user default.
    pub fn resolve(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_event_dir)
    }
}

/// Default event directory.
fn default_event_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auditscope")
        .join("events")
}

/// Output format for listing commands.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
