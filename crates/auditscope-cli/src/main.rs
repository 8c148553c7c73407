//! Auditscope CLI - inspect persisted audit events and run the audit scope demo.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auditscope=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List(args) => commands::list::run(&args),
        Commands::Show(args) => commands::show::run(&args),
        Commands::Demo(args) => commands::demo::run(&args).await,
        Commands::Version => {
            println!("auditscope {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
