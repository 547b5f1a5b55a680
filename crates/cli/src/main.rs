//! Collectify CLI - database migrations and bulk-operation management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! collectify-cli migrate
//!
//! # Watch a bulk operation until it finishes (exponential backoff)
//! collectify-cli bulk watch -s demo.myshopify.com -i gid://shopify/BulkOperation/123
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "collectify-cli")]
#[command(author, version, about = "Collectify CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage bulk operations
    Bulk {
        #[command(subcommand)]
        action: BulkAction,
    },
}

#[derive(Subcommand)]
enum BulkAction {
    /// Poll a bulk operation until it reaches a terminal state
    Watch {
        /// Shop domain (e.g. demo.myshopify.com)
        #[arg(short, long)]
        shop: String,

        /// Bulk operation GID
        #[arg(short, long)]
        id: String,

        /// Maximum number of status queries
        #[arg(long, default_value_t = 60)]
        max_attempts: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Bulk { action } => match action {
            BulkAction::Watch {
                shop,
                id,
                max_attempts,
            } => commands::bulk::watch(&shop, &id, max_attempts).await?,
        },
    }
    Ok(())
}
