//! Tradepost CLI - migrations, feed ingestion and fulfillment tooling.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! tradepost migrate
//!
//! # Ingest a shop's YAML feed on behalf of its owner
//! tradepost ingest --owner shop@example.com feeds/shop1.yaml
//!
//! # Register and confirm an account
//! tradepost account create --email shop@example.com --first-name Ivan --last-name Petrov --role shop
//! tradepost account confirm --email shop@example.com --token <token>
//!
//! # Move an order along its lifecycle
//! tradepost order advance 42 confirmed
//!
//! # Print a buyer's orders as JSON
//! tradepost order list --email buyer@example.com
//! ```
//!
//! # Environment Variables
//!
//! See [`tradepost_engine::config`]. `RUST_LOG` controls log output
//! (default `tradepost=info`); logs go to stderr, results to stdout.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tradepost")]
#[command(author, version, about = "Tradepost marketplace tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Ingest a catalog feed file
    Ingest {
        /// E-mail of the shop account that owns the feed
        #[arg(short, long)]
        owner: String,

        /// Path to the YAML feed
        feed: PathBuf,
    },
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Inspect and advance orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Register a new, inactive account and print its confirmation token
    Create {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        position: Option<String>,

        /// Account role (`shop`, `buyer`)
        #[arg(short, long, default_value = "buyer")]
        role: String,
    },
    /// Activate an account with its confirmation token
    Confirm {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        token: String,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Move an order to the next state (`confirmed`, `assembled`, `sent`, `delivered`, `canceled`)
    Advance { order_id: i32, state: String },
    /// Print an account's placed orders
    List {
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tradepost=info")),
        )
        .with_writer(std::io::stderr)
        .init();

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
        Commands::Ingest { owner, feed } => commands::ingest::run(&owner, &feed).await?,
        Commands::Account { action } => match action {
            AccountAction::Create {
                email,
                first_name,
                last_name,
                company,
                position,
                role,
            } => {
                commands::account::create(commands::account::NewAccountArgs {
                    email,
                    first_name,
                    last_name,
                    company,
                    position,
                    role,
                })
                .await?;
            }
            AccountAction::Confirm { email, token } => {
                commands::account::confirm(&email, &token).await?;
            }
        },
        Commands::Order { action } => match action {
            OrderAction::Advance { order_id, state } => {
                commands::order::advance(order_id, &state).await?;
            }
            OrderAction::List { email } => commands::order::list(&email).await?,
        },
    }
    Ok(())
}
