//! Ledgerline CLI - double-entry ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod output;

use commands::{account, config, transfer, user};

/// Ledgerline - accounts and atomic transfers in your terminal
#[derive(Parser)]
#[command(name = "ledgerline", version, about, long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open, inspect and list accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Move funds from one account to another
    Transfer {
        /// Source account ID
        #[arg(long)]
        from: i64,
        /// Destination account ID
        #[arg(long)]
        to: i64,
        /// Amount in minor units
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
        /// Require both accounts to hold this currency
        #[arg(long)]
        currency: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Account { command } => account::run(command).await,
        Commands::Transfer {
            from,
            to,
            amount,
            currency,
            json,
        } => transfer::run(from, to, amount, currency, json).await,
        Commands::User { command } => user::run(command).await,
        Commands::Config { command } => config::run(command),
    }
}
