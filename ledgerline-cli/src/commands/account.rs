//! Account commands - open, show, list and history

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account with a zero balance
    Open {
        /// Account owner
        #[arg(long)]
        owner: String,
        /// Currency ID
        #[arg(long)]
        currency: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one account
    Show {
        /// Account ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List an owner's accounts
    List {
        /// Account owner
        #[arg(long)]
        owner: String,
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: i64,
        /// Accounts per page (5-10)
        #[arg(long, default_value_t = 5)]
        page_size: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account with its entries and transfers
    History {
        /// Account ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: AccountCommands) -> Result<()> {
    let ctx = get_context()?;
    let accounts = &ctx.account_service;

    match command {
        AccountCommands::Open {
            owner,
            currency,
            json,
        } => {
            let result = accounts.open(&owner, currency).await;
            if json {
                return output::print_json_result(result);
            }
            let account = result?;
            output::success(&format!("Opened account {}", account.id));
            println!("{}", output::accounts_table(&[account]));
        }

        AccountCommands::Show { id, json } => {
            let result = accounts.get(id).await;
            if json {
                return output::print_json_result(result);
            }
            println!("{}", output::accounts_table(&[result?]));
        }

        AccountCommands::List {
            owner,
            page,
            page_size,
            json,
        } => {
            let result = accounts.list(&owner, page, page_size).await;
            if json {
                return output::print_json_result(result);
            }
            let listed = result?;
            if listed.is_empty() {
                output::info(&format!("No accounts for {} on page {}", owner, page));
            } else {
                println!("{}", output::accounts_table(&listed));
            }
        }

        AccountCommands::History { id, json } => {
            let result = accounts.history(id).await;
            if json {
                return output::print_json_result(result);
            }
            let history = result?;
            println!("{}", output::accounts_table(&[history.account]));
            println!();

            println!("{}", "Entries".bold());
            let mut entries = output::create_table();
            entries.set_header(vec!["ID", "Side", "Amount", "Created"]);
            for entry in &history.entries {
                entries.add_row(vec![
                    entry.id.to_string(),
                    if entry.is_debit() { "debit" } else { "credit" }.to_string(),
                    output::format_amount(entry.amount),
                    entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }
            println!("{}", entries);
            println!();

            println!("{}", "Transfers".bold());
            let mut transfers = output::create_table();
            transfers.set_header(vec!["ID", "From", "To", "Amount", "Created"]);
            for transfer in &history.transfers {
                transfers.add_row(vec![
                    transfer.id.to_string(),
                    transfer.from_account_id.to_string(),
                    transfer.to_account_id.to_string(),
                    transfer.amount.to_string(),
                    transfer.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }
            println!("{}", transfers);
        }
    }

    Ok(())
}
