//! Output formatting utilities

use anyhow::{anyhow, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use ledgerline_core::{Account, OperationResult};
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a core result as an `OperationResult` envelope
///
/// A failed result is still printed, then surfaces as an error so the
/// process exits non-zero.
pub fn print_json_result<T: Serialize>(result: ledgerline_core::domain::Result<T>) -> Result<()> {
    let envelope: OperationResult<T> = result.into();
    print_json(&envelope)?;
    match envelope.error {
        Some(error) => Err(anyhow!(error)),
        None => Ok(()),
    }
}

/// Table of accounts, one row each
pub fn accounts_table(accounts: &[Account]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Owner", "Currency", "Balance", "Opened"]);
    for account in accounts {
        table.add_row(vec![
            account.id.to_string(),
            account.owner.clone(),
            account.currency_id.to_string(),
            format_amount(account.balance),
            account.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

/// Signed amount in minor units, colored by sign
pub fn format_amount(amount: i64) -> String {
    let text = amount.to_string();
    if amount < 0 {
        text.red().to_string()
    } else {
        text
    }
}
