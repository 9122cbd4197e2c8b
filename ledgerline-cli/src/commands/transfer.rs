//! Transfer command - move funds between two accounts

use anyhow::Result;
use colored::Colorize;
use ledgerline_core::domain::Result as CoreResult;
use ledgerline_core::{LedgerContext, TransferParams, TransferResult};

use super::get_context;
use crate::output;

pub async fn run(from: i64, to: i64, amount: i64, currency: Option<i64>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let result = checked_transfer(&ctx, from, to, amount, currency).await;

    if json {
        return output::print_json_result(result);
    }

    let done = result?;
    output::success(&format!(
        "Transfer {} committed: {} moved from account {} to account {}",
        done.transfer.id, done.transfer.amount, done.from_account.id, done.to_account.id
    ));

    let mut table = output::create_table();
    table.set_header(vec!["Account", "Entry", "Delta", "Balance"]);
    for (account, entry) in [
        (&done.from_account, &done.from_entry),
        (&done.to_account, &done.to_entry),
    ] {
        table.add_row(vec![
            account.id.to_string(),
            entry.id.to_string(),
            output::format_amount(entry.amount),
            output::format_amount(account.balance),
        ]);
    }
    println!("{}", table);
    println!("{}", done.transfer.created_at.to_rfc3339().dimmed());

    Ok(())
}

/// Run the currency check when one was requested, then the transfer
async fn checked_transfer(
    ctx: &LedgerContext,
    from: i64,
    to: i64,
    amount: i64,
    currency: Option<i64>,
) -> CoreResult<TransferResult> {
    if let Some(currency_id) = currency {
        ctx.account_service
            .check_transfer_accounts(from, to, currency_id)
            .await?;
    }
    ctx.transfer_service
        .execute(TransferParams::new(from, to, amount))
        .await
}
