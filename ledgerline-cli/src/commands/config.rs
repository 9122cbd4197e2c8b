//! Config commands - inspect and change settings.json

use anyhow::Result;
use clap::Subcommand;
use ledgerline_core::config::Config;
use serde_json::json;

use super::get_ledger_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the per-transfer timeout in milliseconds (0 disables it)
    SetTimeout {
        /// Timeout in milliseconds
        ms: u64,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let ledger_dir = get_ledger_dir()?;
    let mut config = Config::load(&ledger_dir)?;

    match command {
        ConfigCommands::Show { json } => {
            let db_path = config.db_path(&ledger_dir);
            if json {
                return output::print_json(&json!({
                    "ledgerDir": ledger_dir,
                    "dbPath": db_path,
                    "transferTimeoutMs": config.transfer_timeout_ms,
                }));
            }

            let mut table = output::create_table();
            table.add_row(vec!["Ledger directory".to_string(), ledger_dir.display().to_string()]);
            table.add_row(vec!["Database".to_string(), db_path.display().to_string()]);
            table.add_row(vec![
                "Transfer timeout".to_string(),
                match config.transfer_timeout() {
                    Some(timeout) => format!("{} ms", timeout.as_millis()),
                    None => "disabled".to_string(),
                },
            ]);
            println!("{}", table);
        }

        ConfigCommands::SetTimeout { ms } => {
            config.set_transfer_timeout_ms(ms);
            config.save(&ledger_dir)?;
            if ms == 0 {
                output::success("Transfer timeout disabled");
            } else {
                output::success(&format!("Transfer timeout set to {} ms", ms));
            }
        }
    }

    Ok(())
}
