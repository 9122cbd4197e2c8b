//! CLI command implementations

pub mod account;
pub mod config;
pub mod transfer;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context, Result};
use ledgerline_core::LedgerContext;

/// Get the ledger directory from environment or default
pub fn get_ledger_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGERLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".ledgerline"))
        .context("Could not find home directory; set LEDGERLINE_DIR")
}

/// Get or create the ledger context
pub fn get_context() -> Result<LedgerContext> {
    let ledger_dir = get_ledger_dir()?;
    tracing::debug!(dir = %ledger_dir.display(), "opening ledger");
    LedgerContext::new(&ledger_dir).context("Failed to initialize ledger context")
}
