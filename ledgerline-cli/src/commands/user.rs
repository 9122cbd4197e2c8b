//! User commands - registration and credential checks

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use dialoguer::{Input, Password};
use ledgerline_core::adapters::channel::{ChannelTaskDistributor, Task};
use ledgerline_core::services::{verify_email_hook, CreateUserParams};

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Username (letters and digits)
        #[arg(long)]
        username: String,
        /// Full name
        #[arg(long)]
        full_name: Option<String>,
        /// Email address
        #[arg(long)]
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a user's password
    Verify {
        /// Username
        #[arg(long)]
        username: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

pub async fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Create {
            username,
            full_name,
            email,
            password,
            json,
        } => run_create(username, full_name, email, password, json).await,
        UserCommands::Verify { username, password } => run_verify(username, password).await,
    }
}

async fn run_create(
    username: String,
    full_name: Option<String>,
    email: String,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    // Get full name interactively if not provided
    let full_name = match full_name {
        Some(name) => name,
        None => Input::new().with_prompt("Full name").interact_text()?,
    };
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let (distributor, mut tasks) = ChannelTaskDistributor::new();
    let result = ctx
        .user_service
        .create_user_with(
            CreateUserParams {
                username,
                full_name,
                email,
                password,
            },
            verify_email_hook(Arc::new(distributor)),
        )
        .await;

    // No worker runs inside the CLI; report what would have been sent.
    while let Ok(Task::SendVerifyEmail(payload)) = tasks.try_recv() {
        tracing::info!(username = %payload.username, email = %payload.email, "verification email queued");
    }

    if json {
        return output::print_json_result(result);
    }
    let user = result?;
    output::success(&format!("Created user {} <{}>", user.username, user.email));
    Ok(())
}

async fn run_verify(username: String, password: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let password = match password {
        Some(p) => p,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let user = ctx
        .user_service
        .verify_credentials(&username, &password)
        .await?;
    output::success(&format!("Credentials valid for {}", user.full_name));
    Ok(())
}
