// ABOUTME: Meridian CLI - terminal client for the Meridian AI chat platform
// ABOUTME: Authentication, organization and key management, billing, and a streaming chat REPL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs
//!
//! Usage:
//! ```bash
//! # Log in and pick an organization
//! meridian login --email dev@example.com --password hunter2
//! meridian org list
//! meridian org switch 3
//!
//! # Chat with streaming output
//! meridian chat
//!
//! # Manage API keys
//! meridian key create --name ci-bot
//! meridian key list
//!
//! # Billing
//! meridian billing subscription
//! meridian billing checkout --plan PRO
//! ```

mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use meridian_client::client::ApiClient;
use meridian_client::config::ClientConfig;
use meridian_client::logging::{self, LoggingConfig};
use meridian_client::models::{MemberRole, PlanType};
use meridian_client::stream::PayloadFormat;
use meridian_client::token_store::FileTokenStore;

#[derive(Parser)]
#[command(
    name = "meridian",
    about = "Meridian AI chat platform CLI",
    long_about = "Terminal client for the Meridian AI chat platform: authentication, organizations, API keys, billing, and streaming chat."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL override
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the authenticated user
    Whoami,
    /// Organization management
    Org {
        #[command(subcommand)]
        action: OrgCommand,
    },
    /// API key management
    Key {
        #[command(subcommand)]
        action: KeyCommand,
    },
    /// Billing and subscription
    Billing {
        #[command(subcommand)]
        action: BillingCommand,
    },
    /// Show this month's AI usage for the selected organization
    Usage,
    /// List stored chats
    Chats,
    /// Interactive streaming chat
    Chat {
        /// Continue a stored chat
        #[arg(long)]
        id: Option<String>,
        /// Model to use
        #[arg(long)]
        model: Option<String>,
        /// Treat stream payloads as JSON-wrapped deltas instead of raw text
        #[arg(long)]
        json_frames: bool,
    },
}

#[derive(Subcommand)]
enum OrgCommand {
    /// List organizations you belong to
    List,
    /// Create an organization
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// URL-safe identifier (lowercase letters, digits, dashes)
        #[arg(long)]
        slug: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
    },
    /// Select the organization used by org-scoped commands
    Switch {
        /// Organization id
        org_id: i64,
    },
    /// List members of an organization
    Members {
        /// Organization id (defaults to the selected one)
        #[arg(long)]
        org_id: Option<i64>,
    },
    /// Invite a user by email
    Invite {
        /// Invitee email
        #[arg(long)]
        email: String,
        /// Role to grant
        #[arg(long, default_value = "member", value_parser = parse_role)]
        role: MemberRole,
        /// Organization id (defaults to the selected one)
        #[arg(long)]
        org_id: Option<i64>,
    },
    /// Remove a member
    Remove {
        /// Member's user id
        user_id: i64,
        /// Organization id (defaults to the selected one)
        #[arg(long)]
        org_id: Option<i64>,
    },
}

#[derive(Subcommand)]
enum KeyCommand {
    /// List API keys of the selected organization
    List,
    /// Create an API key (the secret is shown exactly once)
    Create {
        /// Key name
        #[arg(long)]
        name: String,
    },
    /// Deactivate a key
    Revoke {
        /// Key id
        key_id: i64,
    },
    /// Delete a key permanently
    Delete {
        /// Key id
        key_id: i64,
    },
}

#[derive(Subcommand)]
enum BillingCommand {
    /// Show the current subscription
    Subscription {
        /// Bypass the client-side cache
        #[arg(long)]
        fresh: bool,
    },
    /// List the published plans
    Plans,
    /// Create a checkout session for a plan upgrade
    Checkout {
        /// Target plan (FREE, PRO, TEAM)
        #[arg(long, value_parser = parse_plan)]
        plan: PlanType,
        /// Redirect target after successful payment
        #[arg(long, default_value = "https://app.meridian.dev/pricing/success")]
        success_url: String,
        /// Redirect target after abandoning checkout
        #[arg(long, default_value = "https://app.meridian.dev/pricing")]
        cancel_url: String,
    },
    /// Create a customer portal session
    Portal {
        /// Redirect target when leaving the portal
        #[arg(long, default_value = "https://app.meridian.dev/billing")]
        return_url: String,
    },
}

fn parse_role(raw: &str) -> Result<MemberRole, String> {
    match raw.to_lowercase().as_str() {
        "owner" => Ok(MemberRole::Owner),
        "admin" => Ok(MemberRole::Admin),
        "member" => Ok(MemberRole::Member),
        other => Err(format!("unknown role '{other}' (owner, admin, member)")),
    }
}

fn parse_plan(raw: &str) -> Result<PlanType, String> {
    match raw.to_uppercase().as_str() {
        "FREE" => Ok(PlanType::Free),
        "PRO" => Ok(PlanType::Pro),
        "TEAM" => Ok(PlanType::Team),
        other => Err(format!("unknown plan '{other}' (FREE, PRO, TEAM)")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging_config = if cli.verbose {
        LoggingConfig {
            level: "debug".into(),
            ..LoggingConfig::from_env()
        }
    } else {
        LoggingConfig::from_env()
    };
    logging::init(&logging_config).context("failed to initialize logging")?;

    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config = config.with_base_url(api_url);
    }

    let store = Arc::new(FileTokenStore::from_default_location()?);
    let client = ApiClient::new(config, store)?;

    match cli.command {
        Command::Login { email, password } => commands::login(&client, &email, &password).await,
        Command::Register {
            email,
            password,
            name,
        } => commands::register(&client, &email, &password, name.as_deref()).await,
        Command::Logout => commands::logout(&client).await,
        Command::Whoami => commands::whoami(&client).await,
        Command::Org { action } => match action {
            OrgCommand::List => commands::org_list(&client).await,
            OrgCommand::Create {
                name,
                slug,
                description,
            } => commands::org_create(&client, name, slug, description).await,
            OrgCommand::Switch { org_id } => commands::org_switch(&client, org_id).await,
            OrgCommand::Members { org_id } => commands::org_members(&client, org_id).await,
            OrgCommand::Invite {
                email,
                role,
                org_id,
            } => commands::org_invite(&client, &email, role, org_id).await,
            OrgCommand::Remove { user_id, org_id } => {
                commands::org_remove(&client, user_id, org_id).await
            }
        },
        Command::Key { action } => match action {
            KeyCommand::List => commands::key_list(&client).await,
            KeyCommand::Create { name } => commands::key_create(&client, name).await,
            KeyCommand::Revoke { key_id } => commands::key_revoke(&client, key_id).await,
            KeyCommand::Delete { key_id } => commands::key_delete(&client, key_id).await,
        },
        Command::Billing { action } => match action {
            BillingCommand::Subscription { fresh } => {
                commands::billing_subscription(&client, fresh).await
            }
            BillingCommand::Plans => commands::billing_plans(),
            BillingCommand::Checkout {
                plan,
                success_url,
                cancel_url,
            } => commands::billing_checkout(&client, plan, success_url, cancel_url).await,
            BillingCommand::Portal { return_url } => {
                commands::billing_portal(&client, return_url).await
            }
        },
        Command::Usage => commands::usage(&client).await,
        Command::Chats => commands::chats(&client).await,
        Command::Chat {
            id,
            model,
            json_frames,
        } => {
            let format = if json_frames {
                PayloadFormat::Json
            } else {
                PayloadFormat::Text
            };
            commands::chat(&client, id, model, format).await
        }
    }
}
