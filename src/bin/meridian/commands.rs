// ABOUTME: Command implementations for the Meridian CLI
// ABOUTME: Thin wrappers over the client SDK plus the streaming chat REPL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use std::io::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use meridian_client::client::{ApiClient, ChatSendRequest};
use meridian_client::conversation::{consume_reply, Conversation, MessageRole};
use meridian_client::errors::ClientError;
use meridian_client::models::{
    ApiKeyCreate, CheckoutRequest, MemberRole, MembershipInvite, OrganizationCreate, PlanType,
    PortalRequest,
};
use meridian_client::stream::PayloadFormat;

pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<()> {
    let user = client.login(email, password).await?;
    println!("Logged in as {} (user {})", user.email, user.id);
    if client.current_org().await.is_err() {
        println!("No organization selected yet. Run `meridian org list` and `meridian org switch <id>`.");
    }
    Ok(())
}

pub async fn register(
    client: &ApiClient,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<()> {
    let user = client.register(email, password, name).await?;
    println!("Registered and logged in as {}", user.email);
    Ok(())
}

pub async fn logout(client: &ApiClient) -> Result<()> {
    client.logout().await?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(client: &ApiClient) -> Result<()> {
    let user = client.me().await?;
    let name = user.full_name.as_deref().unwrap_or("-");
    println!("{} ({}), active: {}", user.email, name, user.is_active);
    Ok(())
}

pub async fn org_list(client: &ApiClient) -> Result<()> {
    let selected = client.current_org().await.ok();
    let orgs = client.organizations().await?;
    if orgs.is_empty() {
        println!("You belong to no organizations. Create one with `meridian org create`.");
        return Ok(());
    }
    for org in orgs {
        let marker = if selected == Some(org.organization.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:>5}  {:<24} {:<16} {}",
            org.organization.id,
            org.organization.name,
            org.organization.slug,
            org.user_role.as_str()
        );
    }
    Ok(())
}

pub async fn org_create(
    client: &ApiClient,
    name: String,
    slug: String,
    description: Option<String>,
) -> Result<()> {
    let org = client
        .create_organization(&OrganizationCreate {
            name,
            slug,
            description,
        })
        .await?;
    client.select_org(org.id).await?;
    println!("Created organization {} ({}), now selected.", org.name, org.id);
    Ok(())
}

pub async fn org_switch(client: &ApiClient, org_id: i64) -> Result<()> {
    let org = client.organization(org_id).await?;
    client.select_org(org.id).await?;
    println!("Selected organization {} ({}).", org.name, org.id);
    Ok(())
}

pub async fn org_members(client: &ApiClient, org_id: Option<i64>) -> Result<()> {
    let org_id = resolve_org(client, org_id).await?;
    let members = client.members(org_id).await?;
    for member in members {
        let name = member.user_name.as_deref().unwrap_or("-");
        println!(
            "{:>5}  {:<32} {:<20} {:<8} active: {}",
            member.user_id,
            member.user_email,
            name,
            member.role.as_str(),
            member.is_active
        );
    }
    Ok(())
}

pub async fn org_invite(
    client: &ApiClient,
    email: &str,
    role: MemberRole,
    org_id: Option<i64>,
) -> Result<()> {
    let org_id = resolve_org(client, org_id).await?;
    let membership = client
        .invite_member(
            org_id,
            &MembershipInvite {
                email: email.to_owned(),
                role,
            },
        )
        .await?;
    println!(
        "Invited {} as {}.",
        membership.user_email,
        membership.role.as_str()
    );
    Ok(())
}

pub async fn org_remove(client: &ApiClient, user_id: i64, org_id: Option<i64>) -> Result<()> {
    let org_id = resolve_org(client, org_id).await?;
    client.remove_member(org_id, user_id).await?;
    println!("Removed user {user_id} from organization {org_id}.");
    Ok(())
}

pub async fn key_list(client: &ApiClient) -> Result<()> {
    let keys = client.api_keys().await?;
    if keys.is_empty() {
        println!("No API keys. Create one with `meridian key create --name <name>`.");
        return Ok(());
    }
    for key in keys {
        println!(
            "{:>5}  {:<24} {}...  active: {}",
            key.id, key.name, key.key_prefix, key.is_active
        );
    }
    Ok(())
}

pub async fn key_create(client: &ApiClient, name: String) -> Result<()> {
    let created = client
        .create_api_key(&ApiKeyCreate {
            name,
            expires_at: None,
        })
        .await?;
    println!("Created key {} ({}).", created.api_key.name, created.api_key.id);
    println!("Secret (shown once, store it now): {}", created.secret);
    Ok(())
}

pub async fn key_revoke(client: &ApiClient, key_id: i64) -> Result<()> {
    client.revoke_api_key(key_id).await?;
    println!("Revoked key {key_id}.");
    Ok(())
}

pub async fn key_delete(client: &ApiClient, key_id: i64) -> Result<()> {
    client.delete_api_key(key_id).await?;
    println!("Deleted key {key_id}.");
    Ok(())
}

pub async fn billing_subscription(client: &ApiClient, fresh: bool) -> Result<()> {
    let subscription = if fresh {
        client.invalidate_subscription().await?;
        client.subscription().await?
    } else {
        client.subscription_cached().await?
    };

    println!(
        "Plan: {}  status: {:?}  cancel at period end: {}",
        subscription.plan_type.as_str(),
        subscription.status,
        subscription.cancel_at_period_end
    );
    if let (Some(start), Some(end)) = (
        subscription.current_period_start,
        subscription.current_period_end,
    ) {
        println!("Current period: {start} .. {end}");
    }
    Ok(())
}

pub fn billing_plans() -> Result<()> {
    for plan in meridian_client::models::PlanInfo::catalog() {
        let limit = plan
            .monthly_message_limit
            .map_or_else(|| "unlimited".to_owned(), |limit| limit.to_string());
        println!(
            "{:<6} ${:>3}/{}  {} messages",
            plan.name, plan.price, plan.interval, limit
        );
        for feature in &plan.features {
            println!("        - {feature}");
        }
    }
    Ok(())
}

pub async fn billing_checkout(
    client: &ApiClient,
    plan: PlanType,
    success_url: String,
    cancel_url: String,
) -> Result<()> {
    let checkout = client
        .create_checkout(&CheckoutRequest {
            plan_type: plan,
            success_url,
            cancel_url,
        })
        .await?;
    client.invalidate_subscription().await?;
    println!("Open this URL to complete checkout:\n{}", checkout.checkout_url);
    Ok(())
}

pub async fn billing_portal(client: &ApiClient, return_url: String) -> Result<()> {
    let portal = client
        .customer_portal(&PortalRequest { return_url })
        .await?;
    println!("Open this URL to manage billing:\n{}", portal.portal_url);
    Ok(())
}

pub async fn usage(client: &ApiClient) -> Result<()> {
    let summary = client.usage().await?;
    let messages_limit = summary
        .messages_limit
        .map_or_else(|| "unlimited".to_owned(), |limit| limit.to_string());
    println!(
        "Messages: {} / {}  tokens: {}  ({:.1}% of plan)",
        summary.total_messages, messages_limit, summary.total_tokens, summary.usage_percentage
    );
    for (model, breakdown) in &summary.models_breakdown {
        println!("  {model}: {breakdown}");
    }
    Ok(())
}

pub async fn chats(client: &ApiClient) -> Result<()> {
    let chats = client.chats().await?;
    if chats.is_empty() {
        println!("No stored chats.");
        return Ok(());
    }
    for chat in chats {
        let title = chat.title.as_deref().unwrap_or("(untitled)");
        println!("{}  {}", chat.id, title);
    }
    Ok(())
}

/// Interactive streaming chat REPL
///
/// One exchange at a time: the prompt only returns after the current
/// reply finished or failed. `/regen` truncates back to the last user
/// message and re-runs the same send path.
pub async fn chat(
    client: &ApiClient,
    chat_id: Option<String>,
    model: Option<String>,
    format: PayloadFormat,
) -> Result<()> {
    let mut conversation = match &chat_id {
        Some(id) => {
            let detail = client.chat(id).await?;
            let conversation = Conversation::from_history(detail);
            for message in conversation.messages() {
                println!("[{}] {}", message.role.as_str(), message.content);
            }
            conversation
        }
        None => Conversation::new(),
    };

    println!("Type a message, /regen to retry the last answer, /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/regen" => {
                let Some(last_assistant) = conversation
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| m.role == MessageRole::Assistant)
                    .map(|m| m.id.clone())
                else {
                    println!("Nothing to regenerate yet.");
                    continue;
                };
                if let Err(e) = conversation.regenerate(&last_assistant) {
                    print_error(&e);
                    continue;
                }
                run_exchange(client, &mut conversation, model.as_deref(), format).await;
            }
            content => {
                if let Err(e) = conversation.push_user(content) {
                    print_error(&e);
                    continue;
                }
                run_exchange(client, &mut conversation, model.as_deref(), format).await;
            }
        }
    }

    Ok(())
}

/// Stream one assistant reply into the conversation, printing deltas
async fn run_exchange(
    client: &ApiClient,
    conversation: &mut Conversation,
    model: Option<&str>,
    format: PayloadFormat,
) {
    let message_id = match conversation.begin_reply() {
        Ok(id) => id,
        Err(e) => {
            print_error(&e);
            return;
        }
    };

    let request = ChatSendRequest::from_conversation(conversation, model);
    let stream = match client.stream_chat(&request, format).await {
        Ok(stream) => stream,
        Err(e) => {
            conversation.rollback_reply(&message_id);
            print_error(&e);
            return;
        }
    };

    let mut printed = 0;
    let result = consume_reply(conversation, &message_id, stream, |_, content| {
        print!("{}", &content[printed..]);
        let _ = std::io::stdout().flush();
        printed = content.len();
    })
    .await;
    println!();

    if let Err(e) = result {
        print_error(&e);
    }
}

fn print_error(error: &ClientError) {
    eprintln!("error: {}", error.display_message());
}

async fn resolve_org(client: &ApiClient, org_id: Option<i64>) -> Result<i64> {
    match org_id {
        Some(org_id) => Ok(org_id),
        None => Ok(client.current_org().await?),
    }
}
