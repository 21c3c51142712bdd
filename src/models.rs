// ABOUTME: Core data models for the Meridian client
// ABOUTME: Serde mirrors of the backend wire schemas for users, orgs, keys, billing, and chats
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Authentication
// ============================================================================

/// Bearer token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token
    pub access_token: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// Token type, always `bearer`
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Account email, used as the login identifier
    pub email: String,
    /// Plaintext password, hashed server-side
    pub password: String,
    /// Optional display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// An authenticated platform user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned user id
    pub id: i64,
    /// Account email
    pub email: String,
    /// Optional display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Whether the account is active
    pub is_active: bool,
    /// Whether the account has platform-admin rights
    #[serde(default)]
    pub is_superuser: bool,
    /// Account creation time
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Organizations & membership
// ============================================================================

/// Role of a user within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Organization creator with full control
    #[serde(alias = "OWNER")]
    Owner,
    /// Can manage members and keys
    #[serde(alias = "ADMIN")]
    Admin,
    /// Regular member
    #[serde(alias = "MEMBER")]
    Member,
}

impl MemberRole {
    /// String form used on the wire
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

/// An organization (tenant)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Server-assigned organization id
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL-safe identifier
    pub slug: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the organization is active
    pub is_active: bool,
    /// Linked Stripe customer, if billing is set up
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An organization together with the caller's role in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationWithRole {
    /// The organization record
    #[serde(flatten)]
    pub organization: Organization,
    /// The caller's role
    pub user_role: MemberRole,
}

/// Request body for creating an organization
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationCreate {
    /// Display name
    pub name: String,
    /// URL-safe identifier (lowercase letters, digits, dashes)
    pub slug: String,
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Request body for updating an organization
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizationUpdate {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A user's membership in an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Membership record id
    pub id: i64,
    /// Member's user id
    pub user_id: i64,
    /// Organization id
    pub organization_id: i64,
    /// Member's role
    pub role: MemberRole,
    /// Whether the membership is active
    pub is_active: bool,
    /// When the user joined
    pub joined_at: DateTime<Utc>,
    /// Member's email
    pub user_email: String,
    /// Member's display name
    #[serde(default)]
    pub user_name: Option<String>,
}

/// Request body for inviting a member
#[derive(Debug, Clone, Serialize)]
pub struct MembershipInvite {
    /// Email of the user to invite
    pub email: String,
    /// Role to grant
    pub role: MemberRole,
}

/// Request body for updating a membership
#[derive(Debug, Clone, Default, Serialize)]
pub struct MembershipUpdate {
    /// New role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    /// Activate or deactivate the membership
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

// ============================================================================
// API keys
// ============================================================================

/// An API key (without its secret)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Key id
    pub id: i64,
    /// Human-readable key name
    pub name: String,
    /// First characters of the key for identification
    pub key_prefix: String,
    /// Owning organization
    pub organization_id: i64,
    /// User who created the key
    pub created_by: i64,
    /// Last time the key authenticated a request
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Whether the key is active
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Optional expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly created API key including its full secret
///
/// The secret is only ever returned once, at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyWithSecret {
    /// The key record
    #[serde(flatten)]
    pub api_key: ApiKey,
    /// The full secret (`sk-...`)
    #[serde(rename = "key")]
    pub secret: String,
}

/// Request body for creating an API key
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyCreate {
    /// Human-readable key name
    pub name: String,
    /// Optional expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Billing
// ============================================================================

/// Subscription plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanType {
    /// Free tier with a small monthly message allowance
    #[serde(alias = "free")]
    Free,
    /// Paid individual tier
    #[serde(alias = "pro")]
    Pro,
    /// Paid team tier with unlimited messages
    #[serde(alias = "team")]
    Team,
}

impl PlanType {
    /// String form used on the wire
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Pro => "PRO",
            Self::Team => "TEAM",
        }
    }
}

/// Published details of one subscription plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInfo {
    /// Plan display name
    pub name: String,
    /// Plan tier
    pub plan_type: PlanType,
    /// Monthly price in the plan currency
    pub price: f64,
    /// ISO currency code
    pub currency: String,
    /// Billing interval
    pub interval: String,
    /// Monthly message allowance, `None` for unlimited
    pub monthly_message_limit: Option<u64>,
    /// Marketing feature list
    pub features: Vec<String>,
}

impl PlanInfo {
    /// The platform's published plans
    #[must_use]
    pub fn catalog() -> Vec<Self> {
        vec![
            Self {
                name: "Free".to_owned(),
                plan_type: PlanType::Free,
                price: 0.0,
                currency: "usd".to_owned(),
                interval: "month".to_owned(),
                monthly_message_limit: Some(100),
                features: vec![
                    "100 messages/month".to_owned(),
                    "Basic AI models".to_owned(),
                    "Email support".to_owned(),
                ],
            },
            Self {
                name: "Pro".to_owned(),
                plan_type: PlanType::Pro,
                price: 29.0,
                currency: "usd".to_owned(),
                interval: "month".to_owned(),
                monthly_message_limit: Some(10_000),
                features: vec![
                    "10,000 messages/month".to_owned(),
                    "Advanced AI models".to_owned(),
                    "Priority support".to_owned(),
                ],
            },
            Self {
                name: "Team".to_owned(),
                plan_type: PlanType::Team,
                price: 99.0,
                currency: "usd".to_owned(),
                interval: "month".to_owned(),
                monthly_message_limit: None,
                features: vec![
                    "Unlimited messages".to_owned(),
                    "All AI models".to_owned(),
                    "24/7 support".to_owned(),
                ],
            },
        ]
    }

    /// Look up the published details of a plan tier
    #[must_use]
    pub fn for_plan(plan: PlanType) -> Option<Self> {
        Self::catalog().into_iter().find(|p| p.plan_type == plan)
    }
}

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Paid and current
    #[serde(alias = "ACTIVE")]
    Active,
    /// In a trial period
    #[serde(alias = "TRIALING")]
    Trialing,
    /// Payment failed, grace period
    #[serde(alias = "PAST_DUE", rename = "past_due")]
    PastDue,
    /// Canceled by the customer
    #[serde(alias = "CANCELED")]
    Canceled,
    /// Checkout started but not completed
    #[serde(alias = "INCOMPLETE")]
    Incomplete,
}

/// An organization's subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription id
    pub id: i64,
    /// Owning organization
    pub organization_id: i64,
    /// Plan tier
    pub plan_type: PlanType,
    /// Lifecycle state
    pub status: SubscriptionStatus,
    /// Recurring amount in the subscription currency
    #[serde(default)]
    pub amount: Option<f64>,
    /// ISO currency code
    pub currency: String,
    /// Start of the current billing period
    #[serde(default)]
    pub current_period_start: Option<DateTime<Utc>>,
    /// End of the current billing period
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    /// Whether the subscription ends at the period boundary
    pub cancel_at_period_end: bool,
    /// Trial expiry, if trialing
    #[serde(default)]
    pub trial_end: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a Stripe checkout session
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    /// Plan to subscribe to
    pub plan_type: PlanType,
    /// Redirect target after successful payment
    pub success_url: String,
    /// Redirect target after abandoning checkout
    pub cancel_url: String,
}

/// Checkout session creation response
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page URL
    pub checkout_url: String,
    /// Stripe session id
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Request body for creating a Stripe customer portal session
#[derive(Debug, Clone, Serialize)]
pub struct PortalRequest {
    /// Redirect target when the customer leaves the portal
    pub return_url: String,
}

/// Customer portal session creation response
#[derive(Debug, Clone, Deserialize)]
pub struct PortalResponse {
    /// Hosted portal page URL
    pub portal_url: String,
}

// ============================================================================
// Usage
// ============================================================================

/// Monthly AI usage summary for an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Messages sent this month
    pub total_messages: u64,
    /// Tokens consumed this month
    pub total_tokens: u64,
    /// Plan message limit, if any
    #[serde(default)]
    pub messages_limit: Option<u64>,
    /// Plan token limit, if any
    #[serde(default)]
    pub tokens_limit: Option<u64>,
    /// Fraction of the message limit consumed, as a percentage
    pub usage_percentage: f64,
    /// Per-model usage breakdown
    #[serde(default)]
    pub models_breakdown: HashMap<String, serde_json::Value>,
}

// ============================================================================
// Chat history
// ============================================================================

/// A stored chat in the caller's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Chat id
    pub id: String,
    /// Title, usually derived from the first message
    #[serde(default)]
    pub title: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A stored chat with its full message history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetail {
    /// Chat id
    pub id: String,
    /// Title, usually derived from the first message
    #[serde(default)]
    pub title: Option<String>,
    /// Messages in order
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// One persisted message of a stored chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Message id
    pub id: String,
    /// `user` or `assistant`
    pub role: String,
    /// Message text
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}
