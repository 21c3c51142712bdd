// ABOUTME: System-wide constants for the Meridian client
// ABOUTME: Environment variable names, endpoint routes, header names, and cache TTLs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

/// Environment variable names recognized by [`crate::config::ClientConfig`]
pub mod env_config {
    /// Base URL of the Meridian backend
    pub const API_URL: &str = "MERIDIAN_API_URL";
    /// TCP connect timeout in seconds
    pub const CONNECT_TIMEOUT_SECS: &str = "MERIDIAN_CONNECT_TIMEOUT_SECS";
    /// Whole-request timeout in seconds (streaming responses excluded)
    pub const REQUEST_TIMEOUT_SECS: &str = "MERIDIAN_REQUEST_TIMEOUT_SECS";
}

/// Default configuration values
pub mod defaults {
    /// Default backend base URL (local development server)
    pub const API_URL: &str = "http://localhost:8000";
    /// Default connect timeout
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Default request timeout (chat completions can be slow)
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;
    /// Default model requested when none is configured
    pub const CHAT_MODEL: &str = "gemini-2.0-flash";
}

/// HTTP header names specific to the Meridian backend
pub mod headers {
    /// Organization selector header attached to org-scoped requests
    pub const ORG_SELECTOR: &str = "X-Current-Org";
}

/// Backend route paths, relative to the configured base URL
pub mod routes {
    /// User registration
    pub const AUTH_REGISTER: &str = "api/v1/auth/register";
    /// Form-encoded login returning the token pair
    pub const AUTH_LOGIN: &str = "api/v1/auth/login";
    /// Token refresh
    pub const AUTH_REFRESH: &str = "api/v1/auth/refresh";
    /// Current authenticated user
    pub const USERS_ME: &str = "api/v1/users/me";
    /// Organization collection
    pub const ORGS: &str = "api/v1/orgs/";
    /// API key collection
    pub const API_KEYS: &str = "api/v1/apikeys";
    /// Subscription for the selected organization
    pub const BILLING_SUBSCRIPTION: &str = "api/v1/billing/subscription";
    /// Stripe checkout session creation
    pub const BILLING_CHECKOUT: &str = "api/v1/billing/checkout";
    /// Stripe customer portal session creation
    pub const BILLING_PORTAL: &str = "api/v1/billing/portal";
    /// Monthly AI usage summary
    pub const AI_USAGE: &str = "api/v1/ai/usage";
    /// Streaming chat completion
    pub const AI_CHAT_STREAM: &str = "api/v1/ai/chat/stream";
    /// Chat history collection
    pub const CHATS: &str = "api/v1/chats";
}

/// Cache TTLs for read-mostly server resources
pub mod cache {
    /// Subscription data TTL in seconds
    pub const TTL_SUBSCRIPTION_SECS: u64 = 300;
    /// Usage summary TTL in seconds
    pub const TTL_USAGE_SECS: u64 = 60;
    /// Organization list TTL in seconds
    pub const TTL_ORGANIZATIONS_SECS: u64 = 120;
}
