// ABOUTME: Main library entry point for the Meridian AI chat platform client
// ABOUTME: Provides the typed API client, streaming chat consumer, and session state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

#![deny(unsafe_code)]

//! # Meridian Client
//!
//! A typed Rust client for the Meridian multi-tenant AI-chat platform.
//! The crate wraps the platform's REST/SSE backend: authentication with
//! automatic token refresh, organization and team management, API keys,
//! Stripe-backed billing, and a streaming chat consumer that turns the
//! backend's `data:` frame stream into live message updates.
//!
//! ## Architecture
//!
//! - **`client`**: the authenticated HTTP client and per-resource endpoint methods
//! - **`stream`**: the SSE-like frame decoder (line buffering, sentinel, payload decoding)
//! - **`conversation`**: the active chat's message list and streaming accumulator
//! - **`token_store`**: persisted session tokens and selected organization
//! - **`cache`**: TTL cache with in-flight request de-duplication
//! - **`models`**: serde mirrors of the backend wire schemas
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meridian_client::client::ApiClient;
//! use meridian_client::config::ClientConfig;
//! use meridian_client::errors::ClientResult;
//! use meridian_client::token_store::FileTokenStore;
//!
//! #[tokio::main]
//! async fn main() -> ClientResult<()> {
//!     let store = Arc::new(FileTokenStore::from_default_location()?);
//!     let client = ApiClient::new(ClientConfig::from_env(), store)?;
//!     let user = client.login("dev@example.com", "hunter2").await?;
//!     println!("logged in as {}", user.email);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod errors;
pub mod logging;
pub mod models;
pub mod stream;
pub mod token_store;
