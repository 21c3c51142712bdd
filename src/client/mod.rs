// ABOUTME: Authenticated HTTP client core for the Meridian backend
// ABOUTME: Bearer auth, organization-selector header, refresh-once-on-401, boundary error mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

//! # API Client
//!
//! [`ApiClient`] owns the HTTP connection pool, the token store, and
//! the resource cache. Endpoint methods live in the per-resource
//! submodules; this module provides the shared plumbing: request
//! building, bearer authentication, the single token-refresh retry,
//! and classification of non-2xx responses at the boundary.

mod api_keys;
mod auth;
mod billing;
mod chat;
mod orgs;

pub use chat::{ChatSendRequest, WireChatMessage};

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::cache::ResourceCache;
use crate::config::ClientConfig;
use crate::constants::headers;
use crate::errors::{ClientError, ClientResult};
use crate::token_store::{SessionTokens, TokenStore};

/// Whether a request carries the organization-selector header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// User-level request, authenticated only
    User,
    /// Organization-scoped request; fails if no organization is selected
    Organization,
}

/// Authenticated client for the Meridian backend
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
    cache: ResourceCache,
}

impl ApiClient {
    /// Create a client with the given configuration and token store
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            tokens,
            cache: ResourceCache::new(),
        })
    }

    /// The resource cache used by the `*_cached` endpoint methods
    #[must_use]
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Build the full URL for a route path
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Load the stored session, failing when there is none
    pub(crate) async fn session(&self) -> ClientResult<SessionTokens> {
        self.tokens
            .load()
            .await?
            .ok_or_else(ClientError::auth_required)
    }

    /// The selected organization id
    ///
    /// # Errors
    ///
    /// Fails when no session is stored or no organization is selected.
    pub async fn current_org(&self) -> ClientResult<i64> {
        self.session().await?.current_org.ok_or_else(|| {
            ClientError::config("no organization selected, run `meridian org switch` first")
        })
    }

    /// Persist the selected organization alongside the tokens
    ///
    /// # Errors
    ///
    /// Fails when there is no stored session to update.
    pub async fn select_org(&self, org_id: i64) -> ClientResult<()> {
        let mut session = self.session().await?;
        session.current_org = Some(org_id);
        self.tokens.save(&session).await
    }

    /// Clear the stored session, logging (not propagating) storage errors
    pub(crate) async fn force_logout(&self) {
        if let Err(e) = self.tokens.clear().await {
            warn!("failed to clear stored session: {e}");
        }
    }

    /// Build a request for a route, attaching the org header when scoped
    pub(crate) async fn builder(
        &self,
        method: Method,
        path: &str,
        scope: Scope,
    ) -> ClientResult<reqwest::RequestBuilder> {
        let mut builder = self.http.request(method, self.api_url(path));
        if scope == Scope::Organization {
            let org = self.current_org().await?;
            builder = builder.header(headers::ORG_SELECTOR, org.to_string());
        }
        Ok(builder)
    }

    /// Send an authenticated request, refreshing the session once on 401
    ///
    /// Mirrors the platform's web client: a rejected access token
    /// triggers a single refresh attempt and one replay of the request;
    /// a failed refresh clears the stored session.
    pub(crate) async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> ClientResult<reqwest::Response> {
        let session = self.session().await?;
        let replay = builder.try_clone();

        let response = builder
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(ClientError::from)?;

        if response.status().as_u16() != 401 {
            return Self::into_result(response).await;
        }

        let Some(replay_builder) = replay else {
            self.force_logout().await;
            return Err(ClientError::auth_expired());
        };

        let refreshed = self.refresh_session(session).await?;
        let response = replay_builder
            .bearer_auth(&refreshed.access_token)
            .send()
            .await
            .map_err(ClientError::from)?;

        if response.status().as_u16() == 401 {
            self.force_logout().await;
            return Err(ClientError::auth_expired());
        }
        Self::into_result(response).await
    }

    /// Turn a response into a result, classifying non-2xx statuses
    pub(crate) async fn into_result(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_response(status.as_u16(), &body))
    }

    /// GET a JSON resource
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        scope: Scope,
    ) -> ClientResult<T> {
        let builder = self.builder(Method::GET, path, scope).await?;
        let response = self.execute(builder).await?;
        response.json().await.map_err(ClientError::from)
    }

    /// POST a JSON body, decoding a JSON response
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B, scope: Scope) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.builder(Method::POST, path, scope).await?.json(body);
        let response = self.execute(builder).await?;
        response.json().await.map_err(ClientError::from)
    }

    /// PATCH a JSON body, decoding a JSON response
    pub(crate) async fn patch_json<B, T>(
        &self,
        path: &str,
        body: &B,
        scope: Scope,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.builder(Method::PATCH, path, scope).await?.json(body);
        let response = self.execute(builder).await?;
        response.json().await.map_err(ClientError::from)
    }

    /// DELETE a resource, ignoring the (empty) response body
    pub(crate) async fn delete(&self, path: &str, scope: Scope) -> ClientResult<()> {
        let builder = self.builder(Method::DELETE, path, scope).await?;
        self.execute(builder).await?;
        Ok(())
    }
}
