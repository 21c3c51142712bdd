// ABOUTME: Authentication endpoints: register, login, refresh, current user, logout
// ABOUTME: Login is form-encoded; a successful login stores the token pair
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use serde_json::json;
use tracing::{debug, info, warn};

use super::{ApiClient, Scope};
use crate::constants::routes;
use crate::errors::{ClientError, ClientResult};
use crate::models::{RegisterRequest, TokenPair, User};
use crate::token_store::SessionTokens;

impl ApiClient {
    /// Register a new account and log in with it
    ///
    /// # Errors
    ///
    /// Returns a validation error for rejected emails or weak passwords.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> ClientResult<User> {
        let request = RegisterRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            full_name: full_name.map(ToOwned::to_owned),
        };

        let response = self
            .http
            .post(self.api_url(routes::AUTH_REGISTER))
            .json(&request)
            .send()
            .await
            .map_err(ClientError::from)?;
        Self::into_result(response).await?;

        info!("registered {email}, logging in");
        self.login(email, password).await
    }

    /// Log in and persist the returned token pair
    ///
    /// The backend takes form-encoded credentials with the email in the
    /// `username` field. A previously selected organization is kept.
    ///
    /// # Errors
    ///
    /// Returns an auth error for bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let response = self
            .http
            .post(self.api_url(routes::AUTH_LOGIN))
            .form(&[("username", email), ("password", password)])
            .send()
            .await
            .map_err(ClientError::from)?;
        let response = Self::into_result(response).await?;
        let pair: TokenPair = response.json().await.map_err(ClientError::from)?;

        let current_org = self
            .tokens
            .load()
            .await
            .ok()
            .flatten()
            .and_then(|stored| stored.current_org);

        self.tokens
            .save(&SessionTokens {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                current_org,
            })
            .await?;

        self.me().await
    }

    /// Fetch the authenticated user
    ///
    /// # Errors
    ///
    /// Fails when no session is stored or the session cannot be refreshed.
    pub async fn me(&self) -> ClientResult<User> {
        self.get_json(routes::USERS_ME, Scope::User).await
    }

    /// Clear the stored session
    ///
    /// # Errors
    ///
    /// Fails when the session file cannot be removed.
    pub async fn logout(&self) -> ClientResult<()> {
        self.tokens.clear().await
    }

    /// Exchange the refresh token for a new token pair
    ///
    /// Any failure clears the stored session: a dead refresh token means
    /// the user must log in again.
    pub(crate) async fn refresh_session(
        &self,
        session: SessionTokens,
    ) -> ClientResult<SessionTokens> {
        debug!("access token rejected, attempting refresh");

        let result = async {
            let response = self
                .http
                .post(self.api_url(routes::AUTH_REFRESH))
                .json(&json!({ "refresh_token": session.refresh_token }))
                .send()
                .await
                .map_err(ClientError::from)?;
            let response = Self::into_result(response).await?;
            response
                .json::<TokenPair>()
                .await
                .map_err(ClientError::from)
        }
        .await;

        match result {
            Ok(pair) => {
                let refreshed = SessionTokens {
                    access_token: pair.access_token,
                    refresh_token: pair.refresh_token,
                    current_org: session.current_org,
                };
                self.tokens.save(&refreshed).await?;
                debug!("session refreshed");
                Ok(refreshed)
            }
            Err(e) => {
                warn!("token refresh failed: {e}");
                self.force_logout().await;
                Err(ClientError::auth_expired().with_source(e))
            }
        }
    }
}
