// ABOUTME: API key endpoints for the selected organization
// ABOUTME: Creation reveals the full secret exactly once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use super::{ApiClient, Scope};
use crate::constants::routes;
use crate::errors::ClientResult;
use crate::models::{ApiKey, ApiKeyCreate, ApiKeyWithSecret};

impl ApiClient {
    /// List the selected organization's API keys
    ///
    /// # Errors
    ///
    /// Fails when no organization is selected.
    pub async fn api_keys(&self) -> ClientResult<Vec<ApiKey>> {
        self.get_json(routes::API_KEYS, Scope::Organization).await
    }

    /// Create an API key
    ///
    /// The response carries the full secret; it is never returned again.
    ///
    /// # Errors
    ///
    /// Fails when no organization is selected.
    pub async fn create_api_key(&self, request: &ApiKeyCreate) -> ClientResult<ApiKeyWithSecret> {
        self.post_json(routes::API_KEYS, request, Scope::Organization)
            .await
    }

    /// Deactivate an API key, keeping its record
    ///
    /// # Errors
    ///
    /// Fails when the key belongs to a different organization.
    pub async fn revoke_api_key(&self, key_id: i64) -> ClientResult<()> {
        self.delete(&format!("{}/{key_id}", routes::API_KEYS), Scope::Organization)
            .await
    }

    /// Delete an API key permanently
    ///
    /// # Errors
    ///
    /// Fails when the key belongs to a different organization.
    pub async fn delete_api_key(&self, key_id: i64) -> ClientResult<()> {
        self.delete(
            &format!("{}/{key_id}/permanent", routes::API_KEYS),
            Scope::Organization,
        )
        .await
    }
}
