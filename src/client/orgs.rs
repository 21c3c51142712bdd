// ABOUTME: Organization endpoints: CRUD plus membership management
// ABOUTME: Explicit org ids in paths; listing is cached briefly via the resource cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use std::time::Duration;

use super::{ApiClient, Scope};
use crate::cache::{CacheKey, CacheResource};
use crate::constants::{cache, routes};
use crate::errors::ClientResult;
use crate::models::{
    Membership, MembershipInvite, MembershipUpdate, Organization, OrganizationCreate,
    OrganizationUpdate, OrganizationWithRole,
};

impl ApiClient {
    /// List the organizations the caller belongs to, with their role
    ///
    /// # Errors
    ///
    /// Fails when no session is stored.
    pub async fn organizations(&self) -> ClientResult<Vec<OrganizationWithRole>> {
        self.get_json(routes::ORGS, Scope::User).await
    }

    /// Cached variant of [`organizations`](Self::organizations)
    ///
    /// # Errors
    ///
    /// Propagates the underlying fetch error on a cache miss.
    pub async fn organizations_cached(&self) -> ClientResult<Vec<OrganizationWithRole>> {
        let key = CacheKey::user_scoped(CacheResource::Organizations);
        self.cache
            .get_or_fetch(
                &key,
                Duration::from_secs(cache::TTL_ORGANIZATIONS_SECS),
                || self.organizations(),
            )
            .await
    }

    /// Create an organization; the caller becomes its owner
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed or taken slug.
    pub async fn create_organization(
        &self,
        request: &OrganizationCreate,
    ) -> ClientResult<Organization> {
        let created = self.post_json(routes::ORGS, request, Scope::User).await;
        self.cache
            .invalidate(&CacheKey::user_scoped(CacheResource::Organizations))
            .await;
        created
    }

    /// Fetch one organization
    ///
    /// # Errors
    ///
    /// Returns a membership error when the caller does not belong to it.
    pub async fn organization(&self, org_id: i64) -> ClientResult<Organization> {
        self.get_json(&format!("{}{org_id}", routes::ORGS), Scope::User)
            .await
    }

    /// Update an organization's name or description
    ///
    /// # Errors
    ///
    /// Requires an admin or owner role.
    pub async fn update_organization(
        &self,
        org_id: i64,
        request: &OrganizationUpdate,
    ) -> ClientResult<Organization> {
        self.patch_json(&format!("{}{org_id}", routes::ORGS), request, Scope::User)
            .await
    }

    /// List an organization's members
    ///
    /// # Errors
    ///
    /// Returns a membership error when the caller does not belong to it.
    pub async fn members(&self, org_id: i64) -> ClientResult<Vec<Membership>> {
        self.get_json(&format!("{}{org_id}/members", routes::ORGS), Scope::User)
            .await
    }

    /// Invite a user to an organization by email
    ///
    /// # Errors
    ///
    /// Requires an admin or owner role; the invitee must have an account.
    pub async fn invite_member(
        &self,
        org_id: i64,
        request: &MembershipInvite,
    ) -> ClientResult<Membership> {
        self.post_json(
            &format!("{}{org_id}/invite", routes::ORGS),
            request,
            Scope::User,
        )
        .await
    }

    /// Change a member's role or active state
    ///
    /// # Errors
    ///
    /// Requires an admin or owner role.
    pub async fn update_member(
        &self,
        org_id: i64,
        user_id: i64,
        request: &MembershipUpdate,
    ) -> ClientResult<Membership> {
        self.patch_json(
            &format!("{}{org_id}/members/{user_id}", routes::ORGS),
            request,
            Scope::User,
        )
        .await
    }

    /// Remove a member from an organization
    ///
    /// # Errors
    ///
    /// Requires an admin or owner role; owners cannot be removed.
    pub async fn remove_member(&self, org_id: i64, user_id: i64) -> ClientResult<()> {
        self.delete(
            &format!("{}{org_id}/members/{user_id}", routes::ORGS),
            Scope::User,
        )
        .await
    }
}
