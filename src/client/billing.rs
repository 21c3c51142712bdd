// ABOUTME: Billing endpoints: subscription, checkout, and customer portal sessions
// ABOUTME: Subscription reads go through the resource cache with a 5-minute TTL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use std::time::Duration;

use super::{ApiClient, Scope};
use crate::cache::{CacheKey, CacheResource};
use crate::constants::{cache, routes};
use crate::errors::ClientResult;
use crate::models::{
    CheckoutRequest, CheckoutResponse, PortalRequest, PortalResponse, Subscription,
};

impl ApiClient {
    /// Fetch the selected organization's subscription, bypassing the cache
    ///
    /// # Errors
    ///
    /// Fails when no organization is selected.
    pub async fn subscription(&self) -> ClientResult<Subscription> {
        self.get_json(routes::BILLING_SUBSCRIPTION, Scope::Organization)
            .await
    }

    /// Cached subscription read
    ///
    /// Served from the resource cache for five minutes; concurrent
    /// callers share a single fetch.
    ///
    /// # Errors
    ///
    /// Propagates the underlying fetch error on a cache miss.
    pub async fn subscription_cached(&self) -> ClientResult<Subscription> {
        let org = self.current_org().await?;
        let key = CacheKey::org_scoped(org, CacheResource::Subscription);
        self.cache
            .get_or_fetch(
                &key,
                Duration::from_secs(cache::TTL_SUBSCRIPTION_SECS),
                || self.subscription(),
            )
            .await
    }

    /// Drop the cached subscription for the selected organization
    ///
    /// Call after checkout or portal flows that may change the plan.
    ///
    /// # Errors
    ///
    /// Fails when no organization is selected.
    pub async fn invalidate_subscription(&self) -> ClientResult<()> {
        let org = self.current_org().await?;
        self.cache
            .invalidate(&CacheKey::org_scoped(org, CacheResource::Subscription))
            .await;
        Ok(())
    }

    /// Create a Stripe checkout session for a plan upgrade
    ///
    /// Returns the hosted checkout URL to open in a browser.
    ///
    /// # Errors
    ///
    /// Fails when the organization has no Stripe customer yet.
    pub async fn create_checkout(&self, request: &CheckoutRequest) -> ClientResult<CheckoutResponse> {
        self.post_json(routes::BILLING_CHECKOUT, request, Scope::Organization)
            .await
    }

    /// Create a Stripe customer portal session
    ///
    /// Returns the hosted portal URL to open in a browser.
    ///
    /// # Errors
    ///
    /// Fails when the organization has no Stripe customer yet.
    pub async fn customer_portal(&self, request: &PortalRequest) -> ClientResult<PortalResponse> {
        self.post_json(routes::BILLING_PORTAL, request, Scope::Organization)
            .await
    }
}
