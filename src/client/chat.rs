// ABOUTME: Chat endpoints: streaming send, chat history, and usage summary
// ABOUTME: A failed send clears the session on 401 before any stream read happens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use std::time::Duration;

use futures_util::TryStreamExt;
use serde::Serialize;
use tracing::debug;

use super::{ApiClient, Scope};
use crate::cache::{CacheKey, CacheResource};
use crate::constants::{cache, defaults, headers, routes};
use crate::conversation::{Conversation, MessageRole};
use crate::errors::{ClientError, ClientResult, ErrorKind};
use crate::models::{ChatDetail, ChatSummary, UsageSummary};
use crate::stream::{decode_stream, ChatStream, PayloadFormat};

/// One message as sent to the chat endpoint
#[derive(Debug, Clone, Serialize)]
pub struct WireChatMessage {
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

/// Request body for the streaming chat endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatSendRequest {
    /// Conversation history including the new user message
    pub messages: Vec<WireChatMessage>,
    /// Model identifier
    pub model: String,
    /// Stored chat to append to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Completion length cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Always `true` for this endpoint
    pub stream: bool,
}

impl ChatSendRequest {
    /// Build a request from a conversation's current messages
    ///
    /// The in-flight empty placeholder is excluded; the backend only
    /// sees completed turns plus the new user message.
    #[must_use]
    pub fn from_conversation(conversation: &Conversation, model: Option<&str>) -> Self {
        let messages = conversation
            .messages()
            .iter()
            .filter(|m| !(m.role == MessageRole::Assistant && m.content.is_empty()))
            .map(|m| WireChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();

        Self {
            messages,
            model: model.unwrap_or(defaults::CHAT_MODEL).to_owned(),
            chat_id: conversation.chat_id().map(ToOwned::to_owned),
            temperature: None,
            max_tokens: None,
            stream: true,
        }
    }
}

impl ApiClient {
    /// Start a streaming chat completion
    ///
    /// Classifies HTTP failures before any stream read: a 401 clears the
    /// stored session (no refresh retry on this path), a 402 surfaces
    /// the missing subscription, a 403 the missing membership. On
    /// success the response bytes are wrapped in the frame decoder.
    ///
    /// # Errors
    ///
    /// Fails when no session is stored, no organization is selected, or
    /// the server rejects the request.
    pub async fn stream_chat(
        &self,
        request: &ChatSendRequest,
        format: PayloadFormat,
    ) -> ClientResult<ChatStream> {
        let session = self.session().await?;
        let org = self.current_org().await?;

        debug!(model = %request.model, messages = request.messages.len(), "starting chat stream");

        let response = self
            .http
            .post(self.api_url(routes::AI_CHAT_STREAM))
            .header(headers::ORG_SELECTOR, org.to_string())
            .bearer_auth(&session.access_token)
            .json(request)
            .send()
            .await
            .map_err(ClientError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = ClientError::from_response(status.as_u16(), &body);
            if error.kind == ErrorKind::AuthExpired {
                self.force_logout().await;
            }
            return Err(error);
        }

        Ok(decode_stream(
            response.bytes_stream().map_err(ClientError::from),
            format,
        ))
    }

    /// List the caller's stored chats
    ///
    /// # Errors
    ///
    /// Fails when no session is stored.
    pub async fn chats(&self) -> ClientResult<Vec<ChatSummary>> {
        self.get_json(routes::CHATS, Scope::User).await
    }

    /// Fetch one stored chat with its messages
    ///
    /// # Errors
    ///
    /// Fails when the chat does not exist or belongs to someone else.
    pub async fn chat(&self, chat_id: &str) -> ClientResult<ChatDetail> {
        self.get_json(&format!("{}/{chat_id}", routes::CHATS), Scope::User)
            .await
    }

    /// Fetch the selected organization's monthly usage summary
    ///
    /// # Errors
    ///
    /// Fails when no organization is selected.
    pub async fn usage(&self) -> ClientResult<UsageSummary> {
        self.get_json(routes::AI_USAGE, Scope::Organization).await
    }

    /// Cached variant of [`usage`](Self::usage)
    ///
    /// # Errors
    ///
    /// Propagates the underlying fetch error on a cache miss.
    pub async fn usage_cached(&self) -> ClientResult<UsageSummary> {
        let org = self.current_org().await?;
        let key = CacheKey::org_scoped(org, CacheResource::Usage);
        self.cache
            .get_or_fetch(&key, Duration::from_secs(cache::TTL_USAGE_SECS), || {
                self.usage()
            })
            .await
    }
}
