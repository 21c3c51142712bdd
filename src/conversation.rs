// ABOUTME: Conversation state for the active chat
// ABOUTME: Message list, placeholder lifecycle, full-content replacement updates, regeneration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

//! # Conversation State
//!
//! A [`Conversation`] owns the in-memory message list of one chat. It
//! has exactly one writer: messages are mutated only by the streaming
//! accumulator's replacement step and by truncation on regeneration,
//! and at most one exchange may stream at a time.
//!
//! The accumulator publishes the *full accumulated content* after every
//! frame rather than individual deltas, so updates are idempotent
//! replacements and a missed update is corrected by the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use futures_util::StreamExt;

use crate::errors::{ClientError, ClientResult};
use crate::models::ChatDetail;
use crate::stream::ChatStream;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

impl MessageRole {
    /// String form used on the wire
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message of the active conversation
///
/// The id is assigned client-side. Content is mutable only while the
/// message is the in-flight assistant reply; once streaming ends it is
/// never touched again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Client-assigned message id
    pub id: String,
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// The in-memory state of one chat
#[derive(Debug, Default)]
pub struct Conversation {
    chat_id: Option<String>,
    title: Option<String>,
    messages: Vec<ChatMessage>,
    in_flight: Option<String>,
}

impl Conversation {
    /// Create an empty conversation (a new chat)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation bound to a stored chat id
    #[must_use]
    pub fn with_chat_id(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: Some(chat_id.into()),
            ..Self::default()
        }
    }

    /// Seed a conversation from a stored chat's history
    #[must_use]
    pub fn from_history(detail: ChatDetail) -> Self {
        let messages = detail
            .messages
            .into_iter()
            .map(|stored| {
                let role = match stored.role.as_str() {
                    "assistant" => MessageRole::Assistant,
                    "system" => MessageRole::System,
                    _ => MessageRole::User,
                };
                ChatMessage {
                    id: stored.id,
                    role,
                    content: stored.content,
                    timestamp: stored.created_at,
                }
            })
            .collect();

        Self {
            chat_id: Some(detail.id),
            title: detail.title,
            messages,
            in_flight: None,
        }
    }

    /// The stored chat id, if this conversation is persisted server-side
    #[must_use]
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    /// Chat title
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Messages in order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether a reply is currently streaming
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Append a user message
    ///
    /// # Errors
    ///
    /// Fails if a reply is currently streaming.
    pub fn push_user(&mut self, content: impl Into<String>) -> ClientResult<&ChatMessage> {
        if self.is_streaming() {
            return Err(ClientError::exchange_in_progress());
        }
        self.messages.push(ChatMessage::user(content));
        self.messages
            .last()
            .ok_or_else(|| ClientError::internal("message list empty after push"))
    }

    /// Begin a streamed reply: append an empty assistant placeholder
    ///
    /// Returns the placeholder's id, the target for content updates.
    ///
    /// # Errors
    ///
    /// Fails if a reply is already streaming.
    pub fn begin_reply(&mut self) -> ClientResult<String> {
        if self.is_streaming() {
            return Err(ClientError::exchange_in_progress());
        }
        let placeholder = ChatMessage::assistant("");
        let id = placeholder.id.clone();
        self.messages.push(placeholder);
        self.in_flight = Some(id.clone());
        Ok(id)
    }

    /// Replace the content of the in-flight message
    ///
    /// Replacement is idempotent: callers pass the full accumulated
    /// content, not a delta. Updates for unknown ids are ignored.
    pub fn apply_content(&mut self, message_id: &str, content: String) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
            message.content = content;
        }
    }

    /// Mark the in-flight reply as finished
    pub fn complete_reply(&mut self, message_id: &str) {
        if self.in_flight.as_deref() == Some(message_id) {
            self.in_flight = None;
        }
    }

    /// Abort the in-flight reply
    ///
    /// Discards the placeholder when nothing was accumulated, so the
    /// list never keeps a permanently empty assistant turn. Partial
    /// content that already streamed is kept.
    pub fn rollback_reply(&mut self, message_id: &str) {
        if let Some(index) = self.messages.iter().position(|m| m.id == message_id) {
            if self.messages[index].content.is_empty() {
                self.messages.remove(index);
            }
        }
        self.complete_reply(message_id);
    }

    /// Prepare to regenerate an assistant message
    ///
    /// Truncates the list back to the message's position, dropping it
    /// and everything after, and returns the content of the user
    /// message that prompted it. The caller re-runs the same send path
    /// as an initial exchange; nothing is patched in place.
    ///
    /// # Errors
    ///
    /// Fails if a reply is streaming, the id is unknown, the message is
    /// not an assistant message, or it has no preceding user message.
    pub fn regenerate(&mut self, message_id: &str) -> ClientResult<String> {
        if self.is_streaming() {
            return Err(ClientError::exchange_in_progress());
        }

        let index = self
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| ClientError::internal(format!("unknown message {message_id}")))?;

        if self.messages[index].role != MessageRole::Assistant {
            return Err(ClientError::internal(
                "only assistant messages can be regenerated",
            ));
        }

        let user_content = index
            .checked_sub(1)
            .map(|prev| &self.messages[prev])
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .ok_or_else(|| {
                ClientError::internal("no user message precedes the one to regenerate")
            })?;

        self.messages.truncate(index);
        Ok(user_content)
    }
}

/// Drive a decoded chat stream into the conversation
///
/// Applies every delta as a full-content replacement of the target
/// message and invokes `publish` with the accumulated content after
/// each one, mirroring how a UI would re-render. Returns the final
/// content on success.
///
/// A stream that ends without the sentinel completes normally. On any
/// stream error the reply is rolled back (the placeholder is discarded
/// if still empty) and the error is returned; there is no retry.
///
/// # Errors
///
/// Propagates the first stream error.
pub async fn consume_reply<F>(
    conversation: &mut Conversation,
    message_id: &str,
    mut stream: ChatStream,
    mut publish: F,
) -> ClientResult<String>
where
    F: FnMut(&str, &str),
{
    let mut accumulated = String::new();

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if chunk.is_final {
                    break;
                }
                accumulated.push_str(&chunk.delta);
                conversation.apply_content(message_id, accumulated.clone());
                publish(message_id, &accumulated);
            }
            Err(e) => {
                conversation.rollback_reply(message_id);
                return Err(e);
            }
        }
    }

    conversation.complete_reply(message_id);
    Ok(accumulated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::StoredMessage;

    #[test]
    fn test_push_and_begin_reply() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi").unwrap();
        let id = conversation.begin_reply().unwrap();

        assert_eq!(conversation.messages().len(), 2);
        assert!(conversation.is_streaming());
        assert_eq!(conversation.messages()[1].id, id);
        assert_eq!(conversation.messages()[1].role, MessageRole::Assistant);
        assert!(conversation.messages()[1].content.is_empty());
    }

    #[test]
    fn test_single_exchange_at_a_time() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi").unwrap();
        let _id = conversation.begin_reply().unwrap();

        assert!(conversation.begin_reply().is_err());
        assert!(conversation.push_user("again").is_err());
    }

    #[test]
    fn test_apply_content_replaces_fully() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi").unwrap();
        let id = conversation.begin_reply().unwrap();

        conversation.apply_content(&id, "Hel".into());
        conversation.apply_content(&id, "Hello".into());
        assert_eq!(conversation.messages()[1].content, "Hello");

        // Replaying an older snapshot is harmless on the next update
        conversation.apply_content(&id, "Hel".into());
        conversation.apply_content(&id, "Hello!".into());
        assert_eq!(conversation.messages()[1].content, "Hello!");
    }

    #[test]
    fn test_rollback_discards_empty_placeholder() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi").unwrap();
        let before: Vec<String> = conversation.messages().iter().map(|m| m.id.clone()).collect();

        let id = conversation.begin_reply().unwrap();
        conversation.rollback_reply(&id);

        let after: Vec<String> = conversation.messages().iter().map(|m| m.id.clone()).collect();
        assert_eq!(before, after);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_rollback_keeps_partial_content() {
        let mut conversation = Conversation::new();
        conversation.push_user("hi").unwrap();
        let id = conversation.begin_reply().unwrap();
        conversation.apply_content(&id, "partial answer".into());

        conversation.rollback_reply(&id);
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[1].content, "partial answer");
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_regenerate_truncates_to_prior_user_message() {
        let mut conversation = Conversation::new();
        conversation.push_user("first question").unwrap();
        let a1 = conversation.begin_reply().unwrap();
        conversation.apply_content(&a1, "first answer".into());
        conversation.complete_reply(&a1);

        conversation.push_user("second question").unwrap();
        let a2 = conversation.begin_reply().unwrap();
        conversation.apply_content(&a2, "second answer".into());
        conversation.complete_reply(&a2);

        let content = conversation.regenerate(&a1).unwrap();
        assert_eq!(content, "first question");
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].content, "first question");
    }

    #[test]
    fn test_regenerate_rejects_user_messages() {
        let mut conversation = Conversation::new();
        let user_id = conversation.push_user("hi").unwrap().id.clone();
        assert!(conversation.regenerate(&user_id).is_err());
    }

    #[test]
    fn test_from_history_maps_roles() {
        let detail = ChatDetail {
            id: "chat-1".into(),
            title: Some("Greetings".into()),
            messages: vec![
                StoredMessage {
                    id: "m1".into(),
                    role: "user".into(),
                    content: "hi".into(),
                    created_at: Utc::now(),
                },
                StoredMessage {
                    id: "m2".into(),
                    role: "assistant".into(),
                    content: "hello".into(),
                    created_at: Utc::now(),
                },
            ],
        };

        let conversation = Conversation::from_history(detail);
        assert_eq!(conversation.chat_id(), Some("chat-1"));
        assert_eq!(conversation.title(), Some("Greetings"));
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[0].role, MessageRole::User);
        assert_eq!(conversation.messages()[1].role, MessageRole::Assistant);
    }
}
