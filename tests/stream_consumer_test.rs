// ABOUTME: Integration tests for the streaming chat consumer and conversation state
// ABOUTME: Chunk-boundary invariance, sentinel handling, rollback, regeneration, and 401 handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use meridian_client::client::{ApiClient, ChatSendRequest};
use meridian_client::config::ClientConfig;
use meridian_client::conversation::{consume_reply, Conversation, MessageRole};
use meridian_client::errors::{ClientError, ErrorKind};
use meridian_client::stream::{decode_stream, ChatStream, PayloadFormat};
use meridian_client::token_store::{MemoryTokenStore, SessionTokens, TokenStore};

/// Build a decoded chat stream from pre-chunked raw bytes
fn stream_of(chunks: Vec<Vec<u8>>) -> ChatStream {
    let items: Vec<Result<Bytes, ClientError>> =
        chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
    decode_stream(futures_util::stream::iter(items), PayloadFormat::Text)
}

/// Start a conversation with one user message and an open reply
fn begin_conversation(content: &str) -> (Conversation, String) {
    let mut conversation = Conversation::new();
    conversation.push_user(content).unwrap();
    let id = conversation.begin_reply().unwrap();
    (conversation, id)
}

/// Drive a stream into the conversation, collecting every published update
async fn collect_updates(
    conversation: &mut Conversation,
    message_id: &str,
    stream: ChatStream,
) -> (Result<String, ClientError>, Vec<String>) {
    let mut updates = Vec::new();
    let result = consume_reply(conversation, message_id, stream, |_, content| {
        updates.push(content.to_owned());
    })
    .await;
    (result, updates)
}

#[tokio::test]
async fn test_updates_are_prefix_accumulations_regardless_of_chunking() {
    let raw = b"data: Hel\ndata: lo\ndata:  wor\ndata: ld!\ndata: [DONE]\n".to_vec();
    let expected_updates = ["Hel", "Hello", "Hello wor", "Hello world!"];

    // The same logical stream under different chunk boundaries: one
    // chunk, split mid-line, split mid-prefix, and one byte at a time.
    let chunkings: Vec<Vec<Vec<u8>>> = vec![
        vec![raw.clone()],
        vec![raw[..7].to_vec(), raw[7..23].to_vec(), raw[23..].to_vec()],
        vec![raw[..2].to_vec(), raw[2..].to_vec()],
        raw.iter().map(|b| vec![*b]).collect(),
    ];

    for chunks in chunkings {
        let (mut conversation, id) = begin_conversation("hi");
        let (result, updates) =
            collect_updates(&mut conversation, &id, stream_of(chunks)).await;

        assert_eq!(result.unwrap(), "Hello world!");
        assert_eq!(updates, expected_updates);
        assert_eq!(conversation.messages()[1].content, "Hello world!");
        assert!(!conversation.is_streaming());
    }
}

#[tokio::test]
async fn test_line_split_across_chunks_is_one_frame() {
    let (mut conversation, id) = begin_conversation("hi");
    let chunks = vec![b"data: hel".to_vec(), b"lo\ndata: [DONE]\n".to_vec()];
    let (result, updates) = collect_updates(&mut conversation, &id, stream_of(chunks)).await;

    assert_eq!(result.unwrap(), "hello");
    assert_eq!(updates, ["hello"]);
}

#[tokio::test]
async fn test_sentinel_ends_processing_even_with_trailing_bytes() {
    let (mut conversation, id) = begin_conversation("hi");
    let chunks = vec![
        b"data: answer\ndata: [DONE]\ndata: stale\n".to_vec(),
        b"data: more stale\n".to_vec(),
    ];
    let (result, updates) = collect_updates(&mut conversation, &id, stream_of(chunks)).await;

    assert_eq!(result.unwrap(), "answer");
    assert_eq!(updates, ["answer"]);
    assert_eq!(conversation.messages()[1].content, "answer");
}

#[tokio::test]
async fn test_stream_close_without_sentinel_completes_normally() {
    let (mut conversation, id) = begin_conversation("hi");
    let chunks = vec![b"data: partial answer\n".to_vec()];
    let (result, _) = collect_updates(&mut conversation, &id, stream_of(chunks)).await;

    assert_eq!(result.unwrap(), "partial answer");
    assert!(!conversation.is_streaming());
}

#[tokio::test]
async fn test_error_with_zero_frames_restores_pre_send_list() {
    let mut conversation = Conversation::new();
    conversation.push_user("hi").unwrap();
    let before: Vec<(MessageRole, String)> = conversation
        .messages()
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect();

    let id = conversation.begin_reply().unwrap();
    let items: Vec<Result<Bytes, ClientError>> =
        vec![Err(ClientError::transport("connection reset"))];
    let stream = decode_stream(futures_util::stream::iter(items), PayloadFormat::Text);
    let (result, updates) = collect_updates(&mut conversation, &id, stream).await;

    assert_eq!(result.unwrap_err().kind, ErrorKind::Transport);
    assert!(updates.is_empty());
    let after: Vec<(MessageRole, String)> = conversation
        .messages()
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect();
    assert_eq!(before, after);
    assert!(!conversation.is_streaming());
}

#[tokio::test]
async fn test_server_error_frame_keeps_streamed_content() {
    let (mut conversation, id) = begin_conversation("hi");
    let chunks = vec![b"data: partial\ndata: [ERROR] model crashed\n".to_vec()];
    let (result, _) = collect_updates(&mut conversation, &id, stream_of(chunks)).await;

    let error = result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Stream);
    // Content that already streamed is kept, only empty placeholders roll back
    assert_eq!(conversation.messages()[1].content, "partial");
    assert!(!conversation.is_streaming());
}

#[tokio::test]
async fn test_regenerate_matches_initial_send_shape() {
    let mut conversation = Conversation::new();

    // First exchange
    conversation.push_user("question one").unwrap();
    let a1 = conversation.begin_reply().unwrap();
    let chunks = vec![b"data: answer one\ndata: [DONE]\n".to_vec()];
    collect_updates(&mut conversation, &a1, stream_of(chunks)).await.0.unwrap();

    // Second exchange
    conversation.push_user("question two").unwrap();
    let a2 = conversation.begin_reply().unwrap();
    let chunks = vec![b"data: answer two\ndata: [DONE]\n".to_vec()];
    collect_updates(&mut conversation, &a2, stream_of(chunks)).await.0.unwrap();

    // Regenerate the first answer: everything from it onward is dropped
    let user_content = conversation.regenerate(&a1).unwrap();
    assert_eq!(user_content, "question one");
    assert_eq!(conversation.messages().len(), 1);

    let a1_retry = conversation.begin_reply().unwrap();
    let chunks = vec![b"data: better answer one\ndata: [DONE]\n".to_vec()];
    collect_updates(&mut conversation, &a1_retry, stream_of(chunks)).await.0.unwrap();

    let shape: Vec<(MessageRole, &str)> = conversation
        .messages()
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        shape,
        vec![
            (MessageRole::User, "question one"),
            (MessageRole::Assistant, "better answer one"),
        ]
    );
}

// ============================================================================
// HTTP-level behavior against a scripted server
// ============================================================================

/// Serve one scripted HTTP response on a loopback listener
async fn spawn_one_shot_server(status_line: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    addr
}

fn client_against(addr: SocketAddr, store: Arc<MemoryTokenStore>) -> ApiClient {
    let config = ClientConfig::default().with_base_url(format!("http://{addr}"));
    ApiClient::new(config, store).unwrap()
}

fn stored_session() -> SessionTokens {
    SessionTokens {
        access_token: "stale-access".into(),
        refresh_token: "stale-refresh".into(),
        current_org: Some(1),
    }
}

#[tokio::test]
async fn test_401_before_streaming_clears_tokens() {
    let addr = spawn_one_shot_server(
        "401 Unauthorized",
        r#"{"detail": "Could not validate credentials"}"#,
    )
    .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(stored_session()));
    let client = client_against(addr, Arc::clone(&store));

    let mut conversation = Conversation::new();
    conversation.push_user("hi").unwrap();
    let request = ChatSendRequest::from_conversation(&conversation, None);

    let Err(error) = client.stream_chat(&request, PayloadFormat::Text).await else {
        panic!("401 must abort the send");
    };

    assert_eq!(error.kind, ErrorKind::AuthExpired);
    // Stored tokens are cleared and no stream read was attempted
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_402_surfaces_missing_subscription_detail() {
    let addr = spawn_one_shot_server(
        "402 Payment Required",
        r#"{"detail": "No active subscription"}"#,
    )
    .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(stored_session()));
    let client = client_against(addr, Arc::clone(&store));

    let mut conversation = Conversation::new();
    conversation.push_user("hi").unwrap();
    let request = ChatSendRequest::from_conversation(&conversation, None);

    let Err(error) = client.stream_chat(&request, PayloadFormat::Text).await else {
        panic!("402 must abort the send");
    };

    assert_eq!(error.kind, ErrorKind::SubscriptionRequired);
    assert_eq!(error.display_message(), "No active subscription");
    // A payment failure does not log the user out
    assert!(store.load().await.unwrap().is_some());
}

#[tokio::test]
async fn test_failed_refresh_clears_tokens() {
    // Every connection gets a 401: the original request and the refresh
    // attempt both fail, which must clear the stored session.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for _ in 0..2 {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"detail": "Could not validate credentials"}"#;
            let response = format!(
                "HTTP/1.1 401 Unauthorized\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    let store = Arc::new(MemoryTokenStore::with_tokens(stored_session()));
    let client = client_against(addr, Arc::clone(&store));

    let error = client.me().await.expect_err("dead session must fail");
    assert_eq!(error.kind, ErrorKind::AuthExpired);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_end_to_end_streamed_reply() {
    let addr = spawn_one_shot_server(
        "200 OK",
        "data: Hello\n\ndata:  world\n\ndata: [DONE]\n\n",
    )
    .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(stored_session()));
    let client = client_against(addr, store);

    let mut conversation = Conversation::new();
    conversation.push_user("greet me").unwrap();
    let message_id = conversation.begin_reply().unwrap();

    let request = ChatSendRequest::from_conversation(&conversation, None);
    let stream = client
        .stream_chat(&request, PayloadFormat::Text)
        .await
        .unwrap();

    let (result, updates) = collect_updates(&mut conversation, &message_id, stream).await;
    assert_eq!(result.unwrap(), "Hello world");
    assert_eq!(updates, ["Hello", "Hello world"]);
    assert_eq!(conversation.messages()[1].content, "Hello world");
}
