// ABOUTME: SSE-like frame decoder for streaming chat responses
// ABOUTME: Buffers partial lines across chunk boundaries, handles the [DONE] sentinel and [ERROR] frames
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

//! # Streaming Response Decoder
//!
//! The chat endpoint streams newline-delimited `data:` frames. Network
//! chunks do not align with frame boundaries, so two correctness issues
//! must be handled here:
//!
//! 1. **Multiple frames per chunk**: when the network batches several
//!    frames into one chunk, every frame is emitted, not just the first.
//! 2. **Partial frames across chunks**: a line (or a multi-byte UTF-8
//!    sequence) split across two chunks is buffered until the trailing
//!    newline arrives and then decoded as one frame.
//!
//! The buffer is byte-oriented: bytes accumulate until a `\n` and only
//! complete lines are converted to text, so chunk boundaries inside a
//! UTF-8 sequence cannot corrupt the payload.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_stream::Stream;
use tracing::debug;

use crate::errors::ClientError;

/// Frame prefix for data lines
const DATA_PREFIX: &str = "data: ";

/// End-of-stream sentinel payload
pub const DONE_SENTINEL: &str = "[DONE]";

/// Prefix of a server-reported mid-stream failure payload
const ERROR_PREFIX: &str = "[ERROR] ";

/// How payloads of `data:` frames are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// The payload is the raw text delta (the deployed backend's format)
    #[default]
    Text,
    /// The payload is a JSON object `{"content": "..."}`; frames that do
    /// not parse are skipped silently
    Json,
}

/// A decoded frame of the streaming response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A text delta to append to the accumulated content
    Delta(String),
    /// The end-of-stream sentinel
    Done,
    /// A server-reported failure; the stream is unusable afterwards
    Failure(String),
}

/// JSON payload shape for [`PayloadFormat::Json`]
#[derive(Debug, Deserialize)]
struct JsonDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Line-buffering frame decoder
///
/// Feed raw chunk bytes in, get complete frames out. Bytes after the
/// last newline stay buffered for the next [`feed`](Self::feed) call.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: Vec<u8>,
}

impl FrameBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every frame completed by it
    pub fn feed(&mut self, bytes: &[u8], format: PayloadFormat) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let rest = self.buffer.split_off(newline_pos + 1);
            let mut line = mem::replace(&mut self.buffer, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if let Some(frame) = classify_line(&String::from_utf8_lossy(&line), format) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing partial line when the byte stream ends
    ///
    /// The backend terminates every frame with a newline, but a stream
    /// cut short may leave a final unterminated line in the buffer.
    pub fn flush(&mut self, format: PayloadFormat) -> Option<StreamFrame> {
        let remaining = mem::take(&mut self.buffer);
        if remaining.is_empty() {
            return None;
        }
        classify_line(&String::from_utf8_lossy(&remaining), format)
    }
}

/// Classify one complete line as a frame
///
/// Lines without the `data: ` prefix (blank separators, SSE comments,
/// `event:`/`id:`/`retry:` fields) are ignored. Payload whitespace is
/// preserved: deltas routinely start with a space.
fn classify_line(line: &str, format: PayloadFormat) -> Option<StreamFrame> {
    let payload = line.strip_prefix(DATA_PREFIX)?;

    if payload == DONE_SENTINEL {
        return Some(StreamFrame::Done);
    }
    if let Some(message) = payload.strip_prefix(ERROR_PREFIX) {
        return Some(StreamFrame::Failure(message.to_owned()));
    }
    if payload.is_empty() {
        return None;
    }

    match format {
        PayloadFormat::Text => Some(StreamFrame::Delta(payload.to_owned())),
        PayloadFormat::Json => match serde_json::from_str::<JsonDelta>(payload) {
            Ok(delta) => delta
                .content
                .filter(|content| !content.is_empty())
                .map(StreamFrame::Delta),
            Err(e) => {
                debug!("skipping malformed stream frame: {e}");
                None
            }
        },
    }
}

/// One emitted chunk of a decoded chat stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    /// Content delta for this chunk; empty only when final
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
}

impl StreamChunk {
    fn delta(delta: String) -> Self {
        Self {
            delta,
            is_final: false,
        }
    }

    fn done() -> Self {
        Self {
            delta: String::new(),
            is_final: true,
        }
    }
}

/// Stream of decoded chat chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ClientError>> + Send>>;

/// Internal state of the decode loop
struct DecodeState {
    parser: FrameBuffer,
    pending: VecDeque<Result<StreamChunk, ClientError>>,
    ended: bool,
}

impl DecodeState {
    /// Queue a frame's chunk; returns `false` once the stream is finished
    fn enqueue(&mut self, frame: StreamFrame) -> bool {
        match frame {
            StreamFrame::Delta(delta) => {
                self.pending.push_back(Ok(StreamChunk::delta(delta)));
                true
            }
            StreamFrame::Done => {
                self.pending.push_back(Ok(StreamChunk::done()));
                self.ended = true;
                false
            }
            StreamFrame::Failure(message) => {
                self.pending.push_back(Err(ClientError::stream(message)));
                self.ended = true;
                false
            }
        }
    }
}

/// Decode a raw byte stream into chat chunks
///
/// The sentinel ends decoding: once `data: [DONE]` (or a failure frame)
/// is seen, no further bytes are read from the underlying stream, even
/// if more arrive afterwards. A stream that closes without a sentinel
/// ends normally after a final flush of the line buffer.
pub fn decode_stream<S>(byte_stream: S, format: PayloadFormat) -> ChatStream
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
{
    let state = DecodeState {
        parser: FrameBuffer::new(),
        pending: VecDeque::new(),
        ended: false,
    };

    // unfold keeps the parser state across awaits: each iteration either
    // drains a pending chunk or reads the next network chunk.
    let stream = unfold(
        (Box::pin(byte_stream), state, format),
        |(mut byte_stream, mut state, format)| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, (byte_stream, state, format)));
                }

                if state.ended {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        for frame in state.parser.feed(&bytes, format) {
                            if !state.enqueue(frame) {
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.ended = true;
                        state.pending.push_back(Err(e));
                    }
                    None => {
                        state.ended = true;
                        if let Some(frame) = state.parser.flush(format) {
                            state.enqueue(frame);
                        }
                    }
                }
            }
        },
    );

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn feed_all(chunks: &[&str], format: PayloadFormat) -> Vec<StreamFrame> {
        let mut parser = FrameBuffer::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(parser.feed(chunk.as_bytes(), format));
        }
        frames.extend(parser.flush(format));
        frames
    }

    #[test]
    fn test_single_chunk_single_frame() {
        let frames = feed_all(&["data: hello\n\n"], PayloadFormat::Text);
        assert_eq!(frames, vec![StreamFrame::Delta("hello".into())]);
    }

    #[test]
    fn test_multiple_frames_per_chunk() {
        let frames = feed_all(
            &["data: one\n\ndata: two\n\ndata: [DONE]\n\n"],
            PayloadFormat::Text,
        );
        assert_eq!(
            frames,
            vec![
                StreamFrame::Delta("one".into()),
                StreamFrame::Delta("two".into()),
                StreamFrame::Done,
            ]
        );
    }

    #[test]
    fn test_line_split_across_chunks_is_one_frame() {
        let frames = feed_all(&["data: hel", "lo\n"], PayloadFormat::Text);
        assert_eq!(frames, vec![StreamFrame::Delta("hello".into())]);
    }

    #[test]
    fn test_prefix_split_across_chunks() {
        let frames = feed_all(&["da", "ta: hi\n"], PayloadFormat::Text);
        assert_eq!(frames, vec![StreamFrame::Delta("hi".into())]);
    }

    #[test]
    fn test_utf8_sequence_split_across_chunks() {
        // "é" is two bytes; split them across chunks
        let bytes = "data: caf\u{e9}\n".as_bytes();
        let (left, right) = bytes.split_at(bytes.len() - 3);

        let mut parser = FrameBuffer::new();
        assert!(parser.feed(left, PayloadFormat::Text).is_empty());
        let frames = parser.feed(right, PayloadFormat::Text);
        assert_eq!(frames, vec![StreamFrame::Delta("caf\u{e9}".into())]);
    }

    #[test]
    fn test_leading_whitespace_in_payload_is_preserved() {
        let frames = feed_all(&["data:  world\n"], PayloadFormat::Text);
        assert_eq!(frames, vec![StreamFrame::Delta(" world".into())]);
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        let frames = feed_all(
            &["event: message\nid: 3\n: comment\n\ndata: x\n"],
            PayloadFormat::Text,
        );
        assert_eq!(frames, vec![StreamFrame::Delta("x".into())]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let frames = feed_all(&["data: hi\r\ndata: [DONE]\r\n"], PayloadFormat::Text);
        assert_eq!(
            frames,
            vec![StreamFrame::Delta("hi".into()), StreamFrame::Done]
        );
    }

    #[test]
    fn test_error_frame() {
        let frames = feed_all(&["data: [ERROR] model unavailable\n"], PayloadFormat::Text);
        assert_eq!(
            frames,
            vec![StreamFrame::Failure("model unavailable".into())]
        );
    }

    #[test]
    fn test_unterminated_trailing_line_is_flushed() {
        let frames = feed_all(&["data: tail"], PayloadFormat::Text);
        assert_eq!(frames, vec![StreamFrame::Delta("tail".into())]);
    }

    #[test]
    fn test_json_payloads() {
        let frames = feed_all(
            &[
                "data: {\"content\": \"Hello\"}\n",
                "data: {broken\n",
                "data: {\"content\": \"\"}\n",
                "data: [DONE]\n",
            ],
            PayloadFormat::Json,
        );
        assert_eq!(
            frames,
            vec![StreamFrame::Delta("Hello".into()), StreamFrame::Done]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_stops_at_sentinel() {
        let chunks: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(b"data: a\n\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n\ndata: ignored\n\n")),
            Ok(Bytes::from_static(b"data: also ignored\n\n")),
        ];
        let mut stream = decode_stream(futures_util::stream::iter(chunks), PayloadFormat::Text);

        let mut collected = Vec::new();
        while let Some(item) = stream.next().await {
            collected.push(item.unwrap());
        }

        assert_eq!(
            collected,
            vec![StreamChunk::delta("a".into()), StreamChunk::done()]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_surfaces_transport_error() {
        let chunks: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from_static(b"data: partial\n")),
            Err(ClientError::transport("connection reset")),
        ];
        let mut stream = decode_stream(futures_util::stream::iter(chunks), PayloadFormat::Text);

        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            StreamChunk::delta("partial".into())
        );
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
