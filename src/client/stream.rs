//! Incremental decoding of streamed chat completions.

use std::pin::Pin;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::sse::{data_payload, is_event_stream, LineBuffer, DONE_SENTINEL};
use super::ChatError;
use crate::api::ChatCompletionChunk;
use crate::transport::{StreamingResponse, TransportError};

/// Lazy, single-pass sequence of completion chunks.
///
/// Chunks decode on demand as the caller polls and arrive in exactly the
/// order the transport delivered them. Dropping the stream releases the
/// underlying connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, ChatError>> + Send>>;

enum LineEvent {
    Chunk(ChatCompletionChunk),
    Done,
    Skip,
}

fn decode_line(line: &str) -> Result<LineEvent, ChatError> {
    let Some(payload) = data_payload(line) else {
        return Ok(LineEvent::Skip);
    };
    if payload.is_empty() {
        return Ok(LineEvent::Skip);
    }
    if payload == DONE_SENTINEL {
        return Ok(LineEvent::Done);
    }
    serde_json::from_str(payload)
        .map(LineEvent::Chunk)
        .map_err(|source| ChatError::Decode {
            context: "stream chunk",
            source,
        })
}

/// A flushed partial tail gets one chance to form a final unit; anything
/// that does not decode means the connection closed mid-payload.
fn leftover_event(line: &str) -> Option<LineEvent> {
    let payload = data_payload(line)?;
    if payload == DONE_SENTINEL {
        return Some(LineEvent::Done);
    }
    serde_json::from_str(payload).ok().map(LineEvent::Chunk)
}

/// Decodes a streaming response into completion chunks.
///
/// Non-success statuses collect the body and fail before any chunk is
/// yielded. The sequence ends at the `[DONE]` sentinel, at a clean
/// connection close, or when `cancel` fires; a malformed payload fails the
/// sequence at that unit.
pub(crate) fn chunk_stream(response: StreamingResponse, cancel: CancellationToken) -> ChunkStream {
    Box::pin(try_stream! {
        let StreamingResponse { status, content_type, mut body } = response;

        if !(200..300).contains(&status) {
            let mut collected = Vec::new();
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(ChatError::from)?;
                collected.extend_from_slice(&chunk);
            }
            Err(ChatError::api(status, collected))?;
        }

        if let Some(content_type) = content_type {
            if !is_event_stream(&content_type) {
                debug!(%content_type, "stream response not marked text/event-stream");
            }
        }

        let mut lines = LineBuffer::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("stream cancelled");
                    return;
                }
                next = body.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(ChatError::from)?;
            for line in lines.push(&chunk) {
                match decode_line(&line)? {
                    LineEvent::Chunk(parsed) => yield parsed,
                    LineEvent::Done => {
                        debug!("stream ended at sentinel");
                        return;
                    }
                    LineEvent::Skip => {}
                }
            }
        }

        if let Some(leftover) = lines.finish() {
            match leftover_event(&leftover) {
                Some(LineEvent::Chunk(parsed)) => yield parsed,
                Some(LineEvent::Done) => {}
                _ => {
                    Err(ChatError::Transport(TransportError::Interrupted {
                        detail: "connection closed mid-payload".to_string(),
                    }))?;
                }
            }
        }
        debug!("stream ended at connection close");
    })
}
