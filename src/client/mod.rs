//! Chat completion client: request dispatch, response decoding, streaming.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::request::{RequestBuilder, RequestError};
use crate::api::{ChatCompletion, ChatMessage, ChatOptions};
use crate::config::Config;
use crate::transport::http::{join_url, HttpTransport};
use crate::transport::{Transport, TransportError};

pub mod sse;
pub mod stream;
pub mod usage;


pub use stream::ChunkStream;
pub use usage::{UsageAccumulator, UsageStrategy, UsageTotals};

/// Endpoint path appended to every base URL.
const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Failures surfaced by [`ChatClient`] operations.
#[derive(Debug)]
pub enum ChatError {
    /// The request could not be constructed.
    Request(RequestError),

    /// The transport failed before a response was available.
    Transport(TransportError),

    /// The API answered with a non-success status.
    Api {
        status: u16,
        message: Option<String>,
        body: String,
    },

    /// A response payload did not match the expected shape.
    Decode {
        context: &'static str,
        source: serde_json::Error,
    },
}

impl ChatError {
    pub(crate) fn api(status: u16, body: Vec<u8>) -> Self {
        let body = String::from_utf8_lossy(&body).into_owned();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .as_ref()
            .and_then(error_summary);
        ChatError::Api {
            status,
            message,
            body,
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Request(source) => write!(f, "{source}"),
            ChatError::Transport(source) => write!(f, "{source}"),
            ChatError::Api {
                status,
                message: Some(message),
                ..
            } => write!(f, "API error {status}: {message}"),
            ChatError::Api { status, .. } => write!(f, "API error {status}"),
            ChatError::Decode { context, source } => {
                write!(f, "Malformed {context}: {source}")
            }
        }
    }
}

impl StdError for ChatError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ChatError::Request(source) => Some(source),
            ChatError::Transport(source) => Some(source),
            ChatError::Api { .. } => None,
            ChatError::Decode { source, .. } => Some(source),
        }
    }
}

impl From<RequestError> for ChatError {
    fn from(source: RequestError) -> Self {
        ChatError::Request(source)
    }
}

impl From<TransportError> for ChatError {
    fn from(source: TransportError) -> Self {
        ChatError::Transport(source)
    }
}

/// Client for an OpenAI-compatible chat completions API.
///
/// The transport is injected, so the same call sites run against the real
/// network or a mock. The client itself holds no mutable state; concurrent
/// invocations are independent.
pub struct ChatClient {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
}

impl ChatClient {
    /// Builds a network-backed client from provider configuration.
    pub fn new(config: &Config) -> Self {
        Self::with_transport(
            Arc::new(HttpTransport::new()),
            &config.base_url,
            config.api_key.clone(),
        )
    }

    /// Builds a client over an explicit transport, mock or real.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        base_url: &str,
        api_key: Option<String>,
    ) -> Self {
        let endpoint = join_url(base_url, CHAT_COMPLETIONS_PATH);
        Self {
            transport,
            builder: RequestBuilder::new(endpoint, api_key),
        }
    }

    /// Sends one completion request and decodes the full response.
    pub async fn send(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatCompletion, ChatError> {
        let request = self.builder.chat(model, messages, options, false)?;
        debug!(model, turns = messages.len(), "sending chat completion");
        let response = self.transport.execute(request).await?;
        decode_completion(response.status, &response.body)
    }

    /// Streams a completion as a lazy sequence of chunks.
    ///
    /// Nothing is sent until the sequence is first polled; it is single-pass
    /// and finite. Dropping it releases the connection.
    pub fn stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> ChunkStream {
        self.stream_with_cancellation(model, messages, options, CancellationToken::new())
    }

    /// Streams a completion, stopping as soon as `cancel` fires.
    pub fn stream_with_cancellation(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
        cancel: CancellationToken,
    ) -> ChunkStream {
        let request = self
            .builder
            .chat(model, messages, options, true)
            .map_err(ChatError::from);
        let transport = Arc::clone(&self.transport);
        Box::pin(async_stream::try_stream! {
            let request = request?;
            let response = transport.open_stream(request).await.map_err(ChatError::from)?;
            debug!(status = response.status, "chat completion stream open");
            let mut chunks = stream::chunk_stream(response, cancel);
            while let Some(item) = chunks.next().await {
                let chunk = item?;
                yield chunk;
            }
        })
    }
}

/// Decodes a buffered chat completion response.
///
/// Non-success statuses become [`ChatError::Api`] with the parsed error
/// detail when the body carries one. Absent `usage` is not an error.
pub fn decode_completion(status: u16, body: &[u8]) -> Result<ChatCompletion, ChatError> {
    if !(200..300).contains(&status) {
        return Err(ChatError::api(status, body.to_vec()));
    }
    serde_json::from_slice(body).map_err(|source| ChatError::Decode {
        context: "chat completion",
        source,
    })
}

/// Pulls a human-readable summary out of an API error body.
fn error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })?;

    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

#[cfg(test)]
mod decode_tests {
    use super::*;

    #[test]
    fn success_body_decodes_choices_and_usage() {
        let body = br#"{"choices":[{"message":{"content":"X"}}],"usage":{"prompt_tokens":3,"completion_tokens":5,"total_tokens":8}}"#;
        let completion = decode_completion(200, body).expect("completion");
        assert_eq!(completion.content(), Some("X"));
        let usage = completion.usage.expect("usage");
        assert_eq!(usage.prompt_tokens, Some(3));
        assert_eq!(usage.completion_tokens, Some(5));
        assert_eq!(usage.total_tokens, Some(8));
    }

    #[test]
    fn absent_usage_is_not_an_error() {
        let completion =
            decode_completion(200, br#"{"choices":[{"message":{"content":"X"}}]}"#)
                .expect("completion");
        assert!(completion.usage.is_none());
    }

    #[test]
    fn missing_choices_is_a_decode_error() {
        let err = decode_completion(200, br#"{"usage":{}}"#).expect_err("malformed");
        assert!(matches!(
            err,
            ChatError::Decode {
                context: "chat completion",
                ..
            }
        ));
    }

    #[test]
    fn non_success_status_parses_the_error_detail() {
        let body = br#"{"error":{"message":"The model does not exist","type":"invalid_request_error"}}"#;
        let err = decode_completion(404, body).expect_err("API error");
        match err {
            ChatError::Api {
                status,
                message,
                body,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message.as_deref(), Some("The model does not exist"));
                assert!(body.contains("invalid_request_error"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_error_bodies_keep_the_raw_text() {
        let err = decode_completion(502, b"upstream unavailable").expect_err("API error");
        match err {
            ChatError::Api {
                status,
                message,
                body,
            } => {
                assert_eq!(status, 502);
                assert!(message.is_none());
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn error_summary_reads_the_common_shapes() {
        let nested: serde_json::Value =
            serde_json::from_str(r#"{"error":{"message":"model  overloaded"}}"#).unwrap();
        assert_eq!(error_summary(&nested).as_deref(), Some("model overloaded"));

        let flat: serde_json::Value =
            serde_json::from_str(r#"{"error":"quota exceeded"}"#).unwrap();
        assert_eq!(error_summary(&flat).as_deref(), Some("quota exceeded"));

        let top: serde_json::Value = serde_json::from_str(r#"{"message":"bad key"}"#).unwrap();
        assert_eq!(error_summary(&top).as_deref(), Some("bad key"));

        let none: serde_json::Value = serde_json::from_str(r#"{"status":"failed"}"#).unwrap();
        assert_eq!(error_summary(&none), None);
    }
}
