//! Transport abstractions for chat completion requests.
//!
//! Implementations hide how a request reaches the API, so the same client
//! code runs against the real network or a deterministic mock. A transport
//! either buffers the whole response or hands back an incremental byte
//! stream; classifying statuses and parsing payloads is the client's job.

use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::api::ApiRequest;

pub mod http;
pub mod mock;

/// Raw byte chunks delivered by a streaming response.
///
/// Chunk boundaries are arbitrary; one delivery unit may span several
/// chunks and one chunk may carry several units.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Connection-level failures surfaced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established or timed out.
    Connect { detail: String },

    /// The request could not be built or sent.
    Request { detail: String },

    /// The connection closed in the middle of a delivery unit.
    Interrupted { detail: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect { detail } => write!(f, "Connection failed: {detail}"),
            TransportError::Request { detail } => write!(f, "Request failed: {detail}"),
            TransportError::Interrupted { detail } => {
                write!(f, "Connection interrupted: {detail}")
            }
        }
    }
}

impl StdError for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            TransportError::Connect {
                detail: err.to_string(),
            }
        } else {
            TransportError::Request {
                detail: err.to_string(),
            }
        }
    }
}

/// A fully buffered response to a single-shot request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// An open streaming response delivering raw byte chunks.
pub struct StreamingResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("body", &"<ByteStream>")
            .finish()
    }
}

/// Submit a request, obtain a response.
///
/// Both methods take ownership of the request; a transport performs no
/// retries and holds no state across calls beyond its connection pool.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes a request and buffers the complete response body.
    async fn execute(&self, request: ApiRequest) -> Result<TransportResponse, TransportError>;

    /// Executes a request and returns the body as an incremental stream.
    ///
    /// Dropping the returned stream releases the underlying connection.
    async fn open_stream(&self, request: ApiRequest)
        -> Result<StreamingResponse, TransportError>;
}
