//! Deterministic transport for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use tracing::debug;

use super::{ByteStream, StreamingResponse, Transport, TransportError, TransportResponse};
use crate::api::ApiRequest;

#[derive(Debug, Default, Clone)]
struct MockState {
    data: Option<Vec<u8>>,
    stream_data: Option<Vec<String>>,
    error: Option<TransportError>,
    status_code: Option<u16>,
}

/// Transport driven entirely by preconfigured state.
///
/// Construct one per test and inject it into the client. Configuration is
/// read once per request, in precedence order: a configured error fails the
/// request immediately; configured stream lines are delivered one byte-chunk
/// per line with a `text/event-stream` content type; configured data is
/// returned as a single unit. With nothing configured, a request completes
/// with an empty body and no error. Call [`MockTransport::reset`] between
/// test cases so state never leaks across them.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body returned as one unit by the next requests.
    pub fn set_data(&self, data: impl Into<Vec<u8>>) {
        self.lock().data = Some(data.into());
    }

    /// Lines delivered as separate byte-chunks, in order.
    pub fn set_stream_data(&self, lines: Vec<String>) {
        self.lock().stream_data = Some(lines);
    }

    /// Error replayed to every request until reset.
    pub fn set_error(&self, error: TransportError) {
        self.lock().error = Some(error);
    }

    /// Response status; defaults to 200 when unset.
    pub fn set_status_code(&self, status: u16) {
        self.lock().status_code = Some(status);
    }

    /// Clears all configured behavior.
    pub fn reset(&self) {
        *self.lock() = MockState::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn snapshot(&self) -> MockState {
        self.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, _request: ApiRequest) -> Result<TransportResponse, TransportError> {
        let state = self.snapshot();
        if let Some(error) = state.error {
            debug!("mock replaying configured error");
            return Err(error);
        }
        let status = state.status_code.unwrap_or(200);
        if let Some(lines) = state.stream_data {
            return Ok(TransportResponse {
                status,
                body: lines.concat().into_bytes(),
            });
        }
        if let Some(data) = state.data {
            return Ok(TransportResponse { status, body: data });
        }
        // Nothing configured: complete with no data and no error.
        Ok(TransportResponse {
            status,
            body: Vec::new(),
        })
    }

    async fn open_stream(
        &self,
        _request: ApiRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let state = self.snapshot();
        if let Some(error) = state.error {
            debug!("mock replaying configured error");
            return Err(error);
        }
        let status = state.status_code.unwrap_or(200);
        if let Some(lines) = state.stream_data {
            let chunks: Vec<Result<Vec<u8>, TransportError>> =
                lines.into_iter().map(|line| Ok(line.into_bytes())).collect();
            return Ok(StreamingResponse {
                status,
                content_type: Some("text/event-stream".to_string()),
                body: Box::pin(stream::iter(chunks)),
            });
        }
        if let Some(data) = state.data {
            let chunks: Vec<Result<Vec<u8>, TransportError>> = vec![Ok(data)];
            return Ok(StreamingResponse {
                status,
                content_type: None,
                body: Box::pin(stream::iter(chunks)),
            });
        }
        let empty: ByteStream = Box::pin(stream::empty());
        Ok(StreamingResponse {
            status,
            content_type: None,
            body: empty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn request() -> ApiRequest {
        ApiRequest {
            method: "POST",
            url: "https://api.test.invalid/v1/chat/completions".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[tokio::test]
    async fn error_takes_precedence_over_data() {
        let mock = MockTransport::new();
        mock.set_data(b"{}".to_vec());
        mock.set_error(TransportError::Connect {
            detail: "connection refused".to_string(),
        });

        let err = mock.execute(request()).await.expect_err("configured error");
        assert_eq!(
            err,
            TransportError::Connect {
                detail: "connection refused".to_string()
            }
        );
        let err = mock
            .open_stream(request())
            .await
            .expect_err("configured error");
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[tokio::test]
    async fn stream_data_delivers_one_chunk_per_line() {
        let mock = MockTransport::new();
        mock.set_stream_data(vec![
            "data: {\"choices\":[]}\n\n".to_string(),
            "data: [DONE]\n\n".to_string(),
        ]);

        let response = mock.open_stream(request()).await.expect("stream");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("text/event-stream"));

        let chunks: Vec<Vec<u8>> = response
            .body
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], b"data: {\"choices\":[]}\n\n");
    }

    #[tokio::test]
    async fn status_code_defaults_to_200_and_is_overridable() {
        let mock = MockTransport::new();
        mock.set_data(b"{\"error\":{\"message\":\"nope\"}}".to_vec());

        let response = mock.execute(request()).await.expect("response");
        assert_eq!(response.status, 200);

        mock.set_status_code(404);
        let response = mock.execute(request()).await.expect("response");
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn unconfigured_requests_complete_empty() {
        let mock = MockTransport::new();

        let response = mock.execute(request()).await.expect("response");
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());

        let response = mock.open_stream(request()).await.expect("stream");
        let chunks: Vec<_> = response.body.collect().await;
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn reset_clears_every_field() {
        let mock = MockTransport::new();
        mock.set_data(b"{}".to_vec());
        mock.set_stream_data(vec!["data: [DONE]\n\n".to_string()]);
        mock.set_status_code(500);
        mock.reset();

        let response = mock.execute(request()).await.expect("response");
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }
}
