//! Network transport over reqwest.

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use super::{StreamingResponse, Transport, TransportError, TransportResponse};
use crate::api::ApiRequest;

/// Joins a base URL and an endpoint path without doubling slashes.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Transport that performs the real HTTP exchange.
///
/// Non-2xx statuses pass through with their bodies; only network-level
/// failures become [`TransportError`].
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing client, keeping its timeouts and TLS settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn prepare(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            TransportError::Request {
                detail: format!("invalid method {:?}", request.method),
            }
        })?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        Ok(builder.body(request.body.clone()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<TransportResponse, TransportError> {
        debug!(url = %request.url, "dispatching chat completion request");
        let response = self.prepare(&request)?.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "response received");
        Ok(TransportResponse { status, body })
    }

    async fn open_stream(
        &self,
        request: ApiRequest,
    ) -> Result<StreamingResponse, TransportError> {
        debug!(url = %request.url, "opening chat completion stream");
        let response = self.prepare(&request)?.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TransportError::from));
        Ok(StreamingResponse {
            status,
            content_type,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.test.invalid/v1", "chat/completions"),
            "https://api.test.invalid/v1/chat/completions"
        );
        assert_eq!(
            join_url("https://api.test.invalid/v1/", "/chat/completions"),
            "https://api.test.invalid/v1/chat/completions"
        );
        assert_eq!(
            join_url("https://api.test.invalid/v1///", "chat/completions"),
            "https://api.test.invalid/v1/chat/completions"
        );
    }

    #[test]
    fn prepare_rejects_unknown_methods() {
        let transport = HttpTransport::new();
        let request = ApiRequest {
            method: "NOT A METHOD",
            url: "https://api.test.invalid/v1/chat/completions".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert!(matches!(
            transport.prepare(&request),
            Err(TransportError::Request { .. })
        ));
    }
}
