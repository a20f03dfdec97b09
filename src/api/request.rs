//! Builds transport-level requests for the chat completions endpoint.

use std::error::Error as StdError;
use std::fmt;

use super::options::{ChatOptions, ResponseFormatKind, SchemaError};
use super::{ChatMessage, ChatRequest, StreamOptions};

/// Accepted temperature range for chat completion requests.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// A transport-level request: method, URL, headers, serialized JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

/// Errors raised while constructing a request.
#[derive(Debug)]
pub enum RequestError {
    /// The structured-output schema failed validation.
    Schema(SchemaError),

    /// Temperature outside the accepted range.
    Temperature { value: f32 },

    /// The request body could not be encoded as JSON.
    Encode { source: serde_json::Error },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Schema(source) => {
                write!(f, "Invalid response schema: {source}")
            }
            RequestError::Temperature { value } => {
                write!(f, "Temperature {value} is outside 0.0..=2.0")
            }
            RequestError::Encode { source } => {
                write!(f, "Failed to encode request body: {source}")
            }
        }
    }
}

impl StdError for RequestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RequestError::Schema(source) => Some(source),
            RequestError::Temperature { .. } => None,
            RequestError::Encode { source } => Some(source),
        }
    }
}

impl From<SchemaError> for RequestError {
    fn from(source: SchemaError) -> Self {
        RequestError::Schema(source)
    }
}

/// Assembles chat completion requests from model, messages, and options.
///
/// Construction is pure: nothing is sent, and invalid inputs fail here
/// rather than at the server.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoint: String,
    api_key: Option<String>,
}

impl RequestBuilder {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Builds a POST request for one completion, streamed or not.
    ///
    /// Streaming requests also ask the server to report usage on a terminal
    /// chunk via `stream_options.include_usage`.
    pub fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
        stream: bool,
    ) -> Result<ApiRequest, RequestError> {
        validate_options(options)?;

        let body = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
            response_format: options.response_format.clone(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_completion_tokens: options.max_completion_tokens,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            stop: options.stop.clone(),
            seed: options.seed,
            user: options.user.clone(),
        };
        let body = serde_json::to_vec(&body).map_err(|source| RequestError::Encode { source })?;

        let mut headers = vec![("content-type", "application/json".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("authorization", format!("Bearer {key}")));
        }

        Ok(ApiRequest {
            method: "POST",
            url: self.endpoint.clone(),
            headers,
            body,
        })
    }
}

fn validate_options(options: &ChatOptions) -> Result<(), RequestError> {
    if let Some(value) = options.temperature {
        if !TEMPERATURE_RANGE.contains(&value) {
            return Err(RequestError::Temperature { value });
        }
    }

    if let Some(format) = &options.response_format {
        if format.kind == ResponseFormatKind::JsonSchema {
            match &format.json_schema {
                Some(schema) => schema.node.validate()?,
                None => return Err(SchemaError::MissingSchema.into()),
            }
        }
    }

    Ok(())
}
