//! Causerie is a transport-focused client for OpenAI-compatible chat
//! completion APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the wire-level payloads: conversation messages, chat
//!   options, structured-output schemas, and the request builder that turns
//!   them into a transport-level request.
//! - [`transport`] abstracts "submit a request, obtain a response" behind
//!   the [`transport::Transport`] trait, with a real HTTP implementation and
//!   a deterministic mock for tests.
//! - [`client`] ties the two together: [`client::ChatClient`] sends a single
//!   completion or streams completion chunks, decoding responses and
//!   accounting for token usage along the way.
//! - [`config`] loads provider settings (base URL, API key, default model)
//!   from the platform config directory with environment overrides.
//!
//! The same client code runs against the network or against
//! [`transport::mock::MockTransport`]; only the injected transport differs.

pub mod api;
pub mod client;
pub mod config;
pub mod transport;
