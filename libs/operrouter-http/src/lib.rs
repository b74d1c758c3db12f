#![deny(rust_2018_idioms)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Minimal HTTP client for posting JSON to an OperRouter server.
//!
//! Built on hyper with rustls. Each [`JsonClient::post`] is a single attempt
//! bounded by one timeout that covers connect, send and body read. Nothing
//! is retried.
//!
//! ```ignore
//! use operrouter_http::JsonClient;
//!
//! let client = JsonClient::builder().plain_http(true).build()?;
//! let reply = client.post("http://localhost:8080/jsonrpc", &payload).await?;
//! let value: serde_json::Value = reply.ensure_success()?.json()?;
//! ```

mod client;
mod error;
mod policy;

pub use client::{DEFAULT_USER_AGENT, JsonClient, JsonClientBuilder, Reply};
pub use error::HttpError;
pub use policy::RootStore;
