//! OperRouter SDK
//!
//! Client side of the OperRouter operation router: one contract,
//! [`OperRouterClientV1`], with sixteen operations over configuration,
//! data sources and LLMs, realized three ways:
//! - [`HttpClient`]: JSON-RPC 2.0 over HTTP
//! - [`GrpcClient`]: Protobuf over gRPC
//! - [`FfiClient`]: JSON strings through the native core library
//!
//! ## Usage
//!
//! ```ignore
//! use operrouter_sdk::{ClientConfig, DataSourceConfig, Driver, connect};
//!
//! let client = connect(&ClientConfig::default()).await?;
//! let pg = DataSourceConfig::new(Driver::Postgres, "localhost", 5432, "test")
//!     .with_credentials("user", "pass");
//! client.create_datasource("main", &pg).await?;
//! let result = client.query_datasource("main", "SELECT * FROM users").await?;
//! println!("{} rows", result.rows.len());
//! ```
//!
//! Backend-reported failures come back as `success == false` with a message.
//! `Err(OperRouterError)` is reserved for transport failures and misuse.

#![deny(rust_2018_idioms)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod codes;
pub mod config;
pub mod error;
pub mod ffi;
pub mod grpc;
pub mod http;
pub mod models;

mod validate;
mod wire;
mod wiring;

/// Generated protobuf types for the `operrouter` package.
#[allow(clippy::all, clippy::pedantic)]
pub mod proto {
    tonic::include_proto!("operrouter");
}

pub use api::OperRouterClientV1;
pub use config::{ClientConfig, FfiTransportConfig, GrpcTransportConfig, HttpTransportConfig};
pub use error::{ErrorKind, OperRouterError, TransportKind};
pub use ffi::{FfiClient, NativeApi};
pub use grpc::GrpcClient;
pub use http::HttpClient;
pub use models::{
    ChatMessage, ConfigResponse, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    Driver, LlmChatResponse, LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmProvider,
    LlmResponse, MessageRole, Metadata, MetadataResponse, PingResponse, Row,
};
pub use proto::oper_router_client::OperRouterClient;
pub use proto::oper_router_server::{OperRouter, OperRouterServer};
pub use wiring::connect;

/// Fully qualified gRPC service name.
pub const SERVICE_NAME: &str =
    <OperRouterServer<()> as tonic::server::NamedService>::NAME;
