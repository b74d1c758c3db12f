//! OperRouter API trait
//!
//! The transport-agnostic contract. [`crate::HttpClient`], [`crate::GrpcClient`]
//! and [`crate::FfiClient`] implement it with identical semantics.

use async_trait::async_trait;

use crate::error::OperRouterError;
use crate::models::{
    ChatMessage, ConfigResponse, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmChatResponse, LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse,
    MetadataResponse, PingResponse, Row,
};

/// OperRouter client contract, version 1.
///
/// Every call is one independent request/reply exchange; nothing is queued,
/// batched or retried. Arguments are checked locally first and rejected
/// with [`OperRouterError::InvalidArgument`] without touching the backend.
///
/// A reply with `success == false` is returned as `Ok`: the backend was
/// reached and said no. `Err` is reserved for transport failures and
/// local misuse.
#[async_trait]
pub trait OperRouterClientV1: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<PingResponse, OperRouterError>;

    /// Ask the backend to validate a configuration object.
    async fn validate_config(
        &self,
        config: &serde_json::Value,
    ) -> Result<ConfigResponse, OperRouterError>;

    /// Ask the backend to load a configuration file it can see.
    async fn load_config(&self, path: &str) -> Result<ConfigResponse, OperRouterError>;

    async fn get_metadata(&self) -> Result<MetadataResponse, OperRouterError>;

    // --- data sources ---

    /// Register a named data source.
    async fn create_datasource(
        &self,
        name: &str,
        config: &DataSourceConfig,
    ) -> Result<DataSourceResponse, OperRouterError>;

    /// Run a read query and return its rows.
    async fn query_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError>;

    /// Run a write statement.
    async fn execute_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceResponse, OperRouterError>;

    async fn insert_datasource(
        &self,
        name: &str,
        data: &Row,
    ) -> Result<DataSourceResponse, OperRouterError>;

    /// Health check; `success` carries the backend's `healthy` flag.
    async fn ping_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError>;

    async fn close_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError>;

    // --- LLM instances ---

    /// Register a named LLM instance.
    async fn create_llm(
        &self,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError>;

    async fn generate_llm(
        &self,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError>;

    /// Multi-turn chat. `messages` must not be empty.
    async fn chat_llm(
        &self,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmChatResponse, OperRouterError>;

    async fn embedding_llm(
        &self,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError>;

    /// Health check; `success` carries the backend's `healthy` flag.
    async fn ping_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError>;

    async fn close_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError>;

    /// Release the client's connection. Later calls fail with
    /// [`OperRouterError::ConnectionClosed`]. Realizations that hold no
    /// connection ignore it. Calling it twice is a no-op.
    fn close(&self) {}
}
