use async_trait::async_trait;
use operrouter_http::{HttpError, JsonClient};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::Instrument;

use super::envelope::{JsonRpcRequest, JsonRpcResponse};
use crate::api::OperRouterClientV1;
use crate::config::HttpTransportConfig;
use crate::error::{OperRouterError, TransportKind};
use crate::models::{
    ChatMessage, ConfigResponse, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmChatResponse, LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse,
    MetadataResponse, PingResponse, Row,
};
use crate::wire::{self, Decoded, Operation, Reply};

const USER_AGENT: &str = concat!("operrouter-sdk/", env!("CARGO_PKG_VERSION"));

/// OperRouter client speaking JSON-RPC 2.0 over HTTP.
///
/// Every operation is one `POST {base_url}/jsonrpc`. Request ids come from a
/// per-client counter starting at 1, and each reply must echo the id of the
/// request it answers.
pub struct HttpClient {
    http: JsonClient,
    endpoint: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client for `base_url` with the default 30 second timeout.
    ///
    /// # Errors
    /// Returns `OperRouterError::Configuration` if `base_url` is not an
    /// `http://` or `https://` URL.
    pub fn new(base_url: &str) -> Result<Self, OperRouterError> {
        Self::from_config(&HttpTransportConfig {
            base_url: base_url.to_owned(),
            ..HttpTransportConfig::default()
        })
    }

    /// # Errors
    /// Returns `OperRouterError::Configuration` if the base URL is invalid or
    /// the HTTP stack cannot be initialized.
    pub fn from_config(config: &HttpTransportConfig) -> Result<Self, OperRouterError> {
        let base = config.base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(OperRouterError::Configuration(format!(
                "HTTP base URL must start with http:// or https://, got `{}`",
                config.base_url
            )));
        }

        let http = JsonClient::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .plain_http(true)
            .build()
            .map_err(|e| OperRouterError::Configuration(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{base}/jsonrpc"),
            timeout: config.timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Full URL requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, op: Operation, params: Value) -> Result<Decoded, OperRouterError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let span = tracing::debug_span!(
            "operrouter_call",
            transport = "http",
            method = op.rpc_method(),
            id
        );

        async move {
            let request = JsonRpcRequest::new(op.rpc_method(), params, id);
            let response = self
                .http
                .post(&self.endpoint, &request)
                .await
                .and_then(operrouter_http::Reply::ensure_success)
                .map_err(map_http_error)?;

            let envelope: JsonRpcResponse = response.json().map_err(|e| {
                OperRouterError::malformed(TransportKind::Http, format!("invalid JSON-RPC reply: {e}"))
            })?;
            let result = envelope.into_result(id)?;
            let decoded = Reply::parse(TransportKind::Http, op, result)?;
            tracing::debug!(success = decoded.success(), "reply decoded");
            Ok(decoded)
        }
        .instrument(span)
        .await
    }
}

fn map_http_error(err: HttpError) -> OperRouterError {
    match err {
        HttpError::Timeout(after) => OperRouterError::Timeout {
            transport: TransportKind::Http,
            after,
        },
        HttpError::Url { .. } | HttpError::Scheme(_) => {
            OperRouterError::Configuration(err.to_string())
        }
        other => OperRouterError::transport(TransportKind::Http, other.to_string()),
    }
}

#[async_trait]
impl OperRouterClientV1 for HttpClient {
    async fn ping(&self) -> Result<PingResponse, OperRouterError> {
        Ok(self.call(Operation::Ping, json!({})).await?.into_ping())
    }

    async fn validate_config(&self, config: &Value) -> Result<ConfigResponse, OperRouterError> {
        let params = wire::validate_config_params(config)?;
        Ok(self.call(Operation::ValidateConfig, params).await?.into_config())
    }

    async fn load_config(&self, path: &str) -> Result<ConfigResponse, OperRouterError> {
        let params = wire::load_config_params(path)?;
        Ok(self.call(Operation::LoadConfig, params).await?.into_config())
    }

    async fn get_metadata(&self) -> Result<MetadataResponse, OperRouterError> {
        Ok(self
            .call(Operation::GetMetadata, json!({}))
            .await?
            .into_metadata())
    }

    async fn create_datasource(
        &self,
        name: &str,
        config: &DataSourceConfig,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::create_datasource_params(name, config)?;
        Ok(self
            .call(Operation::CreateDataSource, params)
            .await?
            .into_datasource())
    }

    async fn query_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError> {
        let params = wire::query_params(name, query)?;
        Ok(self.call(Operation::QueryDataSource, params).await?.into_query())
    }

    async fn execute_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::query_params(name, query)?;
        Ok(self
            .call(Operation::ExecuteDataSource, params)
            .await?
            .into_datasource())
    }

    async fn insert_datasource(
        &self,
        name: &str,
        data: &Row,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::insert_params(name, data)?;
        Ok(self
            .call(Operation::InsertDataSource, params)
            .await?
            .into_datasource())
    }

    async fn ping_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self
            .call(Operation::PingDataSource, params)
            .await?
            .into_datasource())
    }

    async fn close_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self
            .call(Operation::CloseDataSource, params)
            .await?
            .into_datasource())
    }

    async fn create_llm(
        &self,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError> {
        let params = wire::create_llm_params(name, config)?;
        Ok(self.call(Operation::CreateLlm, params).await?.into_llm())
    }

    async fn generate_llm(
        &self,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let params = wire::prompt_params(name, prompt)?;
        Ok(self.call(Operation::GenerateLlm, params).await?.into_generate())
    }

    async fn chat_llm(
        &self,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmChatResponse, OperRouterError> {
        let params = wire::chat_params(name, messages)?;
        Ok(self.call(Operation::ChatLlm, params).await?.into_chat())
    }

    async fn embedding_llm(
        &self,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError> {
        let params = wire::text_params(name, text)?;
        Ok(self
            .call(Operation::EmbeddingLlm, params)
            .await?
            .into_embedding())
    }

    async fn ping_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self.call(Operation::PingLlm, params).await?.into_llm())
    }

    async fn close_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self.call(Operation::CloseLlm, params).await?.into_llm())
    }
}
