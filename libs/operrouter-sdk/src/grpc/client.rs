use async_trait::async_trait;
use operrouter_transport_grpc::{ChannelSettings, StatusClass, classify, open_channel};
use parking_lot::RwLock;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tonic::transport::Channel;
use tonic::{Code, Status};
use tracing::Instrument;

use super::convert;
use crate::api::OperRouterClientV1;
use crate::codes;
use crate::config::GrpcTransportConfig;
use crate::error::{OperRouterError, TransportKind};
use crate::models::{
    ChatMessage, ConfigResponse, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmChatResponse, LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse,
    MetadataResponse, PingResponse, Row,
};
use crate::proto;
use crate::proto::oper_router_client::OperRouterClient;
use crate::validate;
use crate::wire::{self, Operation};

type ServiceClient = OperRouterClient<Channel>;

/// OperRouter client over gRPC.
///
/// Owns one HTTP/2 channel. [`GrpcClient::close`] releases it; after that
/// every operation fails with [`OperRouterError::ConnectionClosed`] without
/// touching the network.
pub struct GrpcClient {
    inner: RwLock<Option<ServiceClient>>,
    rpc_timeout: Duration,
}

impl std::fmt::Debug for GrpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcClient")
            .field("closed", &self.is_closed())
            .field("rpc_timeout", &self.rpc_timeout)
            .finish_non_exhaustive()
    }
}

impl GrpcClient {
    /// Connect to `address` with default timeouts.
    ///
    /// # Errors
    /// Returns a transport error if the connection cannot be established.
    pub async fn connect(address: &str) -> Result<Self, OperRouterError> {
        Self::from_config(&GrpcTransportConfig {
            address: address.to_owned(),
            ..GrpcTransportConfig::default()
        })
        .await
    }

    /// # Errors
    /// Returns `OperRouterError::Configuration` if the enumeration code tables
    /// are inconsistent, or a transport error if every connection attempt
    /// fails.
    pub async fn from_config(config: &GrpcTransportConfig) -> Result<Self, OperRouterError> {
        codes::check_tables()?;

        let settings = ChannelSettings::default()
            .with_timeouts(config.connect_timeout, config.rpc_timeout)
            .with_connect_retries(config.connect_retries);

        let channel = open_channel(&config.uri(), &settings)
            .await
            .map_err(|e| OperRouterError::transport(TransportKind::Grpc, format!("{e:#}")))?;

        Ok(Self {
            inner: RwLock::new(Some(OperRouterClient::new(channel))),
            rpc_timeout: config.rpc_timeout,
        })
    }

    /// Wrap an existing channel.
    ///
    /// `rpc_timeout` is only reported in [`OperRouterError::Timeout`]; the
    /// deadline itself belongs to the channel.
    ///
    /// # Errors
    /// Returns `OperRouterError::Configuration` if the enumeration code tables
    /// are inconsistent.
    pub fn from_channel(channel: Channel, rpc_timeout: Duration) -> Result<Self, OperRouterError> {
        codes::check_tables()?;
        Ok(Self {
            inner: RwLock::new(Some(OperRouterClient::new(channel))),
            rpc_timeout,
        })
    }

    /// Release the channel. Calling it again is a no-op.
    pub fn close(&self) {
        if self.inner.write().take().is_some() {
            tracing::info!(transport = "grpc", "channel closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.read().is_none()
    }

    fn service(&self) -> Result<ServiceClient, OperRouterError> {
        self.inner
            .read()
            .clone()
            .ok_or(OperRouterError::ConnectionClosed)
    }

    async fn call<Req, Resp, F, Fut>(
        &self,
        op: Operation,
        request: Req,
        rpc: F,
    ) -> Result<Resp, OperRouterError>
    where
        F: FnOnce(ServiceClient, tonic::Request<Req>) -> Fut,
        Fut: Future<Output = Result<tonic::Response<Resp>, Status>>,
    {
        let service = self.service()?;
        let span = tracing::debug_span!(
            "operrouter_call",
            transport = "grpc",
            method = op.grpc_method()
        );

        async move {
            let response = rpc(service, tonic::Request::new(request))
                .await
                .map_err(|status| self.map_status(&status))?;
            tracing::debug!("reply received");
            Ok(response.into_inner())
        }
        .instrument(span)
        .await
    }

    fn map_status(&self, status: &Status) -> OperRouterError {
        tracing::debug!(code = ?status.code(), message = status.message(), "call failed");
        match (classify(status), status.code()) {
            (StatusClass::Transport, Code::DeadlineExceeded) => OperRouterError::Timeout {
                transport: TransportKind::Grpc,
                after: self.rpc_timeout,
            },
            (StatusClass::Transport, code) => OperRouterError::transport(
                TransportKind::Grpc,
                format!("{}: {}", code.description(), status.message()),
            ),
            (StatusClass::Rpc, code) => OperRouterError::Rpc {
                transport: TransportKind::Grpc,
                code: i64::from(i32::from(code)),
                message: status.message().to_owned(),
            },
        }
    }
}

#[async_trait]
impl OperRouterClientV1 for GrpcClient {
    fn close(&self) {
        Self::close(self);
    }

    async fn ping(&self) -> Result<PingResponse, OperRouterError> {
        let reply = self
            .call(Operation::Ping, proto::PingRequest {}, |mut c, r| async move {
                c.ping(r).await
            })
            .await?;
        Ok(PingResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn validate_config(&self, config: &Value) -> Result<ConfigResponse, OperRouterError> {
        validate::config_object(config)?;
        let request = proto::ValidateConfigRequest {
            config: config.to_string(),
        };
        let reply = self
            .call(Operation::ValidateConfig, request, |mut c, r| async move {
                c.validate_config(r).await
            })
            .await?;
        Ok(ConfigResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn load_config(&self, path: &str) -> Result<ConfigResponse, OperRouterError> {
        validate::config_path(path)?;
        let request = proto::LoadConfigRequest {
            path: path.to_owned(),
        };
        let reply = self
            .call(Operation::LoadConfig, request, |mut c, r| async move {
                c.load_config(r).await
            })
            .await?;
        Ok(ConfigResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn get_metadata(&self) -> Result<MetadataResponse, OperRouterError> {
        let reply = self
            .call(
                Operation::GetMetadata,
                proto::GetMetadataRequest {},
                |mut c, r| async move { c.get_metadata(r).await },
            )
            .await?;
        if reply.success && reply.metadata.is_none() {
            return Err(OperRouterError::malformed(
                TransportKind::Grpc,
                "successful GetMetadata reply without metadata",
            ));
        }
        Ok(MetadataResponse {
            success: reply.success,
            message: reply.error,
            metadata: reply.metadata.map(convert::metadata_from_proto),
        })
    }

    async fn create_datasource(
        &self,
        name: &str,
        config: &DataSourceConfig,
    ) -> Result<DataSourceResponse, OperRouterError> {
        validate::name(name)?;
        validate::datasource_config(config)?;
        let request = proto::CreateDataSourceRequest {
            name: name.to_owned(),
            config: Some(convert::datasource_config_to_proto(config)?),
        };
        let reply = self
            .call(Operation::CreateDataSource, request, |mut c, r| async move {
                c.create_data_source(r).await
            })
            .await?;
        Ok(DataSourceResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn query_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::QueryDataSourceRequest {
            name: name.to_owned(),
            query: query.to_owned(),
        };
        let reply = self
            .call(Operation::QueryDataSource, request, |mut c, r| async move {
                c.query_data_source(r).await
            })
            .await?;

        let rows: Vec<Row> = reply.rows.into_iter().map(convert::row_from_proto).collect();
        let columns = if reply.columns.is_empty() {
            wire::columns_from_rows(&rows)
        } else {
            reply.columns
        };
        Ok(DataSourceQueryResponse {
            success: reply.success,
            message: reply.error,
            columns,
            rows,
        })
    }

    async fn execute_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::ExecuteDataSourceRequest {
            name: name.to_owned(),
            query: query.to_owned(),
        };
        let reply = self
            .call(Operation::ExecuteDataSource, request, |mut c, r| async move {
                c.execute_data_source(r).await
            })
            .await?;
        Ok(DataSourceResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn insert_datasource(
        &self,
        name: &str,
        data: &Row,
    ) -> Result<DataSourceResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::InsertDataSourceRequest {
            name: name.to_owned(),
            data: Some(convert::row_to_proto(data)),
        };
        let reply = self
            .call(Operation::InsertDataSource, request, |mut c, r| async move {
                c.insert_data_source(r).await
            })
            .await?;
        Ok(DataSourceResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn ping_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::PingDataSourceRequest {
            name: name.to_owned(),
        };
        let reply = self
            .call(Operation::PingDataSource, request, |mut c, r| async move {
                c.ping_data_source(r).await
            })
            .await?;
        Ok(DataSourceResponse {
            success: reply.healthy,
            message: reply.error,
        })
    }

    async fn close_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::CloseDataSourceRequest {
            name: name.to_owned(),
        };
        let reply = self
            .call(Operation::CloseDataSource, request, |mut c, r| async move {
                c.close_data_source(r).await
            })
            .await?;
        Ok(DataSourceResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn create_llm(
        &self,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError> {
        validate::name(name)?;
        validate::llm_config(config)?;
        let request = proto::CreateLlmRequest {
            name: name.to_owned(),
            config: Some(convert::llm_config_to_proto(config)?),
        };
        let reply = self
            .call(Operation::CreateLlm, request, |mut c, r| async move {
                c.create_llm(r).await
            })
            .await?;
        Ok(LlmResponse {
            success: reply.success,
            message: reply.error,
        })
    }

    async fn generate_llm(
        &self,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::GenerateLlmRequest {
            name: name.to_owned(),
            prompt: prompt.to_owned(),
        };
        let reply = self
            .call(Operation::GenerateLlm, request, |mut c, r| async move {
                c.generate_llm(r).await
            })
            .await?;
        Ok(LlmGenerateResponse {
            success: reply.success,
            message: reply.error,
            text: reply.text,
        })
    }

    async fn chat_llm(
        &self,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmChatResponse, OperRouterError> {
        validate::name(name)?;
        validate::messages(messages)?;
        let request = proto::ChatLlmRequest {
            name: name.to_owned(),
            messages: messages
                .iter()
                .map(convert::message_to_proto)
                .collect::<Result<_, _>>()?,
        };
        let reply = self
            .call(Operation::ChatLlm, request, |mut c, r| async move {
                c.chat_llm(r).await
            })
            .await?;
        Ok(LlmChatResponse {
            success: reply.success,
            message: reply.error,
            text: reply.text,
        })
    }

    async fn embedding_llm(
        &self,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::EmbeddingLlmRequest {
            name: name.to_owned(),
            text: text.to_owned(),
        };
        let reply = self
            .call(Operation::EmbeddingLlm, request, |mut c, r| async move {
                c.embedding_llm(r).await
            })
            .await?;
        Ok(LlmEmbeddingResponse {
            success: reply.success,
            message: reply.error,
            embedding: reply.embedding,
        })
    }

    async fn ping_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::PingLlmRequest {
            name: name.to_owned(),
        };
        let reply = self
            .call(Operation::PingLlm, request, |mut c, r| async move {
                c.ping_llm(r).await
            })
            .await?;
        Ok(LlmResponse {
            success: reply.healthy,
            message: reply.error,
        })
    }

    async fn close_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError> {
        validate::name(name)?;
        let request = proto::CloseLlmRequest {
            name: name.to_owned(),
        };
        let reply = self
            .call(Operation::CloseLlm, request, |mut c, r| async move {
                c.close_llm(r).await
            })
            .await?;
        Ok(LlmResponse {
            success: reply.success,
            message: reply.error,
        })
    }
}
