//! JSON request and reply shapes shared by the HTTP and FFI clients.
//!
//! Both realizations send the same parameter objects (the FFI client passes
//! them as C strings, the HTTP client wraps them in a JSON-RPC envelope) and
//! receive the same result objects.

use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;

use crate::error::{OperRouterError, TransportKind};
use crate::models::{
    ChatMessage, ConfigResponse, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmChatResponse, LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse, Metadata,
    MetadataResponse, PingResponse, Row,
};
use crate::validate;

/// The sixteen remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ping,
    ValidateConfig,
    LoadConfig,
    GetMetadata,
    CreateDataSource,
    QueryDataSource,
    ExecuteDataSource,
    InsertDataSource,
    PingDataSource,
    CloseDataSource,
    CreateLlm,
    GenerateLlm,
    ChatLlm,
    EmbeddingLlm,
    PingLlm,
    CloseLlm,
}

impl Operation {
    #[cfg(test)]
    pub(crate) const ALL: [Operation; 16] = [
        Operation::Ping,
        Operation::ValidateConfig,
        Operation::LoadConfig,
        Operation::GetMetadata,
        Operation::CreateDataSource,
        Operation::QueryDataSource,
        Operation::ExecuteDataSource,
        Operation::InsertDataSource,
        Operation::PingDataSource,
        Operation::CloseDataSource,
        Operation::CreateLlm,
        Operation::GenerateLlm,
        Operation::ChatLlm,
        Operation::EmbeddingLlm,
        Operation::PingLlm,
        Operation::CloseLlm,
    ];

    /// JSON-RPC method name.
    pub(crate) fn rpc_method(self) -> &'static str {
        match self {
            Operation::Ping => "ping",
            Operation::ValidateConfig => "validate_config",
            Operation::LoadConfig => "load_config",
            Operation::GetMetadata => "get_metadata",
            Operation::CreateDataSource => "datasource.create",
            Operation::QueryDataSource => "datasource.query",
            Operation::ExecuteDataSource => "datasource.execute",
            Operation::InsertDataSource => "datasource.insert",
            Operation::PingDataSource => "datasource.ping",
            Operation::CloseDataSource => "datasource.close",
            Operation::CreateLlm => "llm.create",
            Operation::GenerateLlm => "llm.generate",
            Operation::ChatLlm => "llm.chat",
            Operation::EmbeddingLlm => "llm.embedding",
            Operation::PingLlm => "llm.ping",
            Operation::CloseLlm => "llm.close",
        }
    }

    /// Exported native symbol.
    pub(crate) fn ffi_symbol(self) -> &'static str {
        match self {
            Operation::Ping => "operrouter_ping",
            Operation::ValidateConfig => "operrouter_validate_config",
            Operation::LoadConfig => "operrouter_load_config",
            Operation::GetMetadata => "operrouter_get_metadata",
            Operation::CreateDataSource => "operrouter_datasource_create",
            Operation::QueryDataSource => "operrouter_datasource_query",
            Operation::ExecuteDataSource => "operrouter_datasource_execute",
            Operation::InsertDataSource => "operrouter_datasource_insert",
            Operation::PingDataSource => "operrouter_datasource_ping",
            Operation::CloseDataSource => "operrouter_datasource_close",
            Operation::CreateLlm => "operrouter_llm_create",
            Operation::GenerateLlm => "operrouter_llm_generate",
            Operation::ChatLlm => "operrouter_llm_chat",
            Operation::EmbeddingLlm => "operrouter_llm_embedding",
            Operation::PingLlm => "operrouter_llm_ping",
            Operation::CloseLlm => "operrouter_llm_close",
        }
    }

    /// gRPC method name on the `OperRouter` service.
    pub(crate) fn grpc_method(self) -> &'static str {
        match self {
            Operation::Ping => "Ping",
            Operation::ValidateConfig => "ValidateConfig",
            Operation::LoadConfig => "LoadConfig",
            Operation::GetMetadata => "GetMetadata",
            Operation::CreateDataSource => "CreateDataSource",
            Operation::QueryDataSource => "QueryDataSource",
            Operation::ExecuteDataSource => "ExecuteDataSource",
            Operation::InsertDataSource => "InsertDataSource",
            Operation::PingDataSource => "PingDataSource",
            Operation::CloseDataSource => "CloseDataSource",
            Operation::CreateLlm => "CreateLLM",
            Operation::GenerateLlm => "GenerateLLM",
            Operation::ChatLlm => "ChatLLM",
            Operation::EmbeddingLlm => "EmbeddingLLM",
            Operation::PingLlm => "PingLLM",
            Operation::CloseLlm => "CloseLLM",
        }
    }

    fn is_health_check(self) -> bool {
        matches!(self, Operation::PingDataSource | Operation::PingLlm)
    }
}

// ---------- parameters ----------

pub fn validate_config_params(config: &Value) -> Result<Value, OperRouterError> {
    validate::config_object(config)?;
    Ok(json!({ "config": config }))
}

pub fn load_config_params(path: &str) -> Result<Value, OperRouterError> {
    validate::config_path(path)?;
    Ok(json!({ "path": path }))
}

pub fn create_datasource_params(
    name: &str,
    config: &DataSourceConfig,
) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    validate::datasource_config(config)?;
    Ok(json!({ "name": name, "config": config }))
}

pub fn query_params(name: &str, query: &str) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    Ok(json!({ "name": name, "query": query }))
}

pub fn insert_params(name: &str, data: &Row) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    Ok(json!({ "name": name, "data": data }))
}

pub fn name_params(name: &str) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    Ok(json!({ "name": name }))
}

pub fn create_llm_params(name: &str, config: &LlmConfig) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    validate::llm_config(config)?;
    Ok(json!({ "name": name, "config": config }))
}

pub fn prompt_params(name: &str, prompt: &str) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    Ok(json!({ "name": name, "prompt": prompt }))
}

pub fn chat_params(name: &str, messages: &[ChatMessage]) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    validate::messages(messages)?;
    Ok(json!({ "name": name, "messages": messages }))
}

pub fn text_params(name: &str, text: &str) -> Result<Value, OperRouterError> {
    validate::name(name)?;
    Ok(json!({ "name": name, "text": text }))
}

// ---------- results ----------

/// A decoded result object.
///
/// Backends report the outcome in `success`, or in `healthy` for health
/// checks, and the failure detail in `error` or `message`.
#[derive(Debug, Deserialize)]
pub struct Reply {
    success: Option<bool>,
    healthy: Option<bool>,
    error: Option<Value>,
    message: Option<String>,
    rows: Option<Vec<Row>>,
    columns: Option<Vec<String>>,
    text: Option<String>,
    embedding: Option<Vec<f32>>,
    metadata: Option<Metadata>,
}

pub struct Decoded {
    success: bool,
    message: String,
    reply: Reply,
}

impl Reply {
    /// Parse a result object received for `op`.
    pub(crate) fn parse(
        transport: TransportKind,
        op: Operation,
        result: Value,
    ) -> Result<Decoded, OperRouterError> {
        if !result.is_object() {
            return Err(OperRouterError::malformed(
                transport,
                format!("{} result is not a JSON object", op.rpc_method()),
            ));
        }
        let reply: Reply = serde_json::from_value(result).map_err(|e| {
            OperRouterError::malformed(transport, format!("{} result: {e}", op.rpc_method()))
        })?;

        let flag = if op.is_health_check() {
            reply.healthy.or(reply.success)
        } else {
            reply.success.or(reply.healthy)
        };
        let success = match flag {
            Some(flag) => flag,
            // Some backends answer get_metadata with the metadata object only.
            None if op == Operation::GetMetadata && reply.metadata.is_some() => true,
            None => {
                return Err(OperRouterError::malformed(
                    transport,
                    format!("{} result carries neither `success` nor `healthy`", op.rpc_method()),
                ));
            }
        };

        if success && op == Operation::GetMetadata && reply.metadata.is_none() {
            return Err(OperRouterError::malformed(
                transport,
                "successful get_metadata result without `metadata`",
            ));
        }

        let message = match &reply.error {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Null | Value::String(_)) | None => reply.message.clone().unwrap_or_default(),
            Some(other) => other.to_string(),
        };

        Ok(Decoded {
            success,
            message,
            reply,
        })
    }
}

impl Decoded {
    pub(crate) fn success(&self) -> bool {
        self.success
    }

    pub(crate) fn into_ping(self) -> PingResponse {
        PingResponse {
            success: self.success,
            message: self.message,
        }
    }

    pub(crate) fn into_config(self) -> ConfigResponse {
        ConfigResponse {
            success: self.success,
            message: self.message,
        }
    }

    pub(crate) fn into_metadata(self) -> MetadataResponse {
        MetadataResponse {
            success: self.success,
            message: self.message,
            metadata: self.reply.metadata,
        }
    }

    pub(crate) fn into_datasource(self) -> DataSourceResponse {
        DataSourceResponse {
            success: self.success,
            message: self.message,
        }
    }

    pub(crate) fn into_query(self) -> DataSourceQueryResponse {
        let rows = self.reply.rows.unwrap_or_default();
        let columns = self
            .reply
            .columns
            .unwrap_or_else(|| columns_from_rows(&rows));
        DataSourceQueryResponse {
            success: self.success,
            message: self.message,
            columns,
            rows,
        }
    }

    pub(crate) fn into_llm(self) -> LlmResponse {
        LlmResponse {
            success: self.success,
            message: self.message,
        }
    }

    pub(crate) fn into_generate(self) -> LlmGenerateResponse {
        LlmGenerateResponse {
            success: self.success,
            message: self.message,
            text: self.reply.text.unwrap_or_default(),
        }
    }

    pub(crate) fn into_chat(self) -> LlmChatResponse {
        LlmChatResponse {
            success: self.success,
            message: self.message,
            text: self.reply.text.unwrap_or_default(),
        }
    }

    pub(crate) fn into_embedding(self) -> LlmEmbeddingResponse {
        LlmEmbeddingResponse {
            success: self.success,
            message: self.message,
            embedding: self.reply.embedding.unwrap_or_default(),
        }
    }
}

/// Sorted union of the keys of every row.
pub fn columns_from_rows(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

/// Unwrap a JSON value that must be an object, for callers holding a map.
#[cfg(test)]
pub fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
