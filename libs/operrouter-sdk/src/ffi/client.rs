use async_trait::async_trait;
use libloading::Library;
use serde_json::Value;
use std::ffi::{CStr, CString, c_char};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

use super::library;
use super::symbols::NativeApi;
use crate::api::OperRouterClientV1;
use crate::config::FfiTransportConfig;
use crate::error::{OperRouterError, TransportKind};
use crate::models::{
    ChatMessage, ConfigResponse, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmChatResponse, LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse,
    MetadataResponse, PingResponse, Row,
};
use crate::validate;
use crate::wire::{self, Decoded, Operation, Reply};

/// OperRouter client calling a native library in-process.
///
/// Arguments and replies are NUL-terminated strings. Replies are always
/// JSON; arguments are JSON except for `operrouter_load_config`, which takes
/// the bare path. Each call runs on the blocking thread pool.
pub struct FfiClient {
    api: NativeApi,
    path: Option<PathBuf>,
    // Keeps the symbols in `api` valid.
    library: Option<Arc<Library>>,
}

impl std::fmt::Debug for FfiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfiClient")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FfiClient {
    /// Load the library from `path`, or discover it when `None`.
    ///
    /// # Errors
    /// Returns `OperRouterError::LibraryNotFound` if no candidate loads, or
    /// `OperRouterError::SymbolNotFound` if a required export is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, OperRouterError> {
        Self::from_config(&FfiTransportConfig {
            library_path: path.map(Path::to_path_buf),
            ..FfiTransportConfig::default()
        })
    }

    /// # Errors
    /// Same as [`FfiClient::load`].
    pub fn from_config(config: &FfiTransportConfig) -> Result<Self, OperRouterError> {
        let env_path = std::env::var_os(library::LIBRARY_PATH_ENV);
        let candidates = library::candidates(
            config.library_path.as_deref(),
            env_path.as_deref(),
            &config.search_dirs,
        );
        let (path, lib) = library::load_first(&candidates)?;

        // SAFETY: the OperRouter core library exports these symbols with the
        // documented signatures, and `lib` is stored next to them.
        let api = unsafe { NativeApi::resolve(&lib)? };

        Ok(Self {
            api,
            path: Some(path),
            library: Some(lib),
        })
    }

    /// Wrap already-resolved entry points.
    ///
    /// # Safety
    /// Every function in `api` must follow the documented ABI and stay
    /// callable for the lifetime of the client, from any thread.
    #[must_use]
    pub unsafe fn from_api(api: NativeApi) -> Self {
        Self {
            api,
            path: None,
            library: None,
        }
    }

    /// Path the library was loaded from.
    #[must_use]
    pub fn library_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Library version, when the library exports `operrouter_version`.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        let version = self.api.version?;
        // SAFETY: the string has static storage in the library and is
        // never released.
        unsafe {
            let ptr = version();
            if ptr.is_null() {
                return None;
            }
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }

    async fn call(&self, op: Operation, params: &Value) -> Result<Decoded, OperRouterError> {
        self.call_raw(op, Some(params.to_string())).await
    }

    /// Call `op` with `arg` passed through as is.
    async fn call_raw(
        &self,
        op: Operation,
        arg: Option<String>,
    ) -> Result<Decoded, OperRouterError> {
        let span = tracing::debug_span!(
            "operrouter_call",
            transport = "ffi",
            method = op.ffi_symbol()
        );

        async move {
            let arg = arg
                .map(CString::new)
                .transpose()
                .map_err(|e| OperRouterError::invalid(format!("argument contains NUL: {e}")))?;

            let api = self.api;
            let library = self.library.clone();
            let raw = tokio::task::spawn_blocking(move || {
                let raw = invoke(&api, op, arg.as_deref());
                drop(library);
                raw
            })
            .await
            .map_err(|e| {
                OperRouterError::transport(TransportKind::Ffi, format!("native call aborted: {e}"))
            })??;

            let text = String::from_utf8(raw).map_err(|e| {
                OperRouterError::malformed(TransportKind::Ffi, format!("reply is not UTF-8: {e}"))
            })?;
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                OperRouterError::malformed(TransportKind::Ffi, format!("reply is not JSON: {e}"))
            })?;
            let decoded = Reply::parse(TransportKind::Ffi, op, value)?;
            tracing::debug!(success = decoded.success(), "reply decoded");
            Ok(decoded)
        }
        .instrument(span)
        .await
    }
}

/// Call the entry point for `op`, copy the reply out and release it.
fn invoke(api: &NativeApi, op: Operation, arg: Option<&CStr>) -> Result<Vec<u8>, OperRouterError> {
    // SAFETY: the entry points follow the documented ABI (see the
    // constructors); `arg` outlives the call.
    let reply: *mut c_char = unsafe {
        match (api.json_fn(op), arg) {
            (Some(f), Some(arg)) => f(arg.as_ptr()),
            (None, _) => (api.ping)(),
            (Some(_), None) => {
                return Err(OperRouterError::invalid(format!(
                    "{} requires an argument",
                    op.ffi_symbol()
                )));
            }
        }
    };

    if reply.is_null() {
        return Err(OperRouterError::transport(
            TransportKind::Ffi,
            format!("{} returned a null reply", op.ffi_symbol()),
        ));
    }

    // SAFETY: non-null replies are NUL-terminated strings owned by the
    // library until handed back to `free_string`, which happens exactly once
    // here after the bytes are copied.
    let bytes = unsafe {
        let bytes = CStr::from_ptr(reply).to_bytes().to_vec();
        (api.free_string)(reply);
        bytes
    };
    Ok(bytes)
}

#[async_trait]
impl OperRouterClientV1 for FfiClient {
    async fn ping(&self) -> Result<PingResponse, OperRouterError> {
        Ok(self.call_raw(Operation::Ping, None).await?.into_ping())
    }

    async fn validate_config(&self, config: &Value) -> Result<ConfigResponse, OperRouterError> {
        validate::config_object(config)?;
        Ok(self
            .call_raw(Operation::ValidateConfig, Some(config.to_string()))
            .await?
            .into_config())
    }

    async fn load_config(&self, path: &str) -> Result<ConfigResponse, OperRouterError> {
        validate::config_path(path)?;
        Ok(self
            .call_raw(Operation::LoadConfig, Some(path.to_owned()))
            .await?
            .into_config())
    }

    async fn get_metadata(&self) -> Result<MetadataResponse, OperRouterError> {
        Ok(self
            .call(Operation::GetMetadata, &Value::Object(serde_json::Map::new()))
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
            .call(Operation::CreateDataSource, &params)
            .await?
            .into_datasource())
    }

    async fn query_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError> {
        let params = wire::query_params(name, query)?;
        Ok(self
            .call(Operation::QueryDataSource, &params)
            .await?
            .into_query())
    }

    async fn execute_datasource(
        &self,
        name: &str,
        query: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::query_params(name, query)?;
        Ok(self
            .call(Operation::ExecuteDataSource, &params)
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
            .call(Operation::InsertDataSource, &params)
            .await?
            .into_datasource())
    }

    async fn ping_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self
            .call(Operation::PingDataSource, &params)
            .await?
            .into_datasource())
    }

    async fn close_datasource(&self, name: &str) -> Result<DataSourceResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self
            .call(Operation::CloseDataSource, &params)
            .await?
            .into_datasource())
    }

    async fn create_llm(
        &self,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError> {
        let params = wire::create_llm_params(name, config)?;
        Ok(self
            .call(Operation::CreateLlm, &params)
            .await?
            .into_llm())
    }

    async fn generate_llm(
        &self,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let params = wire::prompt_params(name, prompt)?;
        Ok(self
            .call(Operation::GenerateLlm, &params)
            .await?
            .into_generate())
    }

    async fn chat_llm(
        &self,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmChatResponse, OperRouterError> {
        let params = wire::chat_params(name, messages)?;
        Ok(self
            .call(Operation::ChatLlm, &params)
            .await?
            .into_chat())
    }

    async fn embedding_llm(
        &self,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError> {
        let params = wire::text_params(name, text)?;
        Ok(self
            .call(Operation::EmbeddingLlm, &params)
            .await?
            .into_embedding())
    }

    async fn ping_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self
            .call(Operation::PingLlm, &params)
            .await?
            .into_llm())
    }

    async fn close_llm(&self, name: &str) -> Result<LlmResponse, OperRouterError> {
        let params = wire::name_params(name)?;
        Ok(self
            .call(Operation::CloseLlm, &params)
            .await?
            .into_llm())
    }
}
