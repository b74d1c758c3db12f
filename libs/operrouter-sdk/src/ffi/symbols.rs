//! The C ABI exported by the OperRouter core library.

use libloading::Library;
use std::ffi::c_char;

use crate::error::OperRouterError;
use crate::wire::Operation;

/// `char *operrouter_ping(void)`
pub type NoArgFn = unsafe extern "C" fn() -> *mut c_char;
/// `char *operrouter_<op>(const char *json)`
pub type JsonFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
/// `void operrouter_free_string(char *)`
pub type FreeFn = unsafe extern "C" fn(*mut c_char);
/// `const char *operrouter_version(void)`, static storage, never released.
pub type VersionFn = unsafe extern "C" fn() -> *const c_char;

/// Resolved entry points.
///
/// Every function except `version` returns a heap string owned by the
/// library that must be handed back to `free_string` exactly once.
#[derive(Debug, Clone, Copy)]
pub struct NativeApi {
    pub ping: NoArgFn,
    pub validate_config: JsonFn,
    pub load_config: JsonFn,
    pub get_metadata: JsonFn,
    pub datasource_create: JsonFn,
    pub datasource_query: JsonFn,
    pub datasource_execute: JsonFn,
    pub datasource_insert: JsonFn,
    pub datasource_ping: JsonFn,
    pub datasource_close: JsonFn,
    pub llm_create: JsonFn,
    pub llm_generate: JsonFn,
    pub llm_chat: JsonFn,
    pub llm_embedding: JsonFn,
    pub llm_ping: JsonFn,
    pub llm_close: JsonFn,
    pub free_string: FreeFn,
    pub version: Option<VersionFn>,
}

impl NativeApi {
    /// Resolve every required symbol in `lib`.
    ///
    /// # Safety
    /// The symbols must have the signatures documented on the type aliases
    /// above, and the returned pointers must not outlive `lib`.
    ///
    /// # Errors
    /// Returns `OperRouterError::SymbolNotFound` for the first missing
    /// required symbol.
    pub(crate) unsafe fn resolve(lib: &Library) -> Result<Self, OperRouterError> {
        // SAFETY: forwarded to the caller.
        unsafe {
            Ok(Self {
                ping: symbol(lib, "operrouter_ping")?,
                validate_config: json_symbol(lib, Operation::ValidateConfig)?,
                load_config: json_symbol(lib, Operation::LoadConfig)?,
                get_metadata: json_symbol(lib, Operation::GetMetadata)?,
                datasource_create: json_symbol(lib, Operation::CreateDataSource)?,
                datasource_query: json_symbol(lib, Operation::QueryDataSource)?,
                datasource_execute: json_symbol(lib, Operation::ExecuteDataSource)?,
                datasource_insert: json_symbol(lib, Operation::InsertDataSource)?,
                datasource_ping: json_symbol(lib, Operation::PingDataSource)?,
                datasource_close: json_symbol(lib, Operation::CloseDataSource)?,
                llm_create: json_symbol(lib, Operation::CreateLlm)?,
                llm_generate: json_symbol(lib, Operation::GenerateLlm)?,
                llm_chat: json_symbol(lib, Operation::ChatLlm)?,
                llm_embedding: json_symbol(lib, Operation::EmbeddingLlm)?,
                llm_ping: json_symbol(lib, Operation::PingLlm)?,
                llm_close: json_symbol(lib, Operation::CloseLlm)?,
                free_string: symbol(lib, "operrouter_free_string")?,
                version: symbol(lib, "operrouter_version").ok(),
            })
        }
    }

    /// Entry point taking a JSON argument, `None` for `Ping`.
    pub(crate) fn json_fn(&self, op: Operation) -> Option<JsonFn> {
        Some(match op {
            Operation::Ping => return None,
            Operation::ValidateConfig => self.validate_config,
            Operation::LoadConfig => self.load_config,
            Operation::GetMetadata => self.get_metadata,
            Operation::CreateDataSource => self.datasource_create,
            Operation::QueryDataSource => self.datasource_query,
            Operation::ExecuteDataSource => self.datasource_execute,
            Operation::InsertDataSource => self.datasource_insert,
            Operation::PingDataSource => self.datasource_ping,
            Operation::CloseDataSource => self.datasource_close,
            Operation::CreateLlm => self.llm_create,
            Operation::GenerateLlm => self.llm_generate,
            Operation::ChatLlm => self.llm_chat,
            Operation::EmbeddingLlm => self.llm_embedding,
            Operation::PingLlm => self.llm_ping,
            Operation::CloseLlm => self.llm_close,
        })
    }
}

unsafe fn json_symbol(lib: &Library, op: Operation) -> Result<JsonFn, OperRouterError> {
    // SAFETY: forwarded to the caller.
    unsafe { symbol(lib, op.ffi_symbol()) }
}

unsafe fn symbol<T: Copy>(lib: &Library, name: &str) -> Result<T, OperRouterError> {
    // SAFETY: forwarded to the caller.
    let found = unsafe { lib.get::<T>(name.as_bytes()) };
    found
        .map(|sym| *sym)
        .map_err(|e| OperRouterError::SymbolNotFound {
            symbol: name.to_owned(),
            message: e.to_string(),
        })
}
