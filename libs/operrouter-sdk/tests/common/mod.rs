#![allow(clippy::unwrap_used, clippy::expect_used, unsafe_code, dead_code)]

//! In-process OperRouter backends for integration tests.
//!
//! All three doubles answer from the same table ([`result_for`]) so the
//! same scenario yields equal response records over every transport.

use std::collections::HashSet;
use std::ffi::{CStr, CString, c_char};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use httpmock::prelude::*;
use httpmock::Mock;
use operrouter_sdk::grpc::convert;
use operrouter_sdk::{
    ChatMessage, DataSourceConfig, Driver, FfiClient, LlmConfig, LlmProvider, Metadata,
    NativeApi, OperRouter, OperRouterServer, Row, proto,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

pub const QUERY: &str = "SELECT id, name FROM users ORDER BY id";
pub const EMBEDDING: [f32; 3] = [0.5, 0.25, -1.0];

pub fn postgres() -> DataSourceConfig {
    DataSourceConfig::new(Driver::Postgres, "localhost", 5432, "test")
        .with_credentials("user", "pass")
        .with_option("sslmode", "disable")
}

pub fn ollama() -> LlmConfig {
    LlmConfig::new(LlmProvider::Ollama, "llama3.2").with_base_url("http://localhost:11434")
}

pub fn users() -> Vec<Row> {
    vec![
        serde_json::from_value(json!({"id": 1, "name": "alice"})).unwrap(),
        serde_json::from_value(json!({"id": 2, "name": "bob"})).unwrap(),
    ]
}

pub fn new_user() -> Row {
    serde_json::from_value(json!({"id": 3, "name": "carol"})).unwrap()
}

pub fn conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are terse."),
        ChatMessage::user("hello"),
    ]
}

pub fn metadata() -> Metadata {
    Metadata {
        name: "operrouter-core".to_owned(),
        version: "0.1.0".to_owned(),
        description: Some("test double".to_owned()),
    }
}

/// Names created and not yet closed.
#[derive(Default)]
pub struct Registry {
    datasources: Mutex<HashSet<String>>,
    llms: Mutex<HashSet<String>>,
}

impl Registry {
    pub fn clear(&self) {
        self.datasources.lock().clear();
        self.llms.lock().clear();
    }
}

fn close(set: &Mutex<HashSet<String>>, kind: &str, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or_default();
    if set.lock().remove(name) {
        json!({"success": true})
    } else {
        json!({"success": false, "error": format!("{kind} `{name}` not found")})
    }
}

/// Result object a healthy backend returns for `method`.
pub fn result_for(method: &str, params: &Value, registry: &Registry) -> Value {
    let name = params["name"].as_str().unwrap_or_default().to_owned();
    match method {
        "ping" | "validate_config" | "load_config" | "datasource.execute"
        | "datasource.insert" => json!({"success": true}),
        "get_metadata" => json!({"success": true, "metadata": metadata()}),
        "datasource.create" => {
            registry.datasources.lock().insert(name);
            json!({"success": true})
        }
        "datasource.query" => json!({
            "success": true,
            "columns": ["id", "name"],
            "rows": users(),
        }),
        "datasource.ping" | "llm.ping" => json!({"healthy": true}),
        "datasource.close" => close(&registry.datasources, "datasource", params),
        "llm.create" => {
            registry.llms.lock().insert(name);
            json!({"success": true})
        }
        "llm.generate" => json!({
            "success": true,
            "text": format!("echo: {}", params["prompt"].as_str().unwrap_or_default()),
        }),
        "llm.chat" => {
            let last = params["messages"]
                .as_array()
                .and_then(|m| m.last())
                .and_then(|m| m["content"].as_str())
                .unwrap_or_default();
            json!({"success": true, "text": format!("echo: {last}")})
        }
        "llm.embedding" => json!({"success": true, "embedding": EMBEDDING}),
        "llm.close" => close(&registry.llms, "llm", params),
        other => panic!("no canned result for {other}"),
    }
}

// ---------- JSON-RPC double ----------

/// Answer the `id`-th request for `method` with `result`.
pub fn mock_rpc<'a>(server: &'a MockServer, method: &str, id: u64, result: Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/jsonrpc")
            .header("content-type", "application/json")
            .body_includes(format!("\"method\":\"{method}\""))
            .body_includes(format!(",\"id\":{id}}}"));
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "id": id, "result": result}));
    })
}

// ---------- gRPC double ----------

#[derive(Default)]
pub struct GrpcState {
    pub registry: Registry,
    pub last_datasource: Mutex<Option<proto::DataSourceConfig>>,
    pub last_llm: Mutex<Option<proto::LlmConfig>>,
    pub last_insert: Mutex<Option<proto::Row>>,
    pub last_validate: Mutex<Option<String>>,
    /// Answer `GetMetadata` with `success` and no metadata.
    pub drop_metadata: AtomicBool,
    /// Fail every call with this status code.
    pub fail_with: Mutex<Option<tonic::Code>>,
}

#[derive(Clone, Default)]
pub struct GrpcDouble {
    pub state: Arc<GrpcState>,
}

impl GrpcDouble {
    fn answer(&self, method: &str, params: &Value) -> Result<Value, Status> {
        if let Some(code) = *self.state.fail_with.lock() {
            return Err(Status::new(code, format!("{method} refused")));
        }
        Ok(result_for(method, params, &self.state.registry))
    }
}

fn flag(v: &Value, key: &str) -> bool {
    v[key].as_bool().unwrap_or_default()
}

fn error_text(v: &Value) -> String {
    v["error"].as_str().unwrap_or_default().to_owned()
}

fn text(v: &Value) -> String {
    v["text"].as_str().unwrap_or_default().to_owned()
}

/// Bind an ephemeral port and serve `double` on it.
pub async fn spawn_grpc(double: GrpcDouble) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(OperRouterServer::new(double))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

#[tonic::async_trait]
impl OperRouter for GrpcDouble {
    async fn ping(
        &self,
        _request: Request<proto::PingRequest>,
    ) -> Result<Response<proto::PingResponse>, Status> {
        let v = self.answer("ping", &json!({}))?;
        Ok(Response::new(proto::PingResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn validate_config(
        &self,
        request: Request<proto::ValidateConfigRequest>,
    ) -> Result<Response<proto::ConfigResponse>, Status> {
        let req = request.into_inner();
        *self.state.last_validate.lock() = Some(req.config.clone());
        let v = self.answer("validate_config", &json!({}))?;
        Ok(Response::new(proto::ConfigResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn load_config(
        &self,
        request: Request<proto::LoadConfigRequest>,
    ) -> Result<Response<proto::ConfigResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("load_config", &json!({"path": req.path}))?;
        Ok(Response::new(proto::ConfigResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn get_metadata(
        &self,
        _request: Request<proto::GetMetadataRequest>,
    ) -> Result<Response<proto::GetMetadataResponse>, Status> {
        let v = self.answer("get_metadata", &json!({}))?;
        let metadata = if self.state.drop_metadata.load(Ordering::SeqCst) {
            None
        } else {
            Some(convert::metadata_to_proto(&metadata()))
        };
        Ok(Response::new(proto::GetMetadataResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
            metadata,
        }))
    }

    async fn create_data_source(
        &self,
        request: Request<proto::CreateDataSourceRequest>,
    ) -> Result<Response<proto::DataSourceResponse>, Status> {
        let req = request.into_inner();
        *self.state.last_datasource.lock() = req.config;
        let v = self.answer("datasource.create", &json!({"name": req.name}))?;
        Ok(Response::new(proto::DataSourceResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn query_data_source(
        &self,
        request: Request<proto::QueryDataSourceRequest>,
    ) -> Result<Response<proto::QueryDataSourceResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("datasource.query", &json!({"name": req.name}))?;
        let rows: Vec<Row> = serde_json::from_value(v["rows"].clone()).unwrap_or_default();
        let columns: Vec<String> = serde_json::from_value(v["columns"].clone()).unwrap_or_default();
        Ok(Response::new(proto::QueryDataSourceResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
            rows: rows.iter().map(convert::row_to_proto).collect(),
            columns,
        }))
    }

    async fn execute_data_source(
        &self,
        request: Request<proto::ExecuteDataSourceRequest>,
    ) -> Result<Response<proto::DataSourceResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("datasource.execute", &json!({"name": req.name}))?;
        Ok(Response::new(proto::DataSourceResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn insert_data_source(
        &self,
        request: Request<proto::InsertDataSourceRequest>,
    ) -> Result<Response<proto::DataSourceResponse>, Status> {
        let req = request.into_inner();
        *self.state.last_insert.lock() = req.data;
        let v = self.answer("datasource.insert", &json!({"name": req.name}))?;
        Ok(Response::new(proto::DataSourceResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn ping_data_source(
        &self,
        request: Request<proto::PingDataSourceRequest>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("datasource.ping", &json!({"name": req.name}))?;
        Ok(Response::new(proto::HealthResponse {
            healthy: flag(&v, "healthy"),
            error: error_text(&v),
        }))
    }

    async fn close_data_source(
        &self,
        request: Request<proto::CloseDataSourceRequest>,
    ) -> Result<Response<proto::DataSourceResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("datasource.close", &json!({"name": req.name}))?;
        Ok(Response::new(proto::DataSourceResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn create_llm(
        &self,
        request: Request<proto::CreateLlmRequest>,
    ) -> Result<Response<proto::LlmResponse>, Status> {
        let req = request.into_inner();
        *self.state.last_llm.lock() = req.config;
        let v = self.answer("llm.create", &json!({"name": req.name}))?;
        Ok(Response::new(proto::LlmResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }

    async fn generate_llm(
        &self,
        request: Request<proto::GenerateLlmRequest>,
    ) -> Result<Response<proto::GenerateLlmResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer(
            "llm.generate",
            &json!({"name": req.name, "prompt": req.prompt}),
        )?;
        Ok(Response::new(proto::GenerateLlmResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
            text: text(&v),
        }))
    }

    async fn chat_llm(
        &self,
        request: Request<proto::ChatLlmRequest>,
    ) -> Result<Response<proto::ChatLlmResponse>, Status> {
        let req = request.into_inner();
        let messages: Vec<Value> = req
            .messages
            .iter()
            .map(|m| json!({"content": m.content}))
            .collect();
        let v = self.answer("llm.chat", &json!({"name": req.name, "messages": messages}))?;
        Ok(Response::new(proto::ChatLlmResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
            text: text(&v),
        }))
    }

    async fn embedding_llm(
        &self,
        request: Request<proto::EmbeddingLlmRequest>,
    ) -> Result<Response<proto::EmbeddingLlmResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("llm.embedding", &json!({"name": req.name}))?;
        Ok(Response::new(proto::EmbeddingLlmResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
            embedding: serde_json::from_value(v["embedding"].clone()).unwrap_or_default(),
        }))
    }

    async fn ping_llm(
        &self,
        request: Request<proto::PingLlmRequest>,
    ) -> Result<Response<proto::HealthResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("llm.ping", &json!({"name": req.name}))?;
        Ok(Response::new(proto::HealthResponse {
            healthy: flag(&v, "healthy"),
            error: error_text(&v),
        }))
    }

    async fn close_llm(
        &self,
        request: Request<proto::CloseLlmRequest>,
    ) -> Result<Response<proto::LlmResponse>, Status> {
        let req = request.into_inner();
        let v = self.answer("llm.close", &json!({"name": req.name}))?;
        Ok(Response::new(proto::LlmResponse {
            success: flag(&v, "success"),
            error: error_text(&v),
        }))
    }
}

// ---------- native double ----------

/// How the native double answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NativeMode {
    Normal = 0,
    /// `{"success": false, "error": ...}` for every call.
    ErrorShaped = 1,
    /// A null pointer.
    Null = 2,
    /// Bytes that are not JSON.
    Garbage = 3,
    /// `{"success": true}` and nothing else.
    BareSuccess = 4,
}

static MODE: AtomicU8 = AtomicU8::new(0);
static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static RELEASED: AtomicUsize = AtomicUsize::new(0);
static LAST_ARG: Mutex<Option<(String, String)>> = parking_lot::const_mutex(None);
static REGISTRY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::default);
static NATIVE_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Exclusive access to the native double, reset to [`NativeMode::Normal`].
pub async fn native_session() -> tokio::sync::MutexGuard<'static, ()> {
    let guard = NATIVE_LOCK.lock().await;
    set_native_mode(NativeMode::Normal);
    ALLOCATED.store(0, Ordering::SeqCst);
    RELEASED.store(0, Ordering::SeqCst);
    *LAST_ARG.lock() = None;
    REGISTRY.clear();
    guard
}

pub fn set_native_mode(mode: NativeMode) {
    MODE.store(mode as u8, Ordering::SeqCst);
}

/// Reply buffers handed out and handed back.
pub fn native_counters() -> (usize, usize) {
    (
        ALLOCATED.load(Ordering::SeqCst),
        RELEASED.load(Ordering::SeqCst),
    )
}

/// Symbol and JSON argument of the last native call.
pub fn native_last_arg() -> Option<(String, Value)> {
    native_last_raw_arg().map(|(symbol, arg)| (symbol, serde_json::from_str(&arg).unwrap()))
}

/// Symbol and argument bytes, exactly as received, of the last native call.
pub fn native_last_raw_arg() -> Option<(String, String)> {
    LAST_ARG.lock().clone()
}

fn respond(symbol: &str, method: &str, arg: Option<&str>) -> *mut c_char {
    let raw = arg.unwrap_or("{}");
    *LAST_ARG.lock() = Some((symbol.to_owned(), raw.to_owned()));
    // `operrouter_load_config` takes a bare path
    let params: Value = serde_json::from_str(raw).unwrap_or(Value::Null);

    let reply = match MODE.load(Ordering::SeqCst) {
        0 => result_for(method, &params, &REGISTRY).to_string(),
        1 => json!({"success": false, "error": format!("{method} failed")}).to_string(),
        2 => return std::ptr::null_mut(),
        3 => "{\"success\": tru".to_owned(),
        _ => json!({"success": true}).to_string(),
    };
    ALLOCATED.fetch_add(1, Ordering::SeqCst);
    CString::new(reply).unwrap().into_raw()
}

unsafe extern "C" fn native_ping() -> *mut c_char {
    respond("operrouter_ping", "ping", None)
}

unsafe extern "C" fn native_free(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    RELEASED.fetch_add(1, Ordering::SeqCst);
    // SAFETY: `ptr` came from `CString::into_raw` in `respond`.
    drop(unsafe { CString::from_raw(ptr) });
}

unsafe extern "C" fn native_version() -> *const c_char {
    c"0.1.0-double".as_ptr()
}

macro_rules! native_entries {
    ($($fn_name:ident => $symbol:literal, $method:literal;)*) => {
        $(
            unsafe extern "C" fn $fn_name(arg: *const c_char) -> *mut c_char {
                // SAFETY: the SDK passes a live NUL-terminated string.
                let arg = unsafe { CStr::from_ptr(arg) }.to_str().unwrap();
                respond($symbol, $method, Some(arg))
            }
        )*
    };
}

native_entries! {
    native_validate_config => "operrouter_validate_config", "validate_config";
    native_load_config => "operrouter_load_config", "load_config";
    native_get_metadata => "operrouter_get_metadata", "get_metadata";
    native_ds_create => "operrouter_datasource_create", "datasource.create";
    native_ds_query => "operrouter_datasource_query", "datasource.query";
    native_ds_execute => "operrouter_datasource_execute", "datasource.execute";
    native_ds_insert => "operrouter_datasource_insert", "datasource.insert";
    native_ds_ping => "operrouter_datasource_ping", "datasource.ping";
    native_ds_close => "operrouter_datasource_close", "datasource.close";
    native_llm_create => "operrouter_llm_create", "llm.create";
    native_llm_generate => "operrouter_llm_generate", "llm.generate";
    native_llm_chat => "operrouter_llm_chat", "llm.chat";
    native_llm_embedding => "operrouter_llm_embedding", "llm.embedding";
    native_llm_ping => "operrouter_llm_ping", "llm.ping";
    native_llm_close => "operrouter_llm_close", "llm.close";
}

pub fn native_api() -> NativeApi {
    NativeApi {
        ping: native_ping,
        validate_config: native_validate_config,
        load_config: native_load_config,
        get_metadata: native_get_metadata,
        datasource_create: native_ds_create,
        datasource_query: native_ds_query,
        datasource_execute: native_ds_execute,
        datasource_insert: native_ds_insert,
        datasource_ping: native_ds_ping,
        datasource_close: native_ds_close,
        llm_create: native_llm_create,
        llm_generate: native_llm_generate,
        llm_chat: native_llm_chat,
        llm_embedding: native_llm_embedding,
        llm_ping: native_llm_ping,
        llm_close: native_llm_close,
        free_string: native_free,
        version: Some(native_version),
    }
}

pub fn native_client() -> FfiClient {
    // SAFETY: every entry point above follows the native ABI and is a plain
    // function with static lifetime.
    unsafe { FfiClient::from_api(native_api()) }
}
