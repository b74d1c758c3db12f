//! JSON-RPC 2.0 envelope types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OperRouterError, TransportKind};

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request object.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Value,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub(crate) fn new(method: &'a str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 response object, success or error.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Check the envelope against the request it answers and extract the
    /// result object.
    ///
    /// An `error` member becomes [`OperRouterError::Rpc`]. A reply with an id
    /// other than `expected_id`, a wrong protocol version, or neither `result`
    /// nor `error` is malformed. Servers may answer an unparseable request
    /// with a null id, so a null id is accepted on error replies.
    pub(crate) fn into_result(self, expected_id: u64) -> Result<Value, OperRouterError> {
        if let Some(version) = self.jsonrpc.as_deref()
            && version != JSONRPC_VERSION
        {
            return Err(malformed(format!("unsupported jsonrpc version `{version}`")));
        }

        let id_matches = match &self.id {
            Some(Value::Number(n)) => n.as_u64() == Some(expected_id),
            Some(Value::String(s)) => s.parse::<u64>().ok() == Some(expected_id),
            Some(Value::Null) | None => self.error.is_some(),
            Some(_) => false,
        };
        if !id_matches {
            let got = self
                .id
                .as_ref()
                .map_or_else(|| "none".to_owned(), Value::to_string);
            return Err(malformed(format!(
                "reply id {got} does not match request id {expected_id}"
            )));
        }

        if let Some(error) = self.error {
            let message = match error.data {
                Some(data) => format!("{} ({data})", error.message),
                None => error.message,
            };
            return Err(OperRouterError::Rpc {
                transport: TransportKind::Http,
                code: error.code,
                message,
            });
        }

        self.result
            .ok_or_else(|| malformed("reply has neither `result` nor `error`".to_owned()))
    }
}

fn malformed(message: String) -> OperRouterError {
    OperRouterError::malformed(TransportKind::Http, message)
}
