//! Client configuration.
//!
//! ```yaml
//! transport: grpc
//! http:
//!   base_url: http://localhost:8080
//!   timeout: 30s
//! grpc:
//!   address: http://localhost:50051
//!   connect_timeout: 10s
//!   rpc_timeout: 30s
//!   connect_retries: 0
//! ffi:
//!   library_path: /opt/operrouter/liboperrouter_core_ffi.so
//!   search_dirs: [/usr/local/lib]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::TransportKind;
use crate::ffi::DEFAULT_SEARCH_DIRS;

/// Which realization to construct and how to reach the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub transport: TransportKind,
    pub http: HttpTransportConfig,
    pub grpc: GrpcTransportConfig,
    pub ffi: FfiTransportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpTransportConfig {
    /// Server root; requests go to `{base_url}/jsonrpc`.
    pub base_url: String,

    /// Per-call timeout.
    #[serde(with = "duration_str")]
    pub timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrpcTransportConfig {
    /// Server URI, e.g. `http://localhost:50051`. A bare `host:port` is
    /// accepted and treated as plain-text HTTP/2.
    pub address: String,

    #[serde(with = "duration_str")]
    pub connect_timeout: Duration,

    #[serde(with = "duration_str")]
    pub rpc_timeout: Duration,

    /// Extra connection attempts at construction. Operations are never retried.
    pub connect_retries: u32,
}

impl Default for GrpcTransportConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:50051".to_owned(),
            connect_timeout: Duration::from_secs(10),
            rpc_timeout: Duration::from_secs(30),
            connect_retries: 0,
        }
    }
}

impl GrpcTransportConfig {
    /// `address` with a scheme, as tonic expects.
    #[must_use]
    pub fn uri(&self) -> String {
        if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FfiTransportConfig {
    /// Explicit library path; tried before anything else.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,

    /// Directories searched for the platform library names after the
    /// system loader path.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_dirs: Vec<PathBuf>,
}

impl Default for FfiTransportConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            search_dirs: DEFAULT_SEARCH_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

/// `Duration` as a humantime string (`"30s"`, `"1m 30s"`).
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(de::Error::custom)
    }
}
