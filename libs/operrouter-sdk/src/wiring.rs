use std::sync::Arc;

use crate::api::OperRouterClientV1;
use crate::config::ClientConfig;
use crate::error::{OperRouterError, TransportKind};
use crate::ffi::FfiClient;
use crate::grpc::GrpcClient;
use crate::http::HttpClient;

/// Build the realization selected by `config.transport`.
///
/// The gRPC client connects eagerly; the HTTP client connects on first use;
/// the FFI client loads the native library immediately.
///
/// # Errors
/// Returns the constructor error of the selected realization.
pub async fn connect(config: &ClientConfig) -> Result<Arc<dyn OperRouterClientV1>, OperRouterError> {
    tracing::debug!(transport = %config.transport, "building OperRouter client");
    let client: Arc<dyn OperRouterClientV1> = match config.transport {
        TransportKind::Http => Arc::new(HttpClient::from_config(&config.http)?),
        TransportKind::Grpc => Arc::new(GrpcClient::from_config(&config.grpc).await?),
        TransportKind::Ffi => Arc::new(FfiClient::from_config(&config.ffi)?),
    };
    Ok(client)
}
