//! Scheme and certificate policy.

use std::sync::{Arc, OnceLock};

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls_pki_types::CertificateDer;

use crate::error::HttpError;

/// Where trusted root certificates come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootStore {
    /// Mozilla roots compiled into the binary.
    #[default]
    WebPki,
    /// The operating system store, read once per process.
    Native,
}

static NATIVE_ROOTS: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn native_roots() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS.get_or_init(|| {
        let loaded = rustls_native_certs::load_native_certs();
        for err in &loaded.errors {
            tracing::warn!(error = %err, "skipping unreadable system certificate");
        }
        tracing::debug!(count = loaded.certs.len(), "system root certificates loaded");
        loaded.certs
    })
}

fn provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn native_tls_config() -> Result<rustls::ClientConfig, HttpError> {
    let mut store = rustls::RootCertStore::empty();
    let (added, ignored) = store.add_parsable_certificates(native_roots().iter().cloned());
    if added == 0 {
        return Err(HttpError::Tls(format!(
            "no usable system root certificates ({ignored} rejected)"
        )));
    }

    let config = rustls::ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| HttpError::Tls(e.to_string()))?
        .with_root_certificates(store)
        .with_no_client_auth();
    Ok(config)
}

/// Connector that speaks TLS, and plain HTTP only when `plain_http` is set.
pub fn connector(
    roots: RootStore,
    plain_http: bool,
) -> Result<HttpsConnector<HttpConnector>, HttpError> {
    let builder = match roots {
        RootStore::WebPki => HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider())
            .map_err(|e| HttpError::Tls(e.to_string()))?,
        RootStore::Native => HttpsConnectorBuilder::new().with_tls_config(native_tls_config()?),
    };

    Ok(if plain_http {
        builder.https_or_http().enable_all_versions().build()
    } else {
        builder.https_only().enable_all_versions().build()
    })
}

/// Reject URLs the client must not contact.
pub fn check_url(url: &str, plain_http: bool) -> Result<http::Uri, HttpError> {
    let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| HttpError::Url {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    if uri.authority().is_none() {
        return Err(HttpError::Url {
            url: url.to_owned(),
            reason: "absolute URL with a host required".to_owned(),
        });
    }

    match uri.scheme_str() {
        Some("https") => Ok(uri),
        Some("http") if plain_http => Ok(uri),
        Some(other) => Err(HttpError::Scheme(other.to_owned())),
        None => Err(HttpError::Url {
            url: url.to_owned(),
            reason: "missing scheme".to_owned(),
        }),
    }
}
