//! Layered client configuration for the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use operrouter_sdk::{ClientConfig, TransportKind};

/// Prefix of environment overrides, e.g. `OPERROUTER__GRPC__ADDRESS`.
pub const ENV_PREFIX: &str = "OPERROUTER__";

/// Values given on the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub transport: Option<TransportKind>,
    pub url: Option<String>,
    pub address: Option<String>,
    pub ffi_path: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(url) = &self.url {
            config.http.base_url.clone_from(url);
        }
        if let Some(address) = &self.address {
            config.grpc.address.clone_from(address);
        }
        if let Some(path) = &self.ffi_path {
            config.ffi.library_path = Some(path.clone());
        }
    }
}

/// Load the effective configuration.
///
/// Layers: defaults -> YAML (if provided) -> env (`OPERROUTER__*`) -> CLI overrides.
///
/// # Errors
/// Fails when the file is missing or any layer does not fit [`ClientConfig`].
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<ClientConfig> {
    let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));

    if let Some(path) = path {
        if !path.is_file() {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
        figment = figment.merge(Yaml::file(path));
    }

    let mut config: ClientConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("invalid client configuration")?;

    overrides.apply(&mut config);
    tracing::debug!(transport = %config.transport, "configuration loaded");
    Ok(config)
}
