//! Local argument checks run by every client before any exchange.

use crate::error::OperRouterError;
use crate::models::{ChatMessage, DataSourceConfig, LlmConfig};

pub fn name(name: &str) -> Result<(), OperRouterError> {
    if name.trim().is_empty() {
        return Err(OperRouterError::invalid("name must not be empty"));
    }
    Ok(())
}

pub fn datasource_config(config: &DataSourceConfig) -> Result<(), OperRouterError> {
    if config.host.trim().is_empty() {
        return Err(OperRouterError::invalid("data source host must not be empty"));
    }
    if config.port == 0 {
        return Err(OperRouterError::invalid("data source port must not be 0"));
    }
    Ok(())
}

pub fn llm_config(config: &LlmConfig) -> Result<(), OperRouterError> {
    if config.model.trim().is_empty() {
        return Err(OperRouterError::invalid("LLM model must not be empty"));
    }
    Ok(())
}

pub fn messages(messages: &[ChatMessage]) -> Result<(), OperRouterError> {
    if messages.is_empty() {
        return Err(OperRouterError::invalid("chat requires at least one message"));
    }
    Ok(())
}

pub fn config_object(config: &serde_json::Value) -> Result<(), OperRouterError> {
    if !config.is_object() {
        return Err(OperRouterError::invalid("configuration must be a JSON object"));
    }
    Ok(())
}

pub fn config_path(path: &str) -> Result<(), OperRouterError> {
    if path.trim().is_empty() {
        return Err(OperRouterError::invalid("configuration path must not be empty"));
    }
    Ok(())
}
