//! Result printing.

use anyhow::Result;
use operrouter_sdk::{
    ConfigResponse, DataSourceQueryResponse, DataSourceResponse, LlmChatResponse,
    LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse, MetadataResponse, PingResponse,
};
use serde::Serialize;

/// The `success`/`message` pair every response carries.
pub trait Outcome {
    fn succeeded(&self) -> bool;
    fn message(&self) -> &str;
}

macro_rules! impl_outcome {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Outcome for $ty {
                fn succeeded(&self) -> bool {
                    self.success
                }

                fn message(&self) -> &str {
                    &self.message
                }
            }
        )+
    };
}

impl_outcome!(
    PingResponse,
    ConfigResponse,
    MetadataResponse,
    DataSourceResponse,
    DataSourceQueryResponse,
    LlmResponse,
    LlmGenerateResponse,
    LlmChatResponse,
    LlmEmbeddingResponse,
);

/// Render a response as pretty JSON.
pub fn render<T: Serialize>(response: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(response)?)
}

/// Print a response to stdout and report whether the backend accepted it.
pub fn emit<T>(operation: &str, response: &T) -> Result<bool>
where
    T: Serialize + Outcome,
{
    println!("{}", render(response)?);
    if !response.succeeded() {
        tracing::warn!(operation, message = response.message(), "backend refused the call");
    }
    Ok(response.succeeded())
}
