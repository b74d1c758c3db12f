//! Fixed numeric codes for enumerations on the gRPC wire.
//!
//! Code 0 is `UNSPECIFIED` in every proto enum. The client never sends it and
//! rejects it when decoding.

use std::fmt;

use crate::error::{OperRouterError, TransportKind};
use crate::models::{Driver, LlmProvider, MessageRole};
use crate::proto;

/// Bidirectional mapping between an enumeration and its wire codes.
pub struct CodeTable<T: 'static> {
    name: &'static str,
    entries: &'static [(T, i32)],
    variants: &'static [T],
    known_to_schema: fn(i32) -> bool,
}

impl<T> CodeTable<T>
where
    T: Copy + PartialEq + fmt::Display + 'static,
{
    /// Wire code for `value`.
    ///
    /// # Errors
    /// Returns `OperRouterError::Configuration` if the table has no entry for
    /// `value`, which [`check_tables`] rules out.
    pub fn encode(&self, value: T) -> Result<i32, OperRouterError> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, code)| *code)
            .ok_or_else(|| {
                OperRouterError::Configuration(format!("no {} code for `{value}`", self.name))
            })
    }

    /// Value for a wire code.
    ///
    /// # Errors
    /// Returns `OperRouterError::MalformedResponse` for 0 or an unknown code.
    pub fn decode(&self, code: i32) -> Result<T, OperRouterError> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code && code != 0)
            .map(|(v, _)| *v)
            .ok_or_else(|| {
                OperRouterError::malformed(
                    TransportKind::Grpc,
                    format!("unknown {} code {code}", self.name),
                )
            })
    }

    fn check(&self) -> Result<(), String> {
        for variant in self.variants {
            let count = self.entries.iter().filter(|(v, _)| v == variant).count();
            if count != 1 {
                return Err(format!(
                    "{} table maps `{variant}` {count} times",
                    self.name
                ));
            }
        }
        for (i, (variant, code)) in self.entries.iter().enumerate() {
            if *code == 0 {
                return Err(format!("{} table maps `{variant}` to 0", self.name));
            }
            if self.entries[..i].iter().any(|(_, c)| c == code) {
                return Err(format!("{} table reuses code {code}", self.name));
            }
            if !(self.known_to_schema)(*code) {
                return Err(format!(
                    "{} code {code} is not defined by the schema",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

pub static DRIVER_CODES: CodeTable<Driver> = CodeTable {
    name: "data source type",
    entries: &[
        (Driver::Postgres, 1),
        (Driver::Mysql, 2),
        (Driver::Redis, 3),
        (Driver::Mongodb, 4),
        (Driver::Kafka, 5),
    ],
    variants: &Driver::ALL,
    known_to_schema: |code| proto::DataSourceType::try_from(code).is_ok(),
};

pub static PROVIDER_CODES: CodeTable<LlmProvider> = CodeTable {
    name: "LLM provider",
    entries: &[
        (LlmProvider::OpenAi, 1),
        (LlmProvider::Ollama, 2),
        (LlmProvider::Claude, 3),
    ],
    variants: &LlmProvider::ALL,
    known_to_schema: |code| proto::LlmProvider::try_from(code).is_ok(),
};

pub static ROLE_CODES: CodeTable<MessageRole> = CodeTable {
    name: "message role",
    entries: &[
        (MessageRole::System, 1),
        (MessageRole::User, 2),
        (MessageRole::Assistant, 3),
    ],
    variants: &MessageRole::ALL,
    known_to_schema: |code| proto::MessageRole::try_from(code).is_ok(),
};

/// Verify every table maps each variant exactly once to a unique, non-zero
/// code the schema defines.
///
/// # Errors
/// Returns `OperRouterError::Configuration` describing the first defect.
pub fn check_tables() -> Result<(), OperRouterError> {
    DRIVER_CODES
        .check()
        .and_then(|()| PROVIDER_CODES.check())
        .and_then(|()| ROLE_CODES.check())
        .map_err(OperRouterError::Configuration)
}
