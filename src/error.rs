//! Recoverable errors.
//!
//! Only configuration and registry problems end up here. Index and
//! lifecycle misuse is a programming error and panics at the call site.

use thiserror::Error;

/// Errors raised while configuring vessels or registering values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VesselError {
    #[error("value label must not be empty")]
    EmptyLabel,

    #[error("a value labelled `{0}` is already registered")]
    DuplicateLabel(String),

    #[error("malformed parameter `{0}`: expected KEY=VALUE")]
    MalformedParameter(String),

    #[error("parameter `{0}` given more than once")]
    RepeatedParameter(String),

    #[error("invalid value `{value}` for parameter `{key}`")]
    InvalidParameter { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, VesselError>;
