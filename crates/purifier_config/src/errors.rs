//! Error results that can be returned from the config store
use thiserror::Error;

/// Serious errors and errors from third-party libraries
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    #[error("setting {key} expects a {expected} value")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("json parsing error: {0}")]
    JsonSerde(#[from] serde_json::Error),
}
