//! Error results that can be returned while building a purifier
use thiserror::Error;

/// Configuration defects. These are raised before any token is processed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("injector {injector} needs {missing}, which is not allowed")]
    InjectorNeedsUnavailable { injector: String, missing: String },

    #[error("content model of {element} references undefined element {reference}")]
    UndefinedElementReference { element: String, reference: String },

    #[error("parent element {0} is not defined")]
    UndefinedParent(String),

    #[error("block wrapper {0} is not a defined block element")]
    InvalidBlockWrapper(String),

    #[error("unknown doctype: {0}")]
    UnknownDoctype(String),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("config error: {0}")]
    Config(String),
}
