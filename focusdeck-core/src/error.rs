use thiserror::Error;

use crate::config::ConfigError;
use crate::context::ContextKey;

/// Errors raised by focus transitions and context registration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FocusError {
    #[error("unknown context: {0}")]
    UnknownContext(ContextKey),
    #[error("context '{0}' is not focusable")]
    NotFocusable(ContextKey),
    #[error("context '{0}' is already registered")]
    DuplicateContext(ContextKey),
}

/// Errors raised while producing main-panel content.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{program} exited with code {code:?}: {stderr}")]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{0}")]
    Producer(String),
}

#[derive(Debug, Error)]
pub enum Error {
    /// A business-logic failure meant to be shown to the user verbatim.
    #[error("{0}")]
    User(String),
    #[error(transparent)]
    Focus(#[from] FocusError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("result file error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn user(message: impl Into<String>) -> Self {
        Error::User(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
