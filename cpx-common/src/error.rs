use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CpxError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Manifest Parse Error at line {line}: {message}")]
    ManifestParse { line: usize, message: String },

    #[error("Registry Error: {0}")]
    Registry(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Installation Error: {0}")]
    InstallError(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl CpxError {
    /// True for errors the resolver treats as "skip this name".
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            CpxError::NotFound(_) | CpxError::Registry(_) | CpxError::Http(_) | CpxError::Json(_)
        )
    }
}

impl From<std::io::Error> for CpxError {
    fn from(err: std::io::Error) -> Self {
        CpxError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for CpxError {
    fn from(err: reqwest::Error) -> Self {
        CpxError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for CpxError {
    fn from(err: serde_json::Error) -> Self {
        CpxError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CpxError>;
