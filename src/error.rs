//! Error types shared across the client core

use thiserror::Error;

/// Failures talking to the request/response command API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{route} responded with status {status}")]
    Status { route: &'static str, status: u16 },
}

impl ApiError {
    /// Whether the failure happened before the server could act on the request.
    pub fn is_transport(&self) -> bool {
        match self {
            ApiError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ApiError::Status { status, .. } => *status >= 500,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Failures on the push channel
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Failures in the durable key-value store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid environment configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid url: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} has unknown value: {value}")]
    InvalidChoice { var: &'static str, value: String },
}
