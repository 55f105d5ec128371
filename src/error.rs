//! Error types for the license dashboard.

use thiserror::Error;

/// Failure of a call against the license API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the bearer token (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// The server answered with `ok: false`, a non-success status, or an
    /// envelope missing its payload.
    #[error("{message}")]
    Server { status: Option<u16>, message: String },

    /// The login endpoint handed back a token we cannot use.
    #[error("invalid session token: {0}")]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        ApiError::Server {
            status,
            message: message.into(),
        }
    }
}

/// A bearer token that cannot back a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),

    #[error("token has no valid expiry claim")]
    InvalidExpiry,

    #[error("token expired")]
    Expired,
}

/// Failure of the persisted session store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("stored value is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Failure while writing a spreadsheet export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
