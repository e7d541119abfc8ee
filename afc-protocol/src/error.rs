//! Error types for the AFC portal protocol.

use thiserror::Error;

/// Authentication errors raised during the login handshake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The login page answered with a non-success status.
    #[error("Login page returned HTTP status {0}")]
    HttpStatus(u16),

    /// The login page did not contain a CSRF token field.
    #[error("CSRF token not found in login page")]
    TokenNotFound,

    /// The sign-in POST was rejected.
    #[error("Login failed with HTTP status {0}")]
    LoginFailed(u16),
}

/// Protocol-level errors: endpoint policy and response decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The configured endpoint does not use HTTPS.
    #[error("Non-https URLs are not permitted: {0}")]
    InsecureScheme(String),

    /// The configured endpoint could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The inquiry response is missing required fields or is not JSON.
    #[error("Malformed inquiry response: {0}")]
    MalformedResponse(String),

    /// Failed to encode the inquiry request.
    #[error("Failed to encode request: {0}")]
    EncodeError(String),
}

/// Transport errors: the HTTPS exchange itself did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Any other transport failure (TLS, body read, ...).
    #[error("Transport error: {0}")]
    Other(String),
}

/// Any error produced by one inquiry cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AfcError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AfcError {
    /// Returns true if the portal answered but the body could not be decoded.
    pub fn is_malformed(&self) -> bool {
        matches!(self, AfcError::Protocol(ProtocolError::MalformedResponse(_)))
    }

    /// Returns true if the portal could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, AfcError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, AfcError>;
