//! Gateway error types

use crate::auth::AuthenticationMissing;
use thiserror::Error;

/// Gateway error with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unreachable, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Server, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Decode, message)
    }
}

impl From<AuthenticationMissing> for GatewayError {
    fn from(e: AuthenticationMissing) -> Self {
        Self::new(GatewayErrorKind::AuthenticationMissing, e.to_string())
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Transport failure: connect, timeout, broken body
    Unreachable,
    /// The service answered with an error payload
    Server,
    /// No caller identity, the call was never made
    AuthenticationMissing,
    /// The response body did not have the expected shape
    Decode,
}
