//! Caller identity
//!
//! Every outbound gateway and store call is made on behalf of an explicit
//! caller. There is no ambient "current user"; operations receive an
//! `Option<Identity>` and refuse to go out without one.

use thiserror::Error;

/// Authenticated caller, as handed to us by the surrounding application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub token: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

/// No valid caller identity was available for an outbound call
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no caller identity available")]
pub struct AuthenticationMissing;

/// Resolve the caller or fail before any I/O is attempted
pub fn require(caller: Option<&Identity>) -> Result<&Identity, AuthenticationMissing> {
    match caller {
        Some(identity)
            if !identity.user_id.trim().is_empty() && !identity.token.trim().is_empty() =>
        {
            Ok(identity)
        }
        _ => Err(AuthenticationMissing),
    }
}
