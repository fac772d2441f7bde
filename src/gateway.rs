//! Remote answer gateway
//!
//! Stateless request/response boundary to the answering service. The
//! controller only ever talks to `AnswerGateway`; the HTTP client is one
//! implementation of it.

mod error;
mod http;
mod types;

pub use error::{GatewayError, GatewayErrorKind};
pub use http::HttpGateway;
pub use types::*;

use crate::auth::Identity;
use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for the answering service
#[async_trait]
pub trait AnswerGateway: Send + Sync {
    /// Ask a plain question
    async fn ask(&self, caller: &Identity, question: &str) -> Result<AskReply, GatewayError>;

    /// Teach the service the answer to a question it did not know
    async fn teach(
        &self,
        caller: &Identity,
        original_query: &str,
        teach_response: &str,
    ) -> Result<CorrectionReply, GatewayError>;

    /// Send feedback about the answer to a previous question
    async fn feedback(
        &self,
        caller: &Identity,
        original_query: &str,
        feedback: &str,
    ) -> Result<CorrectionReply, GatewayError>;

    /// Fetch the greeting shown at the start of a session
    async fn greet(&self, caller: &Identity) -> Result<Greeting, GatewayError>;
}

#[async_trait]
impl<T: AnswerGateway + ?Sized> AnswerGateway for Arc<T> {
    async fn ask(&self, caller: &Identity, question: &str) -> Result<AskReply, GatewayError> {
        (**self).ask(caller, question).await
    }

    async fn teach(
        &self,
        caller: &Identity,
        original_query: &str,
        teach_response: &str,
    ) -> Result<CorrectionReply, GatewayError> {
        (**self).teach(caller, original_query, teach_response).await
    }

    async fn feedback(
        &self,
        caller: &Identity,
        original_query: &str,
        feedback: &str,
    ) -> Result<CorrectionReply, GatewayError> {
        (**self).feedback(caller, original_query, feedback).await
    }

    async fn greet(&self, caller: &Identity) -> Result<Greeting, GatewayError> {
        (**self).greet(caller).await
    }
}

/// Logging wrapper for gateways
pub struct LoggingGateway<G> {
    inner: G,
}

impl<G: AnswerGateway> LoggingGateway<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    fn log_outcome<T>(
        operation: &'static str,
        caller: &Identity,
        started: std::time::Instant,
        result: &Result<T, GatewayError>,
    ) {
        let duration = started.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    operation,
                    user_id = %caller.user_id,
                    duration_ms = %duration.as_millis(),
                    "Gateway request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    operation,
                    user_id = %caller.user_id,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Gateway request failed"
                );
            }
        }
    }
}

#[async_trait]
impl<G: AnswerGateway> AnswerGateway for LoggingGateway<G> {
    async fn ask(&self, caller: &Identity, question: &str) -> Result<AskReply, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.ask(caller, question).await;
        Self::log_outcome("ask", caller, start, &result);
        if let Ok(reply) = &result {
            tracing::debug!(status = ?reply.status, query = ?reply.query, "Ask reply");
        }
        result
    }

    async fn teach(
        &self,
        caller: &Identity,
        original_query: &str,
        teach_response: &str,
    ) -> Result<CorrectionReply, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.teach(caller, original_query, teach_response).await;
        Self::log_outcome("teach", caller, start, &result);
        result
    }

    async fn feedback(
        &self,
        caller: &Identity,
        original_query: &str,
        feedback: &str,
    ) -> Result<CorrectionReply, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.feedback(caller, original_query, feedback).await;
        Self::log_outcome("feedback", caller, start, &result);
        result
    }

    async fn greet(&self, caller: &Identity) -> Result<Greeting, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.greet(caller).await;
        Self::log_outcome("greet", caller, start, &result);
        result
    }
}
