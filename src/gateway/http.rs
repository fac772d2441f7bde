//! HTTP implementation of the answer gateway

use super::types::{AskBody, ErrorBody, FeedbackBody, TeachBody};
use super::{AnswerGateway, AskReply, CorrectionReply, GatewayError, Greeting};
use crate::auth::Identity;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// JSON-over-HTTP gateway client
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::unreachable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorize(request: RequestBuilder, caller: &Identity) -> RequestBuilder {
        request
            .bearer_auth(&caller.token)
            .header("x-user-id", &caller.user_id)
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, GatewayError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::unreachable(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                GatewayError::unreachable(format!("Connection failed: {e}"))
            } else {
                GatewayError::unreachable(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::unreachable(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| GatewayError::decode(format!("Failed to parse response: {e} - body: {body}")))
    }
}

/// Turn a non-2xx response into a gateway error, preferring the server's own message
fn classify_error(status: StatusCode, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| format!("Server error: {status}"));
    GatewayError::server(detail)
}

#[async_trait]
impl AnswerGateway for HttpGateway {
    async fn ask(&self, caller: &Identity, question: &str) -> Result<AskReply, GatewayError> {
        let request = self
            .client
            .post(self.url("ask"))
            .json(&AskBody { question });
        self.send(Self::authorize(request, caller)).await
    }

    async fn teach(
        &self,
        caller: &Identity,
        original_query: &str,
        teach_response: &str,
    ) -> Result<CorrectionReply, GatewayError> {
        let request = self.client.post(self.url("teach")).json(&TeachBody {
            original_query,
            teach_response,
        });
        self.send(Self::authorize(request, caller)).await
    }

    async fn feedback(
        &self,
        caller: &Identity,
        original_query: &str,
        feedback: &str,
    ) -> Result<CorrectionReply, GatewayError> {
        let request = self.client.post(self.url("feedback")).json(&FeedbackBody {
            original_query,
            feedback,
        });
        self.send(Self::authorize(request, caller)).await
    }

    async fn greet(&self, caller: &Identity) -> Result<Greeting, GatewayError> {
        let request = self.client.get(self.url("greet"));
        self.send(Self::authorize(request, caller)).await
    }
}
