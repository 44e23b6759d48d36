//! HTTP client for the hosted chat gateway.

use super::ModelGateway;
use crate::error::GatewayError;
use crate::session::SessionContext;
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Gateway client speaking `POST {server}/api/chat`.
pub struct HttpGateway {
    http: reqwest::Client,
    server_url: String,
}

impl HttpGateway {
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        Self {
            http: build_http_client(timeout),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

/// Build an HTTP client with timeout applied.
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    // Fall back to reqwest defaults if builder creation fails for any reason.
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[async_trait]
impl ModelGateway for HttpGateway {
    async fn complete(
        &self,
        request: &ChatRequest,
        session: &SessionContext,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/api/chat", self.server_url);
        let mut req = self.http.post(&url).json(request);
        if let Some(token) = session.bearer_token().filter(|t| !t.trim().is_empty()) {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        debug!(
            session = session.id(),
            history = request.history.len(),
            "gateway request"
        );

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gateway returned error status");
            return Err(GatewayError::Status {
                code: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if let Some(provider) = parsed.provider.as_deref() {
            debug!(provider, "gateway response");
        }
        Ok(parsed.content)
    }
}

/// Pull a readable message out of an error body (`{"error": "..."}` or text).
fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
            return msg.to_string();
        }
    }
    trimmed.to_string()
}
