//! Model gateway abstraction.
//!
//! The orchestration loop only ever sees [`ModelGateway`]: one unary call
//! carrying the system prompt, prior turns, and the newest message, answered
//! with plain text. [`HttpGateway`] is the production implementation; tests
//! substitute scripted gateways.

mod client;
pub mod prompt;

pub use client::HttpGateway;
pub(crate) use client::build_http_client;

use crate::error::GatewayError;
use crate::session::SessionContext;
use crate::types::ChatRequest;
use async_trait::async_trait;

/// Abstraction over the chat backend.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Complete one request. `session` supplies the caller's identity.
    async fn complete(
        &self,
        request: &ChatRequest,
        session: &SessionContext,
    ) -> Result<String, GatewayError>;
}
