//! Email/password sign-in against the gateway.

use crate::error::AuthError;
use crate::gateway::build_http_client;
use crate::session::Credential;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Exchanges user credentials for a bearer token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AuthError>;
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Authenticator speaking `POST {server}/api/auth`.
pub struct HttpAuthenticator {
    http: reqwest::Client,
    server_url: String,
}

impl HttpAuthenticator {
    pub fn new(server_url: &str, timeout: Duration) -> Self {
        Self {
            http: build_http_client(timeout),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Rejected(
                "email and password are required".to_string(),
            ));
        }
        let url = format!("{}/api/auth", self.server_url);
        debug!(email, "signing in");
        let response = self
            .http
            .post(&url)
            .json(&SignInRequest { email, password })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        // The gateway answers `{token}` on success and `{error}` otherwise,
        // sometimes with a 2xx status either way.
        let parsed = serde_json::from_str::<SignInResponse>(&body).ok();
        match parsed {
            Some(SignInResponse {
                token: Some(token), ..
            }) if !token.trim().is_empty() => Ok(Credential {
                token,
                email: email.to_string(),
            }),
            Some(SignInResponse {
                error: Some(error), ..
            }) => Err(AuthError::Rejected(error)),
            _ if !status.is_success() => Err(AuthError::Rejected(format!(
                "Login failed ({})",
                status.as_u16()
            ))),
            _ => Err(AuthError::Rejected("Login failed".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn successful_sign_in_returns_credential() {
        let url = serve_once("200 OK", r#"{"token":"tok-9"}"#).await;
        let auth = HttpAuthenticator::new(&url, Duration::from_secs(3));
        let credential = auth
            .sign_in(" dev@example.com ", "secret")
            .await
            .expect("sign in");
        assert_eq!(
            credential,
            Credential {
                token: "tok-9".into(),
                email: "dev@example.com".into()
            }
        );
    }

    #[tokio::test]
    async fn gateway_error_message_is_surfaced() {
        let url = serve_once("401 Unauthorized", r#"{"error":"Invalid credentials"}"#).await;
        let auth = HttpAuthenticator::new(&url, Duration::from_secs(3));
        let err = auth
            .sign_in("dev@example.com", "wrong")
            .await
            .expect_err("rejected");
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_locally() {
        let auth = HttpAuthenticator::new("http://127.0.0.1:9", Duration::from_secs(1));
        let err = auth.sign_in("", "pw").await.expect_err("rejected");
        assert!(matches!(err, AuthError::Rejected(_)));
    }
}
