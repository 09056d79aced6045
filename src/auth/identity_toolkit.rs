//! Email/password sign-in against the Identity Toolkit REST API.

use super::{AuthError, IdentityProvider, Session};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Public Identity Toolkit endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for password sign-in.
pub struct IdentityToolkitClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl IdentityToolkitClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Other(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    fn sign_in_url(&self) -> String {
        format!(
            "{}/accounts:signInWithPassword",
            self.endpoint.trim_end_matches('/')
        )
    }
}

/// Map a provider error message to a failure class.
///
/// Messages look like `CODE` or `CODE : detail`.
pub fn classify_error_code(message: &str) -> AuthError {
    let code = message.split([' ', ':']).next().unwrap_or("").trim();

    match code {
        "INVALID_EMAIL" | "MISSING_EMAIL" | "MISSING_PASSWORD" => AuthError::InvalidFormat,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredential
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::RateLimited,
        "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => AuthError::MethodDisabled,
        _ => AuthError::Other(message.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidFormat);
        }

        debug!("Signing in {} via {}", email, self.endpoint);

        let response = self
            .http_client
            .post(self.sign_in_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&SignInRequest {
                email: email.trim(),
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| AuthError::Other(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body: SignInResponse = response
                .json()
                .await
                .map_err(|e| AuthError::Other(e.to_string()))?;

            return Ok(Session {
                user_id: body.local_id,
                email: body.email,
                id_token: body.id_token,
                anonymous: false,
            });
        }

        match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => Err(classify_error_code(&envelope.error.message)),
            Err(_) if status == StatusCode::TOO_MANY_REQUESTS => Err(AuthError::RateLimited),
            Err(_) => Err(AuthError::Other(format!("unexpected status {}", status))),
        }
    }
}
