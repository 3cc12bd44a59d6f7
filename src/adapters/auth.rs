//! Service-account OAuth2 for the Google APIs.
//!
//! The key file is exchanged for a bearer token with the JWT-bearer grant:
//! an RS256-signed assertion is posted to the key's `token_uri`.

use crate::utils::error::{EtlError, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read-only access to sheet values and to the Drive file list used for name lookup.
pub const READONLY_SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets.readonly https://www.googleapis.com/auth/drive.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| EtlError::AuthError {
            message: format!(
                "cannot read credentials file {}: {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(content).map_err(|e| EtlError::AuthError {
            message: format!("invalid service-account key: {}", e),
        })?;

        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(EtlError::AuthError {
                message: "service-account key lacks client_email or private_key".to_string(),
            });
        }
        Ok(key)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Fetches the access token once and reuses it for the rest of the run.
pub struct TokenProvider {
    client: Client,
    key: ServiceAccountKey,
    token_uri: String,
    cached: Mutex<Option<String>>,
}

impl TokenProvider {
    pub fn new(client: Client, key: ServiceAccountKey, token_uri: Option<String>) -> Self {
        let token_uri = token_uri.unwrap_or_else(|| key.token_uri.clone());
        Self {
            client,
            key,
            token_uri,
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// 產生簽名過的 JWT assertion
    pub fn assertion(&self, issued_at: i64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: READONLY_SCOPES,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&header, &claims, &signing_key)?)
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn request_token(&self) -> Result<String> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;

        tracing::debug!(
            "Requesting access token for {} from {}",
            self.key.client_email,
            self.token_uri
        );

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{} ({})", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {}: {}", status.as_u16(), body),
            };
            return Err(EtlError::AuthError { message });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        tracing::info!(
            "🔑 Authenticated as {} (token valid for {}s)",
            self.key.client_email,
            token.expires_in.unwrap_or(0)
        );
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email": "par@example.iam.gserviceaccount.com", "private_key": "pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert!(key.private_key_id.is_none());
    }

    #[test]
    fn test_key_requires_email_and_private_key() {
        let result = ServiceAccountKey::from_json(r#"{"client_email": "", "private_key": "pem"}"#);
        assert!(matches!(result, Err(EtlError::AuthError { .. })));

        let result = ServiceAccountKey::from_json("not json");
        assert!(matches!(result, Err(EtlError::AuthError { .. })));
    }

    #[test]
    fn test_missing_key_file() {
        let result = ServiceAccountKey::from_file("/nonexistent/ep-par-processing.json");
        match result {
            Err(EtlError::AuthError { message }) => {
                assert!(message.contains("ep-par-processing.json"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_assertion_rejects_bad_pem() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email": "par@example.iam.gserviceaccount.com", "private_key": "not a pem"}"#,
        )
        .unwrap();
        let provider = TokenProvider::new(Client::new(), key, None);
        assert!(matches!(provider.assertion(0), Err(EtlError::JwtError(_))));
    }
}
