//! Google service account authentication
//!
//! Signs a JWT with the account's private key and exchanges it for an OAuth2
//! access token, cached until shortly before expiry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Read-only Google Drive scope
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Service account token source
pub struct ServiceAccountAuth {
    /// Service account key path
    key_path: PathBuf,
    /// OAuth2 scope requested
    scope: String,
    /// Cached access token
    token: Arc<RwLock<Option<CachedToken>>>,
    client: reqwest::Client,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(serde::Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ServiceAccountAuth {
    /// Create from service account JSON key file
    pub fn from_service_account(key_path: impl AsRef<Path>, scope: impl Into<String>) -> Result<Self> {
        let key_path = key_path.as_ref().to_path_buf();
        if !key_path.exists() {
            return Err(Error::Config(format!(
                "Service account key not found: {}",
                key_path.display()
            )));
        }

        Ok(Self {
            key_path,
            scope: scope.into(),
            token: Arc::new(RwLock::new(None)),
            client: reqwest::Client::new(),
        })
    }

    /// Get a valid access token (refreshing if needed)
    pub async fn get_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(ref cached) = *token {
                // Valid for at least 60 more seconds
                if cached.expires_at > Instant::now() + Duration::from_secs(60) {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let (access_token, expires_in) = self.refresh_token().await?;

        {
            let mut token = self.token.write().await;
            *token = Some(CachedToken {
                access_token: access_token.clone(),
                expires_at: Instant::now() + Duration::from_secs(expires_in),
            });
        }

        Ok(access_token)
    }

    /// Exchange a signed JWT for an access token
    async fn refresh_token(&self) -> Result<(String, u64)> {
        let key_content = tokio::fs::read_to_string(&self.key_path).await.map_err(|e| {
            Error::Config(format!(
                "Failed to read service account key {}: {}",
                self.key_path.display(),
                e
            ))
        })?;

        let key: ServiceAccountKey = serde_json::from_str(&key_content)
            .map_err(|e| Error::Config(format!("Invalid service account key format: {}", e)))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Internal(format!("System clock before epoch: {}", e)))?
            .as_secs() as i64;

        let jwt = sign_jwt(&key, &self.scope, now)?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Storage(format!("Failed to parse token response: {}", e)))?;

        // Tokens are typically valid for an hour
        Ok((
            token_response.access_token,
            token_response.expires_in.unwrap_or(55 * 60),
        ))
    }
}

/// Build and RS256-sign the assertion JWT
fn sign_jwt(key: &ServiceAccountKey, scope: &str, now: i64) -> Result<String> {
    use base64::Engine;

    let claims = serde_json::json!({
        "iss": key.client_email,
        "scope": scope,
        "aud": key.token_uri,
        "iat": now,
        "exp": now + 3600,
    });

    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(r#"{"alg":"RS256","typ":"JWT"}"#.as_bytes());
    let payload = engine.encode(claims.to_string().as_bytes());
    let signing_input = format!("{}.{}", header, payload);

    let private_key = key.private_key.replace("\\n", "\n");
    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(
        pem::parse(&private_key)
            .map_err(|e| Error::Config(format!("Failed to parse private key PEM: {}", e)))?
            .contents(),
    )
    .map_err(|e| Error::Config(format!("Failed to parse private key: {:?}", e)))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            signing_input.as_bytes(),
            &mut signature,
        )
        .map_err(|e| Error::Config(format!("Failed to sign JWT: {:?}", e)))?;

    Ok(format!("{}.{}", signing_input, engine.encode(&signature)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_file() {
        let result = ServiceAccountAuth::from_service_account(
            "/nonexistent/service-account.json",
            DRIVE_READONLY_SCOPE,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_pem_is_config_error() {
        let key = ServiceAccountKey {
            client_email: "svc@example.iam.gserviceaccount.com".to_string(),
            private_key: "not a key".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        };
        assert!(matches!(
            sign_jwt(&key, DRIVE_READONLY_SCOPE, 0),
            Err(Error::Config(_))
        ));
    }
}
