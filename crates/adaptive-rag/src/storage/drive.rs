//! Google Drive permission checks

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::types::Document;

use super::auth::ServiceAccountAuth;
use super::StorageService;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Keeps documents the user holds a direct Drive permission on
pub struct DriveService {
    client: reqwest::Client,
    auth: Option<Arc<ServiceAccountAuth>>,
    api_base: String,
    auth_required: bool,
}

#[derive(Debug, Deserialize)]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Permission {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    email_address: Option<String>,
}

impl DriveService {
    /// Create the service. Credentials are required only when permissions
    /// are enforced.
    pub fn new(auth: Option<Arc<ServiceAccountAuth>>, auth_required: bool) -> Result<Self> {
        if auth_required && auth.is_none() {
            return Err(Error::Config(
                "GOOGLE_APPLICATION_CREDENTIALS environment variable is not set.".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            auth,
            api_base: DRIVE_API_BASE.to_string(),
            auth_required,
        })
    }

    /// Point at a different Drive API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn list_permissions(&self, auth: &ServiceAccountAuth, file_id: &str) -> Result<PermissionList> {
        let token = auth.get_token().await?;
        let url = format!("{}/files/{}/permissions", self.api_base, file_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("fields", "permissions(type,emailAddress)")])
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Drive permissions request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "Drive permissions for {} failed ({}): {}",
                file_id, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Storage(format!("Failed to parse Drive permissions: {}", e)))
    }
}

/// Extract the Drive file id from a document link
/// (`.../d/<id>/edit` or `.../d/<id>/view`)
pub fn extract_drive_file_id(source: &str) -> Option<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"/d/([^/?#]+)/(?:edit|view)").expect("Invalid regex"));

    pattern
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn has_user_permission(permissions: &PermissionList, user_email: &str) -> bool {
    permissions
        .permissions
        .iter()
        .any(|p| p.kind == "user" && p.email_address.as_deref() == Some(user_email))
}

#[async_trait]
impl StorageService for DriveService {
    async fn validate_permissions(
        &self,
        documents: Vec<Document>,
        user_email: &str,
    ) -> Result<Vec<Document>> {
        if documents.is_empty() || !self.auth_required {
            return Ok(documents);
        }

        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| Error::Config("Drive credentials missing".to_string()))?;

        let total = documents.len();
        let mut allowed = Vec::with_capacity(total);

        for document in documents {
            let Some(file_id) = extract_drive_file_id(&document.source) else {
                tracing::debug!("No Drive id in source {}, dropping", document.source);
                continue;
            };

            let permissions = self.list_permissions(auth, file_id).await?;
            if has_user_permission(&permissions, user_email) {
                allowed.push(document);
            }
        }

        tracing::info!("Drive permissions: {}/{} documents allowed", allowed.len(), total);
        Ok(allowed)
    }

    fn name(&self) -> &str {
        "drive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use crate::storage::auth::DRIVE_READONLY_SCOPE;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/service_account_key.pem");

    async fn token() -> Json<serde_json::Value> {
        Json(json!({"access_token": "stub-token", "expires_in": 3600}))
    }

    async fn permissions(Path(file_id): Path<String>, headers: HeaderMap) -> Response {
        let authorized = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
            == Some("Bearer stub-token");
        if !authorized {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        let email = match file_id.as_str() {
            "sop-1" | "sop-4" => "ana@example.com",
            "sop-2" => "bob@example.com",
            _ => return StatusCode::NOT_FOUND.into_response(),
        };
        Json(json!({"permissions": [
            {"type": "anyone"},
            {"type": "user", "emailAddress": email}
        ]}))
        .into_response()
    }

    /// Serve a token endpoint and the Drive permissions API on a local port;
    /// returns the enforcing service pointed at it
    async fn service_with_stub() -> DriveService {
        let app = Router::new()
            .route("/token", post(token))
            .route("/files/:file_id/permissions", get(permissions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let key_path = std::env::temp_dir().join(format!("drive-key-{}.json", uuid::Uuid::new_v4()));
        let key = json!({
            "client_email": "svc@example.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
            "token_uri": format!("{}/token", base),
        });
        std::fs::write(&key_path, key.to_string()).unwrap();

        let auth = ServiceAccountAuth::from_service_account(&key_path, DRIVE_READONLY_SCOPE).unwrap();
        DriveService::new(Some(Arc::new(auth)), true)
            .unwrap()
            .with_api_base(base)
    }

    fn drive_doc(name: &str, source: &str) -> Document {
        Document::new(format!("content of {}", name), name, source)
    }

    #[tokio::test]
    async fn test_enforced_permissions_keep_allowed_in_order() {
        let service = service_with_stub().await;
        let docs = vec![
            drive_doc("a.pdf", "https://docs.google.com/document/d/sop-1/edit"),
            drive_doc("b.pdf", "https://drive.google.com/file/d/sop-2/view"),
            drive_doc("c.pdf", "https://example.com/c.pdf"),
            drive_doc("d.pdf", "https://drive.google.com/file/d/sop-4/view?usp=sharing"),
        ];

        let allowed = service
            .validate_permissions(docs.clone(), "ana@example.com")
            .await
            .unwrap();

        assert_eq!(allowed, vec![docs[0].clone(), docs[3].clone()]);
    }

    #[tokio::test]
    async fn test_failed_permission_lookup_is_storage_error() {
        let service = service_with_stub().await;
        let docs = vec![drive_doc("x.pdf", "https://drive.google.com/file/d/unknown/view")];

        let result = service.validate_permissions(docs, "ana@example.com").await;
        assert!(matches!(result, Err(Error::Storage(msg)) if msg.contains("unknown")));
    }

    #[test]
    fn test_extract_drive_file_id() {
        assert_eq!(
            extract_drive_file_id("https://docs.google.com/document/d/1AbC-xyz_09/edit?usp=sharing"),
            Some("1AbC-xyz_09")
        );
        assert_eq!(
            extract_drive_file_id("https://drive.google.com/file/d/0BzQ/view"),
            Some("0BzQ")
        );
        assert_eq!(extract_drive_file_id("https://example.com/manual.pdf"), None);
    }

    #[test]
    fn test_has_user_permission() {
        let perms: PermissionList = serde_json::from_str(
            r#"{"permissions": [
                {"type": "domain"},
                {"type": "group", "emailAddress": "qa@example.com"},
                {"type": "user", "emailAddress": "ana@example.com"}
            ]}"#,
        )
        .unwrap();

        assert!(has_user_permission(&perms, "ana@example.com"));
        assert!(!has_user_permission(&perms, "qa@example.com"));
        assert!(!has_user_permission(&perms, "bob@example.com"));
    }

    #[test]
    fn test_enforcement_requires_credentials() {
        assert!(DriveService::new(None, true).is_err());
        assert!(DriveService::new(None, false).is_ok());
    }

    #[tokio::test]
    async fn test_passthrough_when_not_enforced() {
        let service = DriveService::new(None, false).unwrap();
        let docs = vec![Document::new("c", "f.pdf", "https://example.com/f.pdf")];

        let allowed = service.validate_permissions(docs.clone(), "ana@example.com").await.unwrap();
        assert_eq!(allowed, docs);
    }
}
