//! Storage services holding the source documents
//!
//! Used to drop retrieved documents the asking user may not read.

pub mod azure;
#[cfg(feature = "drive")]
pub mod auth;
#[cfg(feature = "drive")]
pub mod drive;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StorageConfig, StorageServiceKind};
use crate::error::Result;
use crate::types::Document;

pub use azure::AzureService;
#[cfg(feature = "drive")]
pub use drive::DriveService;

/// Trait for document permission checks
///
/// Implementations:
/// - `DriveService`: Google Drive per-user permissions
/// - `AzureService`: pass-through
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Keep only documents `user_email` may read, preserving order
    async fn validate_permissions(
        &self,
        documents: Vec<Document>,
        user_email: &str,
    ) -> Result<Vec<Document>>;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// Build the storage service selected by `kind`
pub fn create_storage_service(
    kind: StorageServiceKind,
    config: &StorageConfig,
) -> Result<Arc<dyn StorageService>> {
    match kind {
        StorageServiceKind::Azure => Ok(Arc::new(AzureService)),
        #[cfg(feature = "drive")]
        StorageServiceKind::Drive => {
            let auth = match &config.credentials_path {
                Some(path) => Some(Arc::new(auth::ServiceAccountAuth::from_service_account(
                    path,
                    auth::DRIVE_READONLY_SCOPE,
                )?)),
                None => None,
            };
            Ok(Arc::new(DriveService::new(auth, config.auth_required)?))
        }
        #[cfg(not(feature = "drive"))]
        StorageServiceKind::Drive => {
            let _ = config;
            Err(crate::error::Error::Config(
                "Drive storage service requires the 'drive' feature".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_azure_passes_everything() {
        let service = create_storage_service(StorageServiceKind::Azure, &StorageConfig::default())
            .unwrap();
        let docs = vec![
            Document::new("a", "a.pdf", "https://blob/a.pdf"),
            Document::new("b", "b.pdf", "https://blob/b.pdf"),
        ];

        let allowed = service.validate_permissions(docs.clone(), "").await.unwrap();
        assert_eq!(allowed, docs);
        assert_eq!(service.name(), "azure");
    }

    #[cfg(feature = "drive")]
    #[test]
    fn test_drive_enforced_without_credentials_fails() {
        let config = StorageConfig {
            validate_permissions: true,
            auth_required: true,
            credentials_path: None,
        };
        assert!(create_storage_service(StorageServiceKind::Drive, &config).is_err());
    }
}
