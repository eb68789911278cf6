//! Azure Blob Storage service

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Document;

use super::StorageService;

/// Azure-hosted documents carry no per-user ACL; every document is allowed
pub struct AzureService;

#[async_trait]
impl StorageService for AzureService {
    async fn validate_permissions(
        &self,
        documents: Vec<Document>,
        _user_email: &str,
    ) -> Result<Vec<Document>> {
        Ok(documents)
    }

    fn name(&self) -> &str {
        "azure"
    }
}
