//! File system inspection backend
//!
//! Serves inspection responses saved as `<document id>.json` files and the
//! action catalog saved as `field-actions.json`, all below one base directory.
//!
//! ## Security
//!
//! All path operations are validated to prevent path traversal attacks.
//! Document ids containing ".." are rejected, and all resolved paths are
//! verified to remain within the base directory.

use super::{InspectionBackend, InspectionRequest, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File holding the action catalog response
pub const ACTION_CATALOG_FILE: &str = "field-actions.json";

/// File system inspection backend
pub struct FileSystemInspectionBackend {
    base_path: PathBuf,
}

impl FileSystemInspectionBackend {
    /// Create a backend reading below `base_path`
    ///
    /// # Example
    ///
    /// ```rust
    /// use field_mapping_sdk::storage::filesystem::FileSystemInspectionBackend;
    ///
    /// let backend = FileSystemInspectionBackend::new("/workspace/inspections");
    /// ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Resolve a path relative to the base path with security checks.
    fn resolve_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let normalized = path.trim_start_matches('/');

        if normalized.contains("..") {
            return Err(StorageError::PermissionDenied(
                "Path traversal (..) not allowed".to_string(),
            ));
        }

        let full = self.base_path.join(normalized);
        for component in full.components() {
            if matches!(component, Component::ParentDir) {
                return Err(StorageError::PermissionDenied(
                    "Path traversal not allowed".to_string(),
                ));
            }
        }

        if full.exists() {
            let canonical = full
                .canonicalize()
                .map_err(|e| StorageError::IoError(format!("Failed to resolve path: {}", e)))?;
            let base_canonical = self
                .base_path
                .canonicalize()
                .unwrap_or_else(|_| self.base_path.clone());
            if !canonical.starts_with(&base_canonical) {
                return Err(StorageError::PermissionDenied(
                    "Path escapes base directory".to_string(),
                ));
            }
            return Ok(canonical);
        }

        Ok(full)
    }

    async fn read_json(&self, path: &str) -> Result<Value, StorageError> {
        let full_path = self.resolve_path(path)?;
        debug!(path = %full_path.display(), "Reading inspection file");

        let content = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::FileNotFound(path.to_string())
            } else {
                StorageError::IoError(format!("Failed to read file {}: {}", path, e))
            }
        })?;
        serde_json::from_slice(&content)
            .map_err(|e| StorageError::SerializationError(format!("Invalid JSON in {}: {}", path, e)))
    }
}

#[async_trait(?Send)]
impl InspectionBackend for FileSystemInspectionBackend {
    async fn inspect(&self, request: &InspectionRequest) -> Result<Value, StorageError> {
        self.read_json(&format!("{}.json", request.document_id)).await
    }

    async fn fetch_action_catalog(&self, _service_url: Option<&str>) -> Result<Value, StorageError> {
        self.read_json(ACTION_CATALOG_FILE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use tempfile::TempDir;

    fn request(id: &str) -> InspectionRequest {
        InspectionRequest {
            document_id: id.to_string(),
            document_type: DocumentType::Json,
            is_source: true,
            service_url: None,
        }
    }

    #[test]
    fn test_path_traversal_blocked() {
        let temp = TempDir::new().unwrap();
        let backend = FileSystemInspectionBackend::new(temp.path());

        let result = backend.resolve_path("../etc/passwd");
        assert!(matches!(result, Err(StorageError::PermissionDenied(_))));

        let result = backend.resolve_path("/foo/../../../etc/passwd");
        assert!(matches!(result, Err(StorageError::PermissionDenied(_))));

        let result = backend.resolve_path("person.json");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_reads_inspection_and_catalog_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("person.json"), r#"{"jsonDocument": {}}"#).unwrap();
        std::fs::write(temp.path().join(ACTION_CATALOG_FILE), r#"{"ActionDetails": {}}"#).unwrap();
        let backend = FileSystemInspectionBackend::new(temp.path());

        let response = backend.inspect(&request("person")).await.unwrap();
        assert!(response.get("jsonDocument").is_some());
        assert!(backend.fetch_action_catalog(None).await.is_ok());

        let missing = backend.inspect(&request("nobody")).await;
        assert!(matches!(missing, Err(StorageError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_serialization_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        let backend = FileSystemInspectionBackend::new(temp.path());
        let result = backend.inspect(&request("broken")).await;
        assert!(matches!(result, Err(StorageError::SerializationError(_))));
    }
}
