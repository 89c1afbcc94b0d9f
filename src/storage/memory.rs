//! In-memory inspection backend

use super::{InspectionBackend, InspectionRequest, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Backend serving canned responses keyed by document id
#[derive(Debug, Clone, Default)]
pub struct MemoryInspectionBackend {
    responses: HashMap<String, Value>,
    action_catalog: Option<Value>,
}

impl MemoryInspectionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document_id: impl Into<String>, response: Value) -> Self {
        self.responses.insert(document_id.into(), response);
        self
    }

    pub fn with_action_catalog(mut self, response: Value) -> Self {
        self.action_catalog = Some(response);
        self
    }
}

#[async_trait(?Send)]
impl InspectionBackend for MemoryInspectionBackend {
    async fn inspect(&self, request: &InspectionRequest) -> Result<Value, StorageError> {
        self.responses
            .get(&request.document_id)
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(request.document_id.clone()))
    }

    async fn fetch_action_catalog(&self, _service_url: Option<&str>) -> Result<Value, StorageError> {
        self.action_catalog
            .clone()
            .ok_or_else(|| StorageError::BackendError("No action catalog configured".to_string()))
    }
}
