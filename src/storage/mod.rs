//! Inspection backend abstraction
//!
//! Defines the InspectionBackend trait through which documents and the action
//! catalog are fetched, and the [`DocumentLoader`] that feeds their responses
//! into a [`MappingContext`]:
//! - MemoryInspectionBackend: canned responses (tests, embedding)
//! - FileSystemInspectionBackend: responses saved as JSON files (native apps)

use crate::context::MappingContext;
use crate::models::DocumentType;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

pub mod memory;

#[cfg(feature = "native-fs")]
pub mod filesystem;

pub use memory::MemoryInspectionBackend;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// One inspection to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionRequest {
    pub document_id: String,
    pub document_type: DocumentType,
    pub is_source: bool,
    /// Configured service endpoint for the document type
    pub service_url: Option<String>,
}

/// Trait for inspection backends
///
/// Implementations return the raw inspection and catalog responses; parsing
/// happens in the context.
#[async_trait(?Send)]
pub trait InspectionBackend: Send + Sync {
    /// Fetch the inspection response for one document
    async fn inspect(&self, request: &InspectionRequest) -> Result<Value, StorageError>;

    /// Fetch the action catalog response
    async fn fetch_action_catalog(&self, service_url: Option<&str>) -> Result<Value, StorageError>;
}

/// Document to register and load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpec {
    pub id: String,
    pub name: String,
    pub document_type: DocumentType,
    pub is_source: bool,
}

impl DocumentSpec {
    pub fn new(id: impl Into<String>, document_type: DocumentType, is_source: bool) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            document_type,
            is_source,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Counts reported by [`DocumentLoader::load_documents`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub failed: usize,
    /// Loads not issued, e.g. for lack of a configured service
    pub skipped: usize,
}

/// Issues inspections concurrently and applies each result as it completes
pub struct DocumentLoader<'a, B: InspectionBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: InspectionBackend + ?Sized> DocumentLoader<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Fetch and install the action catalog
    pub async fn load_action_catalog(&self, ctx: &mut MappingContext) -> Result<usize, StorageError> {
        let service_url = ctx.config.mapping_service_url.clone();
        let response = self.backend.fetch_action_catalog(service_url.as_deref()).await?;
        ctx.load_action_catalog(&response)
            .map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// Register and load every document
    ///
    /// Responses are applied to the context one at a time in completion
    /// order; each application re-synchronizes the mappings.
    pub async fn load_documents(&self, ctx: &mut MappingContext, specs: &[DocumentSpec]) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut pending = FuturesUnordered::new();

        for spec in specs {
            let doc_id = ctx.add_document(&spec.id, &spec.name, spec.document_type, spec.is_source);
            if !ctx.begin_document_load(doc_id) {
                summary.skipped += 1;
                continue;
            }
            let request = InspectionRequest {
                document_id: spec.id.clone(),
                document_type: spec.document_type,
                is_source: spec.is_source,
                service_url: ctx
                    .config
                    .inspection_service_url(spec.document_type)
                    .map(str::to_string),
            };
            let backend = self.backend;
            pending.push(async move {
                let result = backend.inspect(&request).await;
                (doc_id, request, result)
            });
        }

        while let Some((doc_id, request, result)) = pending.next().await {
            match result {
                Ok(response) => match ctx.complete_document_load(doc_id, &response) {
                    Ok(()) => summary.loaded += 1,
                    Err(e) => {
                        warn!(document = %request.document_id, error = %e, "Could not parse inspection response");
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    ctx.fail_document_load(doc_id, &e.to_string());
                    summary.failed += 1;
                }
            }
        }

        info!(
            loaded = summary.loaded,
            failed = summary.failed,
            skipped = summary.skipped,
            settled = ctx.documents_settled(),
            "Document loading finished"
        );
        summary
    }
}
