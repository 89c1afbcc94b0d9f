//! Field Mapping SDK - domain model for data-mapping sessions
//!
//! Provides unified interfaces for:
//! - Document field trees built from inspection-service responses
//! - Mapping models, transitions and field actions
//! - Mapping document import/export
//! - Synchronization of mappings against loaded documents
//! - Inspection backends (in-memory, filesystem)

pub mod cli;
pub mod context;
pub mod errors;
pub mod export;
pub mod import;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use context::{ContextConfig, MappingContext, SyncSummary};
pub use errors::{ErrorInfo, ErrorLevel, ErrorLog};
pub use export::{ExportError, ExportResult, MappingSerializer};
pub use import::{DocumentImporter, ImportError, InspectedDocument, MappingDeserializer};
#[cfg(feature = "native-fs")]
pub use storage::filesystem::FileSystemInspectionBackend;
pub use storage::{DocumentLoader, DocumentSpec, InspectionBackend, MemoryInspectionBackend, StorageError};

// Re-export models
pub use models::{
    ActionCatalog, CollectionType, DocId, DocumentDefinition, DocumentStore, DocumentType, Field, FieldAction,
    FieldActionConfig, FieldId, FieldMappingPair, FieldRef, FieldType, LookupTable, MappedField, MappingDefinition,
    MappingModel, TransitionDelimiter, TransitionMode, TransitionModel,
};
