//! Import functionality
//!
//! Provides parsers turning external JSON into the domain model:
//! - Inspection-service responses (Java, XML, JSON) into field trees
//! - Serialized mapping documents into pending mapping models

pub mod inspection;
pub mod mapping;

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Error message reported by the inspection service itself
    #[error("Inspection error: {0}")]
    InspectionError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ParseError(err.to_string())
    }
}

// Re-export for convenience
pub use inspection::{DocumentImporter, InspectedDocument};
pub use mapping::{DeserializeSummary, MappingDeserializer};
