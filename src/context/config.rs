//! Configuration for a mapping context

use crate::models::DocumentType;
use serde::{Deserialize, Serialize};

const DEFAULT_SERVICE_BASE: &str = "http://localhost:8585/v2/atlas";

/// Configuration for a mapping session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextConfig {
    /// Java class inspection service
    pub java_inspection_service_url: Option<String>,
    /// XML schema/instance inspection service
    pub xml_inspection_service_url: Option<String>,
    /// JSON schema/instance inspection service
    pub json_inspection_service_url: Option<String>,
    /// Mapping validation and action catalog service
    pub mapping_service_url: Option<String>,
    /// Sort every document's fields by display name, not only Java documents
    pub alphabetize_all_documents: bool,
    /// Separator between path segments
    pub path_separator: String,
    /// Target document types that carry the mapping template text
    pub template_document_types: Vec<DocumentType>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            java_inspection_service_url: Some(format!("{}/java/", DEFAULT_SERVICE_BASE)),
            xml_inspection_service_url: Some(format!("{}/xml/", DEFAULT_SERVICE_BASE)),
            json_inspection_service_url: Some(format!("{}/json/", DEFAULT_SERVICE_BASE)),
            mapping_service_url: Some(format!("{}/", DEFAULT_SERVICE_BASE)),
            alphabetize_all_documents: false,
            path_separator: "/".to_string(),
            template_document_types: vec![DocumentType::Xml, DocumentType::Json],
        }
    }
}

impl ContextConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Config without any service endpoints, for offline use
    pub fn offline() -> Self {
        Self {
            java_inspection_service_url: None,
            xml_inspection_service_url: None,
            json_inspection_service_url: None,
            mapping_service_url: None,
            ..Self::default()
        }
    }

    /// Set the inspection service for one document type
    pub fn with_inspection_service_url(mut self, document_type: DocumentType, url: impl Into<String>) -> Self {
        let url = Some(url.into());
        match document_type {
            DocumentType::Java => self.java_inspection_service_url = url,
            DocumentType::Xml => self.xml_inspection_service_url = url,
            DocumentType::Json => self.json_inspection_service_url = url,
            DocumentType::Property | DocumentType::Constant => {}
        }
        self
    }

    pub fn with_mapping_service_url(mut self, url: impl Into<String>) -> Self {
        self.mapping_service_url = Some(url.into());
        self
    }

    pub fn with_alphabetize_all_documents(mut self, enabled: bool) -> Self {
        self.alphabetize_all_documents = enabled;
        self
    }

    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        self.path_separator = separator.into();
        self
    }

    pub fn with_template_document_types(mut self, types: Vec<DocumentType>) -> Self {
        self.template_document_types = types;
        self
    }

    /// Inspection service for a document type; pseudo documents have none
    pub fn inspection_service_url(&self, document_type: DocumentType) -> Option<&str> {
        match document_type {
            DocumentType::Java => self.java_inspection_service_url.as_deref(),
            DocumentType::Xml => self.xml_inspection_service_url.as_deref(),
            DocumentType::Json => self.json_inspection_service_url.as_deref(),
            DocumentType::Property | DocumentType::Constant => None,
        }
        .filter(|url| !url.trim().is_empty())
    }

    pub fn alphabetizes(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::Java || self.alphabetize_all_documents
    }

    pub fn carries_template(&self, document_type: DocumentType) -> bool {
        self.template_document_types.contains(&document_type)
    }
}
