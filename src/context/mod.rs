//! Mapping context
//!
//! [`MappingContext`] is the session object: it owns the document store, the
//! mapping definition, the action catalog, the error log and the
//! configuration, and is passed explicitly to everything that needs them.
//!
//! Every mutation that can change what a mapping refers to ends with
//! [`MappingContext::synchronize`], which runs stale removal, resolution, table
//! identifier detection and status propagation in that order.

pub mod config;

pub use config::ContextConfig;

use crate::errors::{ErrorInfo, ErrorLog};
use crate::export::{ExportError, MappingSerializer};
use crate::import::{DeserializeSummary, DocumentImporter, ImportError, MappingDeserializer};
use crate::models::{
    ActionCatalog, DocId, DocumentDefinition, DocumentError, DocumentStore, DocumentType, Field, FieldRef,
    FieldType, MappingDefinition, MappingModel, SelectionRejection,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one [`MappingContext::synchronize`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub stale_removed: usize,
    /// Endpoints still carrying parsed data
    pub pending_fields: usize,
    /// Mappings with at least one pair flagged unresolved
    pub unresolved_mappings: usize,
}

/// All state of one mapping session
#[derive(Debug, Default)]
pub struct MappingContext {
    pub config: ContextConfig,
    pub documents: DocumentStore,
    pub mappings: MappingDefinition,
    pub actions: ActionCatalog,
    pub errors: ErrorLog,
}

impl MappingContext {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Register an empty document, or return the existing one with the same id and side
    pub fn add_document(
        &mut self,
        id: &str,
        name: &str,
        document_type: DocumentType,
        is_source: bool,
    ) -> DocId {
        if let Some(existing) = self.documents.find_by_id(id, Some(is_source)) {
            return existing;
        }
        let doc = DocumentDefinition::new(id, name, document_type.uri_for(id), document_type, is_source)
            .with_path_separator(self.config.path_separator.clone())
            .with_alphabetize(self.config.alphabetizes(document_type));
        let doc_id = self.documents.insert(doc);
        debug!(document = %id, document_type = %document_type, is_source, "Added document");
        doc_id
    }

    /// Insert a fully built document, replacing one with the same id and side
    pub fn add_document_definition(&mut self, doc: DocumentDefinition) -> DocId {
        let doc_id = match self.documents.find_by_id(&doc.id, Some(doc.is_source)) {
            Some(existing) => {
                self.mappings.detach_document(existing, &self.documents);
                self.documents.replace(existing, doc);
                existing
            }
            None => self.documents.insert(doc),
        };
        self.synchronize();
        doc_id
    }

    /// Prepare a document for loading
    ///
    /// Returns `false` when the load should not be issued: the handle is
    /// unknown, or no inspection service is configured for the document type.
    /// The latter settles the document with an error.
    pub fn begin_document_load(&mut self, doc_id: DocId) -> bool {
        let Some(doc) = self.documents.get(doc_id) else {
            return false;
        };
        let document_type = doc.document_type;
        if document_type.is_pseudo() {
            return false;
        }
        if self.config.inspection_service_url(document_type).is_none() {
            let message = format!("No inspection service configured for {} documents", document_type);
            self.fail_document_load(doc_id, &message);
            return false;
        }
        if let Some(doc) = self.documents.get_mut(doc_id) {
            doc.error_occurred = false;
        }
        true
    }

    /// Apply an inspection response to a document and re-synchronize
    ///
    /// A document that was already initialized is replaced: mapped fields
    /// pointing into it are detached to their parsed form first and resolved
    /// again against the new tree.
    pub fn complete_document_load(&mut self, doc_id: DocId, response: &Value) -> Result<(), ImportError> {
        let doc = self
            .documents
            .get(doc_id)
            .ok_or_else(|| ImportError::ValidationError(format!("Unknown document #{}", doc_id.index())))?;
        let document_type = doc.document_type;

        let inspected = match DocumentImporter::new().import(document_type, response) {
            Ok(inspected) => inspected,
            Err(e) => {
                self.fail_document_load(doc_id, &e.to_string());
                return Err(e);
            }
        };

        let doc = self
            .documents
            .get(doc_id)
            .ok_or_else(|| ImportError::ValidationError(format!("Unknown document #{}", doc_id.index())))?;
        let mut replacement = DocumentDefinition::new(
            doc.id.clone(),
            doc.name.clone(),
            inspected.uri.unwrap_or_else(|| doc.uri.clone()),
            document_type,
            doc.is_source,
        )
        .with_path_separator(doc.path_separator.clone())
        .with_namespaces(inspected.namespaces)
        .with_alphabetize(doc.alphabetize);
        let reloaded = doc.initialized;

        if reloaded {
            self.mappings.detach_document(doc_id, &self.documents);
        }
        replacement.initialize_from_fields(inspected.fields);
        info!(
            document = %replacement.id,
            fields = replacement.field_count(),
            excluded = inspected.excluded,
            reloaded,
            "Loaded document"
        );
        self.documents.replace(doc_id, replacement);
        self.synchronize();
        Ok(())
    }

    /// Settle a document whose load failed
    pub fn fail_document_load(&mut self, doc_id: DocId, message: &str) {
        let Some(doc) = self.documents.get_mut(doc_id) else {
            return;
        };
        doc.error_occurred = true;
        let id = doc.id.clone();
        warn!(document = %id, error = %message, "Document load failed");
        self.errors
            .report(ErrorInfo::error(format!("Could not load document '{}': {}", id, message)));
        self.synchronize();
    }

    /// Every real document has finished loading, successfully or not
    pub fn documents_settled(&self) -> bool {
        self.documents.documents_settled()
    }

    /// Replace the action catalog from a catalog response
    ///
    /// Load the catalog before mappings: parsed actions are matched against it
    /// when their fields resolve.
    pub fn load_action_catalog(&mut self, response: &Value) -> Result<usize, ImportError> {
        self.actions = ActionCatalog::from_json(response)?;
        info!(actions = self.actions.len(), "Loaded action catalog");
        self.synchronize();
        Ok(self.actions.len())
    }

    /// Replace all mappings with those of a mapping document
    pub fn load_mappings(&mut self, document: &Value) -> Result<DeserializeSummary, ImportError> {
        let summary = MappingDeserializer::new().deserialize(self, document)?;
        self.synchronize();
        Ok(summary)
    }

    pub fn export_mappings(&mut self) -> Result<Value, ExportError> {
        MappingSerializer::new().serialize(self)
    }

    /// Bring mappings and document status in line with the loaded documents
    pub fn synchronize(&mut self) -> SyncSummary {
        let stale_removed = self.mappings.remove_stale_mappings(&mut self.documents);
        self.mappings
            .update_mappings_from_documents(&mut self.documents, &self.actions, &mut self.errors);
        self.mappings.detect_table_identifiers(&self.documents);
        self.mappings.update_document_status(&mut self.documents);

        let summary = SyncSummary {
            stale_removed,
            pending_fields: self
                .mappings
                .mappings()
                .iter()
                .flat_map(|m| m.mapped_fields())
                .filter(|(mf, _)| mf.is_pending())
                .count(),
            unresolved_mappings: self
                .mappings
                .mappings()
                .iter()
                .filter(|m| m.has_unresolved_fields())
                .count(),
        };
        debug!(
            stale_removed = summary.stale_removed,
            pending = summary.pending_fields,
            unresolved = summary.unresolved_mappings,
            "Synchronized mappings"
        );
        summary
    }

    /// Start a new empty mapping and make it active
    pub fn create_mapping(&mut self) -> Uuid {
        let uuid = self.mappings.add_mapping(MappingModel::new());
        self.mappings.set_active_mapping(Some(uuid));
        self.mappings.update_document_status(&mut self.documents);
        uuid
    }

    /// Add a field to the active mapping, creating one when none is active
    ///
    /// Enum-to-enum mappings get a lookup table attached.
    pub fn add_field_to_active_mapping(
        &mut self,
        field_ref: FieldRef,
        is_source: bool,
    ) -> Result<(), SelectionRejection> {
        let mapping_id = match self.mappings.active_mapping_id() {
            Some(id) => id,
            None => self.create_mapping(),
        };
        let Some(mapping) = self.mappings.mapping_mut(mapping_id) else {
            return Err(SelectionRejection::Unresolved);
        };
        if let Some(rejection) = mapping.selection_rejection(field_ref, is_source, &self.documents) {
            debug!(mapping_id = %mapping_id, reason = %rejection, "Rejected field selection");
            return Err(rejection);
        }
        mapping
            .current_pair_mut()
            .add_field(field_ref, is_source, &self.documents, &self.actions);
        self.mappings
            .initialize_mapping_lookup_table(mapping_id, &self.documents);
        self.mappings.update_document_status(&mut self.documents);
        Ok(())
    }

    /// Remove a field from the active mapping; `false` if it was not part of it
    pub fn remove_field_from_active_mapping(&mut self, field_ref: FieldRef) -> bool {
        let Some(mapping) = self.mappings.active_mapping_mut() else {
            return false;
        };
        if !mapping.has_field(field_ref) {
            return false;
        }
        for pair in &mut mapping.field_mappings {
            if pair.has_field(field_ref) {
                pair.remove_field(field_ref, &self.documents, &self.actions);
            }
        }
        self.mappings.update_document_status(&mut self.documents);
        true
    }

    pub fn remove_mapping(&mut self, uuid: Uuid) -> bool {
        let removed = self.mappings.remove_mapping(uuid).is_some();
        if removed {
            self.errors.clear_mapping(uuid);
            self.mappings.update_document_status(&mut self.documents);
        }
        removed
    }

    pub fn set_active_mapping(&mut self, uuid: Option<Uuid>) -> bool {
        let changed = self.mappings.set_active_mapping(uuid);
        if changed {
            self.mappings.update_document_status(&mut self.documents);
        }
        changed
    }

    pub fn add_property(&mut self, name: &str, value: &str, field_type: FieldType) -> Result<FieldRef, DocumentError> {
        self.documents.ensure_property(name, Some(value), field_type)
    }

    pub fn add_constant(&mut self, value: &str, field_type: FieldType) -> Result<FieldRef, DocumentError> {
        self.documents.ensure_constant(value, field_type)
    }

    /// Attach a runtime validation response; returns results attached to mappings
    pub fn apply_validation_response(&mut self, response: &Value) -> Result<usize, ImportError> {
        Ok(self
            .mappings
            .apply_validation_response(response, &mut self.errors)?)
    }

    /// Look up a field by path, expanding complex types as needed
    pub fn find_field(&mut self, doc_id: DocId, path: &str) -> Option<FieldRef> {
        let doc = self.documents.get_mut(doc_id)?;
        match doc.get_field(path) {
            Ok(field) => field.map(|f| FieldRef::new(doc_id, f)),
            Err(e) => {
                debug!(path, error = %e, "Field lookup failed");
                None
            }
        }
    }

    pub fn field(&self, field_ref: FieldRef) -> Option<&Field> {
        self.documents.field(field_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_response() -> Value {
        json!({ "JsonInspectionResponse": { "jsonDocument": { "fields": { "field": [
            { "name": "first", "path": "/first", "fieldType": "STRING" },
            { "name": "last", "path": "/last", "fieldType": "STRING" }
        ]}}}})
    }

    #[test]
    fn test_add_document_dedupes_by_id_and_side() {
        let mut ctx = MappingContext::new(ContextConfig::offline());
        let a = ctx.add_document("person", "Person", DocumentType::Json, true);
        let b = ctx.add_document("person", "Person", DocumentType::Json, true);
        let c = ctx.add_document("person", "Person", DocumentType::Json, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!ctx.documents_settled());
    }

    #[test]
    fn test_begin_load_without_service_settles_with_error() {
        let mut ctx = MappingContext::new(ContextConfig::offline());
        let doc = ctx.add_document("person", "Person", DocumentType::Json, true);
        assert!(!ctx.begin_document_load(doc));
        assert!(ctx.documents.get(doc).unwrap().error_occurred);
        assert!(ctx.documents_settled());
        assert!(ctx.errors.contains("No inspection service configured"));
    }

    #[test]
    fn test_complete_load_and_select_fields() {
        let mut ctx = MappingContext::new(ContextConfig::default());
        let src = ctx.add_document("person", "Person", DocumentType::Json, true);
        let tgt = ctx.add_document("contact", "Contact", DocumentType::Json, false);
        assert!(ctx.begin_document_load(src));
        ctx.complete_document_load(src, &json_response()).unwrap();
        ctx.complete_document_load(tgt, &json_response()).unwrap();
        assert!(ctx.documents_settled());

        let first = ctx.find_field(src, "/first").unwrap();
        let target = ctx.find_field(tgt, "/last").unwrap();
        ctx.add_field_to_active_mapping(first, true).unwrap();
        ctx.add_field_to_active_mapping(target, false).unwrap();

        let mapping = ctx.mappings.active_mapping().unwrap();
        assert_eq!(mapping.mapped_field_refs(), vec![first, target]);
        assert!(ctx.field(first).unwrap().selected);
        assert!(ctx.field(target).unwrap().part_of_mapping);

        assert!(ctx.remove_field_from_active_mapping(first));
        assert!(!ctx.field(first).unwrap().part_of_mapping);
    }

    #[test]
    fn test_failed_import_marks_document() {
        let mut ctx = MappingContext::new(ContextConfig::default());
        let doc = ctx.add_document("person", "Person", DocumentType::Json, true);
        let response = json!({ "JsonInspectionResponse": { "errorMessage": "boom" } });
        assert!(ctx.complete_document_load(doc, &response).is_err());
        assert!(ctx.documents.get(doc).unwrap().error_occurred);
        assert!(ctx.errors.contains("boom"));
    }
}
