//! Document store
//!
//! Owns every document of a mapping context, including the property and
//! constant pseudo documents, and resolves [`FieldRef`] handles to fields.

use super::document::{DocumentDefinition, DocumentError, DocumentType};
use super::field::{DocId, Field, FieldRef, FieldType};
use std::collections::HashSet;

/// All documents of a mapping session
#[derive(Debug, Clone)]
pub struct DocumentStore {
    docs: Vec<DocumentDefinition>,
    property_doc: DocId,
    constant_doc: DocId,
    none_field: Field,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Create a store holding only the two pseudo documents
    pub fn new() -> Self {
        Self {
            docs: vec![
                DocumentDefinition::property_document(),
                DocumentDefinition::constant_document(),
            ],
            property_doc: DocId(0),
            constant_doc: DocId(1),
            none_field: Field::none(),
        }
    }

    /// Add a document, returning its handle
    pub fn insert(&mut self, doc: DocumentDefinition) -> DocId {
        let id = DocId(self.docs.len());
        self.docs.push(doc);
        id
    }

    /// Swap in a new definition under an existing handle
    ///
    /// Returns `false` when the handle is unknown.
    pub fn replace(&mut self, doc_id: DocId, doc: DocumentDefinition) -> bool {
        match self.docs.get_mut(doc_id.0) {
            Some(slot) => {
                *slot = doc;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, doc_id: DocId) -> Option<&DocumentDefinition> {
        self.docs.get(doc_id.0)
    }

    pub fn get_mut(&mut self, doc_id: DocId) -> Option<&mut DocumentDefinition> {
        self.docs.get_mut(doc_id.0)
    }

    pub fn property_doc(&self) -> DocId {
        self.property_doc
    }

    pub fn constant_doc(&self) -> DocId {
        self.constant_doc
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &DocumentDefinition)> {
        self.docs.iter().enumerate().map(|(i, d)| (DocId(i), d))
    }

    /// Handles of all documents, pseudo documents included
    pub fn ids(&self) -> Vec<DocId> {
        (0..self.docs.len()).map(DocId).collect()
    }

    /// Find a document by its identifier, optionally restricted to one side
    pub fn find_by_id(&self, id: &str, is_source: Option<bool>) -> Option<DocId> {
        self.iter()
            .find(|(_, d)| d.id == id && is_source.is_none_or(|s| d.is_source == s))
            .map(|(doc_id, _)| doc_id)
    }

    /// Find a document by its URI, optionally restricted to one side
    pub fn find_by_uri(&self, uri: &str, is_source: Option<bool>) -> Option<DocId> {
        self.iter()
            .find(|(_, d)| d.uri == uri && is_source.is_none_or(|s| d.is_source == s))
            .map(|(doc_id, _)| doc_id)
    }

    /// Real (non-pseudo) documents of one side
    pub fn documents(&self, is_source: bool) -> Vec<DocId> {
        self.iter()
            .filter(|(_, d)| !d.is_pseudo() && d.is_source == is_source)
            .map(|(doc_id, _)| doc_id)
            .collect()
    }

    pub fn sources(&self) -> Vec<DocId> {
        self.documents(true)
    }

    pub fn targets(&self) -> Vec<DocId> {
        self.documents(false)
    }

    /// The live field behind a reference, `None` for the sentinel or a detached field
    pub fn field(&self, field_ref: FieldRef) -> Option<&Field> {
        match field_ref {
            FieldRef::None => None,
            FieldRef::Field { doc, field } => self.get(doc)?.try_field(field),
        }
    }

    /// Like [`field`](Self::field), falling back to the "None" sentinel
    pub fn resolve(&self, field_ref: FieldRef) -> &Field {
        self.field(field_ref).unwrap_or(&self.none_field)
    }

    pub fn none_field(&self) -> &Field {
        &self.none_field
    }

    /// Document owning a reference
    pub fn document_of(&self, field_ref: FieldRef) -> Option<&DocumentDefinition> {
        field_ref.doc().and_then(|d| self.get(d))
    }

    /// Whether a reference points into one of the pseudo documents
    pub fn is_pseudo_ref(&self, field_ref: FieldRef) -> bool {
        matches!(field_ref.doc(), Some(d) if d == self.property_doc || d == self.constant_doc)
    }

    /// Property pseudo field for `name`, created on first use
    pub fn ensure_property(
        &mut self,
        name: &str,
        value: Option<&str>,
        field_type: FieldType,
    ) -> Result<FieldRef, DocumentError> {
        let doc_id = self.property_doc;
        self.ensure_pseudo_field(doc_id, name, value, field_type)
    }

    /// Drop every property field
    pub fn clear_properties(&mut self) {
        self.docs[self.property_doc.0] = DocumentDefinition::property_document();
    }

    /// Constant pseudo field for `value`, created on first use
    pub fn ensure_constant(&mut self, value: &str, field_type: FieldType) -> Result<FieldRef, DocumentError> {
        let doc_id = self.constant_doc;
        self.ensure_pseudo_field(doc_id, value, Some(value), field_type)
    }

    fn ensure_pseudo_field(
        &mut self,
        doc_id: DocId,
        name: &str,
        value: Option<&str>,
        field_type: FieldType,
    ) -> Result<FieldRef, DocumentError> {
        let doc = &mut self.docs[doc_id.0];
        let path = format!("{}{}", doc.path_separator, name);
        if let Some(existing) = doc.find_field(&path) {
            if let Some(value) = value {
                doc.update_field(existing, |f| f.value = Some(value.to_string()))?;
            }
            return Ok(FieldRef::new(doc_id, existing));
        }
        let mut field = Field::new(name, field_type).with_user_created(true);
        field.value = value.map(str::to_string);
        let id = doc.add_field(field, None)?;
        Ok(FieldRef::new(doc_id, id))
    }

    /// Every indexed path of the initialized real documents of one side
    pub fn all_field_paths(&self, is_source: bool) -> HashSet<String> {
        self.iter()
            .filter(|(_, d)| !d.is_pseudo() && d.is_source == is_source && d.initialized)
            .flat_map(|(_, d)| d.field_paths().iter().cloned())
            .collect()
    }

    /// True once every real document has finished loading, successfully or not
    pub fn documents_settled(&self) -> bool {
        self.docs
            .iter()
            .filter(|d| !d.is_pseudo())
            .all(DocumentDefinition::is_settled)
    }

    /// Number of real documents of the given type
    pub fn count_of_type(&self, document_type: DocumentType) -> usize {
        self.docs
            .iter()
            .filter(|d| d.document_type == document_type)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::FieldNode;

    #[test]
    fn test_store_starts_with_pseudo_documents() {
        let store = DocumentStore::new();
        assert_eq!(store.len(), 2);
        assert!(store.get(store.property_doc()).unwrap().is_pseudo());
        assert!(store.get(store.constant_doc()).unwrap().is_pseudo());
        assert!(store.documents_settled());
        assert!(store.sources().is_empty());
    }

    #[test]
    fn test_pseudo_fields_are_reused() {
        let mut store = DocumentStore::new();
        let a = store.ensure_property("region", Some("eu"), FieldType::String).unwrap();
        let b = store.ensure_property("region", Some("us"), FieldType::String).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.resolve(a).value.as_deref(), Some("us"));
        assert_eq!(store.resolve(a).path, "/region");

        let c = store.ensure_constant("42", FieldType::Integer).unwrap();
        assert_eq!(c.doc(), Some(store.constant_doc()));
        assert!(store.is_pseudo_ref(c));

        store.clear_properties();
        assert!(store.field(a).is_none());
        assert!(store.field(c).is_some());
    }

    #[test]
    fn test_resolve_and_settle() {
        let mut store = DocumentStore::new();
        let doc = DocumentDefinition::new("src", "src", "atlas:json:src", DocumentType::Json, true);
        let doc_id = store.insert(doc);
        assert!(!store.documents_settled());

        store
            .get_mut(doc_id)
            .unwrap()
            .initialize_from_fields(vec![FieldNode::new(Field::new("id", FieldType::Integer))]);
        assert!(store.documents_settled());

        let field = store.get(doc_id).unwrap().find_field("/id").unwrap();
        let field_ref = FieldRef::new(doc_id, field);
        assert_eq!(store.resolve(field_ref).name, "id");
        assert_eq!(store.resolve(FieldRef::None).name, "[None]");
        assert_eq!(store.find_by_uri("atlas:json:src", None), Some(doc_id));
        assert_eq!(store.find_by_uri("atlas:json:src", Some(false)), None);
        assert_eq!(store.find_by_id("src", Some(false)), None);
        assert!(store.all_field_paths(true).contains("/id"));
    }
}
