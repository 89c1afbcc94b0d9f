//! Document definition model
//!
//! One source or target schema (Java class, XML or JSON document, or one of the
//! property/constant pseudo documents) together with its field tree.
//!
//! Fields are stored in an arena owned by the document. The flattened indices
//! (`all_fields`, `terminal_fields`, `field_paths`, `fields_by_path`) are kept
//! in sync incrementally as fields are added, updated, removed or lazily
//! expanded; they are never rebuilt from scratch outside of
//! [`DocumentDefinition::initialize_from_fields`].

use super::field::{DocId, Field, FieldId, FieldRef, display_key, join_path};
use super::mapping_definition::MappingDefinition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

/// Identifier of the property pseudo document
pub const PROPERTY_DOCUMENT_ID: &str = "DOC.Properties";
/// Identifier of the constant pseudo document
pub const CONSTANT_DOCUMENT_ID: &str = "DOC.Constants";

/// Kind of schema a document was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    Java,
    Xml,
    Json,
    Property,
    Constant,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Java => "JAVA",
            DocumentType::Xml => "XML",
            DocumentType::Json => "JSON",
            DocumentType::Property => "PROPERTY",
            DocumentType::Constant => "CONSTANT",
        }
    }

    /// Property and constant documents are synthetic
    pub fn is_pseudo(&self) -> bool {
        matches!(self, DocumentType::Property | DocumentType::Constant)
    }

    /// Wire type tag for fields of this document type
    pub fn field_json_type(&self) -> &'static str {
        match self {
            DocumentType::Java => "JavaField",
            DocumentType::Xml => "XmlField",
            DocumentType::Json => "JsonField",
            DocumentType::Property => "PropertyField",
            DocumentType::Constant => "ConstantField",
        }
    }

    /// Wire type tag for the data source entry of this document type
    pub fn data_source_json_type(&self) -> &'static str {
        match self {
            DocumentType::Xml => "XmlDataSource",
            DocumentType::Json => "JsonDataSource",
            _ => "DataSource",
        }
    }

    /// Detect the document type from a data source URI
    pub fn from_uri(uri: &str) -> Option<Self> {
        let lower = uri.to_lowercase();
        if lower.starts_with("atlas:java") {
            Some(DocumentType::Java)
        } else if lower.starts_with("atlas:xml") {
            Some(DocumentType::Xml)
        } else if lower.starts_with("atlas:json") {
            Some(DocumentType::Json)
        } else if lower.starts_with("atlas:property") {
            Some(DocumentType::Property)
        } else if lower.starts_with("atlas:constant") {
            Some(DocumentType::Constant)
        } else {
            None
        }
    }

    /// Default data source URI for a document of this type
    pub fn uri_for(&self, id: &str) -> String {
        match self {
            DocumentType::Java => format!("atlas:java?className={}", id),
            DocumentType::Xml => format!("atlas:xml:{}", id),
            DocumentType::Json => format!("atlas:json:{}", id),
            DocumentType::Property => "atlas:property".to_string(),
            DocumentType::Constant => "atlas:constant".to_string(),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// XML namespace declared by a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceModel {
    pub alias: String,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_uri: Option<String>,
    #[serde(default)]
    pub target_namespace: bool,
}

/// Errors raised by field tree operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// An ancestor segment of a requested path does not exist
    #[error("Parent field '{parent}' not found while resolving '{path}'")]
    ParentFieldNotFound { path: String, parent: String },

    /// No cached subtree exists for a complex field's type
    #[error("No cached complex type found for '{0}'")]
    ComplexTypeNotFound(String),

    #[error("Field path already exists: {0}")]
    DuplicatePath(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),
}

/// A parsed field and its children, as produced by the inspection importers
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub field: Field,
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<FieldNode>) -> Self {
        self.children = children;
        self
    }
}

/// Sort sibling nodes by display name
///
/// Siblings whose display names collide keep only the later node in original
/// order.
pub fn alphabetize_nodes(nodes: Vec<FieldNode>) -> Vec<FieldNode> {
    let mut by_key: BTreeMap<String, FieldNode> = BTreeMap::new();
    for node in nodes {
        let key = display_key(&node.field.name);
        if by_key.insert(key.clone(), node).is_some() {
            debug!(key = %key, "Dropping sibling field with duplicate display name");
        }
    }
    by_key.into_values().collect()
}

/// One schema and its indexed field tree
#[derive(Debug, Clone)]
pub struct DocumentDefinition {
    /// Document identifier (class name, schema id, ...)
    pub id: String,
    pub name: String,
    pub uri: String,
    pub document_type: DocumentType,
    pub is_source: bool,
    pub path_separator: String,
    pub namespaces: Vec<NamespaceModel>,
    /// Sort siblings by display name when initializing
    pub alphabetize: bool,
    /// Fields have been populated from an inspection response
    pub initialized: bool,
    /// Loading failed; the document will not receive fields
    pub error_occurred: bool,

    arena: Vec<Field>,
    fields: Vec<FieldId>,
    all_fields: Vec<FieldId>,
    terminal_fields: Vec<FieldId>,
    field_paths: Vec<String>,
    fields_by_path: HashMap<String, FieldId>,
    complex_fields_by_class_identifier: HashMap<String, FieldId>,
    enum_fields_by_class_identifier: HashMap<String, FieldId>,
}

impl DocumentDefinition {
    /// Create an empty, uninitialized document
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        uri: impl Into<String>,
        document_type: DocumentType,
        is_source: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uri: uri.into(),
            document_type,
            is_source,
            path_separator: "/".to_string(),
            namespaces: Vec::new(),
            alphabetize: document_type == DocumentType::Java,
            initialized: false,
            error_occurred: false,
            arena: Vec::new(),
            fields: Vec::new(),
            all_fields: Vec::new(),
            terminal_fields: Vec::new(),
            field_paths: Vec::new(),
            fields_by_path: HashMap::new(),
            complex_fields_by_class_identifier: HashMap::new(),
            enum_fields_by_class_identifier: HashMap::new(),
        }
    }

    /// Create the property pseudo document
    pub fn property_document() -> Self {
        let mut doc = Self::new(
            PROPERTY_DOCUMENT_ID,
            "Properties",
            DocumentType::Property.uri_for(PROPERTY_DOCUMENT_ID),
            DocumentType::Property,
            true,
        );
        doc.initialized = true;
        doc
    }

    /// Create the constant pseudo document
    pub fn constant_document() -> Self {
        let mut doc = Self::new(
            CONSTANT_DOCUMENT_ID,
            "Constants",
            DocumentType::Constant.uri_for(CONSTANT_DOCUMENT_ID),
            DocumentType::Constant,
            true,
        );
        doc.initialized = true;
        doc
    }

    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        self.path_separator = separator.into();
        self
    }

    pub fn with_namespaces(mut self, namespaces: Vec<NamespaceModel>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_alphabetize(mut self, alphabetize: bool) -> Self {
        self.alphabetize = alphabetize;
        self
    }

    pub fn is_pseudo(&self) -> bool {
        self.document_type.is_pseudo()
    }

    /// Loading has finished, successfully or not
    pub fn is_settled(&self) -> bool {
        self.initialized || self.error_occurred
    }

    /// Access a field by id
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this document.
    pub fn field(&self, id: FieldId) -> &Field {
        &self.arena[id.0]
    }

    /// Access a field by id, `None` for foreign or detached ids
    pub fn try_field(&self, id: FieldId) -> Option<&Field> {
        self.arena.get(id.0).filter(|f| f.attached)
    }

    /// Top-level fields, in display order
    pub fn root_fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn all_fields(&self) -> &[FieldId] {
        &self.all_fields
    }

    pub fn terminal_fields(&self) -> &[FieldId] {
        &self.terminal_fields
    }

    /// All indexed paths, sorted
    pub fn field_paths(&self) -> &[String] {
        &self.field_paths
    }

    pub fn field_count(&self) -> usize {
        self.all_fields.len()
    }

    /// Exact lookup in the path index, without expansion
    pub fn find_field(&self, path: &str) -> Option<FieldId> {
        self.fields_by_path.get(path).copied()
    }

    /// Indexed fields whose path starts with `prefix`, in path order
    pub fn field_ids_for_path_prefix(&self, prefix: &str) -> Vec<FieldId> {
        let start = self.field_paths.partition_point(|p| p.as_str() < prefix);
        self.field_paths[start..]
            .iter()
            .take_while(|p| p.starts_with(prefix))
            .filter_map(|p| self.fields_by_path.get(p).copied())
            .collect()
    }

    /// Cached one-level template for a complex type
    pub fn complex_field(&self, class_identifier: &str) -> Option<&Field> {
        self.complex_fields_by_class_identifier
            .get(class_identifier)
            .map(|id| &self.arena[id.0])
    }

    /// First enumeration field seen for a type
    pub fn enum_field(&self, class_identifier: &str) -> Option<&Field> {
        self.enum_fields_by_class_identifier
            .get(class_identifier)
            .map(|id| &self.arena[id.0])
    }

    pub fn namespace_for_alias(&self, alias: &str) -> Option<&NamespaceModel> {
        self.namespaces.iter().find(|ns| ns.alias == alias)
    }

    /// Replace the field tree with the given parsed nodes
    pub fn initialize_from_fields(&mut self, nodes: Vec<FieldNode>) {
        self.clear_fields();

        let nodes = if self.alphabetize {
            alphabetize_nodes(nodes)
        } else {
            nodes
        };
        for node in nodes {
            let id = self.insert_node(node, None);
            self.fields.push(id);
        }

        self.discover_class_identifiers();

        for root in self.fields.clone() {
            self.refresh_paths(root);
            self.index_subtree(root);
        }

        self.initialized = true;
        self.error_occurred = false;
        debug!(
            document = %self.id,
            fields = self.all_fields.len(),
            "Initialized document fields"
        );
    }

    /// Drop every field and index
    pub fn clear_fields(&mut self) {
        self.arena.clear();
        self.fields.clear();
        self.all_fields.clear();
        self.terminal_fields.clear();
        self.field_paths.clear();
        self.fields_by_path.clear();
        self.complex_fields_by_class_identifier.clear();
        self.enum_fields_by_class_identifier.clear();
        self.initialized = false;
    }

    /// Recompute every path top-down; a no-op when nothing changed structurally
    pub fn refresh_all_paths(&mut self) {
        for root in self.fields.clone() {
            self.refresh_paths(root);
        }
    }

    /// Expand a complex field from the cached subtree of its type
    ///
    /// Terminal fields and fields that already have children are left alone.
    /// A missing cache entry is reported as
    /// [`DocumentError::ComplexTypeNotFound`]; callers treat the field as having
    /// no children.
    pub fn populate_children(&mut self, id: FieldId) -> Result<(), DocumentError> {
        let field = self
            .try_field(id)
            .ok_or_else(|| DocumentError::FieldNotFound(format!("#{}", id.0)))?;
        if field.is_terminal() || !field.children.is_empty() {
            return Ok(());
        }

        let class_identifier = field
            .class_identifier
            .clone()
            .ok_or_else(|| DocumentError::ComplexTypeNotFound(field.path.clone()))?;
        let template = *self
            .complex_fields_by_class_identifier
            .get(&class_identifier)
            .ok_or_else(|| DocumentError::ComplexTypeNotFound(class_identifier.clone()))?;

        let template_children = self.arena[template.0].children.clone();
        for child in template_children {
            let copy = self.copy_subtree(child, id);
            self.arena[id.0].children.push(copy);
            self.refresh_paths(copy);
            self.index_subtree(copy);
        }

        debug!(
            document = %self.id,
            path = %self.arena[id.0].path,
            class_identifier = %class_identifier,
            "Populated complex field children"
        );
        Ok(())
    }

    /// Look up a field by path, expanding ancestors on demand
    ///
    /// Returns `Ok(None)` when every ancestor resolves but the field itself is
    /// absent, and [`DocumentError::ParentFieldNotFound`] when an ancestor is
    /// missing.
    pub fn get_field(&mut self, path: &str) -> Result<Option<FieldId>, DocumentError> {
        if let Some(id) = self.fields_by_path.get(path) {
            return Ok(Some(*id));
        }

        let separator = self.path_separator.clone();
        let segments: Vec<&str> = path.split(separator.as_str()).filter(|s| !s.is_empty()).collect();
        if segments.len() <= 1 {
            return Ok(None);
        }

        let mut prefix = String::new();
        for segment in &segments[..segments.len() - 1] {
            prefix.push_str(&separator);
            prefix.push_str(segment);

            let ancestor = self.fields_by_path.get(&prefix).copied().ok_or_else(|| {
                DocumentError::ParentFieldNotFound {
                    path: path.to_string(),
                    parent: prefix.clone(),
                }
            })?;

            match self.populate_children(ancestor) {
                Ok(()) | Err(DocumentError::ComplexTypeNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(self.fields_by_path.get(path).copied())
    }

    /// Add a field under `parent` (or at the root) and index it
    pub fn add_field(&mut self, field: Field, parent: Option<FieldId>) -> Result<FieldId, DocumentError> {
        let parent_path = match parent {
            Some(p) => Some(
                self.try_field(p)
                    .ok_or_else(|| DocumentError::FieldNotFound(format!("#{}", p.0)))?
                    .path
                    .clone(),
            ),
            None => None,
        };
        let path = join_path(parent_path.as_deref(), &self.path_separator, &field.path_segment());
        if self.fields_by_path.contains_key(&path) {
            return Err(DocumentError::DuplicatePath(path));
        }

        let mut field = field;
        field.parent = parent;
        field.children = Vec::new();
        field.attached = false;
        let id = self.alloc(field);
        match parent {
            Some(p) => self.arena[p.0].children.push(id),
            None => self.fields.push(id),
        }
        self.refresh_paths(id);
        self.index_subtree(id);
        Ok(id)
    }

    /// Detach a field and its subtree from the document
    pub fn remove_field(&mut self, id: FieldId) -> Result<(), DocumentError> {
        let parent = self
            .try_field(id)
            .ok_or_else(|| DocumentError::FieldNotFound(format!("#{}", id.0)))?
            .parent;
        self.unindex_subtree(id);
        match parent {
            Some(p) => self.arena[p.0].children.retain(|c| *c != id),
            None => self.fields.retain(|c| *c != id),
        }
        Ok(())
    }

    /// Modify a field in place, recomputing the paths of its whole subtree
    pub fn update_field<F>(&mut self, id: FieldId, update: F) -> Result<(), DocumentError>
    where
        F: FnOnce(&mut Field),
    {
        let current = self
            .try_field(id)
            .ok_or_else(|| DocumentError::FieldNotFound(format!("#{}", id.0)))?;
        let mut updated = current.clone();
        update(&mut updated);

        let parent_path = updated.parent.map(|p| self.arena[p.0].path.clone());
        let new_path = join_path(parent_path.as_deref(), &self.path_separator, &updated.path_segment());
        if let Some(existing) = self.fields_by_path.get(&new_path)
            && *existing != id
        {
            return Err(DocumentError::DuplicatePath(new_path));
        }

        self.unindex_subtree(id);
        let slot = &mut self.arena[id.0];
        updated.parent = slot.parent;
        updated.children = std::mem::take(&mut slot.children);
        updated.display_name = display_key(&updated.name);
        *slot = updated;
        self.refresh_paths(id);
        self.index_subtree(id);
        Ok(())
    }

    /// Ancestors of a field, nearest first
    pub fn ancestors(&self, id: FieldId) -> Vec<FieldId> {
        let mut result = Vec::new();
        let mut current = self.arena.get(id.0).and_then(|f| f.parent);
        while let Some(parent) = current {
            result.push(parent);
            current = self.arena[parent.0].parent;
        }
        result
    }

    /// Nearest collection field among the field itself and its ancestors
    pub fn collection_ancestor(&self, id: FieldId) -> Option<FieldId> {
        let mut current = Some(id);
        while let Some(candidate) = current {
            let field = self.arena.get(candidate.0)?;
            if field.is_collection() {
                return Some(candidate);
            }
            current = field.parent;
        }
        None
    }

    pub fn is_field_in_collection(&self, id: FieldId) -> bool {
        self.collection_ancestor(id).is_some()
    }

    /// The field and all its descendants, pre-order
    pub fn subtree(&self, id: FieldId) -> Vec<FieldId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.arena[current.0].children.iter().rev().copied());
        }
        result
    }

    /// Recompute mapping status flags from the current mappings
    ///
    /// Flags are reset, ancestors of every mapped field are marked as part of
    /// a mapping (and of a transformation when the mapping transforms), fields
    /// of the active mapping are marked selected, and `has_unmapped_children`
    /// is recomputed bottom-up.
    pub fn update_from_mappings(&mut self, doc_id: DocId, definition: &MappingDefinition) {
        for field in &mut self.arena {
            field.reset_status();
        }

        let active = definition.active_mapping_id();
        for mapping in definition.mappings() {
            let transformation = mapping.has_transformation();
            let is_active = active == Some(mapping.uuid);
            for field_ref in mapping.mapped_field_refs() {
                let FieldRef::Field { doc, field } = field_ref else {
                    continue;
                };
                if doc != doc_id || self.try_field(field).is_none() {
                    continue;
                }
                if is_active {
                    self.arena[field.0].selected = true;
                }
                let mut current = Some(field);
                while let Some(id) = current {
                    let f = &mut self.arena[id.0];
                    f.part_of_mapping = true;
                    if transformation {
                        f.part_of_transformation = true;
                    }
                    current = f.parent;
                }
            }
        }

        for root in self.fields.clone() {
            self.refresh_unmapped_children(root);
        }
    }

    fn refresh_unmapped_children(&mut self, id: FieldId) -> bool {
        let mut any = false;
        for child in self.arena[id.0].children.clone() {
            if self.refresh_unmapped_children(child) {
                any = true;
            }
        }
        let field = &mut self.arena[id.0];
        let unmapped = (!field.part_of_mapping && field.is_terminal()) || any;
        field.has_unmapped_children = unmapped;
        unmapped
    }

    fn alloc(&mut self, field: Field) -> FieldId {
        let id = FieldId(self.arena.len());
        self.arena.push(field);
        id
    }

    fn insert_node(&mut self, node: FieldNode, parent: Option<FieldId>) -> FieldId {
        let FieldNode { mut field, children } = node;
        field.parent = parent;
        field.children = Vec::new();
        field.attached = false;
        field.display_name = display_key(&field.name);
        let id = self.alloc(field);

        let children = if self.alphabetize {
            alphabetize_nodes(children)
        } else {
            children
        };
        for child in children {
            let child_id = self.insert_node(child, Some(id));
            self.arena[id.0].children.push(child_id);
        }
        id
    }

    /// Seed the complex and enum caches from the first occurrence of each type
    fn discover_class_identifiers(&mut self) {
        let order: Vec<FieldId> = self
            .fields
            .clone()
            .into_iter()
            .flat_map(|root| self.subtree(root))
            .collect();

        for id in order {
            let field = &self.arena[id.0];
            let Some(class_identifier) = field.class_identifier.clone() else {
                continue;
            };
            if field.enumeration {
                self.enum_fields_by_class_identifier
                    .entry(class_identifier)
                    .or_insert(id);
            } else if field.is_complex()
                && !field.children.is_empty()
                && !self
                    .complex_fields_by_class_identifier
                    .contains_key(&class_identifier)
            {
                let template = self.clone_one_level(id);
                self.complex_fields_by_class_identifier
                    .insert(class_identifier, template);
            }
        }
    }

    /// Detached copy of a field and its direct children only
    fn clone_one_level(&mut self, id: FieldId) -> FieldId {
        let root = self.arena[id.0].detached_copy();
        let root_id = self.alloc(root);
        for child in self.arena[id.0].children.clone() {
            let mut copy = self.arena[child.0].detached_copy();
            copy.parent = Some(root_id);
            let copy_id = self.alloc(copy);
            self.arena[root_id.0].children.push(copy_id);
        }
        root_id
    }

    /// Deep copy of a subtree, re-parented under `parent`
    fn copy_subtree(&mut self, source: FieldId, parent: FieldId) -> FieldId {
        let mut copy = self.arena[source.0].detached_copy();
        copy.parent = Some(parent);
        let copy_id = self.alloc(copy);
        for child in self.arena[source.0].children.clone() {
            let child_copy = self.copy_subtree(child, copy_id);
            self.arena[copy_id.0].children.push(child_copy);
        }
        copy_id
    }

    /// Recompute the path of a field and all its descendants, top-down
    fn refresh_paths(&mut self, id: FieldId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let parent_path = self.arena[current.0]
                .parent
                .map(|p| self.arena[p.0].path.clone());
            let segment = self.arena[current.0].path_segment();
            let path = join_path(parent_path.as_deref(), &self.path_separator, &segment);
            self.set_path(current, path);
            stack.extend(self.arena[current.0].children.iter().rev().copied());
        }
    }

    fn set_path(&mut self, id: FieldId, path: String) {
        let old = std::mem::take(&mut self.arena[id.0].path);
        if old != path && self.fields_by_path.get(&old) == Some(&id) {
            self.fields_by_path.remove(&old);
            if let Ok(pos) = self.field_paths.binary_search(&old) {
                self.field_paths.remove(pos);
            }
            if let Err(pos) = self.field_paths.binary_search(&path) {
                self.field_paths.insert(pos, path.clone());
            }
            self.fields_by_path.insert(path.clone(), id);
        }
        self.arena[id.0].path = path;
    }

    fn index_subtree(&mut self, id: FieldId) {
        for current in self.subtree(id) {
            let path = self.arena[current.0].path.clone();
            if let Some(existing) = self.fields_by_path.get(&path)
                && *existing != current
            {
                warn!(document = %self.id, path = %path, "Duplicate field path, field not indexed");
                continue;
            }
            self.arena[current.0].attached = true;
            if self.fields_by_path.insert(path.clone(), current).is_none() {
                if let Err(pos) = self.field_paths.binary_search(&path) {
                    self.field_paths.insert(pos, path);
                }
                self.all_fields.push(current);
                if self.arena[current.0].is_terminal() {
                    self.terminal_fields.push(current);
                }
            }
        }
    }

    fn unindex_subtree(&mut self, id: FieldId) {
        let removed = self.subtree(id);
        for current in &removed {
            let path = self.arena[current.0].path.clone();
            if self.fields_by_path.get(&path) == Some(current) {
                self.fields_by_path.remove(&path);
                if let Ok(pos) = self.field_paths.binary_search(&path) {
                    self.field_paths.remove(pos);
                }
            }
            self.arena[current.0].attached = false;
        }
        self.all_fields.retain(|f| !removed.contains(f));
        self.terminal_fields.retain(|f| !removed.contains(f));
    }
}
