//! Mapping definition
//!
//! Holds every mapping of a session together with the lookup-table registry and
//! runs the algorithms that keep mappings consistent with the loaded documents:
//!
//! - [`MappingDefinition::remove_stale_mappings`] drops mappings whose fields
//!   no longer exist.
//! - [`MappingDefinition::update_mappings_from_documents`] resolves parsed
//!   endpoints to live fields.
//! - [`MappingDefinition::detect_table_identifiers`] back-fills lookup table
//!   identifiers from enum mappings.
//!
//! All of them operate on the full current snapshot and are safe to re-run.

use super::document::{DocumentDefinition, DocumentType, NamespaceModel};
use super::document_store::DocumentStore;
use super::field::{DocId, Field, FieldId, FieldPathParts, FieldRef, FieldType};
use super::field_action::{ActionCatalog, FieldAction};
use super::lookup_table::{LookupTable, identifier_key};
use super::mapping::{MappedField, MappingModel, ParsedAction, ParsedFieldData};
use super::transition::TransitionMode;
use super::wire::WireValidations;
use crate::errors::{ErrorInfo, ErrorLog};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Document reference retained from the last deserialized mapping
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceDescriptor {
    pub id: String,
    pub uri: String,
    pub is_source: bool,
    pub document_type: Option<DocumentType>,
    pub namespaces: Vec<NamespaceModel>,
    pub template: Option<String>,
}

/// Outcome of resolving one parsed endpoint
enum Resolution {
    Resolved(FieldRef),
    /// Owning document not loaded yet
    Pending,
    /// Owning document loaded but the field cannot be found
    Missing(String),
}

/// All mappings of a session
#[derive(Debug, Clone)]
pub struct MappingDefinition {
    pub name: String,
    mappings: Vec<MappingModel>,
    active_mapping: Option<Uuid>,
    tables: BTreeMap<String, LookupTable>,
    tables_by_source_target: HashMap<String, String>,
    pub template_text: Option<String>,
    pub data_sources: Vec<DataSourceDescriptor>,
}

impl Default for MappingDefinition {
    fn default() -> Self {
        Self::new("UI")
    }
}

impl MappingDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
            active_mapping: None,
            tables: BTreeMap::new(),
            tables_by_source_target: HashMap::new(),
            template_text: None,
            data_sources: Vec::new(),
        }
    }

    pub fn mappings(&self) -> &[MappingModel] {
        &self.mappings
    }

    pub fn mapping(&self, uuid: Uuid) -> Option<&MappingModel> {
        self.mappings.iter().find(|m| m.uuid == uuid)
    }

    pub fn mapping_mut(&mut self, uuid: Uuid) -> Option<&mut MappingModel> {
        self.mappings.iter_mut().find(|m| m.uuid == uuid)
    }

    /// Add a mapping, replacing one with the same id
    pub fn add_mapping(&mut self, mapping: MappingModel) -> Uuid {
        let uuid = mapping.uuid;
        match self.mappings.iter_mut().find(|m| m.uuid == uuid) {
            Some(existing) => *existing = mapping,
            None => self.mappings.push(mapping),
        }
        uuid
    }

    pub fn remove_mapping(&mut self, uuid: Uuid) -> Option<MappingModel> {
        let pos = self.mappings.iter().position(|m| m.uuid == uuid)?;
        if self.active_mapping == Some(uuid) {
            self.active_mapping = None;
        }
        Some(self.mappings.remove(pos))
    }

    pub fn clear_mappings(&mut self) {
        self.mappings.clear();
        self.active_mapping = None;
    }

    pub fn clear_tables(&mut self) {
        self.tables.clear();
        self.tables_by_source_target.clear();
    }

    /// Select the mapping being edited; `false` if the id is unknown
    pub fn set_active_mapping(&mut self, uuid: Option<Uuid>) -> bool {
        if let Some(id) = uuid
            && self.mapping(id).is_none()
        {
            return false;
        }
        self.active_mapping = uuid;
        true
    }

    pub fn active_mapping_id(&self) -> Option<Uuid> {
        self.active_mapping
    }

    pub fn active_mapping(&self) -> Option<&MappingModel> {
        self.active_mapping.and_then(|id| self.mapping(id))
    }

    pub fn active_mapping_mut(&mut self) -> Option<&mut MappingModel> {
        let id = self.active_mapping?;
        self.mapping_mut(id)
    }

    /// Mappings with an endpoint on `field_ref`
    pub fn mappings_for_field(&self, field_ref: FieldRef) -> Vec<&MappingModel> {
        self.mappings
            .iter()
            .filter(|m| m.has_field(field_ref))
            .collect()
    }

    /// Register a table, replacing one with the same name
    pub fn add_table(&mut self, table: LookupTable) {
        if let Some(previous) = self.tables.get(&table.name)
            && let Some(key) = previous.identifier_key()
        {
            self.tables_by_source_target.remove(&key);
        }
        if let Some(key) = table.identifier_key() {
            self.tables_by_source_target.insert(key, table.name.clone());
        }
        self.tables.insert(table.name.clone(), table);
    }

    pub fn remove_table(&mut self, name: &str) -> Option<LookupTable> {
        let table = self.tables.remove(name)?;
        if let Some(key) = table.identifier_key() {
            self.tables_by_source_target.remove(&key);
        }
        Some(table)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&LookupTable> {
        self.tables.get(name)
    }

    pub fn table_by_name_mut(&mut self, name: &str) -> Option<&mut LookupTable> {
        self.tables.get_mut(name)
    }

    pub fn table_by_identifiers(&self, source_identifier: &str, target_identifier: &str) -> Option<&LookupTable> {
        let name = self
            .tables_by_source_target
            .get(&identifier_key(source_identifier, target_identifier))?;
        self.tables.get(name)
    }

    /// Tables ordered by name
    pub fn tables(&self) -> impl Iterator<Item = &LookupTable> {
        self.tables.values()
    }

    /// Resolve every pending endpoint against the loaded documents
    pub fn update_mappings_from_documents(
        &mut self,
        docs: &mut DocumentStore,
        catalog: &ActionCatalog,
        errors: &mut ErrorLog,
    ) {
        let mut resolved = 0usize;
        for mapping in &mut self.mappings {
            let mapping_id = mapping.uuid;
            for pair in &mut mapping.field_mappings {
                let mut changed = false;
                let mut unresolved = false;
                for is_source in [true, false] {
                    for mf in pair.fields_mut(is_source).iter_mut() {
                        let Some(parsed) = mf.parsed_data.as_ref() else {
                            continue;
                        };
                        match resolve_parsed_field(parsed, is_source, docs) {
                            Resolution::Resolved(field_ref) => {
                                attach_resolved(mf, field_ref, catalog, errors, mapping_id);
                                changed = true;
                                resolved += 1;
                            }
                            Resolution::Pending => {}
                            Resolution::Missing(message) => {
                                mf.field = FieldRef::None;
                                unresolved = true;
                                errors.report(ErrorInfo::error(message).with_mapping(mapping_id));
                            }
                        }
                    }
                }
                pair.unresolved_fields = unresolved;
                if changed {
                    pair.update_transition(docs, catalog);
                }
            }
        }
        if resolved > 0 {
            debug!(resolved, "Resolved mapped fields against documents");
        }
    }

    /// Drop mappings referencing fields that no longer exist
    ///
    /// Returns the number of mappings removed.
    pub fn remove_stale_mappings(&mut self, docs: &mut DocumentStore) -> usize {
        let source_paths = docs.all_field_paths(true);
        let target_paths = docs.all_field_paths(false);

        let before = self.mappings.len();
        let mut kept = Vec::with_capacity(before);
        for mapping in std::mem::take(&mut self.mappings) {
            if is_stale(&mapping, docs, &source_paths, &target_paths) {
                debug!(mapping_id = %mapping.uuid, "Removing stale mapping");
                if self.active_mapping == Some(mapping.uuid) {
                    self.active_mapping = None;
                }
            } else {
                kept.push(mapping);
            }
        }
        self.mappings = kept;
        before - self.mappings.len()
    }

    /// Fill in missing table identifiers from the enum mappings that use them
    pub fn detect_table_identifiers(&mut self, docs: &DocumentStore) {
        let mut updates: Vec<(String, Option<String>, Option<String>)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for mapping in &self.mappings {
            for pair in &mapping.field_mappings {
                if pair.transition.mode != TransitionMode::Enum {
                    continue;
                }
                let Some(name) = &pair.transition.lookup_table_name else {
                    continue;
                };
                let Some(table) = self.tables.get(name) else {
                    continue;
                };
                if table.identifier_key().is_some() || !seen.insert(name.clone()) {
                    continue;
                }
                let identifier = |is_source: bool| {
                    pair.field_refs(is_source)
                        .first()
                        .and_then(|r| docs.field(*r))
                        .and_then(enum_identifier)
                };
                updates.push((name.clone(), identifier(true), identifier(false)));
            }
        }

        for (name, source, target) in updates {
            let Some(mut table) = self.tables.get(&name).cloned() else {
                continue;
            };
            if table.source_identifier.is_none() {
                table.source_identifier = source;
            }
            if table.target_identifier.is_none() {
                table.target_identifier = target;
            }
            self.add_table(table);
        }
    }

    /// Attach a lookup table to an enum-to-enum mapping that has none
    ///
    /// Reuses the table registered for the same identifier pair, otherwise
    /// creates one pre-populated from the enum values. Returns the table name.
    pub fn initialize_mapping_lookup_table(&mut self, mapping_id: Uuid, docs: &DocumentStore) -> Option<String> {
        let mapping = self.mapping(mapping_id)?;
        let pair = mapping.current_pair()?;
        if pair.transition.mode != TransitionMode::Enum {
            return None;
        }
        if let Some(name) = &pair.transition.lookup_table_name {
            return Some(name.clone());
        }

        let enum_field = |is_source: bool| {
            pair.field_refs(is_source)
                .into_iter()
                .filter_map(|r| docs.field(r))
                .find(|f| f.enumeration)
        };
        let source = enum_field(true)?;
        let target = enum_field(false)?;
        let source_id = enum_identifier(source)?;
        let target_id = enum_identifier(target)?;

        let name = match self.table_by_identifiers(&source_id, &target_id) {
            Some(table) => table.name.clone(),
            None => {
                let mut table = LookupTable::for_identifiers(&source_id, &target_id);
                table.populate_from_enums(&source.enum_values, &target.enum_values);
                let name = table.name.clone();
                info!(table = %name, source = %source_id, target = %target_id, "Created lookup table");
                self.add_table(table);
                name
            }
        };

        let mapping = self.mapping_mut(mapping_id)?;
        mapping.current_pair_mut().transition.lookup_table_name = Some(name.clone());
        Some(name)
    }

    /// Convert endpoints on `doc_id` back to parsed form ahead of a document replace
    ///
    /// Returns the number of endpoints detached.
    pub fn detach_document(&mut self, doc_id: DocId, docs: &DocumentStore) -> usize {
        let Some(doc) = docs.get(doc_id) else {
            return 0;
        };
        let mut detached = 0;
        for mapping in &mut self.mappings {
            for pair in &mut mapping.field_mappings {
                for is_source in [true, false] {
                    for mf in pair.fields_mut(is_source).iter_mut() {
                        if mf.field.doc() != Some(doc_id) {
                            continue;
                        }
                        if let Some(field) = docs.field(mf.field) {
                            mf.parsed_data = Some(parsed_from_field(field, doc, mf));
                        }
                        mf.field = FieldRef::None;
                        mf.actions.retain(|a| a.is_index);
                        detached += 1;
                    }
                }
            }
        }
        debug!(document = %doc.id, detached, "Detached mapped fields from document");
        detached
    }

    /// Attach runtime validation results to their mappings
    ///
    /// Results scoped to a known mapping id replace that mapping's
    /// `validation_errors`; the rest go to the error log. Returns the number of
    /// results attached to mappings.
    pub fn apply_validation_response(&mut self, value: &Value, errors: &mut ErrorLog) -> Result<usize, serde_json::Error> {
        let validations = WireValidations::from_value(value)?;
        for mapping in &mut self.mappings {
            mapping.validation_errors.clear();
        }

        let mut attached = 0;
        for validation in validations.validation {
            let target = validation
                .id
                .as_deref()
                .filter(|_| validation.scope.as_deref().is_none_or(|s| s.eq_ignore_ascii_case("MAPPING")))
                .and_then(|id| Uuid::parse_str(id).ok())
                .and_then(|id| self.mappings.iter_mut().find(|m| m.uuid == id));
            match target {
                Some(mapping) => {
                    let info = ErrorInfo::validation(validation.message).with_mapping(mapping.uuid);
                    mapping.validation_errors.push(info);
                    attached += 1;
                }
                None => {
                    errors.report(ErrorInfo::validation(validation.message));
                }
            }
        }
        Ok(attached)
    }

    /// Recompute field status flags in every document
    pub fn update_document_status(&self, docs: &mut DocumentStore) {
        for doc_id in docs.ids() {
            if let Some(doc) = docs.get_mut(doc_id) {
                doc.update_from_mappings(doc_id, self);
            }
        }
    }
}

/// Identifier used to key lookup tables for an enum field
fn enum_identifier(field: &Field) -> Option<String> {
    if !field.enumeration {
        return None;
    }
    Some(field.class_identifier.clone().unwrap_or_else(|| field.path.clone()))
}

/// Locate the document a parsed endpoint belongs to, on the endpoint's side
fn find_document(parsed: &ParsedFieldData, is_source: bool, docs: &DocumentStore) -> Option<DocId> {
    if let Some(uri) = &parsed.document_uri
        && let Some(doc_id) = docs.find_by_uri(uri, Some(is_source))
    {
        return Some(doc_id);
    }
    docs.find_by_id(parsed.document_id.as_deref()?, Some(is_source))
}

fn resolve_parsed_field(parsed: &ParsedFieldData, is_source: bool, docs: &mut DocumentStore) -> Resolution {
    let field_type = parsed.field_type.clone().unwrap_or(FieldType::String);

    if parsed.is_property {
        let name = parsed
            .name
            .clone()
            .unwrap_or_else(|| parsed.path.trim_start_matches('/').to_string());
        return match docs.ensure_property(&name, parsed.value.as_deref(), field_type) {
            Ok(field_ref) => Resolution::Resolved(field_ref),
            Err(e) => Resolution::Missing(format!("Could not create property '{}': {}", name, e)),
        };
    }
    if parsed.is_constant {
        let value = parsed.value.clone().unwrap_or_default();
        return match docs.ensure_constant(&value, field_type) {
            Ok(field_ref) => Resolution::Resolved(field_ref),
            Err(e) => Resolution::Missing(format!("Could not create constant '{}': {}", value, e)),
        };
    }

    let Some(doc_id) = find_document(parsed, is_source, docs) else {
        return Resolution::Pending;
    };
    let Some(doc) = docs.get_mut(doc_id) else {
        return Resolution::Pending;
    };
    if doc.error_occurred {
        return Resolution::Missing(format!(
            "Could not find field '{}': document '{}' failed to load",
            parsed.path, doc.id
        ));
    }
    if !doc.initialized {
        return Resolution::Pending;
    }

    match doc.get_field(&parsed.path) {
        Ok(Some(field)) => return Resolution::Resolved(FieldRef::new(doc_id, field)),
        Ok(None) => {}
        Err(e) => debug!(path = %parsed.path, error = %e, "Field lookup failed"),
    }

    if parsed.user_created {
        return match materialize_user_field(parsed, field_type, doc) {
            Some(field) => Resolution::Resolved(FieldRef::new(doc_id, field)),
            None => Resolution::Missing(format!(
                "Could not create user field '{}' in document '{}'",
                parsed.path, doc.id
            )),
        };
    }

    Resolution::Missing(format!(
        "Could not find field '{}' in document '{}'",
        parsed.path, doc.id
    ))
}

/// Recreate a user-created field from its serialized path
fn materialize_user_field(
    parsed: &ParsedFieldData,
    field_type: FieldType,
    doc: &mut DocumentDefinition,
) -> Option<FieldId> {
    let parts = FieldPathParts::parse(&parsed.path, &doc.path_separator)?;
    let parent = match &parts.parent_path {
        Some(parent_path) => Some(doc.get_field(parent_path).ok()??),
        None => None,
    };
    let mut field = Field::new(parts.name, field_type)
        .with_attribute(parts.is_attribute)
        .with_collection_type(parts.collection_type)
        .with_user_created(true);
    field.namespace_alias = parts.namespace_alias;
    field.value = parsed.value.clone();
    doc.add_field(field, parent).ok()
}

/// Bind a resolved endpoint and turn its parsed actions into catalog actions
fn attach_resolved(
    mf: &mut MappedField,
    field_ref: FieldRef,
    catalog: &ActionCatalog,
    errors: &mut ErrorLog,
    mapping_id: Uuid,
) {
    let Some(parsed) = mf.parsed_data.take() else {
        return;
    };
    mf.field = field_ref;
    mf.actions.retain(|a| a.is_index);
    if let Some(index) = parsed.index {
        mf.set_index(index + 1);
    }
    for action in parsed.actions {
        match catalog.get(&action.name) {
            Some(config) => mf.actions.push(FieldAction::from_config(config, &action.arguments)),
            None => {
                errors.report(
                    ErrorInfo::error(format!("Could not find field action '{}'", action.name))
                        .with_mapping(mapping_id),
                );
            }
        }
    }
}

/// Parsed form of a live endpoint, used when its document is replaced
fn parsed_from_field(field: &Field, doc: &DocumentDefinition, mf: &MappedField) -> ParsedFieldData {
    ParsedFieldData {
        name: Some(field.name.clone()),
        path: field.path.clone(),
        field_type: Some(field.field_type.clone()),
        value: field.value.clone(),
        document_id: Some(doc.id.clone()),
        document_uri: Some(doc.uri.clone()),
        index: mf.index().map(|i| i.saturating_sub(1)),
        user_created: field.user_created,
        is_property: doc.document_type == DocumentType::Property,
        is_constant: doc.document_type == DocumentType::Constant,
        actions: mf
            .catalog_actions()
            .map(|a| ParsedAction {
                name: a.name.clone(),
                arguments: a
                    .arguments
                    .iter()
                    .map(|arg| (arg.name.clone(), Value::String(arg.value.clone())))
                    .collect::<Map<String, Value>>(),
            })
            .collect(),
    }
}

fn is_stale(
    mapping: &MappingModel,
    docs: &mut DocumentStore,
    source_paths: &HashSet<String>,
    target_paths: &HashSet<String>,
) -> bool {
    let endpoints: Vec<(FieldRef, Option<ParsedFieldData>, bool)> = mapping
        .mapped_fields()
        .map(|(mf, is_source)| (mf.field, mf.parsed_data.clone(), is_source))
        .collect();

    for (field_ref, parsed, is_source) in endpoints {
        let paths = if is_source { source_paths } else { target_paths };
        match (field_ref, parsed) {
            (FieldRef::Field { doc, .. }, _) => {
                if docs.is_pseudo_ref(field_ref) {
                    continue;
                }
                let Some(document) = docs.get(doc) else {
                    return true;
                };
                if !document.initialized {
                    continue;
                }
                match docs.field(field_ref) {
                    None => return true,
                    Some(field) if field.user_created || paths.contains(&field.path) => {}
                    Some(_) => return true,
                }
            }
            (FieldRef::None, Some(parsed)) => {
                if parsed.is_property || parsed.is_constant || parsed.user_created {
                    continue;
                }
                let Some(doc_id) = find_document(&parsed, is_source, docs) else {
                    continue;
                };
                let Some(document) = docs.get_mut(doc_id) else {
                    continue;
                };
                if !document.initialized || document.error_occurred {
                    continue;
                }
                if paths.contains(&parsed.path) {
                    continue;
                }
                if !matches!(document.get_field(&parsed.path), Ok(Some(_))) {
                    return true;
                }
            }
            (FieldRef::None, None) => {}
        }
    }
    false
}
