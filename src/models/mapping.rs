//! Mapping model
//!
//! A [`MappingModel`] is one user-visible mapping: a list of
//! [`FieldMappingPair`]s, each relating source fields to target fields through a
//! [`TransitionModel`]. Endpoints are [`MappedField`]s, which reference live
//! fields through [`FieldRef`] handles and keep the parsed wire data until the
//! reference has been resolved.

use super::document_store::DocumentStore;
use super::field::{CollectionType, FieldId, FieldRef, FieldType};
use super::field_action::{ActionCatalog, FieldAction};
use super::transition::{TransitionMode, TransitionModel};
use crate::errors::ErrorInfo;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// An action as read from the wire, before it is matched against the catalog
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAction {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Field data read from a serialized mapping, kept until the field resolves
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedFieldData {
    pub name: Option<String>,
    pub path: String,
    pub field_type: Option<FieldType>,
    pub value: Option<String>,
    pub document_id: Option<String>,
    pub document_uri: Option<String>,
    /// 0-based separate/combine index
    pub index: Option<u32>,
    pub user_created: bool,
    pub is_property: bool,
    pub is_constant: bool,
    pub actions: Vec<ParsedAction>,
}

/// One endpoint of a field pair
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappedField {
    pub field: FieldRef,
    pub parsed_data: Option<ParsedFieldData>,
    pub actions: Vec<FieldAction>,
}

impl MappedField {
    pub fn new(field: FieldRef) -> Self {
        Self {
            field,
            parsed_data: None,
            actions: Vec::new(),
        }
    }

    /// Endpoint waiting to be resolved against the documents
    pub fn from_parsed(parsed: ParsedFieldData) -> Self {
        Self {
            field: FieldRef::None,
            parsed_data: Some(parsed),
            actions: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.parsed_data.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.field.is_none()
    }

    pub fn index_action(&self) -> Option<&FieldAction> {
        self.actions.first().filter(|a| a.is_index)
    }

    /// 1-based separate/combine index
    pub fn index(&self) -> Option<u32> {
        self.index_action().and_then(FieldAction::index_value)
    }

    pub fn set_index(&mut self, value: u32) {
        match self.actions.first_mut() {
            Some(action) if action.is_index => action.set_index_value(value),
            _ => self.actions.insert(0, FieldAction::index(value)),
        }
    }

    pub fn remove_index_action(&mut self) {
        self.actions.retain(|a| !a.is_index);
    }

    /// Actions other than the synthetic index
    pub fn catalog_actions(&self) -> impl Iterator<Item = &FieldAction> {
        self.actions.iter().filter(|a| !a.is_index)
    }

    /// Keep the index slot consistent with the transition mode
    ///
    /// Removes the slot when the mode is neither Separate nor Combine or this
    /// endpoint is on the non-indexed side; otherwise ensures exactly one,
    /// taking `next_index` (and advancing it) when none is present.
    pub fn update_separate_or_combine_index(
        &mut self,
        mode: TransitionMode,
        is_source: bool,
        next_index: &mut u32,
    ) {
        if mode.indexed_side() != Some(is_source) {
            self.remove_index_action();
            return;
        }
        let existing = self.index();
        self.remove_index_action();
        let value = existing.unwrap_or_else(|| {
            let value = *next_index;
            *next_index += 1;
            value
        });
        self.actions.insert(0, FieldAction::index(value));
    }
}

/// Source and target endpoints joined by one transition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMappingPair {
    pub source_fields: Vec<MappedField>,
    pub target_fields: Vec<MappedField>,
    pub transition: TransitionModel,
    /// A field referenced by this pair could not be resolved
    pub unresolved_fields: bool,
}

impl FieldMappingPair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self, is_source: bool) -> &[MappedField] {
        if is_source {
            &self.source_fields
        } else {
            &self.target_fields
        }
    }

    pub fn fields_mut(&mut self, is_source: bool) -> &mut Vec<MappedField> {
        if is_source {
            &mut self.source_fields
        } else {
            &mut self.target_fields
        }
    }

    /// Resolved references of one side, sentinel excluded
    pub fn field_refs(&self, is_source: bool) -> Vec<FieldRef> {
        self.fields(is_source)
            .iter()
            .filter(|mf| !mf.is_none())
            .map(|mf| mf.field)
            .collect()
    }

    pub fn has_field(&self, field_ref: FieldRef) -> bool {
        !field_ref.is_none()
            && self
                .source_fields
                .iter()
                .chain(self.target_fields.iter())
                .any(|mf| mf.field == field_ref)
    }

    /// No endpoint on either side is resolved or pending
    pub fn is_empty(&self) -> bool {
        self.source_fields
            .iter()
            .chain(self.target_fields.iter())
            .all(|mf| mf.is_none() && !mf.is_pending())
    }

    /// Add a resolved field to one side
    ///
    /// A second source in Map mode switches the pair to Combine and a second
    /// target switches it to Separate. Otherwise the single-endpoint side of
    /// the current mode has its endpoint replaced.
    pub fn add_field(
        &mut self,
        field_ref: FieldRef,
        is_source: bool,
        docs: &DocumentStore,
        catalog: &ActionCatalog,
    ) {
        if field_ref.is_none() || self.has_field(field_ref) {
            return;
        }

        let mode = self.transition.mode;
        let fields = self.fields_mut(is_source);
        fields.retain(|mf| !mf.is_none() || mf.is_pending());
        if !fields.is_empty() {
            let multi_allowed = mode.indexed_side() == Some(is_source);
            if mode == TransitionMode::Map {
                self.transition.mode = if is_source {
                    TransitionMode::Combine
                } else {
                    TransitionMode::Separate
                };
            } else if !multi_allowed {
                self.fields_mut(is_source).clear();
            }
        }
        self.fields_mut(is_source).push(MappedField::new(field_ref));
        self.update_transition(docs, catalog);
    }

    /// Remove a field; falls back to Map once the indexed side has one field left
    pub fn remove_field(&mut self, field_ref: FieldRef, docs: &DocumentStore, catalog: &ActionCatalog) {
        self.source_fields.retain(|mf| mf.field != field_ref);
        self.target_fields.retain(|mf| mf.field != field_ref);
        if let Some(side) = self.transition.mode.indexed_side()
            && self.fields(side).len() <= 1
        {
            self.transition.mode = TransitionMode::Map;
        }
        self.update_transition(docs, catalog);
    }

    /// Re-derive mode, actions and indices from the current endpoints
    pub fn update_transition(&mut self, docs: &DocumentStore, catalog: &ActionCatalog) {
        let any_enum = self
            .source_fields
            .iter()
            .chain(self.target_fields.iter())
            .filter_map(|mf| docs.field(mf.field))
            .any(|f| f.enumeration);
        if any_enum {
            self.transition.mode = TransitionMode::Enum;
        } else if self.transition.mode == TransitionMode::Enum
            && self.source_fields.iter().chain(self.target_fields.iter()).all(|mf| !mf.is_pending())
        {
            self.transition.mode = TransitionMode::Map;
        }
        let mode = self.transition.mode;

        let other = self
            .source_fields
            .iter()
            .find_map(|mf| docs.field(mf.field));
        for target in &mut self.target_fields {
            let Some(field) = docs.field(target.field) else {
                continue;
            };
            target.actions.retain(|action| {
                action.is_index
                    || catalog
                        .get(&action.name)
                        .is_none_or(|cfg| cfg.applies_to_field(field, other, mode))
            });
        }

        for is_source in [true, false] {
            let fields = self.fields_mut(is_source);
            let mut next = fields.iter().filter_map(MappedField::index).max().unwrap_or(0) + 1;
            for mf in fields.iter_mut() {
                mf.update_separate_or_combine_index(mode, is_source, &mut next);
            }
            if mode.indexed_side() == Some(is_source) {
                renumber_indices(fields);
            }
        }
    }

    /// Any endpoint carries an action; Separate and Combine qualify through their index
    pub fn has_transformation(&self) -> bool {
        self.source_fields
            .iter()
            .chain(self.target_fields.iter())
            .any(|mf| !mf.actions.is_empty())
    }
}

/// Renumber index actions to 1..n, preserving relative order
fn renumber_indices(fields: &mut [MappedField]) {
    let mut order: Vec<(u32, usize)> = fields
        .iter()
        .enumerate()
        .map(|(pos, mf)| (mf.index().unwrap_or(u32::MAX), pos))
        .collect();
    order.sort();
    for (rank, (_, pos)) in order.into_iter().enumerate() {
        fields[pos].set_index(rank as u32 + 1);
    }
}

/// Reason a field may not be added to a mapping
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionRejection {
    #[error("Field is not resolved against a loaded document")]
    Unresolved,
    #[error("Only terminal fields can be mapped")]
    NotTerminal,
    #[error("Enumeration fields cannot be added to a non-enumeration mapping")]
    EnumerationInPlainMapping,
    #[error("Collection fields cannot be added to a non-collection mapping")]
    CollectionInPlainMapping,
    #[error("Separate mappings require a STRING source field")]
    SeparateSourceNotString,
    #[error("Only enumeration fields can be added to a lookup mapping")]
    NotEnumeration,
    #[error("Field belongs to a different collection than the fields already mapped")]
    DifferentCollection,
}

/// One user-visible mapping
#[derive(Debug, Clone, PartialEq)]
pub struct MappingModel {
    pub uuid: Uuid,
    pub field_mappings: Vec<FieldMappingPair>,
    pub validation_errors: Vec<ErrorInfo>,
    /// Collection kind read from the wire, kept while endpoints are pending
    pub collection_type: Option<CollectionType>,
}

impl Default for MappingModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingModel {
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            field_mappings: vec![FieldMappingPair::new()],
            validation_errors: Vec::new(),
            collection_type: None,
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn with_collection_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = Some(collection_type);
        self
    }

    pub fn current_pair(&self) -> Option<&FieldMappingPair> {
        self.field_mappings.first()
    }

    /// The pair edited by selection, created when the mapping has none
    pub fn current_pair_mut(&mut self) -> &mut FieldMappingPair {
        if self.field_mappings.is_empty() {
            self.field_mappings.push(FieldMappingPair::new());
        }
        &mut self.field_mappings[0]
    }

    /// Transition mode of the current pair
    pub fn mode(&self) -> TransitionMode {
        self.current_pair()
            .map(|p| p.transition.mode)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.field_mappings.iter().all(FieldMappingPair::is_empty)
    }

    /// Every resolved endpoint reference, in pair order, sources first
    pub fn mapped_field_refs(&self) -> Vec<FieldRef> {
        self.field_mappings
            .iter()
            .flat_map(|p| p.source_fields.iter().chain(p.target_fields.iter()))
            .filter(|mf| !mf.is_none())
            .map(|mf| mf.field)
            .collect()
    }

    /// Every endpoint with its side
    pub fn mapped_fields(&self) -> impl Iterator<Item = (&MappedField, bool)> {
        self.field_mappings.iter().flat_map(|p| {
            p.source_fields
                .iter()
                .map(|mf| (mf, true))
                .chain(p.target_fields.iter().map(|mf| (mf, false)))
        })
    }

    pub fn has_field(&self, field_ref: FieldRef) -> bool {
        self.field_mappings.iter().any(|p| p.has_field(field_ref))
    }

    pub fn has_transformation(&self) -> bool {
        self.field_mappings.iter().any(FieldMappingPair::has_transformation)
    }

    /// Any endpoint sits inside a collection
    pub fn is_collection_mapping(&self, docs: &DocumentStore) -> bool {
        self.mapped_field_refs()
            .into_iter()
            .any(|r| collection_ancestor(docs, r).is_some())
    }

    pub fn has_unresolved_fields(&self) -> bool {
        self.field_mappings.iter().any(|p| p.unresolved_fields)
    }

    pub fn is_field_selectable(&self, field_ref: FieldRef, is_source: bool, docs: &DocumentStore) -> bool {
        self.selection_rejection(field_ref, is_source, docs).is_none()
    }

    /// Why `field_ref` may not join this mapping, `None` when it may
    pub fn selection_rejection(
        &self,
        field_ref: FieldRef,
        is_source: bool,
        docs: &DocumentStore,
    ) -> Option<SelectionRejection> {
        let Some(field) = docs.field(field_ref) else {
            return Some(SelectionRejection::Unresolved);
        };
        if self.is_empty() {
            return None;
        }
        if !field.is_terminal() {
            return Some(SelectionRejection::NotTerminal);
        }

        let mode = self.mode();
        let collection_mapping = self.is_collection_mapping(docs);
        let field_collection = collection_ancestor(docs, field_ref);

        if mode != TransitionMode::Enum && !collection_mapping {
            if field.enumeration {
                return Some(SelectionRejection::EnumerationInPlainMapping);
            }
            if field_collection.is_some() {
                return Some(SelectionRejection::CollectionInPlainMapping);
            }
        }
        if mode == TransitionMode::Separate && is_source && field.field_type != FieldType::String {
            return Some(SelectionRejection::SeparateSourceNotString);
        }
        if mode == TransitionMode::Enum && !field.enumeration {
            return Some(SelectionRejection::NotEnumeration);
        }
        if collection_mapping {
            let existing = self
                .field_mappings
                .iter()
                .flat_map(|p| p.field_refs(is_source))
                .find_map(|r| collection_ancestor(docs, r));
            if let Some(existing) = existing
                && field_collection != Some(existing)
            {
                return Some(SelectionRejection::DifferentCollection);
            }
        }
        None
    }
}

/// Nearest collection ancestor of a referenced field, as a document-qualified reference
fn collection_ancestor(docs: &DocumentStore, field_ref: FieldRef) -> Option<FieldRef> {
    let FieldRef::Field { doc, field } = field_ref else {
        return None;
    };
    let ancestor: FieldId = docs.get(doc)?.collection_ancestor(field)?;
    Some(FieldRef::new(doc, ancestor))
}
