//! Models module for the SDK
//!
//! Defines the mapping domain model: documents and their field trees, the
//! transition and action catalog, mapping models, the mapping definition with
//! its synchronization algorithms, and the wire format types.

pub mod document;
pub mod document_store;
pub mod field;
pub mod field_action;
pub mod lookup_table;
pub mod mapping;
pub mod mapping_definition;
pub mod transition;
pub mod wire;

pub use document::{
    CONSTANT_DOCUMENT_ID, DocumentDefinition, DocumentError, DocumentType, FieldNode, NamespaceModel,
    PROPERTY_DOCUMENT_ID,
};
pub use document_store::DocumentStore;
pub use field::{CollectionType, DocId, EnumValue, Field, FieldId, FieldRef, FieldType};
pub use field_action::{ActionCatalog, FieldAction, FieldActionArgument, FieldActionConfig};
pub use lookup_table::{LookupTable, LookupTableEntry};
pub use mapping::{
    FieldMappingPair, MappedField, MappingModel, ParsedAction, ParsedFieldData, SelectionRejection,
};
pub use mapping_definition::{DataSourceDescriptor, MappingDefinition};
pub use transition::{TransitionDelimiter, TransitionMode, TransitionModel};
