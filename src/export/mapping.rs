//! Mapping document exporter
//!
//! Writes every mapping of a [`MappingContext`] to the JSON mapping document
//! format, together with the data sources, lookup tables and properties.
//! Endpoints that are still pending are written back from their parsed data so
//! that an incomplete session survives a save.

use super::{ExportError, ExportResult};
use crate::context::MappingContext;
use crate::errors::ErrorInfo;
use crate::models::wire::{
    COLLECTION_JSON_TYPE, COLLECTION_MAPPING_TYPE, MAPPING_ENTRY_JSON_TYPE, MAPPING_JSON_TYPE, MAPPING_ROOT_KEY,
    WireDataSource, WireField, WireLookupTables, WireMappingDocument, WireMappingEntry, WireMappings,
    WireProperties, WireProperty, WireXmlNamespace, WireXmlNamespaces,
};
use crate::models::{
    DocumentStore, DocumentType, FieldMappingPair, MappedField, MappingModel, NamespaceModel, TransitionMode,
};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Format identifier of [`ExportResult`]s produced here
pub const MAPPING_FORMAT: &str = "atlas-mapping-json";

/// Writer for mapping documents
#[derive(Debug, Default)]
pub struct MappingSerializer;

impl MappingSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Serialize the context to a mapping document wrapped in `AtlasMapping`
    ///
    /// A mapping whose endpoints cannot be written is skipped and reported to
    /// the context's error log.
    pub fn serialize(&self, ctx: &mut MappingContext) -> Result<Value, ExportError> {
        let mut entries = Vec::new();
        let mut failed = Vec::new();
        for mapping in ctx.mappings.mappings() {
            match serialize_mapping(mapping, &ctx.documents) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(message) => failed.push(ErrorInfo::error(message).with_mapping(mapping.uuid)),
            }
        }
        for info in failed {
            warn!(mapping_id = ?info.mapping_id, message = %info.message, "Skipping mapping on export");
            ctx.errors.report(info);
        }

        let tables: Vec<_> = ctx.mappings.tables().map(|t| t.to_wire()).collect();
        let properties = property_entries(&ctx.documents);
        let document = WireMappingDocument {
            json_type: MAPPING_JSON_TYPE.to_string(),
            name: Some(ctx.mappings.name.clone()),
            data_source: data_sources(ctx),
            mappings: WireMappings { mapping: entries },
            lookup_tables: (!tables.is_empty()).then_some(WireLookupTables { lookup_table: tables }),
            properties: (!properties.is_empty()).then_some(WireProperties { property: properties }),
        };

        info!(
            mappings = document.mappings.mapping.len(),
            data_sources = document.data_source.len(),
            "Serialized mapping document"
        );
        let mut root = Map::new();
        root.insert(MAPPING_ROOT_KEY.to_string(), serde_json::to_value(document)?);
        Ok(Value::Object(root))
    }

    /// Serialize to pretty-printed JSON text
    pub fn export(&self, ctx: &mut MappingContext) -> Result<ExportResult, ExportError> {
        let value = self.serialize(ctx)?;
        Ok(ExportResult {
            content: serde_json::to_string_pretty(&value)?,
            format: MAPPING_FORMAT.to_string(),
        })
    }
}

/// `Ok(None)` for a mapping with no complete pair
fn serialize_mapping(mapping: &MappingModel, docs: &DocumentStore) -> Result<Option<WireMappingEntry>, String> {
    let mut pairs = Vec::new();
    for pair in &mapping.field_mappings {
        if !side_present(pair, true) || !side_present(pair, false) {
            continue;
        }
        pairs.push(serialize_pair(pair, docs)?);
    }
    if pairs.is_empty() {
        return Ok(None);
    }

    let collection_type = collection_type(mapping, docs);
    if collection_type.is_none() && pairs.len() == 1 {
        let mut entry = pairs.remove(0);
        entry.id = Some(mapping.uuid.to_string());
        return Ok(Some(entry));
    }
    Ok(Some(WireMappingEntry {
        json_type: COLLECTION_JSON_TYPE.to_string(),
        id: Some(mapping.uuid.to_string()),
        mapping_type: Some(COLLECTION_MAPPING_TYPE.to_string()),
        input_field: Vec::new(),
        output_field: Vec::new(),
        strategy: None,
        lookup_table_name: None,
        collection_type: Some(collection_type.unwrap_or("LIST").to_string()),
        mappings: Some(WireMappings { mapping: pairs }),
    }))
}

fn side_present(pair: &FieldMappingPair, is_source: bool) -> bool {
    pair.fields(is_source)
        .iter()
        .any(|mf| !mf.is_none() || mf.is_pending())
}

/// Collection kind of the first endpoint inside a collection, else the kind read from the wire
fn collection_type(mapping: &MappingModel, docs: &DocumentStore) -> Option<&'static str> {
    mapping
        .mapped_field_refs()
        .into_iter()
        .find_map(|r| {
            let doc = docs.document_of(r)?;
            let ancestor = doc.collection_ancestor(r.field_id()?)?;
            Some(doc.field(ancestor).collection_type.as_str())
        })
        .or_else(|| mapping.collection_type.map(|c| c.as_str()))
}

fn serialize_pair(pair: &FieldMappingPair, docs: &DocumentStore) -> Result<WireMappingEntry, String> {
    let mode = pair.transition.mode;
    let mut input_field = Vec::new();
    let mut output_field = Vec::new();
    for (is_source, out) in [(true, &mut input_field), (false, &mut output_field)] {
        for mf in pair.fields(is_source) {
            if let Some(field) = serialize_field(mf, docs)? {
                out.push(field);
            }
        }
    }

    Ok(WireMappingEntry {
        json_type: MAPPING_ENTRY_JSON_TYPE.to_string(),
        id: None,
        mapping_type: Some(mode.as_str().to_string()),
        input_field,
        output_field,
        strategy: mode
            .is_indexed()
            .then(|| pair.transition.delimiter.as_str().to_string()),
        lookup_table_name: pair
            .transition
            .lookup_table_name
            .clone()
            .filter(|_| mode == TransitionMode::Enum),
        collection_type: None,
        mappings: None,
    })
}

/// `Ok(None)` for the sentinel; `Err` for a reference into a missing document
fn serialize_field(mf: &MappedField, docs: &DocumentStore) -> Result<Option<WireField>, String> {
    let index = mf.index().map(|i| i.saturating_sub(1));

    if let Some(parsed) = &mf.parsed_data {
        let json_type = if parsed.is_property {
            DocumentType::Property.field_json_type()
        } else if parsed.is_constant {
            DocumentType::Constant.field_json_type()
        } else {
            parsed
                .document_uri
                .as_deref()
                .and_then(DocumentType::from_uri)
                .map(|t| t.field_json_type())
                .unwrap_or("Field")
        };
        return Ok(Some(WireField {
            json_type: json_type.to_string(),
            name: parsed.name.clone(),
            path: Some(parsed.path.clone()),
            field_type: parsed.field_type.as_ref().map(|t| t.as_str().to_string()),
            value: parsed.value.clone(),
            doc_id: parsed.document_id.clone(),
            index: index.or(parsed.index),
            user_created: parsed.user_created.then_some(true),
            actions: parsed
                .actions
                .iter()
                .map(|a| {
                    let args = if a.arguments.is_empty() {
                        Value::Null
                    } else {
                        Value::Object(a.arguments.clone())
                    };
                    let mut entry = Map::new();
                    entry.insert(a.name.clone(), args);
                    Value::Object(entry)
                })
                .collect(),
        }));
    }

    if mf.is_none() {
        return Ok(None);
    }
    let (Some(doc), Some(field)) = (docs.document_of(mf.field), docs.field(mf.field)) else {
        return Err("Mapped field refers to a document that is no longer loaded".to_string());
    };
    Ok(Some(WireField {
        json_type: doc.document_type.field_json_type().to_string(),
        name: Some(field.name.clone()),
        path: Some(field.path.clone()),
        field_type: Some(field.field_type.as_str().to_string()),
        value: field.value.clone().filter(|_| doc.is_pseudo()),
        doc_id: Some(doc.id.clone()),
        index,
        user_created: field.user_created.then_some(true),
        actions: mf.catalog_actions().map(|a| a.to_wire()).collect(),
    }))
}

/// Loaded real documents, then retained descriptors of documents not loaded
fn data_sources(ctx: &MappingContext) -> Vec<WireDataSource> {
    let mut sources: Vec<WireDataSource> = ctx
        .documents
        .iter()
        .filter(|(_, d)| !d.is_pseudo())
        .map(|(_, d)| WireDataSource {
            json_type: d.document_type.data_source_json_type().to_string(),
            id: d.id.clone(),
            uri: d.uri.clone(),
            data_source_type: side_label(d.is_source).to_string(),
            xml_namespaces: wire_namespaces(&d.namespaces),
            template: ctx
                .mappings
                .template_text
                .clone()
                .filter(|_| !d.is_source && ctx.config.carries_template(d.document_type)),
        })
        .collect();

    for descriptor in &ctx.mappings.data_sources {
        if sources
            .iter()
            .any(|s| s.id == descriptor.id && s.is_source() == descriptor.is_source)
        {
            continue;
        }
        sources.push(WireDataSource {
            json_type: descriptor
                .document_type
                .map(|t| t.data_source_json_type())
                .unwrap_or("DataSource")
                .to_string(),
            id: descriptor.id.clone(),
            uri: descriptor.uri.clone(),
            data_source_type: side_label(descriptor.is_source).to_string(),
            xml_namespaces: wire_namespaces(&descriptor.namespaces),
            template: descriptor.template.clone(),
        });
    }
    sources
}

fn side_label(is_source: bool) -> &'static str {
    if is_source { "SOURCE" } else { "TARGET" }
}

fn wire_namespaces(namespaces: &[NamespaceModel]) -> Option<WireXmlNamespaces> {
    if namespaces.is_empty() {
        return None;
    }
    Some(WireXmlNamespaces {
        xml_namespace: namespaces
            .iter()
            .map(|ns| WireXmlNamespace {
                alias: ns.alias.clone(),
                uri: ns.uri.clone(),
                location_uri: ns.location_uri.clone(),
                target_namespace: ns.target_namespace.then_some(true),
            })
            .collect(),
    })
}

fn property_entries(docs: &DocumentStore) -> Vec<WireProperty> {
    let Some(doc) = docs.get(docs.property_doc()) else {
        return Vec::new();
    };
    doc.all_fields()
        .iter()
        .map(|id| doc.field(*id))
        .map(|f| WireProperty {
            name: f.name.clone(),
            value: f.value.clone().unwrap_or_default(),
            field_type: f.field_type.as_str().to_string(),
        })
        .collect()
}
