//! Mapping document importer
//!
//! Turns a serialized mapping document into pending [`MappingModel`]s. Endpoints
//! keep their parsed wire data until
//! [`MappingContext::synchronize`](crate::context::MappingContext::synchronize)
//! resolves them against the loaded documents.

use super::ImportError;
use crate::context::MappingContext;
use crate::models::wire::{WireDataSource, WireField, WireMappingDocument, WireMappingEntry};
use crate::models::{
    CONSTANT_DOCUMENT_ID, CollectionType, DataSourceDescriptor, DocumentType, FieldMappingPair, FieldType, LookupTable,
    MappedField, MappingModel, NamespaceModel, PROPERTY_DOCUMENT_ID, ParsedAction, ParsedFieldData,
    TransitionDelimiter, TransitionMode, TransitionModel,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Counts reported after a mapping document was read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeserializeSummary {
    pub mappings: usize,
    pub fields: usize,
    /// Fields dropped because their document could not be identified
    pub dropped_fields: usize,
    pub lookup_tables: usize,
    pub properties: usize,
}

/// Data source entry as referenced by field `docId`s
struct DocumentRef {
    uri: String,
}

/// Data sources keyed by id and side; a type may be mapped onto itself
type DocumentRefs = HashMap<(String, bool), DocumentRef>;

/// Reader for mapping documents
#[derive(Debug, Default)]
pub struct MappingDeserializer;

impl MappingDeserializer {
    pub fn new() -> Self {
        Self
    }

    /// Replace the context's mappings, lookup tables and properties with those of `value`
    ///
    /// Accepts the document bare or wrapped in the `AtlasMapping` key.
    pub fn deserialize(&self, ctx: &mut MappingContext, value: &Value) -> Result<DeserializeSummary, ImportError> {
        let document = WireMappingDocument::from_value(value)?;
        let mut summary = DeserializeSummary::default();

        ctx.mappings.clear_mappings();
        ctx.mappings.clear_tables();
        ctx.documents.clear_properties();
        if let Some(name) = &document.name {
            ctx.mappings.name = name.clone();
        }

        let mut doc_refs = DocumentRefs::new();
        ctx.mappings.data_sources.clear();
        ctx.mappings.template_text = None;
        for source in &document.data_source {
            doc_refs.insert(
                (source.id.clone(), source.is_source()),
                DocumentRef { uri: source.uri.clone() },
            );
            if !source.is_source()
                && let Some(template) = &source.template
            {
                ctx.mappings.template_text = Some(template.clone());
            }
            ctx.mappings.data_sources.push(descriptor_from_wire(source));
        }

        if let Some(properties) = &document.properties {
            for property in &properties.property {
                let field_type = FieldType::from_wire(&property.field_type);
                match ctx
                    .documents
                    .ensure_property(&property.name, Some(&property.value), field_type)
                {
                    Ok(_) => summary.properties += 1,
                    Err(e) => {
                        ctx.errors
                            .error(format!("Could not register property '{}': {}", property.name, e));
                    }
                }
            }
        }

        if let Some(tables) = document.lookup_tables {
            for table in tables.lookup_table {
                ctx.mappings.add_table(LookupTable::from(table));
                summary.lookup_tables += 1;
            }
        }

        for entry in &document.mappings.mapping {
            let uuid = parse_mapping_id(entry.id.as_deref());
            let entries: Vec<&WireMappingEntry> = if entry.is_collection() {
                entry
                    .mappings
                    .as_ref()
                    .map(|m| m.mapping.iter().collect())
                    .unwrap_or_default()
            } else {
                vec![entry]
            };

            let mut model = MappingModel::new().with_uuid(uuid);
            if entry.is_collection() {
                let collection_type = CollectionType::from_wire(entry.collection_type.as_deref());
                model = model.with_collection_type(if collection_type.is_collection() {
                    collection_type
                } else {
                    CollectionType::List
                });
            }
            model.field_mappings = entries
                .into_iter()
                .map(|e| self.parse_pair(e, ctx, &doc_refs, &mut summary))
                .collect();
            if model.field_mappings.is_empty() {
                model.field_mappings.push(FieldMappingPair::new());
            }
            ctx.mappings.add_mapping(model);
            summary.mappings += 1;
        }

        info!(
            mappings = summary.mappings,
            fields = summary.fields,
            dropped = summary.dropped_fields,
            tables = summary.lookup_tables,
            "Deserialized mapping document"
        );
        Ok(summary)
    }

    fn parse_pair(
        &self,
        entry: &WireMappingEntry,
        ctx: &mut MappingContext,
        doc_refs: &DocumentRefs,
        summary: &mut DeserializeSummary,
    ) -> FieldMappingPair {
        let mode = entry
            .mapping_type
            .as_deref()
            .and_then(TransitionMode::from_wire)
            .unwrap_or(TransitionMode::Map);
        let mut transition = TransitionModel::new(mode);
        if let Some(delimiter) = entry.strategy.as_deref().and_then(TransitionDelimiter::from_wire) {
            transition = transition.with_delimiter(delimiter);
        }
        if let Some(name) = &entry.lookup_table_name {
            transition = transition.with_lookup_table_name(name.clone());
        }

        let mut pair = FieldMappingPair::new();
        pair.transition = transition;
        for (wire_fields, is_source) in [(&entry.input_field, true), (&entry.output_field, false)] {
            for wire in wire_fields {
                match parse_field(wire, is_source, ctx, doc_refs) {
                    Some(parsed) => {
                        let index = parsed.index;
                        let mut mf = MappedField::from_parsed(parsed);
                        if let Some(index) = index {
                            mf.set_index(index + 1);
                        }
                        pair.fields_mut(is_source).push(mf);
                        summary.fields += 1;
                    }
                    None => {
                        let path = wire.path.as_deref().unwrap_or_default();
                        warn!(path, doc_id = ?wire.doc_id, "Dropping field with unknown document");
                        ctx.errors.error(format!(
                            "Could not find document '{}' for mapped field '{}'",
                            wire.doc_id.as_deref().unwrap_or_default(),
                            path
                        ));
                        summary.dropped_fields += 1;
                    }
                }
            }
        }
        pair
    }
}

/// Wire ids that are not UUIDs get a fresh one
fn parse_mapping_id(id: Option<&str>) -> Uuid {
    id.and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(Uuid::new_v4)
}

fn descriptor_from_wire(source: &WireDataSource) -> DataSourceDescriptor {
    DataSourceDescriptor {
        id: source.id.clone(),
        uri: source.uri.clone(),
        is_source: source.is_source(),
        document_type: DocumentType::from_uri(&source.uri),
        namespaces: source
            .xml_namespaces
            .as_ref()
            .map(|ns| {
                ns.xml_namespace
                    .iter()
                    .map(|n| NamespaceModel {
                        alias: n.alias.clone(),
                        uri: n.uri.clone(),
                        location_uri: n.location_uri.clone(),
                        target_namespace: n.target_namespace.unwrap_or(false),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        template: source.template.clone(),
    }
}

/// Parsed endpoint data, or `None` when the owning document cannot be identified
fn parse_field(
    wire: &WireField,
    is_source: bool,
    ctx: &MappingContext,
    doc_refs: &DocumentRefs,
) -> Option<ParsedFieldData> {
    let is_property =
        wire.json_type == "PropertyField" || wire.doc_id.as_deref() == Some(PROPERTY_DOCUMENT_ID);
    let is_constant =
        wire.json_type == "ConstantField" || wire.doc_id.as_deref() == Some(CONSTANT_DOCUMENT_ID);

    let document_uri = match wire.doc_id.as_deref() {
        _ if is_property || is_constant => None,
        Some(id) => match doc_refs.get(&(id.to_string(), is_source)) {
            Some(doc_ref) => Some(doc_ref.uri.clone()),
            None => {
                let doc_id = ctx.documents.find_by_id(id, Some(is_source))?;
                ctx.documents.get(doc_id).map(|d| d.uri.clone())
            }
        },
        None => return None,
    };

    let path = wire.path.clone().unwrap_or_else(|| match &wire.name {
        Some(name) if is_property || is_constant => format!("/{}", name),
        _ => String::new(),
    });
    Some(ParsedFieldData {
        name: wire.name.clone(),
        path,
        field_type: wire.field_type.as_deref().map(FieldType::from_wire),
        value: wire.value.clone(),
        document_id: wire.doc_id.clone(),
        document_uri,
        index: wire.index,
        user_created: wire.user_created.unwrap_or(false),
        is_property,
        is_constant,
        actions: wire.actions.iter().filter_map(parse_action).collect(),
    })
}

/// `{Name: {arg: value}}` or `{Name: null}`
fn parse_action(value: &Value) -> Option<ParsedAction> {
    let (name, arguments) = value.as_object()?.iter().next()?;
    let arguments = match arguments {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    Some(ParsedAction {
        name: name.clone(),
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextConfig;
    use serde_json::json;

    fn context() -> MappingContext {
        MappingContext::new(ContextConfig::offline())
    }

    #[test]
    fn test_deserialize_collection_and_pending_fields() {
        let mut ctx = context();
        let value = json!({
            "AtlasMapping": {
                "name": "orders",
                "dataSource": [
                    { "jsonType": "DataSource", "id": "src", "uri": "atlas:java?className=Src", "dataSourceType": "SOURCE" },
                    { "jsonType": "JsonDataSource", "id": "tgt", "uri": "atlas:json:tgt", "dataSourceType": "TARGET",
                      "template": "{}" }
                ],
                "mappings": { "mapping": [
                    { "jsonType": "Collection", "mappingType": "COLLECTION",
                      "id": "7a0e6b3e-3f5b-4c47-9a1e-2b8f0c1e4d5a",
                      "mappings": { "mapping": [
                          { "inputField": [{ "jsonType": "JavaField", "path": "/a", "docId": "src" }],
                            "outputField": [{ "jsonType": "JsonField", "path": "/x", "docId": "tgt" }] },
                          { "inputField": [{ "jsonType": "JavaField", "path": "/b", "docId": "src" }],
                            "outputField": [{ "jsonType": "JsonField", "path": "/y", "docId": "tgt" }] }
                      ]}},
                    { "mappingType": "COMBINE", "delimiter": "COMMA",
                      "inputField": [
                          { "jsonType": "JavaField", "path": "/a", "docId": "src", "index": 0 },
                          { "jsonType": "JavaField", "path": "/b", "docId": "src", "index": 1,
                            "actions": [{ "Trim": null }] }
                      ],
                      "outputField": [{ "jsonType": "JsonField", "path": "/z", "docId": "unknown" }] }
                ]}
            }
        });

        let summary = MappingDeserializer::new().deserialize(&mut ctx, &value).unwrap();
        assert_eq!(summary.mappings, 2);
        assert_eq!(summary.fields, 6);
        assert_eq!(summary.dropped_fields, 1);
        assert_eq!(ctx.mappings.name, "orders");
        assert_eq!(ctx.mappings.template_text.as_deref(), Some("{}"));
        assert_eq!(ctx.mappings.data_sources.len(), 2);

        let collection = &ctx.mappings.mappings()[0];
        assert_eq!(collection.uuid.to_string(), "7a0e6b3e-3f5b-4c47-9a1e-2b8f0c1e4d5a");
        assert_eq!(collection.collection_type, Some(CollectionType::List));
        assert_eq!(ctx.mappings.mappings()[1].collection_type, None);
        assert_eq!(collection.field_mappings.len(), 2);

        let combine = &ctx.mappings.mappings()[1].field_mappings[0];
        assert_eq!(combine.transition.mode, TransitionMode::Combine);
        assert_eq!(combine.transition.delimiter, TransitionDelimiter::Comma);
        assert!(combine.source_fields.iter().all(MappedField::is_pending));
        assert_eq!(combine.source_fields[1].index(), Some(2));
        let parsed = combine.source_fields[1].parsed_data.as_ref().unwrap();
        assert_eq!(parsed.actions[0].name, "Trim");
        assert_eq!(parsed.document_uri.as_deref(), Some("atlas:java?className=Src"));
        assert!(combine.target_fields.is_empty());
        assert!(ctx.errors.contains("unknown"));
    }

    #[test]
    fn test_properties_and_tables_are_registered() {
        let mut ctx = context();
        let value = json!({
            "mappings": { "mapping": [{
                "inputField": [{ "jsonType": "PropertyField", "name": "region", "docId": "DOC.Properties" }],
                "outputField": []
            }]},
            "lookupTables": { "lookupTable": [{
                "name": "colors",
                "lookupEntry": [{ "sourceValue": "RED", "targetValue": "ROJO" }]
            }]},
            "properties": { "property": [{ "name": "region", "value": "EU", "fieldType": "STRING" }] }
        });

        let summary = MappingDeserializer::new().deserialize(&mut ctx, &value).unwrap();
        assert_eq!(summary.properties, 1);
        assert_eq!(summary.lookup_tables, 1);
        assert!(ctx.mappings.table_by_name("colors").is_some());

        let property_doc = ctx.documents.get(ctx.documents.property_doc()).unwrap();
        let field = property_doc.find_field("/region").unwrap();
        assert_eq!(property_doc.field(field).value.as_deref(), Some("EU"));

        let pending = &ctx.mappings.mappings()[0].field_mappings[0].source_fields[0];
        let parsed = pending.parsed_data.as_ref().unwrap();
        assert!(parsed.is_property);
        assert_eq!(parsed.path, "/region");
    }

    #[test]
    fn test_same_id_on_both_sides_keeps_each_side_uri() {
        let mut ctx = context();
        let value = json!({
            "dataSource": [
                { "id": "person", "uri": "atlas:json:person", "dataSourceType": "SOURCE" },
                { "id": "person", "uri": "atlas:xml:person", "dataSourceType": "TARGET" }
            ],
            "mappings": { "mapping": [{
                "inputField": [{ "jsonType": "JsonField", "path": "/first", "docId": "person" }],
                "outputField": [{ "jsonType": "XmlField", "path": "/last", "docId": "person" }]
            }]}
        });

        MappingDeserializer::new().deserialize(&mut ctx, &value).unwrap();
        let pair = &ctx.mappings.mappings()[0].field_mappings[0];
        let uri = |mf: &MappedField| mf.parsed_data.as_ref().unwrap().document_uri.clone();
        assert_eq!(uri(&pair.source_fields[0]).as_deref(), Some("atlas:json:person"));
        assert_eq!(uri(&pair.target_fields[0]).as_deref(), Some("atlas:xml:person"));
    }

    #[test]
    fn test_reading_replaces_tables_and_properties() {
        let mut ctx = context();
        let deserializer = MappingDeserializer::new();
        deserializer
            .deserialize(
                &mut ctx,
                &json!({
                    "mappings": { "mapping": [] },
                    "lookupTables": { "lookupTable": [{ "name": "colors", "lookupEntry": [] }]},
                    "properties": { "property": [{ "name": "region", "value": "EU", "fieldType": "STRING" }] }
                }),
            )
            .unwrap();
        assert!(ctx.mappings.table_by_name("colors").is_some());

        deserializer
            .deserialize(
                &mut ctx,
                &json!({
                    "mappings": { "mapping": [] },
                    "lookupTables": { "lookupTable": [{ "name": "sizes", "lookupEntry": [] }]}
                }),
            )
            .unwrap();
        assert!(ctx.mappings.table_by_name("colors").is_none());
        assert!(ctx.mappings.table_by_name("sizes").is_some());
        let property_doc = ctx.documents.get(ctx.documents.property_doc()).unwrap();
        assert!(property_doc.find_field("/region").is_none());
    }

    #[test]
    fn test_invalid_document_is_a_parse_error() {
        let mut ctx = context();
        let err = MappingDeserializer::new()
            .deserialize(&mut ctx, &json!({ "mappings": "nope" }))
            .unwrap_err();
        assert!(matches!(err, ImportError::ParseError(_)));
    }
}
