//! Mapping document export/import tests

use field_mapping_sdk::{
    ContextConfig, DocId, DocumentType, MappingContext, MappingSerializer, TransitionDelimiter, TransitionMode,
};
use serde_json::{Value, json};

fn person_response() -> Value {
    json!({ "JsonInspectionResponse": { "jsonDocument": { "fields": { "field": [
        { "name": "first", "path": "/first", "fieldType": "STRING" },
        { "name": "last", "path": "/last", "fieldType": "STRING" },
        { "name": "orders", "path": "/orders<>", "fieldType": "COMPLEX", "collectionType": "LIST",
          "jsonFields": { "jsonField": [
              { "name": "total", "path": "/orders<>/total", "fieldType": "DOUBLE" }
          ]}}
    ]}}}})
}

fn contact_response() -> Value {
    json!({ "XmlInspectionResponse": { "xmlDocument": {
        "xmlNamespaces": { "xmlNamespace": [{ "alias": "tns", "uri": "http://example.com/contact" }] },
        "fields": { "field": [
            { "name": "tns:fullName", "path": "/tns:fullName", "fieldType": "STRING" },
            { "name": "tns:items", "path": "/tns:items<>", "fieldType": "COMPLEX", "collectionType": "LIST",
              "xmlFields": { "xmlField": [
                  { "name": "tns:price", "path": "/tns:items<>/tns:price", "fieldType": "DOUBLE" }
              ]}}
        ]}
    }}})
}

fn loaded_context() -> (MappingContext, DocId, DocId) {
    let mut ctx = MappingContext::new(ContextConfig::default());
    let src = ctx.add_document("person", "Person", DocumentType::Json, true);
    let tgt = ctx.add_document("contact", "Contact", DocumentType::Xml, false);
    ctx.complete_document_load(src, &person_response()).unwrap();
    ctx.complete_document_load(tgt, &contact_response()).unwrap();
    (ctx, src, tgt)
}

const PERSON: &str = "com.example.Person";
const CONTACT: &str = "com.example.Contact";

fn java_field(name: &str, field_type: &str) -> Value {
    json!({ "name": name, "path": format!("/{}", name), "fieldType": field_type })
}

fn java_enum(name: &str, class_name: &str, values: &[&str]) -> Value {
    let values: Vec<Value> = values
        .iter()
        .enumerate()
        .map(|(ordinal, value)| json!({ "name": value, "ordinal": ordinal }))
        .collect();
    json!({ "name": name, "path": format!("/{}", name), "fieldType": "COMPLEX", "enumeration": true,
            "className": class_name, "javaEnumFields": { "javaEnumField": values } })
}

fn java_class(class_name: &str, fields: Vec<Value>) -> Value {
    json!({ "ClassInspectionResponse": { "javaClass": {
        "className": class_name,
        "uri": format!("atlas:java?className={}", class_name),
        "javaFields": { "javaField": fields }
    }}})
}

/// Java person/contact pair with a catalog holding an action that takes arguments
fn java_context() -> (MappingContext, DocId, DocId) {
    let mut ctx = MappingContext::new(ContextConfig::default());
    ctx.load_action_catalog(&json!({ "ActionDetails": { "actionDetail": [
        { "name": "Uppercase", "sourceType": "STRING", "targetType": "STRING" },
        { "name": "PadStringRight", "sourceType": "STRING", "targetType": "STRING",
          "parameters": { "property": [
              { "name": "padCharacter", "fieldType": "STRING" },
              { "name": "padCount", "fieldType": "INTEGER" }
          ]}}
    ]}}))
    .unwrap();
    let src = ctx.add_document(PERSON, "Person", DocumentType::Java, true);
    let tgt = ctx.add_document(CONTACT, "Contact", DocumentType::Java, false);
    ctx.complete_document_load(
        src,
        &java_class(
            PERSON,
            vec![
                java_field("fullName", "STRING"),
                java_field("first", "STRING"),
                java_field("last", "STRING"),
                java_enum("status", "com.example.Status", &["OPEN", "CLOSED"]),
            ],
        ),
    )
    .unwrap();
    ctx.complete_document_load(
        tgt,
        &java_class(
            CONTACT,
            vec![
                java_field("name", "STRING"),
                java_field("given", "STRING"),
                java_field("family", "STRING"),
                java_field("summary", "STRING"),
                java_enum("state", "com.example.State", &["OPEN", "DONE"]),
            ],
        ),
    )
    .unwrap();
    (ctx, src, tgt)
}

/// One mapping of every kind between the Java person and contact
fn every_kind_document() -> Value {
    json!({ "AtlasMapping": {
        "name": "people",
        "dataSource": [
            { "jsonType": "DataSource", "id": PERSON, "uri": "atlas:java?className=com.example.Person",
              "dataSourceType": "SOURCE" },
            { "jsonType": "DataSource", "id": CONTACT, "uri": "atlas:java?className=com.example.Contact",
              "dataSourceType": "TARGET" }
        ],
        "mappings": { "mapping": [
            { "jsonType": "Mapping", "mappingType": "MAP",
              "inputField": [{ "jsonType": "JavaField", "path": "/first", "docId": PERSON }],
              "outputField": [{ "jsonType": "JavaField", "path": "/name", "docId": CONTACT, "actions": [
                  { "PadStringRight": { "padCharacter": "x", "padCount": 3 } },
                  { "Uppercase": null }
              ]}] },
            { "jsonType": "Mapping", "mappingType": "SEPARATE", "strategy": "COMMA",
              "inputField": [{ "jsonType": "JavaField", "path": "/fullName", "docId": PERSON }],
              "outputField": [
                  { "jsonType": "JavaField", "path": "/given", "docId": CONTACT, "index": 0 },
                  { "jsonType": "JavaField", "path": "/family", "docId": CONTACT, "index": 1 }
              ] },
            { "jsonType": "Mapping", "mappingType": "COMBINE", "strategy": "SPACE",
              "inputField": [
                  { "jsonType": "JavaField", "path": "/first", "docId": PERSON, "index": 0 },
                  { "jsonType": "JavaField", "path": "/last", "docId": PERSON, "index": 1 }
              ],
              "outputField": [{ "jsonType": "JavaField", "path": "/summary", "docId": CONTACT }] },
            { "jsonType": "Mapping", "mappingType": "LOOKUP", "lookupTableName": "status-to-state",
              "inputField": [{ "jsonType": "JavaField", "path": "/status", "docId": PERSON }],
              "outputField": [{ "jsonType": "JavaField", "path": "/state", "docId": CONTACT }] }
        ]},
        "lookupTables": { "lookupTable": [{ "name": "status-to-state", "lookupEntry": [
            { "sourceValue": "OPEN", "targetValue": "OPEN" },
            { "sourceValue": "CLOSED", "targetValue": "DONE" }
        ]}]}
    }})
}

/// The same JSON type loaded as both source and target
fn self_mapped_context() -> (MappingContext, DocId, DocId) {
    let mut ctx = MappingContext::new(ContextConfig::default());
    let src = ctx.add_document("person", "Person", DocumentType::Json, true);
    let tgt = ctx.add_document("person", "Person", DocumentType::Json, false);
    ctx.complete_document_load(src, &person_response()).unwrap();
    ctx.complete_document_load(tgt, &person_response()).unwrap();
    (ctx, src, tgt)
}

fn combine_context() -> MappingContext {
    let (mut ctx, src, tgt) = loaded_context();
    let first = ctx.find_field(src, "/first").unwrap();
    let last = ctx.find_field(src, "/last").unwrap();
    let full_name = ctx.find_field(tgt, "/tns:fullName").unwrap();
    ctx.add_field_to_active_mapping(first, true).unwrap();
    ctx.add_field_to_active_mapping(full_name, false).unwrap();
    ctx.add_field_to_active_mapping(last, true).unwrap();
    ctx
}

mod export_tests {
    use super::*;

    #[test]
    fn test_combine_with_space_writes_zero_based_indices() {
        let mut ctx = combine_context();
        let pair = ctx.mappings.active_mapping().unwrap().current_pair().unwrap();
        assert_eq!(pair.transition.mode, TransitionMode::Combine);
        assert_eq!(pair.transition.delimiter, TransitionDelimiter::Space);

        let value = ctx.export_mappings().unwrap();
        let entry = &value["AtlasMapping"]["mappings"]["mapping"][0];
        assert_eq!(entry["mappingType"], "COMBINE");
        assert_eq!(entry["strategy"], "SPACE");
        assert_eq!(entry["inputField"][0]["path"], "/first");
        assert_eq!(entry["inputField"][0]["index"], 0);
        assert_eq!(entry["inputField"][1]["path"], "/last");
        assert_eq!(entry["inputField"][1]["index"], 1);
        assert!(entry["outputField"][0].get("index").is_none());
        assert_eq!(entry["outputField"][0]["jsonType"], "XmlField");
    }

    #[test]
    fn test_collection_mapping_is_wrapped() {
        let (mut ctx, src, tgt) = loaded_context();
        let total = ctx.find_field(src, "/orders<>/total").unwrap();
        let price = ctx.find_field(tgt, "/tns:items<>/tns:price").unwrap();
        ctx.add_field_to_active_mapping(total, true).unwrap();
        ctx.add_field_to_active_mapping(price, false).unwrap();

        let value = ctx.export_mappings().unwrap();
        let entry = &value["AtlasMapping"]["mappings"]["mapping"][0];
        assert_eq!(entry["jsonType"], "Collection");
        assert_eq!(entry["mappingType"], "COLLECTION");
        assert_eq!(entry["collectionType"], "LIST");
        let inner = entry["mappings"]["mapping"].as_array().unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0]["inputField"][0]["path"], "/orders<>/total");
    }

    #[test]
    fn test_data_sources_carry_namespaces_and_template() {
        let (mut ctx, _, _) = loaded_context();
        ctx.mappings.template_text = Some("<contact/>".to_string());

        let value = ctx.export_mappings().unwrap();
        let sources = value["AtlasMapping"]["dataSource"].as_array().unwrap();
        assert_eq!(sources.len(), 2);
        let target = sources.iter().find(|s| s["id"] == "contact").unwrap();
        assert_eq!(target["dataSourceType"], "TARGET");
        assert_eq!(target["template"], "<contact/>");
        assert_eq!(target["xmlNamespaces"]["xmlNamespace"][0]["alias"], "tns");
        let source = sources.iter().find(|s| s["id"] == "person").unwrap();
        assert!(source.get("template").is_none());
    }

    #[test]
    fn test_incomplete_mapping_is_not_written() {
        let (mut ctx, src, _) = loaded_context();
        let first = ctx.find_field(src, "/first").unwrap();
        ctx.add_field_to_active_mapping(first, true).unwrap();

        let result = MappingSerializer::new().export(&mut ctx).unwrap();
        assert_eq!(result.format, "atlas-mapping-json");
        let value: Value = serde_json::from_str(&result.content).unwrap();
        assert!(value["AtlasMapping"]["mappings"]["mapping"].as_array().unwrap().is_empty());
    }
}

mod round_trip_tests {
    use super::*;

    #[test]
    fn test_exported_mapping_reloads_into_fresh_context() {
        let mut original = combine_context();
        original.add_property("region", "EU", field_mapping_sdk::FieldType::String).unwrap();
        let uuid = original.mappings.active_mapping().unwrap().uuid;
        let exported = original.export_mappings().unwrap();

        let (mut ctx, src, _) = loaded_context();
        let summary = ctx.load_mappings(&exported).unwrap();
        assert_eq!(summary.mappings, 1);
        assert_eq!(summary.fields, 3);
        assert_eq!(summary.dropped_fields, 0);
        assert_eq!(summary.properties, 1);

        let mapping = ctx.mappings.mapping(uuid).unwrap();
        let pair = mapping.current_pair().unwrap();
        assert_eq!(pair.transition.mode, TransitionMode::Combine);
        assert!(pair.source_fields.iter().all(|mf| !mf.is_pending()));
        let indices: Vec<Option<u32>> = pair.source_fields.iter().map(|mf| mf.index()).collect();
        assert_eq!(indices, vec![Some(1), Some(2)]);
        assert_eq!(pair.source_fields[0].field.doc(), Some(src));

        let reexported = ctx.export_mappings().unwrap();
        assert_eq!(
            reexported["AtlasMapping"]["mappings"],
            exported["AtlasMapping"]["mappings"]
        );
        assert_eq!(reexported["AtlasMapping"]["properties"]["property"][0]["value"], "EU");
    }

    #[test]
    fn test_every_mapping_kind_survives_reload() {
        let (mut original, _, _) = java_context();
        original.load_mappings(&every_kind_document()).unwrap();
        assert_eq!(original.synchronize().pending_fields, 0);
        let exported = original.export_mappings().unwrap();

        let entries = exported["AtlasMapping"]["mappings"]["mapping"].as_array().unwrap();
        let kinds: Vec<&str> = entries.iter().map(|e| e["mappingType"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["MAP", "SEPARATE", "COMBINE", "LOOKUP"]);
        assert_eq!(
            entries[0]["outputField"][0]["actions"],
            json!([{ "PadStringRight": { "padCharacter": "x", "padCount": 3 } }, { "Uppercase": null }])
        );
        assert_eq!(entries[1]["strategy"], "COMMA");
        assert_eq!(entries[1]["outputField"][0]["index"], 0);
        assert_eq!(entries[1]["outputField"][1]["index"], 1);
        assert_eq!(entries[3]["lookupTableName"], "status-to-state");

        let (mut ctx, src, _) = java_context();
        let summary = ctx.load_mappings(&exported).unwrap();
        assert_eq!(summary.mappings, 4);
        assert_eq!(summary.dropped_fields, 0);

        let modes: Vec<TransitionMode> = ctx.mappings.mappings().iter().map(|m| m.mode()).collect();
        assert_eq!(
            modes,
            vec![TransitionMode::Map, TransitionMode::Separate, TransitionMode::Combine, TransitionMode::Enum]
        );
        let name = &ctx.mappings.mappings()[0].field_mappings[0].target_fields[0];
        let actions: Vec<&str> = name.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(actions, vec!["PadStringRight", "Uppercase"]);
        assert_eq!(name.actions[0].argument("padCharacter"), Some("x"));
        assert_eq!(name.actions[0].argument("padCount"), Some("3"));
        let separate = ctx.mappings.mappings()[1].current_pair().unwrap();
        let indices: Vec<Option<u32>> = separate.target_fields.iter().map(|mf| mf.index()).collect();
        assert_eq!(indices, vec![Some(1), Some(2)]);
        let table = ctx.mappings.table_by_name("status-to-state").unwrap();
        assert_eq!(table.entry_for("CLOSED").unwrap().target_value, "DONE");
        assert_eq!(table.source_identifier.as_deref(), Some("com.example.Status"));

        // a lookup without actions is mapped but not transformed
        let status = ctx.find_field(src, "/status").unwrap();
        assert!(ctx.field(status).unwrap().part_of_mapping);
        assert!(!ctx.field(status).unwrap().part_of_transformation);

        let reexported = ctx.export_mappings().unwrap();
        assert_eq!(reexported["AtlasMapping"]["mappings"], exported["AtlasMapping"]["mappings"]);
        assert_eq!(
            reexported["AtlasMapping"]["lookupTables"],
            exported["AtlasMapping"]["lookupTables"]
        );
    }

    #[test]
    fn test_type_mapped_onto_itself_resolves_per_side() {
        let (mut original, src, tgt) = self_mapped_context();
        let first = original.find_field(src, "/first").unwrap();
        let last = original.find_field(tgt, "/last").unwrap();
        original.add_field_to_active_mapping(first, true).unwrap();
        original.add_field_to_active_mapping(last, false).unwrap();
        let exported = original.export_mappings().unwrap();
        assert_eq!(exported["AtlasMapping"]["dataSource"].as_array().unwrap().len(), 2);

        let (mut ctx, src, tgt) = self_mapped_context();
        ctx.load_mappings(&exported).unwrap();
        let pair = ctx.mappings.mappings()[0].current_pair().unwrap();
        assert_eq!(pair.source_fields[0].field.doc(), Some(src));
        assert_eq!(pair.target_fields[0].field.doc(), Some(tgt));

        let target_last = ctx.find_field(tgt, "/last").unwrap();
        let source_last = ctx.find_field(src, "/last").unwrap();
        assert!(ctx.field(target_last).unwrap().part_of_mapping);
        assert!(!ctx.field(source_last).unwrap().part_of_mapping);
    }

    #[test]
    fn test_pending_collection_mapping_keeps_wrapper() {
        let (mut ctx, src, tgt) = loaded_context();
        let total = ctx.find_field(src, "/orders<>/total").unwrap();
        let price = ctx.find_field(tgt, "/tns:items<>/tns:price").unwrap();
        ctx.add_field_to_active_mapping(total, true).unwrap();
        ctx.add_field_to_active_mapping(price, false).unwrap();
        let exported = ctx.export_mappings().unwrap();

        let mut pending = MappingContext::new(ContextConfig::offline());
        pending.load_mappings(&exported).unwrap();
        assert_eq!(pending.synchronize().pending_fields, 2);

        let saved = pending.export_mappings().unwrap();
        let entry = &saved["AtlasMapping"]["mappings"]["mapping"][0];
        assert_eq!(entry["jsonType"], "Collection");
        assert_eq!(entry["mappingType"], "COLLECTION");
        assert_eq!(entry["collectionType"], "LIST");
        let inner = entry["mappings"]["mapping"].as_array().unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0]["outputField"][0]["path"], "/tns:items<>/tns:price");
    }

    #[test]
    fn test_pending_mapping_survives_save_without_documents() {
        let exported = combine_context().export_mappings().unwrap();

        let mut ctx = MappingContext::new(ContextConfig::offline());
        ctx.load_mappings(&exported).unwrap();
        assert_eq!(ctx.synchronize().pending_fields, 3);

        let saved = ctx.export_mappings().unwrap();
        let entry = &saved["AtlasMapping"]["mappings"]["mapping"][0];
        assert_eq!(entry["inputField"][1]["index"], 1);
        assert_eq!(entry["outputField"][0]["docId"], "contact");
        assert_eq!(entry["outputField"][0]["jsonType"], "XmlField");
        assert_eq!(saved["AtlasMapping"]["dataSource"].as_array().unwrap().len(), 2);
    }
}
