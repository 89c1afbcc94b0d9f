//! Document loader tests

use field_mapping_sdk::{
    ContextConfig, DocumentLoader, DocumentSpec, DocumentType, MappingContext, MemoryInspectionBackend,
};
use serde_json::{Value, json};

fn json_document(names: &[&str]) -> Value {
    let fields: Vec<Value> = names
        .iter()
        .map(|name| json!({ "name": name, "path": format!("/{}", name), "fieldType": "STRING" }))
        .collect();
    json!({ "JsonInspectionResponse": { "jsonDocument": { "fields": { "field": fields } } } })
}

fn catalog() -> Value {
    json!({ "ActionDetails": { "actionDetail": [
        { "name": "Trim", "sourceType": "STRING", "targetType": "STRING" },
        { "name": "Uppercase", "sourceType": "STRING", "targetType": "STRING" }
    ]}})
}

mod memory_backend_tests {
    use super::*;

    #[tokio::test]
    async fn test_load_documents_and_catalog() {
        let backend = MemoryInspectionBackend::new()
            .with_document("src", json_document(&["first", "last"]))
            .with_document("tgt", json_document(&["name"]))
            .with_action_catalog(catalog());
        let loader = DocumentLoader::new(&backend);
        let mut ctx = MappingContext::new(ContextConfig::default());

        assert_eq!(loader.load_action_catalog(&mut ctx).await.unwrap(), 2);
        let summary = loader
            .load_documents(
                &mut ctx,
                &[
                    DocumentSpec::new("src", DocumentType::Json, true).with_name("Source"),
                    DocumentSpec::new("tgt", DocumentType::Json, false),
                ],
            )
            .await;

        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.failed, 0);
        assert!(ctx.documents_settled());
        let src = ctx.documents.find_by_id("src", Some(true)).unwrap();
        assert_eq!(ctx.documents.get(src).unwrap().name, "Source");
        assert_eq!(ctx.documents.get(src).unwrap().field_count(), 2);
        assert!(ctx.actions.contains("Trim"));
    }

    #[tokio::test]
    async fn test_missing_document_settles_with_error() {
        let backend = MemoryInspectionBackend::new().with_document("src", json_document(&["first"]));
        let loader = DocumentLoader::new(&backend);
        let mut ctx = MappingContext::new(ContextConfig::default());

        let summary = loader
            .load_documents(
                &mut ctx,
                &[
                    DocumentSpec::new("src", DocumentType::Json, true),
                    DocumentSpec::new("absent", DocumentType::Json, false),
                ],
            )
            .await;

        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.failed, 1);
        assert!(ctx.documents_settled());
        let absent = ctx.documents.find_by_id("absent", None).unwrap();
        assert!(ctx.documents.get(absent).unwrap().error_occurred);
        assert!(ctx.errors.contains("absent"));
    }

    #[tokio::test]
    async fn test_unconfigured_service_skips_load() {
        let backend = MemoryInspectionBackend::new().with_document("src", json_document(&["first"]));
        let loader = DocumentLoader::new(&backend);
        let config = ContextConfig::offline().with_inspection_service_url(DocumentType::Json, "http://localhost/json/");
        let mut ctx = MappingContext::new(config);

        let summary = loader
            .load_documents(
                &mut ctx,
                &[
                    DocumentSpec::new("src", DocumentType::Json, true),
                    DocumentSpec::new("com.example.Order", DocumentType::Java, false),
                ],
            )
            .await;

        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.skipped, 1);
        assert!(ctx.documents_settled());
        assert!(ctx.errors.contains("No inspection service configured for JAVA documents"));
    }

    #[tokio::test]
    async fn test_missing_catalog_is_an_error() {
        let backend = MemoryInspectionBackend::new();
        let loader = DocumentLoader::new(&backend);
        let mut ctx = MappingContext::new(ContextConfig::default());
        assert!(loader.load_action_catalog(&mut ctx).await.is_err());
        assert!(ctx.actions.is_empty());
    }

    #[tokio::test]
    async fn test_mapping_resolves_after_loading() {
        let backend = MemoryInspectionBackend::new()
            .with_document("src", json_document(&["first"]))
            .with_document("tgt", json_document(&["name"]));
        let loader = DocumentLoader::new(&backend);
        let mut ctx = MappingContext::new(ContextConfig::default());
        ctx.load_mappings(&json!({ "mappings": { "mapping": [{
            "inputField": [{ "jsonType": "JsonField", "path": "/first", "docId": "src" }],
            "outputField": [{ "jsonType": "JsonField", "path": "/name", "docId": "tgt" }]
        }]}}))
        .unwrap();
        // no data sources and no documents yet: both fields are dropped
        assert!(ctx.mappings.mappings()[0].is_empty());

        ctx.add_document("src", "src", DocumentType::Json, true);
        ctx.add_document("tgt", "tgt", DocumentType::Json, false);
        ctx.load_mappings(&json!({ "mappings": { "mapping": [{
            "inputField": [{ "jsonType": "JsonField", "path": "/first", "docId": "src" }],
            "outputField": [{ "jsonType": "JsonField", "path": "/name", "docId": "tgt" }]
        }]}}))
        .unwrap();
        loader
            .load_documents(
                &mut ctx,
                &[
                    DocumentSpec::new("src", DocumentType::Json, true),
                    DocumentSpec::new("tgt", DocumentType::Json, false),
                ],
            )
            .await;

        let summary = ctx.synchronize();
        assert_eq!(summary.pending_fields, 0);
        assert_eq!(ctx.mappings.mappings()[0].mapped_field_refs().len(), 2);
    }
}
