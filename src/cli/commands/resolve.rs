//! Resolve command implementation
//!
//! Loads saved inspection responses, applies a mapping document to them and
//! writes the synchronized mapping back out.

use super::{load_input, parse_document_type};
use crate::cli::error::CliError;
use crate::cli::output::format_mapping_report;
use crate::context::{ContextConfig, MappingContext};
use crate::storage::filesystem::{ACTION_CATALOG_FILE, FileSystemInspectionBackend};
use crate::storage::{DocumentLoader, DocumentSpec};
use std::path::PathBuf;

/// Arguments for the `resolve` command
pub struct ResolveArgs {
    /// Directory holding `<id>.json` inspection responses
    pub documents_dir: PathBuf,
    /// Source documents as `id:type`
    pub sources: Vec<String>,
    /// Target documents as `id:type`
    pub targets: Vec<String>,
    /// Mapping document to resolve, `-` for stdin
    pub mapping: Option<String>,
    /// Where to write the re-serialized mapping; stdout when absent
    pub output: Option<PathBuf>,
}

/// Parse `id:type`
fn parse_document_spec(spec: &str, is_source: bool) -> Result<DocumentSpec, CliError> {
    let (id, document_type) = spec.rsplit_once(':').ok_or_else(|| {
        CliError::InvalidArgument(format!("Expected id:type, got '{}'", spec))
    })?;
    if id.is_empty() {
        return Err(CliError::InvalidArgument(format!("Missing document id in '{}'", spec)));
    }
    Ok(DocumentSpec::new(id, parse_document_type(document_type)?, is_source))
}

/// Handle the resolve command
pub fn handle_resolve(args: &ResolveArgs, config: ContextConfig) -> Result<(), CliError> {
    let mut specs = Vec::new();
    for spec in &args.sources {
        specs.push(parse_document_spec(spec, true)?);
    }
    for spec in &args.targets {
        specs.push(parse_document_spec(spec, false)?);
    }
    let mapping = match &args.mapping {
        Some(input) => Some(
            serde_json::from_str::<serde_json::Value>(&load_input(input)?)
                .map_err(|e| CliError::InvalidArgument(format!("Mapping is not valid JSON: {}", e)))?,
        ),
        None => None,
    };

    let mut ctx = MappingContext::new(config);
    let backend = FileSystemInspectionBackend::new(&args.documents_dir);
    let loader = DocumentLoader::new(&backend);
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::InvalidArgument(format!("Failed to start runtime: {}", e)))?;

    let load_summary = runtime.block_on(async {
        if args.documents_dir.join(ACTION_CATALOG_FILE).exists() {
            loader.load_action_catalog(&mut ctx).await?;
        }
        Ok::<_, CliError>(loader.load_documents(&mut ctx, &specs).await)
    })?;
    eprintln!(
        "Loaded {} document(s), {} failed, {} skipped",
        load_summary.loaded, load_summary.failed, load_summary.skipped
    );

    if let Some(mapping) = &mapping {
        ctx.load_mappings(mapping)?;
    }
    let summary = ctx.synchronize();
    eprintln!("{}", format_mapping_report(&ctx, &summary));

    let exported = ctx.export_mappings()?;
    let content = serde_json::to_string_pretty(&exported)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to serialize mapping: {}", e)))?;
    match &args.output {
        Some(path) => std::fs::write(path, content)
            .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?,
        None => println!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use tempfile::TempDir;

    #[test]
    fn test_parse_document_spec() {
        let spec = parse_document_spec("com.example.Order:java", true).unwrap();
        assert_eq!(spec.id, "com.example.Order");
        assert_eq!(spec.document_type, DocumentType::Java);
        assert!(parse_document_spec("order", true).is_err());
        assert!(parse_document_spec(":json", false).is_err());
    }

    #[test]
    fn test_resolve_writes_mapping() {
        let temp = TempDir::new().unwrap();
        let response = r#"{ "JsonInspectionResponse": { "jsonDocument": { "fields": { "field": [
            { "name": "name", "path": "/name", "fieldType": "STRING" }
        ]}}}}"#;
        std::fs::write(temp.path().join("src.json"), response).unwrap();
        std::fs::write(temp.path().join("tgt.json"), response).unwrap();
        let mapping_path = temp.path().join("mapping.json");
        std::fs::write(
            &mapping_path,
            r#"{ "AtlasMapping": { "mappings": { "mapping": [{
                "jsonType": "Mapping", "mappingType": "MAP",
                "inputField": [{ "jsonType": "JsonField", "path": "/name", "docId": "src" }],
                "outputField": [{ "jsonType": "JsonField", "path": "/name", "docId": "tgt" }]
            }]}}}"#,
        )
        .unwrap();
        let output = temp.path().join("out.json");

        let args = ResolveArgs {
            documents_dir: temp.path().to_path_buf(),
            sources: vec!["src:json".to_string()],
            targets: vec!["tgt:json".to_string()],
            mapping: Some(mapping_path.to_string_lossy().to_string()),
            output: Some(output.clone()),
        };
        handle_resolve(&args, ContextConfig::default()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        let entry = &written["AtlasMapping"]["mappings"]["mapping"][0];
        assert_eq!(entry["inputField"][0]["docId"], "src");
        assert_eq!(entry["outputField"][0]["path"], "/name");
        assert_eq!(written["AtlasMapping"]["dataSource"].as_array().unwrap().len(), 2);
    }
}
