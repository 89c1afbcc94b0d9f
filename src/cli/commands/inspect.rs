//! Inspect command implementation

use super::{load_input, parse_document_type};
use crate::cli::error::CliError;
use crate::cli::output::format_document_tree;
use crate::context::ContextConfig;
use crate::import::DocumentImporter;
use crate::models::DocumentDefinition;

/// Parse an inspection response and return its formatted field tree
pub fn inspect_document(
    document_type: &str,
    content: &str,
    config: &ContextConfig,
) -> Result<String, CliError> {
    let document_type = parse_document_type(document_type)?;
    let response: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| CliError::InvalidArgument(format!("Input is not valid JSON: {}", e)))?;
    let inspected = DocumentImporter::new().import(document_type, &response)?;

    let id = inspected.uri.clone().unwrap_or_else(|| "document".to_string());
    let mut doc = DocumentDefinition::new(
        id.clone(),
        id.clone(),
        inspected.uri.unwrap_or_else(|| document_type.uri_for(&id)),
        document_type,
        true,
    )
    .with_path_separator(config.path_separator.clone())
    .with_namespaces(inspected.namespaces)
    .with_alphabetize(config.alphabetizes(document_type));
    doc.initialize_from_fields(inspected.fields);

    let mut output = format_document_tree(&doc);
    if inspected.excluded > 0 {
        output.push_str(&format!("\n⚠️  {} field(s) excluded by status\n", inspected.excluded));
    }
    Ok(output)
}

/// Handle the inspect command
pub fn handle_inspect(document_type: &str, input: &str, config: &ContextConfig) -> Result<(), CliError> {
    let content = load_input(input)?;
    let output = inspect_document(document_type, &content, config)?;
    println!("{}", output);
    Ok(())
}
