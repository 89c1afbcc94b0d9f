//! CLI command implementations

pub mod inspect;
pub mod resolve;

use crate::cli::error::CliError;
use crate::models::DocumentType;
use std::io::Read;
use std::path::PathBuf;

/// Load input content from file or stdin
pub(crate) fn load_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(content)
    } else {
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))
    }
}

/// Parse an inspectable document type name
pub(crate) fn parse_document_type(name: &str) -> Result<DocumentType, CliError> {
    match name.trim().to_lowercase().as_str() {
        "java" => Ok(DocumentType::Java),
        "xml" => Ok(DocumentType::Xml),
        "json" => Ok(DocumentType::Json),
        _ => Err(CliError::InvalidArgument(format!(
            "Unknown document type: {} (expected java, xml or json)",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_type() {
        assert_eq!(parse_document_type("JSON").unwrap(), DocumentType::Json);
        assert!(matches!(
            parse_document_type("property"),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
