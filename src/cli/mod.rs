//! CLI module for field-mapping-cli binary

#[cfg(feature = "cli")]
pub mod commands;
#[cfg(feature = "cli")]
pub mod error;
#[cfg(feature = "cli")]
pub mod output;

#[cfg(feature = "cli")]
pub use error::CliError;

#[cfg(feature = "cli")]
use crate::context::ContextConfig;
#[cfg(feature = "cli")]
use std::path::Path;

/// Read a TOML context configuration, or the defaults when no file is given
#[cfg(feature = "cli")]
pub fn load_config(path: Option<&Path>) -> Result<ContextConfig, CliError> {
    let Some(path) = path else {
        return Ok(ContextConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))?;
    toml::from_str(&content).map_err(|e| CliError::ConfigError(format!("{}: {}", path.display(), e)))
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_from_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mapping.toml");
        std::fs::write(
            &path,
            "alphabetizeAllDocuments = true\ntemplateDocumentTypes = [\"XML\"]\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(config.alphabetize_all_documents);
        assert_eq!(config.template_document_types, vec![DocumentType::Xml]);
        assert!(config.inspection_service_url(DocumentType::Json).is_some());
    }

    #[test]
    fn test_missing_config_file() {
        let result = load_config(Some(Path::new("/nonexistent/mapping.toml")));
        assert!(matches!(result, Err(CliError::FileReadError(_, _))));
    }
}
