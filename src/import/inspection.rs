//! Inspection response importer
//!
//! Parses the responses of the Java, XML and JSON inspection services into
//! [`FieldNode`] trees ready for
//! [`DocumentDefinition::initialize_from_fields`](crate::models::DocumentDefinition::initialize_from_fields).
//!
//! Fields whose status is `NOT_FOUND` or `BLACK_LIST` are excluded together with
//! their subtree.

use super::ImportError;
use crate::models::wire::WireXmlNamespaces;
use crate::models::{CollectionType, DocumentType, EnumValue, Field, FieldNode, FieldType, NamespaceModel};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

const EXCLUDED_STATUSES: [&str; 2] = ["NOT_FOUND", "BLACK_LIST"];

/// Result of parsing one inspection response
#[derive(Debug, Clone, Default)]
pub struct InspectedDocument {
    pub fields: Vec<FieldNode>,
    pub namespaces: Vec<NamespaceModel>,
    /// URI reported by the service, if any
    pub uri: Option<String>,
    /// Number of fields dropped because of their status
    pub excluded: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassInspectionResponse {
    java_class: Option<JavaClass>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JavaClass {
    class_name: Option<String>,
    uri: Option<String>,
    status: Option<String>,
    java_fields: Option<JavaFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JavaFields {
    #[serde(default)]
    java_field: Vec<JavaField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JavaField {
    name: Option<String>,
    path: Option<String>,
    field_type: Option<String>,
    collection_type: Option<String>,
    status: Option<String>,
    #[serde(default)]
    primitive: bool,
    class_name: Option<String>,
    #[serde(default)]
    enumeration: bool,
    java_enum_fields: Option<JavaEnumFields>,
    java_fields: Option<JavaFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JavaEnumFields {
    #[serde(default)]
    java_enum_field: Vec<JavaEnumField>,
}

#[derive(Debug, Deserialize)]
struct JavaEnumField {
    name: String,
    #[serde(default)]
    ordinal: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlInspectionResponse {
    xml_document: Option<XmlDocument>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlDocument {
    fields: Option<XmlFieldList>,
    xml_namespaces: Option<WireXmlNamespaces>,
}

#[derive(Debug, Default, Deserialize)]
struct XmlFieldList {
    #[serde(default)]
    field: Vec<TreeField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonInspectionResponse {
    json_document: Option<JsonDocument>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonDocument {
    fields: Option<XmlFieldList>,
}

/// XML and JSON fields share one shape; only the child list key differs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeField {
    name: Option<String>,
    path: Option<String>,
    field_type: Option<String>,
    collection_type: Option<String>,
    status: Option<String>,
    type_name: Option<String>,
    xml_fields: Option<XmlChildren>,
    json_fields: Option<JsonChildren>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XmlChildren {
    #[serde(default)]
    xml_field: Vec<TreeField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonChildren {
    #[serde(default)]
    json_field: Vec<TreeField>,
}

impl TreeField {
    fn into_children(self) -> Vec<TreeField> {
        match (self.xml_fields, self.json_fields) {
            (Some(xml), _) => xml.xml_field,
            (None, Some(json)) => json.json_field,
            (None, None) => Vec::new(),
        }
    }
}

/// Importer for inspection-service responses
#[derive(Debug, Default)]
pub struct DocumentImporter;

impl DocumentImporter {
    pub fn new() -> Self {
        Self
    }

    /// Parse a response for a document of the given type
    pub fn import(&self, document_type: DocumentType, response: &Value) -> Result<InspectedDocument, ImportError> {
        let document = match document_type {
            DocumentType::Java => self.import_java(response)?,
            DocumentType::Xml => self.import_xml(response)?,
            DocumentType::Json => self.import_json(response)?,
            DocumentType::Property | DocumentType::Constant => {
                return Err(ImportError::ValidationError(format!(
                    "{} documents are not inspected",
                    document_type
                )));
            }
        };
        info!(
            document_type = %document_type,
            fields = document.fields.len(),
            excluded = document.excluded,
            "Parsed inspection response"
        );
        Ok(document)
    }

    pub fn import_java(&self, response: &Value) -> Result<InspectedDocument, ImportError> {
        let inner = response.get("ClassInspectionResponse").unwrap_or(response);
        let parsed = ClassInspectionResponse::deserialize(inner)?;
        check_error_message(parsed.error_message)?;

        let class = parsed
            .java_class
            .ok_or_else(|| ImportError::ParseError("Missing javaClass in inspection response".to_string()))?;
        if class.status.as_deref().is_some_and(is_excluded) {
            return Err(ImportError::InspectionError(format!(
                "Class '{}' could not be inspected",
                class.class_name.unwrap_or_default()
            )));
        }

        let mut document = InspectedDocument {
            uri: class.uri,
            ..Default::default()
        };
        let fields = class.java_fields.unwrap_or_default().java_field;
        document.fields = fields
            .into_iter()
            .filter_map(|f| java_node(f, &mut document.excluded))
            .collect();
        Ok(document)
    }

    pub fn import_xml(&self, response: &Value) -> Result<InspectedDocument, ImportError> {
        let inner = response.get("XmlInspectionResponse").unwrap_or(response);
        let parsed = XmlInspectionResponse::deserialize(inner)?;
        check_error_message(parsed.error_message)?;

        let xml = parsed
            .xml_document
            .ok_or_else(|| ImportError::ParseError("Missing xmlDocument in inspection response".to_string()))?;
        let mut document = InspectedDocument {
            namespaces: xml
                .xml_namespaces
                .unwrap_or_default()
                .xml_namespace
                .into_iter()
                .map(|ns| NamespaceModel {
                    alias: ns.alias,
                    uri: ns.uri,
                    location_uri: ns.location_uri,
                    target_namespace: ns.target_namespace.unwrap_or(false),
                })
                .collect(),
            ..Default::default()
        };
        let fields = xml.fields.unwrap_or_default().field;
        document.fields = fields
            .into_iter()
            .filter_map(|f| tree_node(f, &mut document.excluded))
            .collect();
        Ok(document)
    }

    pub fn import_json(&self, response: &Value) -> Result<InspectedDocument, ImportError> {
        let inner = response.get("JsonInspectionResponse").unwrap_or(response);
        let parsed = JsonInspectionResponse::deserialize(inner)?;
        check_error_message(parsed.error_message)?;

        let json = parsed
            .json_document
            .ok_or_else(|| ImportError::ParseError("Missing jsonDocument in inspection response".to_string()))?;
        let mut document = InspectedDocument::default();
        let fields = json.fields.unwrap_or_default().field;
        document.fields = fields
            .into_iter()
            .filter_map(|f| tree_node(f, &mut document.excluded))
            .collect();
        Ok(document)
    }
}

fn check_error_message(message: Option<String>) -> Result<(), ImportError> {
    match message {
        Some(message) if !message.trim().is_empty() => Err(ImportError::InspectionError(message)),
        _ => Ok(()),
    }
}

fn is_excluded(status: &str) -> bool {
    EXCLUDED_STATUSES.contains(&status)
}

/// Last path segment, the fallback when a field has no name
fn last_segment(path: Option<&str>) -> String {
    path.unwrap_or_default()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim_start_matches('@')
        .trim_end_matches("[]")
        .trim_end_matches("<>")
        .to_string()
}

fn java_node(field: JavaField, excluded: &mut usize) -> Option<FieldNode> {
    if field.status.as_deref().is_some_and(is_excluded) {
        debug!(path = ?field.path, status = ?field.status, "Excluding field");
        *excluded += 1;
        return None;
    }

    let name = field
        .name
        .clone()
        .unwrap_or_else(|| last_segment(field.path.as_deref()));
    let field_type = field
        .field_type
        .as_deref()
        .map(FieldType::from_wire)
        .unwrap_or(FieldType::Complex);
    let mut model = Field::new(name, field_type)
        .with_collection_type(CollectionType::from_wire(field.collection_type.as_deref()))
        .with_primitive(field.primitive);
    if let Some(class_name) = field.class_name {
        model = model.with_class_identifier(class_name);
    }
    if field.enumeration {
        let values = field
            .java_enum_fields
            .unwrap_or_default()
            .java_enum_field
            .into_iter()
            .map(|v| EnumValue {
                name: v.name,
                ordinal: v.ordinal,
            })
            .collect();
        model = model.with_enum_values(values);
    }

    let children = field
        .java_fields
        .unwrap_or_default()
        .java_field
        .into_iter()
        .filter_map(|f| java_node(f, excluded))
        .collect();
    Some(FieldNode::new(model).with_children(children))
}

fn tree_node(field: TreeField, excluded: &mut usize) -> Option<FieldNode> {
    if field.status.as_deref().is_some_and(is_excluded) {
        debug!(path = ?field.path, status = ?field.status, "Excluding field");
        *excluded += 1;
        return None;
    }

    let last = field
        .path
        .as_deref()
        .and_then(|p| p.rsplit('/').next())
        .unwrap_or_default();
    let is_attribute = last.starts_with('@');
    let raw_name = field
        .name
        .clone()
        .unwrap_or_else(|| last_segment(field.path.as_deref()));
    let (alias, name) = match raw_name.split_once(':') {
        Some((alias, name)) => (Some(alias.to_string()), name.to_string()),
        None => (None, raw_name),
    };
    let field_type = field
        .field_type
        .as_deref()
        .map(FieldType::from_wire)
        .unwrap_or(FieldType::Complex);

    let mut model = Field::new(name, field_type)
        .with_collection_type(CollectionType::from_wire(field.collection_type.as_deref()))
        .with_attribute(is_attribute);
    if let Some(alias) = alias {
        model = model.with_namespace_alias(alias);
    }
    if let Some(type_name) = &field.type_name {
        model = model.with_class_identifier(type_name.clone());
    }

    let children = field
        .into_children()
        .into_iter()
        .filter_map(|f| tree_node(f, excluded))
        .collect();
    Some(FieldNode::new(model).with_children(children))
}
