//! Wire format types
//!
//! Serde representations of the JSON mapping document, the action catalog
//! response and the validation response. The domain model converts to and from
//! these in [`crate::export::mapping`] and [`crate::import::mapping`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root key some producers wrap the mapping document in
pub const MAPPING_ROOT_KEY: &str = "AtlasMapping";
pub const MAPPING_JSON_TYPE: &str = "AtlasMapping";
pub const MAPPING_ENTRY_JSON_TYPE: &str = "Mapping";
pub const COLLECTION_JSON_TYPE: &str = "Collection";
pub const COLLECTION_MAPPING_TYPE: &str = "COLLECTION";

fn default_mapping_json_type() -> String {
    MAPPING_JSON_TYPE.to_string()
}

fn default_entry_json_type() -> String {
    MAPPING_ENTRY_JSON_TYPE.to_string()
}

/// Top-level mapping document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMappingDocument {
    #[serde(default = "default_mapping_json_type")]
    pub json_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_source: Vec<WireDataSource>,
    #[serde(default)]
    pub mappings: WireMappings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_tables: Option<WireLookupTables>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<WireProperties>,
}

impl WireMappingDocument {
    /// Parse a mapping document, bare or wrapped in the `AtlasMapping` key
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let inner = value.get(MAPPING_ROOT_KEY).unwrap_or(value);
        Self::deserialize(inner)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireMappings {
    #[serde(default)]
    pub mapping: Vec<WireMappingEntry>,
}

/// One mapping entry, or a collection wrapper around nested entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMappingEntry {
    #[serde(default = "default_entry_json_type")]
    pub json_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_field: Vec<WireField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_field: Vec<WireField>,
    #[serde(default, alias = "delimiter", skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<WireMappings>,
}

impl WireMappingEntry {
    pub fn is_collection(&self) -> bool {
        self.mapping_type.as_deref() == Some(COLLECTION_MAPPING_TYPE)
            || self.json_type == COLLECTION_JSON_TYPE
    }
}

/// One field entry inside `inputField` / `outputField`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireField {
    #[serde(default)]
    pub json_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// 0-based separate/combine index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_created: Option<bool>,
    /// Each entry is `{ActionName: {argument: value}}`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Value>,
}

/// One document referenced by the mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDataSource {
    #[serde(default)]
    pub json_type: String,
    pub id: String,
    pub uri: String,
    /// `SOURCE` or `TARGET`
    pub data_source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_namespaces: Option<WireXmlNamespaces>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl WireDataSource {
    pub fn is_source(&self) -> bool {
        self.data_source_type.eq_ignore_ascii_case("SOURCE")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireXmlNamespaces {
    #[serde(default)]
    pub xml_namespace: Vec<WireXmlNamespace>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireXmlNamespace {
    #[serde(default)]
    pub alias: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLookupTables {
    #[serde(default)]
    pub lookup_table: Vec<WireLookupTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLookupTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub lookup_entry: Vec<WireLookupEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLookupEntry {
    pub source_value: String,
    #[serde(default = "default_string_type")]
    pub source_type: String,
    pub target_value: String,
    #[serde(default = "default_string_type")]
    pub target_type: String,
}

fn default_string_type() -> String {
    "STRING".to_string()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireProperties {
    #[serde(default)]
    pub property: Vec<WireProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProperty {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_string_type")]
    pub field_type: String,
}

/// Action catalog response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireActionDetails {
    #[serde(default)]
    pub action_detail: Vec<WireActionDetail>,
}

impl WireActionDetails {
    /// Parse a catalog response, bare or wrapped in `ActionDetails`
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let inner = value.get("ActionDetails").unwrap_or(value);
        if inner.is_array() {
            return Ok(Self {
                action_detail: Vec::deserialize(inner)?,
            });
        }
        Self::deserialize(inner)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireActionDetail {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<WireActionParameters>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireActionParameters {
    #[serde(default)]
    pub property: Vec<WireActionParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireActionParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

/// Validation response from the runtime
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireValidations {
    #[serde(default)]
    pub validation: Vec<WireValidation>,
}

impl WireValidations {
    /// Parse a validation response, bare or wrapped in `Validations`
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let inner = value.get("Validations").unwrap_or(value);
        Self::deserialize(inner)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
