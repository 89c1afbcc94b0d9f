//! Field actions and the action catalog
//!
//! The catalog is the registry of transformation actions advertised by the
//! runtime. A [`FieldAction`] is one action applied to a mapped field, with its
//! argument values. The synthetic index action used by Separate and Combine
//! shares the same representation but is flagged with `is_index`.

use super::field::{Field, FieldType};
use super::transition::TransitionMode;
use super::wire::{WireActionDetail, WireActionDetails};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Name of the synthetic separate/combine index action
pub const INDEX_ACTION_NAME: &str = "Index";
const INDEX_ARGUMENT_NAME: &str = "Index";

/// Declared argument of a catalog action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldActionArgument {
    pub name: String,
    #[serde(default = "default_argument_type")]
    pub field_type: FieldType,
}

fn default_argument_type() -> FieldType {
    FieldType::String
}

/// Catalog entry describing one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldActionConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub source_type: FieldType,
    pub target_type: FieldType,
    #[serde(default)]
    pub arguments: Vec<FieldActionArgument>,
}

impl FieldActionConfig {
    pub fn new(name: impl Into<String>, source_type: FieldType, target_type: FieldType) -> Self {
        Self {
            name: name.into(),
            class_name: None,
            method: None,
            source_type,
            target_type,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.arguments.push(FieldActionArgument {
            name: name.into(),
            field_type,
        });
        self
    }

    /// Whether this action may be attached to `field`
    ///
    /// `other` is the field on the opposite side of the mapping, if selected.
    pub fn applies_to_field(&self, field: &Field, other: Option<&Field>, mode: TransitionMode) -> bool {
        if self.source_type == FieldType::String
            && mode == TransitionMode::Map
            && let Some(other) = other
            && other.field_type != FieldType::None
            && !other.field_type.is_string_like()
        {
            return false;
        }
        if self.target_type == FieldType::Number && !field.field_type.is_numeric() {
            return false;
        }
        true
    }

    fn argument_type(&self, name: &str) -> FieldType {
        self.arguments
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.field_type.clone())
            .unwrap_or(FieldType::String)
    }
}

impl From<WireActionDetail> for FieldActionConfig {
    fn from(detail: WireActionDetail) -> Self {
        Self {
            name: detail.name,
            class_name: detail.class_name,
            method: detail.method,
            source_type: detail
                .source_type
                .map(|t| FieldType::from_wire(&t))
                .unwrap_or(FieldType::Any),
            target_type: detail
                .target_type
                .map(|t| FieldType::from_wire(&t))
                .unwrap_or(FieldType::Any),
            arguments: detail
                .parameters
                .map(|p| p.property)
                .unwrap_or_default()
                .into_iter()
                .map(|p| FieldActionArgument {
                    name: p.name,
                    field_type: p
                        .field_type
                        .map(|t| FieldType::from_wire(&t))
                        .unwrap_or(FieldType::String),
                })
                .collect(),
        }
    }
}

/// Registry of the actions available to this context, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    by_name: HashMap<String, FieldActionConfig>,
    order: Vec<String>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from an action catalog response
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        let details = WireActionDetails::from_value(value)?;
        let mut catalog = Self::new();
        for detail in details.action_detail {
            catalog.register(detail.into());
        }
        Ok(catalog)
    }

    /// Add or replace an action; replacements keep their original position
    pub fn register(&mut self, config: FieldActionConfig) {
        if !self.by_name.contains_key(&config.name) {
            self.order.push(config.name.clone());
        }
        self.by_name.insert(config.name.clone(), config);
    }

    pub fn get(&self, name: &str) -> Option<&FieldActionConfig> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Actions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &FieldActionConfig> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    pub fn applicable_to(
        &self,
        field: &Field,
        other: Option<&Field>,
        mode: TransitionMode,
    ) -> Vec<&FieldActionConfig> {
        self.iter()
            .filter(|cfg| cfg.applies_to_field(field, other, mode))
            .collect()
    }
}

/// Value supplied for one action argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionArgumentValue {
    pub name: String,
    pub value: String,
    pub field_type: FieldType,
}

/// An action attached to a mapped field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAction {
    pub name: String,
    #[serde(default)]
    pub is_index: bool,
    #[serde(default)]
    pub arguments: Vec<ActionArgumentValue>,
}

impl FieldAction {
    /// The synthetic separate/combine index action with a 1-based index
    pub fn index(value: u32) -> Self {
        Self {
            name: INDEX_ACTION_NAME.to_string(),
            is_index: true,
            arguments: vec![ActionArgumentValue {
                name: INDEX_ARGUMENT_NAME.to_string(),
                value: value.to_string(),
                field_type: FieldType::Integer,
            }],
        }
    }

    /// Instantiate a catalog action with the supplied argument values
    ///
    /// Declared arguments missing from `provided` get an empty value; extra
    /// provided arguments are kept as strings.
    pub fn from_config(config: &FieldActionConfig, provided: &Map<String, Value>) -> Self {
        let mut arguments: Vec<ActionArgumentValue> = config
            .arguments
            .iter()
            .map(|arg| ActionArgumentValue {
                name: arg.name.clone(),
                value: provided.get(&arg.name).map(value_to_string).unwrap_or_default(),
                field_type: arg.field_type.clone(),
            })
            .collect();
        for (name, value) in provided {
            if !arguments.iter().any(|a| &a.name == name) {
                arguments.push(ActionArgumentValue {
                    name: name.clone(),
                    value: value_to_string(value),
                    field_type: config.argument_type(name),
                });
            }
        }
        Self {
            name: config.name.clone(),
            is_index: false,
            arguments,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// 1-based index of a synthetic index action
    pub fn index_value(&self) -> Option<u32> {
        if !self.is_index {
            return None;
        }
        self.argument(INDEX_ARGUMENT_NAME)?.parse().ok()
    }

    pub fn set_index_value(&mut self, value: u32) {
        if let Some(arg) = self
            .arguments
            .iter_mut()
            .find(|a| a.name == INDEX_ARGUMENT_NAME)
        {
            arg.value = value.to_string();
        }
    }

    /// Wire form `{name: {argument: typed value}}`, `{name: null}` without arguments
    pub fn to_wire(&self) -> Value {
        let args = if self.arguments.is_empty() {
            Value::Null
        } else {
            Value::Object(
                self.arguments
                    .iter()
                    .map(|a| (a.name.clone(), typed_value(&a.value, &a.field_type)))
                    .collect(),
            )
        };
        let mut entry = Map::new();
        entry.insert(self.name.clone(), args);
        Value::Object(entry)
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a stored argument string back to a JSON value of its declared type
fn typed_value(value: &str, field_type: &FieldType) -> Value {
    match field_type {
        FieldType::Byte | FieldType::Short | FieldType::Integer | FieldType::Long | FieldType::BigInteger => value
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
        FieldType::Float | FieldType::Double | FieldType::Decimal | FieldType::Number => value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string())),
        FieldType::Boolean => value
            .parse::<bool>()
            .map(Value::Bool)
            .unwrap_or_else(|_| Value::String(value.to_string())),
        _ => Value::String(value.to_string()),
    }
}
