//! Lookup tables translating enumeration values between two enum types

use super::field::{EnumValue, FieldType};
use super::wire::{WireLookupEntry, WireLookupTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One source value to target value translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupTableEntry {
    pub source_value: String,
    pub source_type: FieldType,
    pub target_value: String,
    pub target_type: FieldType,
}

impl LookupTableEntry {
    pub fn new(source_value: impl Into<String>, target_value: impl Into<String>) -> Self {
        Self {
            source_value: source_value.into(),
            source_type: FieldType::String,
            target_value: target_value.into(),
            target_type: FieldType::String,
        }
    }
}

/// Named enum value translation table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupTable {
    pub name: String,
    /// Class identifier of the source enumeration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_identifier: Option<String>,
    /// Class identifier of the target enumeration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_identifier: Option<String>,
    #[serde(default)]
    pub entries: Vec<LookupTableEntry>,
}

impl LookupTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_identifier: None,
            target_identifier: None,
            entries: Vec::new(),
        }
    }

    /// Table for an enum pair, with a name derived deterministically from the identifiers
    pub fn for_identifiers(source_identifier: &str, target_identifier: &str) -> Self {
        let key = identifier_key(source_identifier, target_identifier);
        let name = Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string();
        Self {
            name,
            source_identifier: Some(source_identifier.to_string()),
            target_identifier: Some(target_identifier.to_string()),
            entries: Vec::new(),
        }
    }

    /// `source:target` key, once both identifiers are known
    pub fn identifier_key(&self) -> Option<String> {
        match (&self.source_identifier, &self.target_identifier) {
            (Some(s), Some(t)) => Some(identifier_key(s, t)),
            _ => None,
        }
    }

    /// One entry per source value, targeting the same-named target value if present
    pub fn populate_from_enums(&mut self, source_values: &[EnumValue], target_values: &[EnumValue]) {
        self.entries = source_values
            .iter()
            .map(|source| {
                let target = target_values
                    .iter()
                    .find(|t| t.name == source.name)
                    .map(|t| t.name.clone())
                    .unwrap_or_default();
                LookupTableEntry::new(source.name.clone(), target)
            })
            .collect();
    }

    pub fn entry_for(&self, source_value: &str) -> Option<&LookupTableEntry> {
        self.entries.iter().find(|e| e.source_value == source_value)
    }

    /// Set the target of a source value, adding the entry if missing
    pub fn set_entry(&mut self, source_value: &str, target_value: &str) {
        match self.entries.iter_mut().find(|e| e.source_value == source_value) {
            Some(entry) => entry.target_value = target_value.to_string(),
            None => self
                .entries
                .push(LookupTableEntry::new(source_value, target_value)),
        }
    }

    pub fn to_wire(&self) -> WireLookupTable {
        WireLookupTable {
            name: self.name.clone(),
            description: None,
            lookup_entry: self
                .entries
                .iter()
                .map(|e| WireLookupEntry {
                    source_value: e.source_value.clone(),
                    source_type: e.source_type.as_str().to_string(),
                    target_value: e.target_value.clone(),
                    target_type: e.target_type.as_str().to_string(),
                })
                .collect(),
        }
    }
}

impl From<WireLookupTable> for LookupTable {
    fn from(wire: WireLookupTable) -> Self {
        Self {
            name: wire.name,
            source_identifier: None,
            target_identifier: None,
            entries: wire
                .lookup_entry
                .into_iter()
                .map(|e| LookupTableEntry {
                    source_value: e.source_value,
                    source_type: FieldType::from_wire(&e.source_type),
                    target_value: e.target_value,
                    target_type: FieldType::from_wire(&e.target_type),
                })
                .collect(),
        }
    }
}

/// Registry key for a source/target identifier pair
pub fn identifier_key(source_identifier: &str, target_identifier: &str) -> String {
    format!("{}:{}", source_identifier, target_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(names: &[&str]) -> Vec<EnumValue> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| EnumValue {
                name: n.to_string(),
                ordinal: i as i64,
            })
            .collect()
    }

    #[test]
    fn test_for_identifiers_is_deterministic() {
        let a = LookupTable::for_identifiers("com.a.Color", "com.b.Colour");
        let b = LookupTable::for_identifiers("com.a.Color", "com.b.Colour");
        assert_eq!(a.name, b.name);
        assert_eq!(a.identifier_key().as_deref(), Some("com.a.Color:com.b.Colour"));
        assert_eq!(LookupTable::new("t").identifier_key(), None);
    }

    #[test]
    fn test_populate_from_enums() {
        let mut table = LookupTable::new("colors");
        table.populate_from_enums(&values(&["RED", "GREEN", "BLUE"]), &values(&["RED", "BLUE"]));
        assert_eq!(table.entries.len(), 3);
        assert_eq!(table.entry_for("RED").unwrap().target_value, "RED");
        assert_eq!(table.entry_for("GREEN").unwrap().target_value, "");

        table.set_entry("GREEN", "BLUE");
        assert_eq!(table.entry_for("GREEN").unwrap().target_value, "BLUE");
    }
}
