//! Transition model: how the fields of one mapping pair are combined

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mapping between source and target fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransitionMode {
    /// One source to one target
    #[default]
    #[serde(rename = "MAP")]
    Map,
    /// One source split into several targets
    #[serde(rename = "SEPARATE")]
    Separate,
    /// Several sources joined into one target
    #[serde(rename = "COMBINE")]
    Combine,
    /// Enumeration values translated through a lookup table
    #[serde(rename = "LOOKUP", alias = "ENUM")]
    Enum,
}

impl TransitionMode {
    /// Wire `mappingType` token
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionMode::Map => "MAP",
            TransitionMode::Separate => "SEPARATE",
            TransitionMode::Combine => "COMBINE",
            TransitionMode::Enum => "LOOKUP",
        }
    }

    pub fn from_wire(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "MAP" => Some(TransitionMode::Map),
            "SEPARATE" => Some(TransitionMode::Separate),
            "COMBINE" => Some(TransitionMode::Combine),
            "LOOKUP" | "ENUM" => Some(TransitionMode::Enum),
            _ => None,
        }
    }

    /// Side carrying the synthetic index action: `Some(true)` for sources
    /// (Combine), `Some(false)` for targets (Separate)
    pub fn indexed_side(&self) -> Option<bool> {
        match self {
            TransitionMode::Combine => Some(true),
            TransitionMode::Separate => Some(false),
            _ => None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed_side().is_some()
    }
}

impl fmt::Display for TransitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delimiter used by Separate and Combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransitionDelimiter {
    Colon,
    Comma,
    Dash,
    None,
    Period,
    Semicolon,
    #[default]
    Space,
    Underscore,
}

impl TransitionDelimiter {
    pub const ALL: [TransitionDelimiter; 8] = [
        TransitionDelimiter::Colon,
        TransitionDelimiter::Comma,
        TransitionDelimiter::Dash,
        TransitionDelimiter::None,
        TransitionDelimiter::Period,
        TransitionDelimiter::Semicolon,
        TransitionDelimiter::Space,
        TransitionDelimiter::Underscore,
    ];

    /// Wire token
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionDelimiter::Colon => "COLON",
            TransitionDelimiter::Comma => "COMMA",
            TransitionDelimiter::Dash => "DASH",
            TransitionDelimiter::None => "NONE",
            TransitionDelimiter::Period => "PERIOD",
            TransitionDelimiter::Semicolon => "SEMICOLON",
            TransitionDelimiter::Space => "SPACE",
            TransitionDelimiter::Underscore => "UNDERSCORE",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            TransitionDelimiter::Colon => "Colon",
            TransitionDelimiter::Comma => "Comma",
            TransitionDelimiter::Dash => "Dash",
            TransitionDelimiter::None => "[None]",
            TransitionDelimiter::Period => "Period",
            TransitionDelimiter::Semicolon => "Semicolon",
            TransitionDelimiter::Space => "Space",
            TransitionDelimiter::Underscore => "Underscore",
        }
    }

    pub fn from_wire(token: &str) -> Option<Self> {
        let token = token.trim().to_uppercase();
        Self::ALL.into_iter().find(|d| d.as_str() == token)
    }
}

impl fmt::Display for TransitionDelimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transition configuration of one field pair
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionModel {
    pub mode: TransitionMode,
    pub delimiter: TransitionDelimiter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_table_name: Option<String>,
}

impl TransitionModel {
    pub fn new(mode: TransitionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: TransitionDelimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_lookup_table_name(mut self, name: impl Into<String>) -> Self {
        self.lookup_table_name = Some(name.into());
        self
    }

    pub fn is_separate_or_combine(&self) -> bool {
        self.mode.is_indexed()
    }

    /// Short description, e.g. `Combine (Space)`
    pub fn describe(&self) -> String {
        match self.mode {
            TransitionMode::Map => "Map".to_string(),
            TransitionMode::Separate => format!("Separate ({})", self.delimiter.label()),
            TransitionMode::Combine => format!("Combine ({})", self.delimiter.label()),
            TransitionMode::Enum => match &self.lookup_table_name {
                Some(name) => format!("Lookup ({})", name),
                None => "Lookup".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tokens() {
        assert_eq!(TransitionMode::Enum.as_str(), "LOOKUP");
        assert_eq!(TransitionMode::from_wire("enum"), Some(TransitionMode::Enum));
        assert_eq!(TransitionMode::from_wire("COLLECTION"), None);
        assert_eq!(TransitionMode::Combine.indexed_side(), Some(true));
        assert_eq!(TransitionMode::Separate.indexed_side(), Some(false));
        assert_eq!(TransitionMode::Map.indexed_side(), None);
    }

    #[test]
    fn test_delimiter_tokens() {
        assert_eq!(TransitionDelimiter::default(), TransitionDelimiter::Space);
        assert_eq!(
            TransitionDelimiter::from_wire("semicolon"),
            Some(TransitionDelimiter::Semicolon)
        );
        assert_eq!(TransitionDelimiter::from_wire("PIPE"), None);
        assert_eq!(TransitionDelimiter::None.label(), "[None]");
    }

    #[test]
    fn test_describe() {
        let t = TransitionModel::new(TransitionMode::Combine).with_delimiter(TransitionDelimiter::Comma);
        assert_eq!(t.describe(), "Combine (Comma)");
        let t = TransitionModel::new(TransitionMode::Enum).with_lookup_table_name("colors");
        assert_eq!(t.describe(), "Lookup (colors)");
    }
}
