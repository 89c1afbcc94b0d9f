//! Field model for the SDK
//!
//! A field is one addressable schema element. Fields live in the arena of the
//! [`DocumentDefinition`](super::document::DocumentDefinition) that owns them and
//! refer to each other through [`FieldId`] handles, so the parent link is a plain
//! non-owning index rather than a reference cycle.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a field inside its document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of a document inside a [`DocumentStore`](super::document_store::DocumentStore)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(pub(crate) usize);

impl DocId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Reference from a mapping endpoint to a live field
///
/// `FieldRef::None` stands for the sentinel "None" field: the unselected side
/// of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldRef {
    #[default]
    None,
    Field { doc: DocId, field: FieldId },
}

impl FieldRef {
    pub fn new(doc: DocId, field: FieldId) -> Self {
        FieldRef::Field { doc, field }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FieldRef::None)
    }

    pub fn doc(&self) -> Option<DocId> {
        match self {
            FieldRef::None => None,
            FieldRef::Field { doc, .. } => Some(*doc),
        }
    }

    pub fn field_id(&self) -> Option<FieldId> {
        match self {
            FieldRef::None => None,
            FieldRef::Field { field, .. } => Some(*field),
        }
    }
}

/// Field type tag as reported by the inspection services
///
/// Unknown tags are preserved verbatim in `Other` so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Any,
    BigInteger,
    Boolean,
    Byte,
    ByteArray,
    Char,
    Complex,
    Date,
    DateTime,
    DateTimeTz,
    Decimal,
    Double,
    Float,
    Integer,
    Long,
    None,
    Number,
    Short,
    String,
    Time,
    Unsupported,
    Other(String),
}

impl FieldType {
    /// Wire tag for this type
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Any => "ANY",
            FieldType::BigInteger => "BIG_INTEGER",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Byte => "BYTE",
            FieldType::ByteArray => "BYTE_ARRAY",
            FieldType::Char => "CHAR",
            FieldType::Complex => "COMPLEX",
            FieldType::Date => "DATE",
            FieldType::DateTime => "DATE_TIME",
            FieldType::DateTimeTz => "DATE_TIME_TZ",
            FieldType::Decimal => "DECIMAL",
            FieldType::Double => "DOUBLE",
            FieldType::Float => "FLOAT",
            FieldType::Integer => "INTEGER",
            FieldType::Long => "LONG",
            FieldType::None => "NONE",
            FieldType::Number => "NUMBER",
            FieldType::Short => "SHORT",
            FieldType::String => "STRING",
            FieldType::Time => "TIME",
            FieldType::Unsupported => "UNSUPPORTED",
            FieldType::Other(tag) => tag.as_str(),
        }
    }

    /// Parse a wire tag (case-insensitive)
    pub fn from_wire(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "ANY" => FieldType::Any,
            "BIG_INTEGER" => FieldType::BigInteger,
            "BOOLEAN" => FieldType::Boolean,
            "BYTE" => FieldType::Byte,
            "BYTE_ARRAY" => FieldType::ByteArray,
            "CHAR" => FieldType::Char,
            "COMPLEX" => FieldType::Complex,
            "DATE" => FieldType::Date,
            "DATE_TIME" => FieldType::DateTime,
            "DATE_TIME_TZ" => FieldType::DateTimeTz,
            "DECIMAL" => FieldType::Decimal,
            "DOUBLE" => FieldType::Double,
            "FLOAT" => FieldType::Float,
            "INTEGER" => FieldType::Integer,
            "LONG" => FieldType::Long,
            "NONE" => FieldType::None,
            "NUMBER" => FieldType::Number,
            "SHORT" => FieldType::Short,
            "STRING" => FieldType::String,
            "TIME" => FieldType::Time,
            "UNSUPPORTED" => FieldType::Unsupported,
            _ => FieldType::Other(tag.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Integer
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::Decimal
                | FieldType::BigInteger
                | FieldType::Number
        )
    }

    /// STRING or CHAR
    pub fn is_string_like(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Char)
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        FieldType::from_wire(&tag)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Collection kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CollectionType {
    #[default]
    None,
    List,
    Array,
    Map,
}

impl CollectionType {
    pub fn from_wire(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_uppercase()) {
            Some(t) if t == "LIST" => CollectionType::List,
            Some(t) if t == "ARRAY" => CollectionType::Array,
            Some(t) if t == "MAP" => CollectionType::Map,
            _ => CollectionType::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::None => "NONE",
            CollectionType::List => "LIST",
            CollectionType::Array => "ARRAY",
            CollectionType::Map => "MAP",
        }
    }

    pub fn is_collection(&self) -> bool {
        !matches!(self, CollectionType::None)
    }

    /// Path suffix marking a collection segment
    pub fn path_suffix(&self) -> &'static str {
        match self {
            CollectionType::None => "",
            CollectionType::Array => "[]",
            CollectionType::List | CollectionType::Map => "<>",
        }
    }
}

/// One value of an enumeration field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub name: String,
    #[serde(default)]
    pub ordinal: i64,
}

/// Field model representing one schema element
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name without namespace alias or markers
    pub name: String,
    /// Name with the first letter capitalized, used as the sort key
    pub display_name: String,
    /// Full path within the owning document
    pub path: String,
    pub field_type: FieldType,
    pub collection_type: CollectionType,
    pub is_attribute: bool,
    pub is_primitive: bool,
    pub enumeration: bool,
    pub enum_values: Vec<EnumValue>,
    /// Type key used for complex-type subtree caching (Java class name)
    pub class_identifier: Option<String>,
    pub namespace_alias: Option<String>,
    /// Created by the user rather than reported by inspection
    pub user_created: bool,
    /// Only meaningful for property and constant pseudo fields
    pub value: Option<String>,

    pub selected: bool,
    pub part_of_mapping: bool,
    pub part_of_transformation: bool,
    pub has_unmapped_children: bool,

    pub(crate) parent: Option<FieldId>,
    pub(crate) children: Vec<FieldId>,
    pub(crate) attached: bool,
}

impl Field {
    /// Create a new field with the given name and type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            display_name: display_key(&name),
            name,
            path: String::new(),
            field_type,
            collection_type: CollectionType::None,
            is_attribute: false,
            is_primitive: false,
            enumeration: false,
            enum_values: Vec::new(),
            class_identifier: None,
            namespace_alias: None,
            user_created: false,
            value: None,
            selected: false,
            part_of_mapping: false,
            part_of_transformation: false,
            has_unmapped_children: false,
            parent: None,
            children: Vec::new(),
            attached: false,
        }
    }

    /// The sentinel placeholder for an unselected mapping side
    pub fn none() -> Self {
        Self::new("[None]", FieldType::None)
    }

    pub fn with_collection_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = collection_type;
        self
    }

    pub fn with_attribute(mut self, is_attribute: bool) -> Self {
        self.is_attribute = is_attribute;
        self
    }

    pub fn with_primitive(mut self, is_primitive: bool) -> Self {
        self.is_primitive = is_primitive;
        self
    }

    pub fn with_namespace_alias(mut self, alias: impl Into<String>) -> Self {
        self.namespace_alias = Some(alias.into());
        self
    }

    pub fn with_class_identifier(mut self, class_identifier: impl Into<String>) -> Self {
        self.class_identifier = Some(class_identifier.into());
        self
    }

    /// Mark the field as an enumeration with the given values
    pub fn with_enum_values(mut self, values: Vec<EnumValue>) -> Self {
        self.enumeration = true;
        self.enum_values = values;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_user_created(mut self, user_created: bool) -> Self {
        self.user_created = user_created;
        self
    }

    pub fn parent(&self) -> Option<FieldId> {
        self.parent
    }

    pub fn children(&self) -> &[FieldId] {
        &self.children
    }

    /// Whether the field is still part of its document's tree
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_complex(&self) -> bool {
        self.field_type == FieldType::Complex
    }

    pub fn is_collection(&self) -> bool {
        self.collection_type.is_collection()
    }

    pub fn is_array(&self) -> bool {
        self.collection_type == CollectionType::Array
    }

    /// Terminal fields are the mappable endpoints
    pub fn is_terminal(&self) -> bool {
        self.enumeration || !self.is_complex()
    }

    /// This field's own path segment, without separator
    pub fn path_segment(&self) -> String {
        let qualified = match &self.namespace_alias {
            Some(alias) if !alias.is_empty() => format!("{}:{}", alias, self.name),
            _ => self.name.clone(),
        };
        if self.is_attribute {
            format!("@{}", qualified)
        } else {
            format!("{}{}", qualified, self.collection_type.path_suffix())
        }
    }

    /// Copy of this field detached from any tree, with derived flags cleared
    pub(crate) fn detached_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.parent = None;
        copy.children = Vec::new();
        copy.attached = false;
        copy.reset_status();
        copy
    }

    pub(crate) fn reset_status(&mut self) {
        self.selected = false;
        self.part_of_mapping = false;
        self.part_of_transformation = false;
        self.has_unmapped_children = false;
    }
}

/// Sort key: name with its first character upper-cased
pub fn display_key(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Path of a child given its parent's path (or `None` for a root field)
pub fn join_path(parent_path: Option<&str>, separator: &str, segment: &str) -> String {
    format!("{}{}{}", parent_path.unwrap_or(""), separator, segment)
}

static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(@)?(?:([^:@\[\]<>]+):)?([^:@\[\]<>]+)(\[\]|<>)?$").unwrap()
});

/// Components of a serialized field path, as needed to recreate a user-created field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPathParts {
    /// Path of the parent field, `None` for a root field
    pub parent_path: Option<String>,
    pub name: String,
    pub namespace_alias: Option<String>,
    pub is_attribute: bool,
    pub collection_type: CollectionType,
}

impl FieldPathParts {
    /// Split `path` into parent path and the parsed last segment
    pub fn parse(path: &str, separator: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches(separator);
        let (parent, segment) = match trimmed.rfind(separator) {
            Some(pos) => (&trimmed[..pos], &trimmed[pos + separator.len()..]),
            None => ("", trimmed),
        };
        let caps = SEGMENT_REGEX.captures(segment)?;
        let collection_type = match caps.get(4).map(|m| m.as_str()) {
            Some("[]") => CollectionType::Array,
            Some("<>") => CollectionType::List,
            _ => CollectionType::None,
        };
        Some(Self {
            parent_path: if parent.is_empty() {
                None
            } else {
                Some(parent.to_string())
            },
            name: caps.get(3)?.as_str().to_string(),
            namespace_alias: caps.get(2).map(|m| m.as_str().to_string()),
            is_attribute: caps.get(1).is_some(),
            collection_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_round_trip_tags() {
        assert_eq!(FieldType::from_wire("string"), FieldType::String);
        assert_eq!(FieldType::from_wire("DATE_TIME").as_str(), "DATE_TIME");
        assert_eq!(
            FieldType::from_wire("GEO_POINT"),
            FieldType::Other("GEO_POINT".to_string())
        );
        assert_eq!(FieldType::from_wire("GEO_POINT").as_str(), "GEO_POINT");
        assert!(FieldType::Decimal.is_numeric());
        assert!(!FieldType::String.is_numeric());
        assert!(FieldType::Char.is_string_like());
    }

    #[test]
    fn test_path_segment() {
        let plain = Field::new("street", FieldType::String);
        assert_eq!(plain.path_segment(), "street");

        let list = Field::new("orders", FieldType::Complex).with_collection_type(CollectionType::List);
        assert_eq!(list.path_segment(), "orders<>");

        let array = Field::new("tags", FieldType::String).with_collection_type(CollectionType::Array);
        assert_eq!(array.path_segment(), "tags[]");

        let attr = Field::new("id", FieldType::String)
            .with_attribute(true)
            .with_namespace_alias("tns")
            .with_collection_type(CollectionType::List);
        assert_eq!(attr.path_segment(), "@tns:id");
    }

    #[test]
    fn test_terminal() {
        assert!(Field::new("name", FieldType::String).is_terminal());
        assert!(!Field::new("address", FieldType::Complex).is_terminal());
        let status = Field::new("status", FieldType::Complex).with_enum_values(vec![]);
        assert!(status.is_terminal());
    }

    #[test]
    fn test_display_key() {
        assert_eq!(display_key("foo"), "Foo");
        assert_eq!(display_key("Foo"), "Foo");
        assert_eq!(display_key(""), "");
    }

    #[test]
    fn test_parse_path_parts() {
        let parts = FieldPathParts::parse("/tns:order/tns:items<>/@tns:sku", "/").unwrap();
        assert_eq!(parts.parent_path.as_deref(), Some("/tns:order/tns:items<>"));
        assert_eq!(parts.name, "sku");
        assert_eq!(parts.namespace_alias.as_deref(), Some("tns"));
        assert!(parts.is_attribute);

        let root = FieldPathParts::parse("/values[]", "/").unwrap();
        assert_eq!(root.parent_path, None);
        assert_eq!(root.name, "values");
        assert_eq!(root.collection_type, CollectionType::Array);
        assert!(!root.is_attribute);
    }
}
