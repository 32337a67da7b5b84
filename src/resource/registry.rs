//! Kind Registry - Load asset kind definitions from JSON
//!
//! Kind definitions (coordinates, parameter fields, surfaced outputs) are
//! embedded as JSON files and parsed into a [`KindRegistry`]. The registry is a
//! plain value: build it once at startup and hand references to whatever
//! needs it.

use super::identifier::{self, Coordinates, DEFAULT_VERSION};
use super::params::ParamValue;
use crate::error::Error;
use serde::Deserialize;
use std::collections::HashMap;

/// Embedded kind definition files (compiled into the binary)
const KIND_FILES: &[&str] = &[
    include_str!("../resources/aws.json"),
    include_str!("../resources/null.json"),
];

/// Wire type of a parameter field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Bool,
    Number,
    StringList,
    Map,
    /// List of arbitrary values (e.g. a list of objects)
    List,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Number => "number",
            FieldType::StringList => "list of strings",
            FieldType::Map => "map",
            FieldType::List => "list",
        }
    }

    /// Whether a (non-null) value has this type
    pub fn accepts(self, value: &ParamValue) -> bool {
        match self {
            FieldType::String => matches!(value, ParamValue::String(_)),
            FieldType::Bool => matches!(value, ParamValue::Bool(_)),
            FieldType::Number => matches!(value, ParamValue::Number(_)),
            FieldType::StringList => value.as_string_list().is_some(),
            FieldType::Map => matches!(value, ParamValue::Map(_)),
            FieldType::List => matches!(value, ParamValue::List(_)),
        }
    }
}

/// Parameter field definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Key used in the parameter bag when it differs from `name`
    #[serde(default)]
    pub wire_name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// If true, an absent value is sent as an explicit null
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDef {
    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }
}

/// Output definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct OutputDef {
    pub name: String,
    /// Key in the asset's outputs map, when it differs from `name`
    #[serde(default)]
    pub source: Option<String>,
}

impl OutputDef {
    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// Asset kind definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct KindDef {
    pub display_name: String,
    pub platform: String,
    pub kind: String,
    #[serde(default = "default_version")]
    pub default_version: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub outputs: Vec<OutputDef>,
}

impl KindDef {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(&self.platform, &self.kind, &self.default_version)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether a wire type identifier belongs to this kind
    pub fn matches(&self, type_identifier: &str) -> bool {
        identifier::matches(type_identifier, &self.platform, &self.kind)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KindCatalog {
    #[serde(default)]
    pub kinds: HashMap<String, KindDef>,
}

/// Asset kinds known to this process, keyed by kind key (e.g. `aws_vpc`)
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<String, KindDef>,
}

impl KindRegistry {
    /// Empty registry; populate with [`KindRegistry::register`] or
    /// [`KindRegistry::load_json`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every kind shipped with this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for content in KIND_FILES {
            registry
                .load_json(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded kind JSON: {}", e));
        }
        registry
    }

    /// Merge the kinds of one catalog document into the registry.
    ///
    /// Either every kind in the document is registered or none is.
    pub fn load_json(&mut self, content: &str) -> Result<(), Error> {
        let catalog: KindCatalog = serde_json::from_str(content)?;
        let mut kinds: Vec<(String, KindDef)> = catalog.kinds.into_iter().collect();
        kinds.sort_by(|a, b| a.0.cmp(&b.0));

        let mut staged = self.clone();
        for (key, kind) in kinds {
            staged.register(&key, kind)?;
        }
        *self = staged;
        Ok(())
    }

    /// Add or replace the kind stored under `key`.
    ///
    /// Fails if the coordinates would not round-trip through a type identifier,
    /// or if another key already owns the same platform and kind.
    pub fn register(&mut self, key: &str, kind: KindDef) -> Result<(), Error> {
        let invalid = |reason: String| Error::InvalidKind {
            key: key.to_string(),
            reason,
        };

        kind.coordinates().validate().map_err(|e| invalid(e.to_string()))?;
        if let Some(owner) = self
            .kinds
            .iter()
            .find(|(other, def)| {
                other.as_str() != key && def.platform == kind.platform && def.kind == kind.kind
            })
            .map(|(other, _)| other)
        {
            return Err(invalid(format!(
                "{}{}{} is already registered as `{}`",
                kind.platform,
                identifier::DELIMITER,
                kind.kind,
                owner
            )));
        }

        self.kinds.insert(key.to_string(), kind);
        Ok(())
    }

    /// Get a kind definition by key
    pub fn get(&self, key: &str) -> Option<&KindDef> {
        self.kinds.get(key)
    }

    /// Like [`KindRegistry::get`], but an unknown key is an error
    pub fn lookup(&self, key: &str) -> Result<&KindDef, Error> {
        self.get(key).ok_or_else(|| Error::UnknownKind(key.to_string()))
    }

    /// Find the kind a wire type identifier belongs to.
    ///
    /// At most one kind can match, since [`KindRegistry::register`] keeps
    /// platform and kind unique.
    pub fn for_type_identifier(&self, type_identifier: &str) -> Option<&KindDef> {
        self.kinds.values().find(|k| k.matches(type_identifier))
    }

    /// All kind keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.kinds.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
