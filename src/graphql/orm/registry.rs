//! Field type registry
//!
//! Each entity declares which logical fields a client may filter on, the scalar
//! kind of each one, and where the value lives in the stored document. Registries
//! are built once (usually in a `Lazy` static) and only read afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::error::FilterError;

/// Semantic type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Id,
    String,
    Int,
    Float,
    Boolean,
    Date,
    Enum,
    Location,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Id => "id",
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Date => "date",
            ScalarKind::Enum => "enum",
            ScalarKind::Location => "location",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(ScalarKind::Id),
            "string" => Ok(ScalarKind::String),
            "int" | "integer" => Ok(ScalarKind::Int),
            "float" => Ok(ScalarKind::Float),
            "boolean" | "bool" => Ok(ScalarKind::Boolean),
            "date" => Ok(ScalarKind::Date),
            "enum" => Ok(ScalarKind::Enum),
            "location" | "geo" => Ok(ScalarKind::Location),
            _ => Err(FilterError::invalid("scalarKind", format!("unknown scalar kind `{s}`"))),
        }
    }
}

/// Server-side distance bounds for a geo-point field, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
}

/// Registry entry for one logical field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub logical_name: String,
    pub scalar_kind: ScalarKind,
    /// Stored field path when it differs from the logical name (e.g. `_id`)
    pub physical_name: Option<String>,
    /// Only meaningful for `Location` fields
    pub geo: GeoBounds,
    /// Allowed variant names for `Enum` fields; `None` accepts any
    pub variants: Option<Vec<String>>,
}

/// Descriptor as written in a JSON configuration table
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorConfig {
    logical_name: String,
    scalar_kind: String,
    #[serde(default)]
    physical_name: Option<String>,
    #[serde(default)]
    geo: GeoBounds,
    #[serde(default)]
    variants: Option<Vec<String>>,
}

impl TryFrom<DescriptorConfig> for FieldDescriptor {
    type Error = FilterError;

    fn try_from(config: DescriptorConfig) -> Result<Self, Self::Error> {
        let scalar_kind = config.scalar_kind.parse::<ScalarKind>().map_err(|e| match e {
            FilterError::InvalidFilter { reason, .. } => {
                FilterError::invalid(config.logical_name.as_str(), reason)
            }
            other => other,
        })?;
        Ok(Self {
            scalar_kind,
            logical_name: config.logical_name,
            physical_name: config.physical_name,
            geo: config.geo,
            variants: config.variants,
        })
    }
}

impl FieldDescriptor {
    pub fn new(logical_name: impl Into<String>, scalar_kind: ScalarKind) -> Self {
        Self {
            logical_name: logical_name.into(),
            scalar_kind,
            physical_name: None,
            geo: GeoBounds::default(),
            variants: None,
        }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::Id)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::Date)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: Some(variants.into_iter().map(Into::into).collect()),
            ..Self::new(name, ScalarKind::Enum)
        }
    }

    pub fn location(name: impl Into<String>) -> Self {
        Self::new(name, ScalarKind::Location)
    }

    /// Store the field under a different path
    pub fn stored_as(mut self, physical_name: impl Into<String>) -> Self {
        self.physical_name = Some(physical_name.into());
        self
    }

    pub fn min_distance(mut self, meters: f64) -> Self {
        self.geo.min_distance = Some(meters);
        self
    }

    pub fn max_distance(mut self, meters: f64) -> Self {
        self.geo.max_distance = Some(meters);
        self
    }

    /// Field path used in the store query
    pub fn storage_name(&self) -> &str {
        self.physical_name.as_deref().unwrap_or(&self.logical_name)
    }
}

/// Immutable mapping from logical field name to its descriptor.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    fields: HashMap<String, FieldDescriptor>,
}

impl FieldTypeRegistry {
    /// Build from a static configuration table. Later entries replace earlier
    /// ones with the same logical name.
    pub fn new(descriptors: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        let fields = descriptors
            .into_iter()
            .map(|d| (d.logical_name.clone(), d))
            .collect();
        Self { fields }
    }

    /// Load a registry from a JSON array of descriptors.
    pub fn from_json(table: serde_json::Value) -> Result<Self, FilterError> {
        let configs: Vec<DescriptorConfig> = serde_json::from_value(table)
            .map_err(|e| FilterError::invalid("<registry>", e.to_string()))?;
        let descriptors = configs
            .into_iter()
            .map(FieldDescriptor::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(descriptors))
    }

    pub fn describe(&self, logical_name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(logical_name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_uses_override_name() {
        let registry = FieldTypeRegistry::new([
            FieldDescriptor::id("id").stored_as("_id"),
            FieldDescriptor::string("name"),
        ]);

        let id = registry.describe("id").unwrap();
        assert_eq!(id.scalar_kind, ScalarKind::Id);
        assert_eq!(id.storage_name(), "_id");
        assert_eq!(registry.describe("name").unwrap().storage_name(), "name");
        assert!(registry.describe("email").is_none());
    }

    #[test]
    fn test_from_json_table() {
        let registry = FieldTypeRegistry::from_json(json!([
            { "logicalName": "id", "scalarKind": "id", "physicalName": "_id" },
            {
                "logicalName": "location",
                "scalarKind": "location",
                "physicalName": "profileDetail.location",
                "geo": { "maxDistance": 50000.0 }
            }
        ]))
        .unwrap();

        assert_eq!(registry.len(), 2);
        let location = registry.describe("location").unwrap();
        assert_eq!(location.geo.max_distance, Some(50_000.0));
        assert_eq!(location.geo.min_distance, None);
    }

    #[test]
    fn test_from_json_unknown_kind() {
        let err = FieldTypeRegistry::from_json(json!([
            { "logicalName": "rating", "scalarKind": "decimal" }
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::invalid("rating", "unknown scalar kind `decimal`")
        );
    }

    #[test]
    fn test_scalar_kind_parse() {
        assert_eq!("Integer".parse::<ScalarKind>().unwrap(), ScalarKind::Int);
        assert_eq!("geo".parse::<ScalarKind>().unwrap(), ScalarKind::Location);
        assert!("uuid".parse::<ScalarKind>().is_err());
    }
}
