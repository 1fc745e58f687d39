//! Schema definitions and the schema merger
//!
//! A schema declares the fields a dataset carries. Field names are unique;
//! merging a candidate set of generated fields into an existing schema is
//! all-or-nothing and fails on any name collision unless a prefix defuses
//! it. Schemas round-trip through YAML so loaders can ship them alongside
//! columnar data files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::SchemaError;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Field value type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    /// Token sequence (array of strings, joined for per-text operations)
    Tokens,
    Number,
    Bool,
    /// Arbitrary JSON value (default for generated fields)
    Json,
}

/// Field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name (unique within a schema)
    pub name: String,

    /// Value type
    #[serde(default, rename = "type")]
    pub dtype: FieldType,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, dtype: FieldType) -> Self {
        Self {
            name: name.into(),
            dtype,
            description: None,
        }
    }

    /// Declaration for a generated field of unknown shape
    pub fn generated(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Json)
    }
}

/// Declared field set for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Field declarations, in column order
    pub fields: Vec<FieldDef>,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl Schema {
    /// Create a schema, rejecting duplicate field names
    pub fn new(fields: Vec<FieldDef>) -> Result<Self, SchemaError> {
        let schema = Self {
            version: SCHEMA_VERSION,
            fields,
        };
        schema.check_unique()?;
        Ok(schema)
    }

    /// Convenience constructor from plain text field names
    pub fn of_text_fields(names: &[&str]) -> Result<Self, SchemaError> {
        Self::new(
            names
                .iter()
                .map(|n| FieldDef::new(*n, FieldType::Text))
                .collect(),
        )
    }

    fn check_unique(&self) -> Result<(), SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::Duplicate(field.name.clone()));
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge candidate fields into this schema.
    ///
    /// When a prefix is supplied each candidate name is prefixed before the
    /// collision check. All collisions are reported together; on success a
    /// new schema with old ∪ new fields is returned and `self` is untouched.
    pub fn merged(
        &self,
        new_fields: &[FieldDef],
        prefix: Option<&str>,
    ) -> Result<Schema, SchemaError> {
        let mut candidates = Vec::with_capacity(new_fields.len());
        for field in new_fields {
            let mut field = field.clone();
            if let Some(prefix) = prefix {
                field.name = format!("{prefix}{}", field.name);
            }
            candidates.push(field);
        }

        // candidate set must itself be collision-free
        let mut seen = std::collections::HashSet::new();
        for field in &candidates {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::Duplicate(field.name.clone()));
            }
        }

        let colliding: Vec<String> = candidates
            .iter()
            .filter(|f| self.contains(&f.name))
            .map(|f| f.name.clone())
            .collect();
        if !colliding.is_empty() {
            return Err(SchemaError::Conflict { fields: colliding });
        }

        let mut fields = self.fields.clone();
        fields.extend(candidates);
        Ok(Schema {
            version: self.version,
            fields,
        })
    }

    /// Load schema from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SchemaError::Io(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse schema from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let schema: Schema =
            serde_yaml::from_str(yaml).map_err(|e| SchemaError::Parse(e.to_string()))?;

        if schema.version > SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion(schema.version));
        }
        schema.check_unique()?;
        Ok(schema)
    }

    /// Serialize schema to YAML
    pub fn to_yaml(&self) -> Result<String, SchemaError> {
        serde_yaml::to_string(self).map_err(|e| SchemaError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA_YAML: &str = r#"
version: 1
fields:
  - name: text
    type: text
    description: "source document"
  - name: tokens
    type: tokens
  - name: label
    type: number
"#;

    #[test]
    fn test_parse_yaml_schema() {
        let schema = Schema::from_yaml(SCHEMA_YAML).unwrap();
        assert_eq!(schema.version, 1);
        assert_eq!(schema.len(), 3);
        assert!(schema.contains("tokens"));
        assert_eq!(schema.field("label").unwrap().dtype, FieldType::Number);
    }

    #[test]
    fn test_yaml_round_trip() {
        let schema = Schema::from_yaml(SCHEMA_YAML).unwrap();
        let back = Schema::from_yaml(&schema.to_yaml().unwrap()).unwrap();
        assert_eq!(schema, back);
    }

    #[test]
    fn test_unsupported_version() {
        let yaml = "version: 999\nfields:\n  - name: text\n";
        let result = Schema::from_yaml(yaml);
        assert!(matches!(result, Err(SchemaError::UnsupportedVersion(999))));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::of_text_fields(&["text", "text"]);
        assert!(matches!(result, Err(SchemaError::Duplicate(_))));
    }

    #[test]
    fn test_merge_disjoint() {
        let schema = Schema::of_text_fields(&["text"]).unwrap();
        let merged = schema
            .merged(&[FieldDef::generated("length")], None)
            .unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.contains("length"));
        // original untouched
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_merge_conflict_lists_all_collisions() {
        let schema = Schema::of_text_fields(&["text", "label"]).unwrap();
        let result = schema.merged(
            &[
                FieldDef::generated("text"),
                FieldDef::generated("label"),
                FieldDef::generated("fresh"),
            ],
            None,
        );
        match result {
            Err(SchemaError::Conflict { fields }) => {
                assert_eq!(fields, vec!["text".to_string(), "label".to_string()]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_prefix_defuses_conflict() {
        let schema = Schema::of_text_fields(&["text"]).unwrap();
        let merged = schema
            .merged(&[FieldDef::generated("text")], Some("aug_"))
            .unwrap();
        assert!(merged.contains("aug_text"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_prefixed_name_still_checked() {
        let schema = Schema::of_text_fields(&["aug_text"]).unwrap();
        let result = schema.merged(&[FieldDef::generated("text")], Some("aug_"));
        assert!(matches!(result, Err(SchemaError::Conflict { .. })));
    }

    #[test]
    fn test_duplicate_candidates_rejected() {
        let schema = Schema::of_text_fields(&["text"]).unwrap();
        let result = schema.merged(
            &[FieldDef::generated("x"), FieldDef::generated("x")],
            None,
        );
        assert!(matches!(result, Err(SchemaError::Duplicate(_))));
    }
}
