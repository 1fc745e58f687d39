//! Sample: one record of a dataset
//!
//! A sample is an ordered mapping from field name to JSON value. Loaders
//! produce samples; the dispatcher extends them with generated fields.
//! Field order is preserved so materialized datasets and their columnar
//! form stay aligned.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// Ordered field-name → value mapping, also used for operation outputs
pub type FieldMap = IndexMap<String, Value>;

/// One record of a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample {
    fields: FieldMap,
}

impl Sample {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    /// Build a sample from (name, value) pairs, keeping their order
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Render a field as text for a per-text operation.
    ///
    /// Strings pass through unchanged. Arrays are treated as token
    /// sequences: their string elements are joined with single spaces.
    /// Numbers and booleans render via `to_string`; null renders empty.
    pub fn field_text(&self, name: &str) -> Option<String> {
        let value = self.fields.get(name)?;
        Some(Self::value_text(value))
    }

    fn value_text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Self::value_text)
                .collect::<Vec<_>>()
                .join(" "),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Extend the sample with a generated field (dispatcher only)
    pub(crate) fn insert(&mut self, name: String, value: Value) {
        self.fields.insert(name, value);
    }
}
