//! Operation registry
//!
//! An explicit, caller-owned, append-only collection of operation
//! descriptors. The registry exists for introspection only; the dispatcher
//! never consults it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::operation::{KindTag, Operation};
use crate::utils::Result;

/// Serializable summary of an operation's declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub kind: KindTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub processed_fields: Vec<String>,
    pub generated_fields: Vec<String>,
    /// Keys of the resource bag (values may not be serializable)
    pub resource_keys: Vec<String>,
}

impl OperationDescriptor {
    pub fn of(op: &Operation) -> Self {
        Self {
            name: op.name().to_string(),
            kind: op.tag(),
            contributor: op.contributor().map(str::to_string),
            task: op.task().to_string(),
            description: op.description().map(str::to_string),
            processed_fields: op.processed_fields().to_vec(),
            generated_fields: op.generated_fields().to_vec(),
            resource_keys: op.resources().keys().cloned().collect(),
        }
    }
}

/// Append-only operation catalog
#[derive(Debug, Default)]
pub struct OperationRegistry {
    entries: Vec<OperationDescriptor>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation's descriptor
    pub fn register(&mut self, op: &Operation) {
        self.entries.push(OperationDescriptor::of(op));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.entries.iter()
    }

    /// First descriptor registered under the given name
    pub fn find(&self, name: &str) -> Option<&OperationDescriptor> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn by_kind(&self, kind: KindTag) -> impl Iterator<Item = &OperationDescriptor> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Dump the catalog as pretty JSON, for external tooling
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample::FieldMap;
    use serde_json::json;

    fn length_op() -> Operation {
        Operation::featurizing("get_length", &["length"], |text| {
            let mut out = FieldMap::new();
            out.insert("length".to_string(), json!(text.split(' ').count()));
            Ok(out)
        })
        .unwrap()
    }

    #[test]
    fn test_register_and_find() {
        let mut registry = OperationRegistry::new();
        assert!(registry.is_empty());

        registry.register(&length_op());
        let agg = Operation::aggregating("corpus_size", |texts| Ok(json!(texts.len()))).unwrap();
        registry.register(&agg);

        assert_eq!(registry.len(), 2);
        let desc = registry.find("get_length").unwrap();
        assert_eq!(desc.kind, KindTag::Featurizing);
        assert_eq!(desc.generated_fields, ["length"]);
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn test_by_kind() {
        let mut registry = OperationRegistry::new();
        registry.register(&length_op());
        let agg = Operation::aggregating("corpus_size", |texts| Ok(json!(texts.len()))).unwrap();
        registry.register(&agg);

        let featurizers: Vec<_> = registry.by_kind(KindTag::Featurizing).collect();
        assert_eq!(featurizers.len(), 1);
        assert_eq!(featurizers[0].name, "get_length");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operations.json");

        let mut registry = OperationRegistry::new();
        registry.register(&length_op());
        registry.write_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<OperationDescriptor> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "get_length");
    }
}
