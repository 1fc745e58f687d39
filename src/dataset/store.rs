//! Columnar backing store for local-mode datasets
//!
//! Layout: one directory per table, holding `schema.yaml` plus one
//! newline-delimited JSON file per column (`<field>.jsonl`, one value per
//! row). Two write paths exist: a full rewrite (`flush`) and an incremental
//! column append (`append_columns`). Only the local execution mode touches
//! the store, and all of its failures surface as I/O errors.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::sample::{Sample, Value};
use super::schema::{FieldDef, Schema};
use crate::utils::{Result, TextlabError};

const SCHEMA_FILE: &str = "schema.yaml";

/// Handle to a columnar table directory
#[derive(Debug, Clone)]
pub struct ColumnStore {
    dir: PathBuf,
}

impl ColumnStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Whether a table has been written at this path
    pub fn exists(&self) -> bool {
        self.dir.join(SCHEMA_FILE).is_file()
    }

    fn column_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.jsonl"))
    }

    /// Full rewrite: replace the stored schema and every column
    pub fn flush(&self, schema: &Schema, samples: &[Sample]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let yaml = schema
            .to_yaml()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(self.dir.join(SCHEMA_FILE), yaml)?;

        for field in &schema.fields {
            let column: Vec<&Value> = samples
                .iter()
                .map(|s| s.get(&field.name).unwrap_or(&Value::Null))
                .collect();
            self.write_column(&field.name, column.into_iter())?;
        }
        Ok(())
    }

    /// Append new columns to an existing table, extending its schema.
    ///
    /// Column lengths must match the current row count; the merged schema
    /// replaces `schema.yaml` only after every column file is written.
    pub fn append_columns(
        &self,
        new_fields: &[FieldDef],
        columns: &IndexMap<String, Vec<Value>>,
    ) -> Result<()> {
        let (schema, rows) = self.load()?;
        let merged = schema.merged(new_fields, None)?;

        for field in new_fields {
            let column = columns.get(&field.name).ok_or_else(|| {
                TextlabError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no column data for appended field '{}'", field.name),
                ))
            })?;
            if column.len() != rows.len() {
                return Err(TextlabError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "column '{}' has {} rows, table has {}",
                        field.name,
                        column.len(),
                        rows.len()
                    ),
                )));
            }
            self.write_column(&field.name, column.iter())?;
        }

        let yaml = merged
            .to_yaml()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(self.dir.join(SCHEMA_FILE), yaml)?;
        Ok(())
    }

    fn write_column<'a, I: Iterator<Item = &'a Value>>(&self, name: &str, values: I) -> Result<()> {
        let file = File::create(self.column_path(name))?;
        let mut writer = BufWriter::new(file);
        for value in values {
            let line = serde_json::to_string(value)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            writeln!(writer, "{line}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load the stored schema and materialize all rows
    pub fn load(&self) -> Result<(Schema, Vec<Sample>)> {
        let schema = Schema::load(self.dir.join(SCHEMA_FILE))?;

        let mut columns: Vec<(String, Vec<Value>)> = Vec::with_capacity(schema.len());
        let mut rows = None;
        for field in &schema.fields {
            let values = self.read_column(&field.name)?;
            match rows {
                None => rows = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(TextlabError::Io(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "ragged table: column '{}' has {} rows, expected {}",
                            field.name,
                            values.len(),
                            n
                        ),
                    )));
                }
                Some(_) => {}
            }
            columns.push((field.name.clone(), values));
        }

        let rows = rows.unwrap_or(0);
        let mut samples = Vec::with_capacity(rows);
        for i in 0..rows {
            samples.push(Sample::from_pairs(
                columns
                    .iter()
                    .map(|(name, values)| (name.clone(), values[i].clone())),
            ));
        }
        Ok((schema, samples))
    }

    fn read_column(&self, name: &str) -> Result<Vec<Value>> {
        let file = File::open(self.column_path(name))?;
        let reader = BufReader::new(file);
        let mut values = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let value = serde_json::from_str(&line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            values.push(value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::schema::FieldType;
    use serde_json::json;

    fn sample_table() -> (Schema, Vec<Sample>) {
        let schema = Schema::new(vec![
            FieldDef::new("text", FieldType::Text),
            FieldDef::new("label", FieldType::Number),
        ])
        .unwrap();
        let samples = vec![
            Sample::from_pairs([("text", json!("a cat sat.")), ("label", json!(0))]),
            Sample::from_pairs([("text", json!("a dog ran.")), ("label", json!(1))]),
        ];
        (schema, samples)
    }

    #[test]
    fn test_flush_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ColumnStore::new(dir.path().join("table"));
        let (schema, samples) = sample_table();

        store.flush(&schema, &samples).unwrap();
        assert!(store.exists());

        let (loaded_schema, loaded) = store.load().unwrap();
        assert_eq!(loaded_schema, schema);
        assert_eq!(loaded, samples);
    }

    #[test]
    fn test_append_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = ColumnStore::new(dir.path().join("table"));
        let (schema, samples) = sample_table();
        store.flush(&schema, &samples).unwrap();

        let mut columns = IndexMap::new();
        columns.insert("length".to_string(), vec![json!(3), json!(3)]);
        store
            .append_columns(&[FieldDef::generated("length")], &columns)
            .unwrap();

        let (loaded_schema, loaded) = store.load().unwrap();
        assert!(loaded_schema.contains("length"));
        assert_eq!(loaded[0].get("length"), Some(&json!(3)));
    }

    #[test]
    fn test_append_length_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ColumnStore::new(dir.path().join("table"));
        let (schema, samples) = sample_table();
        store.flush(&schema, &samples).unwrap();

        let mut columns = IndexMap::new();
        columns.insert("length".to_string(), vec![json!(3)]);
        let result = store.append_columns(&[FieldDef::generated("length")], &columns);
        assert!(matches!(result, Err(TextlabError::Io(_))));
    }

    #[test]
    fn test_load_missing_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ColumnStore::new(dir.path().join("absent"));
        assert!(!store.exists());
        assert!(store.load().is_err());
    }
}
