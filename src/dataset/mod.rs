//! Datasets, schemas and the operation dispatcher
//!
//! A `Dataset` is an ordered sequence of `Sample`s plus a `Schema` and an
//! optional columnar backing store. `Dataset::apply` routes an operation to
//! the correct per-sample or whole-dataset behavior for the requested
//! execution mode.

pub mod dataset;
pub mod sample;
pub mod schema;
pub mod store;

pub use dataset::{ApplyOptions, ApplyOutput, Dataset, ExecutionMode, RealtimeApply};
pub use sample::{FieldMap, Sample, Value};
pub use schema::{FieldDef, FieldType, Schema, SCHEMA_VERSION};
pub use store::ColumnStore;
