//! Dataset and the operation dispatcher
//!
//! `Dataset::apply` routes one operation plus one execution mode to the
//! correct behavior:
//! - aggregating operations see a whole column projection once and return a
//!   terminal value;
//! - per-sample operations extract the declared input field, run the
//!   closure, and union its output into the sample under the declared
//!   output names, honoring an optional prefix;
//! - realtime mode returns a one-shot lazy iterator, memory mode a new
//!   materialized dataset, local mode additionally flushes the merged
//!   result into the columnar backing store.
//!
//! The merged schema is validated before any sample is processed, so
//! memory/local failures never leave a partial schema visible.

use std::sync::Arc;

use tracing::debug;

use super::sample::{Sample, Value};
use super::schema::{FieldDef, Schema};
use super::store::ColumnStore;
use crate::extract::pool::{ordered_map, PoolConfig};
use crate::operations::{Operation, OperationKind};
use crate::utils::{ContractError, Result, TextlabError};

/// Controls materialization and persistence of apply results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Materialize into a new in-memory dataset
    Memory,
    /// Lazy one-shot iterator, no materialization
    #[default]
    Realtime,
    /// Materialize and flush into the columnar backing store
    Local,
}

impl ExecutionMode {
    /// Parse execution mode from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "realtime" => Some(Self::Realtime),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Realtime => "realtime",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for `Dataset::apply`
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub mode: ExecutionMode,
    /// Prefix applied to every generated field name, to avoid collisions
    pub prefix: Option<String>,
    /// Parallelism degree for memory/local materialization (ignored by
    /// realtime mode)
    pub num_proc: Option<usize>,
}

impl ApplyOptions {
    pub fn mode(mode: ExecutionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Result of `Dataset::apply`
#[derive(Debug)]
pub enum ApplyOutput<'d> {
    /// Lazy per-sample iterator (realtime mode)
    Realtime(RealtimeApply<'d>),
    /// New materialized dataset (memory/local modes)
    Materialized(Dataset),
    /// Terminal summary value (aggregating operations, any mode)
    Aggregate(Value),
}

impl<'d> ApplyOutput<'d> {
    pub fn realtime(self) -> Option<RealtimeApply<'d>> {
        match self {
            Self::Realtime(iter) => Some(iter),
            _ => None,
        }
    }

    pub fn materialized(self) -> Option<Dataset> {
        match self {
            Self::Materialized(ds) => Some(ds),
            _ => None,
        }
    }

    pub fn aggregate(self) -> Option<Value> {
        match self {
            Self::Aggregate(v) => Some(v),
            _ => None,
        }
    }
}

/// Ordered sequence of samples plus schema and backing-store descriptor
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    samples: Vec<Sample>,
    store: Option<ColumnStore>,
}

impl Dataset {
    /// Build a materialized dataset from loader output
    pub fn from_samples(schema: Schema, samples: Vec<Sample>) -> Self {
        Self {
            schema,
            samples,
            store: None,
        }
    }

    /// Attach a columnar backing store (required for local mode)
    pub fn with_store(mut self, store: ColumnStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Open a dataset previously flushed to a columnar store
    pub fn open(store: ColumnStore) -> Result<Self> {
        let (schema, samples) = store.load()?;
        Ok(Self {
            schema,
            samples,
            store: Some(store),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> Option<&ColumnStore> {
        self.store.as_ref()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Sample> {
        self.samples.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Project one column as text, for aggregating operations
    pub fn column_text(&self, field: &str, operation: &str) -> Result<Vec<String>> {
        self.samples
            .iter()
            .map(|s| {
                s.field_text(field).ok_or_else(|| {
                    ContractError::MissingField {
                        operation: operation.to_string(),
                        field: field.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }

    /// Apply one operation under one execution mode.
    ///
    /// Errors carry the operation name and the mode; schema conflicts are
    /// detected before any sample is processed.
    pub fn apply<'d>(&'d self, op: &Operation, opts: &ApplyOptions) -> Result<ApplyOutput<'d>> {
        self.apply_inner(op, opts).map_err(|e| TextlabError::Apply {
            operation: op.name().to_string(),
            mode: opts.mode.as_str(),
            source: Box::new(e),
        })
    }

    fn apply_inner<'d>(&'d self, op: &Operation, opts: &ApplyOptions) -> Result<ApplyOutput<'d>> {
        if let OperationKind::Aggregating(f) = op.kind() {
            let field = &op.processed_fields()[0];
            let column = self.column_text(field, op.name())?;
            debug!(operation = op.name(), rows = column.len(), "aggregating");
            return Ok(ApplyOutput::Aggregate(f(&column)?));
        }

        // fail fast: merged schema is validated before any sample runs
        let new_defs: Vec<FieldDef> = op
            .generated_fields()
            .iter()
            .map(|n| FieldDef::generated(n.clone()))
            .collect();
        let merged = self.schema.merged(&new_defs, opts.prefix.as_deref())?;

        match opts.mode {
            ExecutionMode::Realtime => Ok(ApplyOutput::Realtime(RealtimeApply {
                dataset: self,
                op: op.clone(),
                prefix: opts.prefix.clone(),
                schema: merged,
                idx: 0,
                done: false,
            })),
            ExecutionMode::Memory => {
                let samples = self.materialize(op, opts)?;
                Ok(ApplyOutput::Materialized(Dataset {
                    schema: merged,
                    samples,
                    store: self.store.clone(),
                }))
            }
            ExecutionMode::Local => {
                let store = self.store.clone().ok_or_else(|| {
                    TextlabError::Config(
                        "local mode requires a columnar backing store".to_string(),
                    )
                })?;
                let samples = self.materialize(op, opts)?;
                store.flush(&merged, &samples)?;
                Ok(ApplyOutput::Materialized(Dataset {
                    schema: merged,
                    samples,
                    store: Some(store),
                }))
            }
        }
    }

    fn materialize(&self, op: &Operation, opts: &ApplyOptions) -> Result<Vec<Sample>> {
        match opts.num_proc {
            Some(n) if n > 1 => {
                let worker_op = op.clone();
                let prefix = opts.prefix.clone();
                let worker = Arc::new(move |sample: Sample| {
                    transform_sample(&worker_op, prefix.as_deref(), &sample)
                        .map_err(|e| e.to_string())
                });
                let config = PoolConfig {
                    num_workers: n,
                    ..PoolConfig::default()
                };
                let mut samples = Vec::with_capacity(self.samples.len());
                for chunk in ordered_map(self.samples.clone(), worker, &config) {
                    samples.extend(chunk?);
                }
                Ok(samples)
            }
            _ => self
                .samples
                .iter()
                .map(|s| transform_sample(op, opts.prefix.as_deref(), s))
                .collect(),
        }
    }
}

/// Run one per-sample operation and union its output into a new sample
fn transform_sample(op: &Operation, prefix: Option<&str>, sample: &Sample) -> Result<Sample> {
    let output = match op.kind() {
        OperationKind::Editing(f)
        | OperationKind::Preprocessing(f)
        | OperationKind::Featurizing(f) => {
            let field = &op.processed_fields()[0];
            let text = sample.field_text(field).ok_or_else(|| {
                TextlabError::from(ContractError::MissingField {
                    operation: op.name().to_string(),
                    field: field.to_string(),
                })
            })?;
            f(&text)?
        }
        OperationKind::Prompting(f) | OperationKind::Inference(f) => {
            for field in op.processed_fields() {
                if !sample.contains(field) {
                    return Err(ContractError::MissingField {
                        operation: op.name().to_string(),
                        field: field.to_string(),
                    }
                    .into());
                }
            }
            f(sample)?
        }
        OperationKind::Aggregating(_) => {
            // routed through apply_inner, never per-sample
            return Err(TextlabError::Config(format!(
                "aggregating operation '{}' cannot run per sample",
                op.name()
            )));
        }
    };

    let mut extended = sample.clone();
    for (key, value) in output {
        if !op.generated_fields().iter().any(|g| g == &key) {
            return Err(TextlabError::Operation(format!(
                "operation '{}' returned undeclared field '{}'",
                op.name(),
                key
            )));
        }
        let name = match prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key,
        };
        extended.insert(name, value);
    }
    Ok(extended)
}

/// One-shot lazy iterator over transformed samples (realtime mode)
///
/// Suspension happens at each yielded sample; once exhausted the iterator
/// stays exhausted. An error on one sample is yielded once, after which
/// iteration ends; samples yielded before the error stay delivered.
pub struct RealtimeApply<'d> {
    dataset: &'d Dataset,
    op: Operation,
    prefix: Option<String>,
    schema: Schema,
    idx: usize,
    done: bool,
}

impl std::fmt::Debug for RealtimeApply<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeApply")
            .field("dataset", &self.dataset)
            .field("prefix", &self.prefix)
            .field("schema", &self.schema)
            .field("idx", &self.idx)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<'d> RealtimeApply<'d> {
    /// Merged schema the yielded samples conform to
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_exhausted(&self) -> bool {
        self.done
    }

    /// Like `next`, but consuming past completion is an error
    pub fn expect_next(&mut self) -> Result<Sample> {
        match self.next() {
            Some(result) => result,
            None => Err(TextlabError::Exhausted),
        }
    }
}

impl<'d> Iterator for RealtimeApply<'d> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(sample) = self.dataset.get(self.idx) else {
            self.done = true;
            return None;
        };
        self.idx += 1;

        match transform_sample(&self.op, self.prefix.as_deref(), sample) {
            Ok(sample) => Some(Ok(sample)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
