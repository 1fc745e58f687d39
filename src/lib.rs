//! textlab — dataset operation dispatch and extractive-oracle summarization
//!
//! The crate has two halves that meet at the `Dataset` type:
//! - `operations` + `dataset`: classified operations applied to datasets
//!   under three execution modes (memory, realtime, local).
//! - `extract`: pure greedy-oracle and lead-k summarization algorithms,
//!   driven sequentially or through an ordered worker pool.

pub mod dataset;
pub mod extract;
pub mod operations;
pub mod utils;

pub use dataset::{
    ApplyOptions, ApplyOutput, ColumnStore, Dataset, ExecutionMode, FieldDef, FieldType, Sample,
    Schema,
};
pub use extract::{
    ext_oracle, ext_oracle_single, lead_k, lead_k_single, ExtractOptions, ExtractOutput,
    LeadOutput, OracleParams, OracleResult, SimFn,
};
pub use operations::{
    KindTag, Operation, OperationBuilder, OperationDescriptor, OperationKind, OperationRegistry,
};
pub use utils::{Result, TextlabError};
