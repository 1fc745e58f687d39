//! Extractive summarization: pure algorithms and parallel drivers
//!
//! `oracle` holds the single-sample greedy oracle and lead-k baselines;
//! `engine` fans them out over a corpus, either sequentially or through the
//! ordered worker pool in `pool`, with an optional JSON-lines disk sink.

pub mod engine;
pub mod oracle;
pub mod pool;

pub use engine::{ext_oracle, lead_k, ExtractOptions, ExtractOutput, LeadOutput, SimFn, TokenCountFn};
pub use oracle::{ext_oracle_single, lead_k_single, OracleParams, OracleResult};
pub use pool::{ordered_map, OrderedResults, PoolConfig};
