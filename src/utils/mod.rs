//! Utility modules

pub mod error;
pub mod text;

pub use error::{ContractError, PoolError, Result, SchemaError, TextlabError};
pub use text::word_count;
