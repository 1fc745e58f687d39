//! Operations: classified, introspectable wrappers around transformation
//! functions, plus the registry used for introspection.

pub mod operation;
pub mod registry;

pub use operation::{
    AggregateFn, KindTag, OpResult, Operation, OperationBuilder, OperationKind, RecordFn, TextFn,
};
pub use registry::{OperationDescriptor, OperationRegistry};
