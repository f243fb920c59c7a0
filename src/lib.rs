//! This file is the root of the `tuplegroup` Rust crate.
//!
//! `tuplegroup` orders multi-field records ("tuples") by declarative sort
//! criteria, either as objects or directly on their serialized bytes, and walks
//! a sorted stream reporting nested ("rollup") group boundaries.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library.
//! 2.  Re-exporting the types most callers need, so that
//!     `use tuplegroup::{SortPlan, RollupGrouper, ...}` is enough.
//!
//! Typical flow: build `Schema`s and a `SortCriteria` (or a `config::JobConfig`),
//! validate them into a `SortPlan`, sort serialized tuples with a
//! `TupleComparator`, then feed the ordered stream to a `RollupGrouper` with a
//! `GroupHandler`.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // `log_metric!` is used throughout the crate

pub mod config;
pub mod error;
pub mod grouping;
pub mod kernels;
pub mod schema;
pub mod serialization;
pub mod sorting;
pub mod tuple;
pub mod types;

pub mod traits;

#[doc(hidden)]
pub use log as __log;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use config::{CompiledJob, JobConfig, SourceConfig};
pub use error::TupleError;
pub use grouping::{GroupElements, GroupHandler, RollupGrouper};
pub use schema::{Field, Schema, SOURCE_ID_FIELD};
pub use serialization::TupleSerializer;
pub use sorting::{
    ComparatorRegistry, FieldComparator, SortCriteria, SortOrder, SortPlan, TupleComparator,
};
pub use tuple::Tuple;
pub use types::{FieldType, Value};
