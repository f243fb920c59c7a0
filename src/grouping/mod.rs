//! Rollup grouping over a stream already ordered by a `SortPlan`.

pub mod handler;
pub mod rollup;

#[cfg(test)]
mod rollup_tests;

pub use handler::GroupHandler;
pub use rollup::{GroupElements, RollupGrouper};
