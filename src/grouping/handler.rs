//! The callback contract between the grouping engine and the caller.

use crate::error::TupleError;
use crate::grouping::rollup::GroupElements;
use crate::tuple::Tuple;

/// Receives the nested group events of one ordered stream.
///
/// Depths are 0-based: depth `i` is the group keyed by the first `i + 1`
/// group-by fields, and `field` is the group-by field at that depth. Any error
/// returned aborts the scan and is handed back by `RollupGrouper::run`; use
/// `TupleError::Handler` for failures of the handler's own.
pub trait GroupHandler {
    /// A group at `depth` starts with `first`.
    fn on_open_group(
        &mut self,
        _depth: usize,
        _field: &str,
        _first: &Tuple,
    ) -> Result<(), TupleError> {
        Ok(())
    }

    /// The elements of the innermost open group. The sequence is single-pass;
    /// whatever the handler leaves unconsumed is skipped by the engine.
    fn on_group_elements(
        &mut self,
        depth: usize,
        elements: &mut GroupElements<'_>,
    ) -> Result<(), TupleError>;

    /// The group at `depth` ends with `last`.
    fn on_close_group(
        &mut self,
        _depth: usize,
        _field: &str,
        _last: &Tuple,
    ) -> Result<(), TupleError> {
        Ok(())
    }
}
