// In: src/grouping/rollup.rs

//! The rollup grouping engine.
//!
//! `RollupGrouper` walks a tuple stream that is already ordered by its
//! `SortPlan` and reports, through a `GroupHandler`, an open and a close event
//! for every group-by depth whose key changes, with the elements of the
//! innermost group delivered in between.
//!
//! With group-by fields `f0..fN-1` and a rollup base `b`:
//!   - the first tuple opens depths `b..N-1`;
//!   - when the next tuple shares only its first `d` group-by fields with the
//!     last one, depths `N-1` down to `max(d, b)` close (carrying the last
//!     tuple) and depths `max(d, b)..N-1` open again (carrying the next one);
//!   - the end of the stream closes `N-1` down to `b`.
//!
//! Nothing is buffered: elements are pulled from upstream while the handler
//! iterates, with one tuple of look-ahead to detect the boundary.

use std::sync::Arc;

use crate::error::TupleError;
use crate::grouping::handler::GroupHandler;
use crate::sorting::comparator::TupleComparator;
use crate::sorting::plan::SortPlan;
use crate::tuple::Tuple;

type Upstream<'a> = dyn Iterator<Item = Result<Tuple, TupleError>> + 'a;

//==================================================================================
// 1. Group Elements
//==================================================================================

/// The single-pass sequence of tuples in the innermost open group.
///
/// Iteration stops at the first tuple that belongs to another group (kept by
/// the engine as look-ahead) or at the end of the stream. An upstream or
/// comparison error also ends the iteration; the engine then returns it from
/// `RollupGrouper::run`.
pub struct GroupElements<'a> {
    upstream: &'a mut Upstream<'a>,
    comparator: &'a TupleComparator,
    depth_count: usize,
    first: Option<Tuple>,
    last: Option<Tuple>,
    boundary: Option<(Tuple, usize)>,
    error: Option<TupleError>,
    finished: bool,
}

impl<'a> GroupElements<'a> {
    fn new(
        upstream: &'a mut Upstream<'a>,
        comparator: &'a TupleComparator,
        depth_count: usize,
        first: Tuple,
    ) -> Self {
        Self {
            upstream,
            comparator,
            depth_count,
            first: Some(first),
            last: None,
            boundary: None,
            error: None,
            finished: false,
        }
    }

    /// The most recently yielded tuple.
    pub fn last_seen(&self) -> Option<&Tuple> {
        self.last.as_ref()
    }

    fn pull(&mut self) -> Result<Option<Tuple>, TupleError> {
        if let Some(first) = self.first.take() {
            return Ok(Some(first));
        }
        let Some(next) = self.upstream.next().transpose()? else {
            return Ok(None);
        };
        let previous = self
            .last
            .as_ref()
            .ok_or_else(|| TupleError::InternalError("Group has no previous element".to_string()))?;
        let shared = self.comparator.matching_prefix(previous, &next, self.depth_count)?;
        if shared == self.depth_count {
            Ok(Some(next))
        } else {
            self.boundary = Some((next, shared));
            Ok(None)
        }
    }
}

impl Iterator for GroupElements<'_> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        if self.finished {
            return None;
        }
        match self.pull() {
            Ok(Some(tuple)) => {
                self.last = Some(tuple.clone());
                Some(tuple)
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.error = Some(e);
                self.finished = true;
                None
            }
        }
    }
}

//==================================================================================
// 2. Engine
//==================================================================================

enum State {
    Idle,
    InGroup(Tuple),
    Done,
}

/// A validated group-by over a `SortPlan`.
#[derive(Debug, Clone)]
pub struct RollupGrouper {
    comparator: TupleComparator,
    group_by: Vec<String>,
    rollup_base: usize,
}

impl RollupGrouper {
    /// Groups by `group_by`, which must be a prefix of the plan's common sort
    /// fields, reporting depths from `rollup_from` (default: the first field)
    /// down to the last.
    pub fn new(
        plan: Arc<SortPlan>,
        group_by: Vec<String>,
        rollup_from: Option<&str>,
    ) -> Result<Self, TupleError> {
        if group_by.is_empty() {
            return Err(TupleError::InvalidGroupBy(
                "At least one group-by field is required".to_string(),
            ));
        }
        let common = plan.common();
        if group_by.len() > common.len() {
            return Err(TupleError::InvalidGroupBy(format!(
                "{} group-by fields but only {} common sort fields ('{}')",
                group_by.len(),
                common.len(),
                common
            )));
        }
        for (i, (field, element)) in group_by.iter().zip(common.elements()).enumerate() {
            if field != element.field_name() {
                return Err(TupleError::InvalidGroupBy(format!(
                    "Group-by field #{} is '{}' but sort field #{} is '{}'; group-by must be a prefix of '{}'",
                    i,
                    field,
                    i,
                    element.field_name(),
                    common
                )));
            }
        }
        let rollup_base = match rollup_from {
            None => 0,
            Some(name) => group_by.iter().position(|f| f == name).ok_or_else(|| {
                TupleError::InvalidGroupBy(format!(
                    "Rollup field '{}' is not one of the group-by fields {:?}",
                    name, group_by
                ))
            })?,
        };

        log::info!(
            "Grouping by {:?}, reporting depths {}..{}",
            group_by,
            rollup_base,
            group_by.len() - 1
        );
        Ok(Self {
            comparator: TupleComparator::new(plan),
            group_by,
            rollup_base,
        })
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// The shallowest reported depth.
    pub fn rollup_base(&self) -> usize {
        self.rollup_base
    }

    pub fn comparator(&self) -> &TupleComparator {
        &self.comparator
    }

    /// Scans `tuples` once, calling `handler` for every group event.
    pub fn run<I, H>(&self, tuples: I, handler: &mut H) -> Result<(), TupleError>
    where
        I: IntoIterator<Item = Result<Tuple, TupleError>>,
        H: GroupHandler + ?Sized,
    {
        let mut upstream = tuples.into_iter();
        let mut state = State::Idle;
        let mut groups = 0usize;

        loop {
            state = match state {
                State::Idle => match upstream.next().transpose()? {
                    None => State::Done,
                    Some(first) => {
                        self.open_from(self.rollup_base, &first, handler)?;
                        State::InGroup(first)
                    }
                },
                State::InGroup(first) => {
                    groups += 1;
                    let (last, boundary) = self.deliver(first, &mut upstream, handler)?;
                    match boundary {
                        Some((next, shared)) => {
                            let level = shared.max(self.rollup_base);
                            log::debug!(
                                "Boundary after {} shared group-by field(s): closing depths {}..{}",
                                shared,
                                level,
                                self.group_by.len() - 1
                            );
                            self.close_down_to(level, &last, handler)?;
                            self.open_from(level, &next, handler)?;
                            State::InGroup(next)
                        }
                        None => {
                            self.close_down_to(self.rollup_base, &last, handler)?;
                            State::Done
                        }
                    }
                }
                State::Done => {
                    crate::log_metric!("event" = "grouping_finished", "groups" = groups);
                    return Ok(());
                }
            };
        }
    }

    /// `run` over tuples that cannot fail upstream.
    pub fn run_tuples<I, H>(&self, tuples: I, handler: &mut H) -> Result<(), TupleError>
    where
        I: IntoIterator<Item = Tuple>,
        H: GroupHandler + ?Sized,
    {
        self.run(tuples.into_iter().map(Ok), handler)
    }

    /// Hands the innermost group to the handler, drains what it left, and
    /// returns the group's last tuple with the look-ahead that ended it.
    fn deliver<J, H>(
        &self,
        first: Tuple,
        upstream: &mut J,
        handler: &mut H,
    ) -> Result<(Tuple, Option<(Tuple, usize)>), TupleError>
    where
        J: Iterator<Item = Result<Tuple, TupleError>>,
        H: GroupHandler + ?Sized,
    {
        let depth_count = self.group_by.len();
        let mut elements = GroupElements::new(upstream, &self.comparator, depth_count, first);
        handler.on_group_elements(depth_count - 1, &mut elements)?;
        elements.by_ref().for_each(drop);

        if let Some(e) = elements.error.take() {
            return Err(e);
        }
        let last = elements
            .last
            .take()
            .ok_or_else(|| TupleError::InternalError("Group ended without elements".to_string()))?;
        Ok((last, elements.boundary.take()))
    }

    fn open_from<H>(&self, level: usize, first: &Tuple, handler: &mut H) -> Result<(), TupleError>
    where
        H: GroupHandler + ?Sized,
    {
        for depth in level..self.group_by.len() {
            handler.on_open_group(depth, &self.group_by[depth], first)?;
        }
        Ok(())
    }

    fn close_down_to<H>(&self, level: usize, last: &Tuple, handler: &mut H) -> Result<(), TupleError>
    where
        H: GroupHandler + ?Sized,
    {
        for depth in (level..self.group_by.len()).rev() {
            handler.on_close_group(depth, &self.group_by[depth], last)?;
        }
        Ok(())
    }
}
