//! The `TupleComparator`: one ordering, two paths.
//!
//! `compare` orders `Tuple` objects; `compare_bytes` orders the serialized form
//! produced by `serialization::TupleSerializer` without decoding it. For any two
//! tuples, `compare(a, b)` and `compare_bytes(ser(a), ser(b))` have the same sign.
//!
//! Both paths walk the common criteria first. On a multi-source plan a tie on
//! every common field continues into the specific criteria of the source named
//! by the *first* operand's discriminator; two tuples that tie on every common
//! field (`#source#` included) always come from the same source.
//!
//! All per-comparison state (cursors, the discriminator seen so far) lives in
//! locals, so one comparator can be shared by any number of threads.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::TupleError;
use crate::kernels::{self, zigzag};
use crate::sorting::criteria::SortElement;
use crate::sorting::plan::SortPlan;
use crate::tuple::Tuple;
use crate::types::Value;

/// Orders tuples according to a `SortPlan`.
#[derive(Debug, Clone)]
pub struct TupleComparator {
    plan: Arc<SortPlan>,
}

impl TupleComparator {
    pub fn new(plan: Arc<SortPlan>) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &Arc<SortPlan> {
        &self.plan
    }

    //==============================================================================
    // 1. Object Path
    //==============================================================================

    /// Compares two tuples field by field.
    pub fn compare(&self, a: &Tuple, b: &Tuple) -> Result<Ordering, TupleError> {
        let source_index = self.plan.source_field_index();
        let mut source_id = None;

        for (depth, element) in self.plan.common().elements().iter().enumerate() {
            let (v1, v2) = (a.get_by_name(element.field_name())?, b.get_by_name(element.field_name())?);
            if Some(depth) == source_index {
                if let Value::Int(id) = v1 {
                    source_id = Some(*id);
                }
            }
            let ord = compare_values(element, v1, v2);
            if ord != Ordering::Equal {
                return Ok(element.order().apply(ord));
            }
        }

        if !self.plan.is_multi_source() {
            return Ok(Ordering::Equal);
        }
        let layout = source_id
            .and_then(|id| self.plan.source(id))
            .ok_or_else(|| {
                TupleError::InvalidField(format!(
                    "Tuple of schema '{}' carries source id {:?}, which the plan does not register",
                    a.schema().name(),
                    source_id
                ))
            })?;
        let Some(specific) = layout.specific() else {
            return Ok(Ordering::Equal);
        };
        for element in specific.elements() {
            let ord = a
                .get_by_name(element.field_name())?
                .natural_cmp(b.get_by_name(element.field_name())?);
            if ord != Ordering::Equal {
                return Ok(element.order().apply(ord));
            }
        }
        Ok(Ordering::Equal)
    }

    /// Number of leading common fields, up to `n`, on which `a` and `b` are
    /// equal under the criteria's comparators.
    pub fn matching_prefix(&self, a: &Tuple, b: &Tuple, n: usize) -> Result<usize, TupleError> {
        let elements = self.plan.common().elements();
        if n > elements.len() {
            return Err(TupleError::InternalError(format!(
                "Prefix of {} fields requested but the common criteria has {}",
                n,
                elements.len()
            )));
        }
        for (depth, element) in elements[..n].iter().enumerate() {
            let ord = compare_values(
                element,
                a.get_by_name(element.field_name())?,
                b.get_by_name(element.field_name())?,
            );
            if ord != Ordering::Equal {
                return Ok(depth);
            }
        }
        Ok(n)
    }

    //==============================================================================
    // 2. Binary Path
    //==============================================================================

    /// Compares two whole serialized tuples.
    pub fn compare_bytes(&self, a: &[u8], b: &[u8]) -> Result<Ordering, TupleError> {
        let source_index = self.plan.source_field_index();
        let mut source_id = None;
        let (mut pos_a, mut pos_b) = (0usize, 0usize);

        for (depth, (element, field)) in self
            .plan
            .common()
            .elements()
            .iter()
            .zip(self.plan.common_fields())
            .enumerate()
        {
            let ord = match element.comparator() {
                Some(comparator) => {
                    let (span_a, used_a) = kernels::read_span(a, pos_a)?;
                    let (span_b, used_b) = kernels::read_span(b, pos_b)?;
                    pos_a += used_a;
                    pos_b += used_b;
                    comparator.comparator().compare_bytes(span_a, span_b)?
                }
                None => {
                    if Some(depth) == source_index {
                        let (id, _) = zigzag::read_varint::<i32>(a, pos_a)?;
                        source_id = Some(id);
                    }
                    let (ord, used_a, used_b) =
                        kernels::compare_encoded(field.field_type, a, pos_a, b, pos_b)?;
                    pos_a += used_a;
                    pos_b += used_b;
                    ord
                }
            };
            if ord != Ordering::Equal {
                return Ok(element.order().apply(ord));
            }
        }

        if !self.plan.is_multi_source() {
            return Ok(Ordering::Equal);
        }
        let layout = source_id
            .and_then(|id| self.plan.source(id))
            .ok_or_else(|| {
                TupleError::Decode(format!(
                    "Serialized tuple carries unknown source id {:?}",
                    source_id
                ))
            })?;
        let Some(specific) = layout.specific() else {
            return Ok(Ordering::Equal);
        };
        for (element, field) in specific.elements().iter().zip(layout.specific_fields()) {
            let (ord, used_a, used_b) =
                kernels::compare_encoded(field.field_type, a, pos_a, b, pos_b)?;
            pos_a += used_a;
            pos_b += used_b;
            if ord != Ordering::Equal {
                return Ok(element.order().apply(ord));
            }
        }
        Ok(Ordering::Equal)
    }

    /// Compares `b1[s1..s1 + l1]` with `b2[s2..s2 + l2]`.
    pub fn compare_raw(
        &self,
        b1: &[u8],
        s1: usize,
        l1: usize,
        b2: &[u8],
        s2: usize,
        l2: usize,
    ) -> Result<Ordering, TupleError> {
        self.compare_bytes(sub_slice(b1, s1, l1)?, sub_slice(b2, s2, l2)?)
    }

    //==============================================================================
    // 3. Sorting Helpers
    //==============================================================================

    /// Sorts tuples in place. A failed comparison counts as `Equal` and the sort
    /// runs to completion, leaving the slice in an unspecified order; the first
    /// error is then returned.
    pub fn sort_tuples(&self, tuples: &mut [Tuple]) -> Result<(), TupleError> {
        let mut failure = None;
        tuples.sort_by(|a, b| absorb(self.compare(a, b), &mut failure));
        failure.map_or(Ok(()), Err)
    }

    /// Sorts serialized tuples in place, in the same order `sort_tuples` would.
    /// Errors are handled as in `sort_tuples`.
    pub fn sort_serialized<B: AsRef<[u8]>>(&self, buffers: &mut [B]) -> Result<(), TupleError> {
        let mut failure = None;
        buffers.sort_by(|a, b| absorb(self.compare_bytes(a.as_ref(), b.as_ref()), &mut failure));
        failure.map_or(Ok(()), Err)
    }
}

//==================================================================================
// 4. Private Helpers
//==================================================================================

#[inline]
fn compare_values(element: &SortElement, a: &Value, b: &Value) -> Ordering {
    match element.comparator() {
        Some(comparator) => comparator.comparator().compare_values(a, b),
        None => a.natural_cmp(b),
    }
}

fn sub_slice(buf: &[u8], start: usize, len: usize) -> Result<&[u8], TupleError> {
    start
        .checked_add(len)
        .and_then(|end| buf.get(start..end))
        .ok_or_else(|| {
            TupleError::Decode(format!(
                "Range {}..{}+{} is outside a buffer of {} bytes",
                start,
                start,
                len,
                buf.len()
            ))
        })
}

/// Keeps the first error and reports `Equal` for the failed comparison.
fn absorb(result: Result<Ordering, TupleError>, failure: &mut Option<TupleError>) -> Ordering {
    match result {
        Ok(ord) => ord,
        Err(e) => {
            if failure.is_none() {
                *failure = Some(e);
            }
            Ordering::Equal
        }
    }
}
