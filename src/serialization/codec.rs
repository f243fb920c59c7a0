// In: src/serialization/codec.rs

//! The `TupleSerializer`.
//!
//! A serialized tuple is the concatenation of its field encodings in the
//! source's ordered layout (see `sorting::plan`), with no header. Common fields
//! sorted with a custom comparator are framed as a LEB128 length followed by
//! the comparator payload, so the binary comparator can hand the comparator an
//! exact span. Everything else uses the natural encoding from `kernels`.
//!
//! The source of a serialized tuple is recovered from the `#source#` value among
//! the common fields; a single-source plan needs no discriminator.

use std::sync::Arc;

use crate::error::TupleError;
use crate::kernels;
use crate::schema::Schema;
use crate::sorting::plan::{SortPlan, SourceLayout};
use crate::tuple::Tuple;
use crate::types::Value;

/// Serializes and deserializes tuples in plan order.
#[derive(Debug, Clone)]
pub struct TupleSerializer {
    plan: Arc<SortPlan>,
}

impl TupleSerializer {
    pub fn new(plan: Arc<SortPlan>) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &Arc<SortPlan> {
        &self.plan
    }

    /// Appends the serialized form of `tuple` to `buffer`. On error the buffer
    /// is left as it was.
    pub fn serialize(&self, tuple: &Tuple, buffer: &mut Vec<u8>) -> Result<(), TupleError> {
        let layout = self.plan.source_of(tuple)?;
        let start = buffer.len();
        let result = self.write_fields(tuple, layout, buffer);
        if result.is_err() {
            buffer.truncate(start);
        }
        result
    }

    /// Serializes `tuple` into a fresh buffer.
    pub fn to_bytes(&self, tuple: &Tuple) -> Result<Vec<u8>, TupleError> {
        let mut buffer = Vec::new();
        self.serialize(tuple, &mut buffer)?;
        Ok(buffer)
    }

    /// Rebuilds a tuple from exactly one serialized record.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Tuple, TupleError> {
        let mut pos = 0usize;

        // --- 1. Common fields, typed by the plan ---
        let common = self.plan.common();
        let mut common_values = Vec::with_capacity(common.len());
        for (element, field) in common.elements().iter().zip(self.plan.common_fields()) {
            let value = if element.comparator().is_some() {
                let (payload, used) = kernels::read_span(bytes, pos)?;
                pos += used;
                kernels::decode_payload(field.field_type, payload)?
            } else {
                let (value, used) = kernels::decode_value(field.field_type, bytes, pos)?;
                pos += used;
                value
            };
            common_values.push(value);
        }

        // --- 2. Resolve the source ---
        let layout = self.resolve_source(&common_values)?;
        let schema: &Arc<Schema> = layout.schema();
        let positions = layout.ordered_positions();

        // --- 3. Remaining fields, typed by the source schema ---
        let mut values = vec![Value::Null; schema.len()];
        for (&schema_pos, value) in positions.iter().zip(common_values) {
            values[schema_pos] = value;
        }
        for &schema_pos in &positions[common.len()..] {
            let field_type = schema.fields()[schema_pos].field_type;
            let (value, used) = kernels::decode_value(field_type, bytes, pos)?;
            pos += used;
            values[schema_pos] = value;
        }

        if pos != bytes.len() {
            return Err(TupleError::Decode(format!(
                "{} trailing bytes after a tuple of schema '{}'",
                bytes.len() - pos,
                schema.name()
            )));
        }
        Tuple::from_values(Arc::clone(schema), values)
    }

    fn write_fields(
        &self,
        tuple: &Tuple,
        layout: &SourceLayout,
        buffer: &mut Vec<u8>,
    ) -> Result<(), TupleError> {
        let common = self.plan.common().elements();
        let fields = layout.schema().fields();
        let mut payload = Vec::new();

        for (i, &schema_pos) in layout.ordered_positions().iter().enumerate() {
            let field = &fields[schema_pos];
            let value = tuple.get(schema_pos)?;
            let framed = common.get(i).is_some_and(|e| e.comparator().is_some());

            let written = if framed {
                payload.clear();
                kernels::encode_payload(field.field_type, value, &mut payload)
                    .and_then(|_| kernels::write_span(&payload, buffer))
            } else {
                kernels::encode_value(field.field_type, value, buffer)
            };
            written.map_err(|e| match e {
                TupleError::Encode(msg) => TupleError::Encode(format!("Field '{}': {}", field.name, msg)),
                other => other,
            })?;
        }
        Ok(())
    }

    fn resolve_source(&self, common_values: &[Value]) -> Result<&SourceLayout, TupleError> {
        if let Some(layout) = self.plan.sole_source() {
            return Ok(layout);
        }
        let index = self.plan.source_field_index().ok_or_else(|| {
            TupleError::InternalError("Multi-source plan without a discriminator".to_string())
        })?;
        match common_values.get(index) {
            Some(Value::Int(id)) => self.plan.source(*id).ok_or_else(|| {
                TupleError::Decode(format!("Serialized tuple carries unknown source id {}", id))
            }),
            other => Err(TupleError::Decode(format!(
                "Expected a source id in the serialized tuple, found {:?}",
                other
            ))),
        }
    }
}
