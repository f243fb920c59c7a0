//! This module serves as the public API and dispatcher for the collection of
//! pure, stateless field encoding kernels.
//!
//! It declares the kernel sub-modules and provides the per-`FieldType`
//! dispatchers used by the serializer (encode/decode) and by the binary
//! comparator (compare-in-place). Every dispatcher matches `FieldType`
//! exhaustively and reports the exact number of bytes it consumed; the
//! callers advance their own cursors with it.
//!
//! Wire form per type:
//!
//! | type                | encoding                                   |
//! |---------------------|--------------------------------------------|
//! | Int32 / Float32     | 4 bytes big-endian                         |
//! | Int64 / Float64     | 8 bytes big-endian                         |
//! | VarInt32 / VarInt64 | zig-zag + LEB128                           |
//! | Enum                | LEB128 ordinal                             |
//! | Boolean             | 1 byte, 0 or 1                             |
//! | String / Bytes      | LEB128 length + raw bytes                  |

use std::cmp::Ordering;

use crate::error::TupleError;
use crate::types::{FieldType, Value};

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod fixed;
pub mod leb128;
pub mod zigzag;

//==================================================================================
// 2. Length-Prefixed Spans
//==================================================================================

/// Appends `payload` framed by its LEB128 length.
pub fn write_span(payload: &[u8], buffer: &mut Vec<u8>) -> Result<(), TupleError> {
    buffer.reserve(leb128::encoded_len(payload.len() as u64) + payload.len());
    leb128::encode_one(payload.len() as u64, buffer)?;
    buffer.extend_from_slice(payload);
    Ok(())
}

/// Reads a length-prefixed span at `pos`. Returns the payload and the total
/// number of bytes consumed (prefix included).
pub fn read_span(buf: &[u8], pos: usize) -> Result<(&[u8], usize), TupleError> {
    let (len, prefix) = leb128::decode_at::<u64>(buf, pos)?;
    let start = pos + prefix;
    let end = usize::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            TupleError::Decode(format!(
                "Span of {} bytes at offset {} overruns buffer of {} bytes",
                len,
                start,
                buf.len()
            ))
        })?;
    Ok((&buf[start..end], end - pos))
}

//==================================================================================
// 3. Unified Dispatchers
//==================================================================================

/// Encodes `value` in the natural wire form of `field_type`.
pub fn encode_value(
    field_type: FieldType,
    value: &Value,
    buffer: &mut Vec<u8>,
) -> Result<(), TupleError> {
    match (field_type, value) {
        (FieldType::String, Value::Str(s)) => write_span(s.as_bytes(), buffer),
        (FieldType::Bytes, Value::Bytes(b)) => write_span(b, buffer),
        _ => encode_payload(field_type, value, buffer),
    }
}

/// Encodes `value` as the payload handed to a custom comparator: raw bytes for
/// strings and bytes, the natural form for every other type.
pub fn encode_payload(
    field_type: FieldType,
    value: &Value,
    buffer: &mut Vec<u8>,
) -> Result<(), TupleError> {
    match (field_type, value) {
        (_, Value::Null) => Err(TupleError::Encode(format!(
            "Null values cannot be serialized (field type {})",
            field_type
        ))),
        (FieldType::Int32, Value::Int(v)) => {
            fixed::write_i32(*v, buffer);
            Ok(())
        }
        (FieldType::Int64, Value::Long(v)) => {
            fixed::write_i64(*v, buffer);
            Ok(())
        }
        (FieldType::Float32, Value::Float(v)) => {
            fixed::write_f32(*v, buffer);
            Ok(())
        }
        (FieldType::Float64, Value::Double(v)) => {
            fixed::write_f64(*v, buffer);
            Ok(())
        }
        (FieldType::Boolean, Value::Bool(v)) => {
            buffer.push(u8::from(*v));
            Ok(())
        }
        (FieldType::VarInt32, Value::Int(v)) => zigzag::write_varint(*v, buffer),
        (FieldType::VarInt64, Value::Long(v)) => zigzag::write_varint(*v, buffer),
        (FieldType::Enum, Value::Enum(v)) => leb128::encode_one(*v, buffer),
        (FieldType::String, Value::Str(s)) => {
            buffer.extend_from_slice(s.as_bytes());
            Ok(())
        }
        (FieldType::Bytes, Value::Bytes(b)) => {
            buffer.extend_from_slice(b);
            Ok(())
        }
        _ => Err(mismatch(field_type, value)),
    }
}

/// Decodes one value in natural wire form at `pos`; returns it with the bytes consumed.
pub fn decode_value(
    field_type: FieldType,
    buf: &[u8],
    pos: usize,
) -> Result<(Value, usize), TupleError> {
    match field_type {
        FieldType::String | FieldType::Bytes => {
            let (payload, consumed) = read_span(buf, pos)?;
            Ok((binary_value(field_type, payload)?, consumed))
        }
        _ => decode_scalar(field_type, buf, pos),
    }
}

/// Decodes a custom-comparator payload that spans exactly `payload`.
pub fn decode_payload(field_type: FieldType, payload: &[u8]) -> Result<Value, TupleError> {
    match field_type {
        FieldType::String | FieldType::Bytes => binary_value(field_type, payload),
        _ => {
            let (value, consumed) = decode_scalar(field_type, payload, 0)?;
            if consumed != payload.len() {
                return Err(TupleError::Decode(format!(
                    "{} payload of {} bytes has {} trailing bytes",
                    field_type,
                    payload.len(),
                    payload.len() - consumed
                )));
            }
            Ok(value)
        }
    }
}

/// Compares the natural wire forms of one field in two buffers without
/// materializing values. Returns the ascending ordering and the bytes consumed
/// from each buffer.
pub fn compare_encoded(
    field_type: FieldType,
    a: &[u8],
    pos_a: usize,
    b: &[u8],
    pos_b: usize,
) -> Result<(Ordering, usize, usize), TupleError> {
    match field_type {
        FieldType::Int32 => Ok((fixed::read_i32(a, pos_a)?.cmp(&fixed::read_i32(b, pos_b)?), 4, 4)),
        FieldType::Int64 => Ok((fixed::read_i64(a, pos_a)?.cmp(&fixed::read_i64(b, pos_b)?), 8, 8)),
        FieldType::Float32 => {
            let (x, y) = (fixed::read_f32(a, pos_a)?, fixed::read_f32(b, pos_b)?);
            Ok((x.total_cmp(&y), 4, 4))
        }
        FieldType::Float64 => {
            let (x, y) = (fixed::read_f64(a, pos_a)?, fixed::read_f64(b, pos_b)?);
            Ok((x.total_cmp(&y), 8, 8))
        }
        FieldType::Boolean => Ok((fixed::read_u8(a, pos_a)?.cmp(&fixed::read_u8(b, pos_b)?), 1, 1)),
        FieldType::VarInt32 => {
            let (x, na) = zigzag::read_varint::<i32>(a, pos_a)?;
            let (y, nb) = zigzag::read_varint::<i32>(b, pos_b)?;
            Ok((x.cmp(&y), na, nb))
        }
        FieldType::VarInt64 => {
            let (x, na) = zigzag::read_varint::<i64>(a, pos_a)?;
            let (y, nb) = zigzag::read_varint::<i64>(b, pos_b)?;
            Ok((x.cmp(&y), na, nb))
        }
        FieldType::Enum => {
            let (x, na) = leb128::decode_at::<u32>(a, pos_a)?;
            let (y, nb) = leb128::decode_at::<u32>(b, pos_b)?;
            Ok((x.cmp(&y), na, nb))
        }
        FieldType::String | FieldType::Bytes => {
            let (x, na) = read_span(a, pos_a)?;
            let (y, nb) = read_span(b, pos_b)?;
            Ok((x.cmp(y), na, nb))
        }
    }
}

//==================================================================================
// 4. Private Helpers
//==================================================================================

fn decode_scalar(
    field_type: FieldType,
    buf: &[u8],
    pos: usize,
) -> Result<(Value, usize), TupleError> {
    match field_type {
        FieldType::Int32 => Ok((Value::Int(fixed::read_i32(buf, pos)?), 4)),
        FieldType::Int64 => Ok((Value::Long(fixed::read_i64(buf, pos)?), 8)),
        FieldType::Float32 => Ok((Value::Float(fixed::read_f32(buf, pos)?), 4)),
        FieldType::Float64 => Ok((Value::Double(fixed::read_f64(buf, pos)?), 8)),
        FieldType::Boolean => match fixed::read_u8(buf, pos)? {
            0 => Ok((Value::Bool(false), 1)),
            1 => Ok((Value::Bool(true), 1)),
            other => Err(TupleError::Decode(format!(
                "Invalid boolean byte {:#04x} at offset {}",
                other, pos
            ))),
        },
        FieldType::VarInt32 => {
            let (v, n) = zigzag::read_varint::<i32>(buf, pos)?;
            Ok((Value::Int(v), n))
        }
        FieldType::VarInt64 => {
            let (v, n) = zigzag::read_varint::<i64>(buf, pos)?;
            Ok((Value::Long(v), n))
        }
        FieldType::Enum => {
            let (v, n) = leb128::decode_at::<u32>(buf, pos)?;
            Ok((Value::Enum(v), n))
        }
        FieldType::String | FieldType::Bytes => {
            let (payload, n) = read_span(buf, pos)?;
            Ok((binary_value(field_type, payload)?, n))
        }
    }
}

fn binary_value(field_type: FieldType, payload: &[u8]) -> Result<Value, TupleError> {
    if field_type == FieldType::String {
        let text = std::str::from_utf8(payload)
            .map_err(|e| TupleError::Decode(format!("String field is not valid UTF-8: {}", e)))?;
        Ok(Value::Str(text.to_string()))
    } else {
        Ok(Value::Bytes(payload.to_vec()))
    }
}

fn mismatch(field_type: FieldType, value: &Value) -> TupleError {
    TupleError::Encode(format!(
        "Value of kind {} cannot be encoded as {}",
        value.kind(),
        field_type
    ))
}

//==================================================================================
// 5. Unit Tests
//==================================================================================
