//! This module contains the pure, stateless kernels for zig-zag + LEB128
//! encoding of signed integers, the wire form of `VarInt32`/`VarInt64` fields.
//!
//! Zig-zag maps small magnitudes (positive or negative) to small unsigned
//! values so the LEB128 stage stays short. The mapping does not preserve
//! order, so comparisons always decode before comparing.

use num_traits::{PrimInt, Unsigned};

use crate::error::TupleError;
use crate::kernels::leb128;
use crate::traits::ZigZag;

//==================================================================================
// 1. Generic Core Logic
//==================================================================================

/// Encodes a single signed integer using the zig-zag algorithm.
#[inline]
pub fn encode_val<T: ZigZag>(n: T) -> T::Unsigned {
    n.zigzag_encode()
}

/// Decodes a single unsigned integer back to its signed representation.
#[inline]
pub fn decode_val<T: ZigZag>(n: T::Unsigned) -> T {
    T::zigzag_decode(n)
}

//==================================================================================
// 2. Public API (zig-zag + LEB128 framing)
//==================================================================================

/// Appends the varint form of `value` to `buffer`.
pub fn write_varint<T>(value: T, buffer: &mut Vec<u8>) -> Result<(), TupleError>
where
    T: ZigZag,
    T::Unsigned: PrimInt + Unsigned,
{
    leb128::encode_one(encode_val(value), buffer)
}

/// Reads a varint at `pos`, returning the value and the bytes consumed.
pub fn read_varint<T>(buf: &[u8], pos: usize) -> Result<(T, usize), TupleError>
where
    T: ZigZag,
    T::Unsigned: PrimInt + Unsigned,
{
    let (raw, consumed) = leb128::decode_at::<T::Unsigned>(buf, pos)?;
    Ok((decode_val::<T>(raw), consumed))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
