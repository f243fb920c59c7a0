//! This module contains the pure, stateless kernels for LEB128 (Little-Endian
//! Base 128) variable-length integer encoding and decoding.
//!
//! LEB128 frames every variable-width value in the tuple layout: VarInt fields
//! (after zig-zag), enum ordinals, and the length prefix of strings, bytes and
//! custom-comparator spans. It is fully panic-free.

use num_traits::{PrimInt, Unsigned};

use crate::error::TupleError;

//==================================================================================
// 1. Encoding
//==================================================================================

/// Encodes a single unsigned integer into a LEB128 byte sequence, appending to a buffer.
pub fn encode_one<T>(value: T, buffer: &mut Vec<u8>) -> Result<(), TupleError>
where
    T: PrimInt + Unsigned,
{
    let zero = T::zero();
    let seven_bit_mask = T::from(0x7F)
        .ok_or_else(|| TupleError::Encode("Failed to create 7-bit mask for type".to_string()))?;

    let mut current_value = value;
    loop {
        let payload = (current_value & seven_bit_mask)
            .to_u8()
            .ok_or_else(|| TupleError::Encode("Failed to convert generic integer to u8".to_string()))?;
        current_value = current_value >> 7;

        if current_value == zero {
            buffer.push(payload);
            return Ok(());
        }
        buffer.push(payload | 0x80);
    }
}

/// Number of bytes `encode_one` writes for `value`.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

//==================================================================================
// 2. Decoding
//==================================================================================

/// Decodes a single unsigned integer starting at `pos`.
///
/// Returns the value and the number of bytes consumed. The caller owns the
/// cursor; nothing is retained between calls.
///
/// # Errors
/// `TupleError::Decode` if the buffer ends before the terminating byte or the
/// encoded value does not fit in `T`.
pub fn decode_at<T>(buf: &[u8], pos: usize) -> Result<(T, usize), TupleError>
where
    T: PrimInt + Unsigned,
{
    let mut result = T::zero();
    let mut shift = 0;
    let total_bits = std::mem::size_of::<T>() * 8;
    let mut cursor = pos;

    loop {
        let byte = *buf.get(cursor).ok_or_else(|| {
            TupleError::Decode(format!("Unexpected end of buffer reading varint at offset {}", pos))
        })?;
        cursor += 1;

        if shift >= total_bits {
            return Err(TupleError::Decode("Integer overflow during varint decoding".to_string()));
        }

        let seven_bit_payload = T::from(byte & 0x7F)
            .ok_or_else(|| TupleError::Decode("Failed to create 7-bit payload from byte".to_string()))?;

        // Bits of the last group that fall outside the type are an overflow.
        if shift + 7 > total_bits && (u32::from(byte & 0x7F) >> (total_bits - shift)) > 0 {
            return Err(TupleError::Decode("Integer overflow during varint decoding".to_string()));
        }

        result = result | (seven_bit_payload << shift);

        if byte & 0x80 == 0 {
            return Ok((result, cursor - pos));
        }

        shift += 7;
    }
}
