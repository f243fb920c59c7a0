//! Fixed-width, big-endian kernels for `Int32`, `Int64`, `Float32` and
//! `Float64` fields. All reads are bounds-checked and panic-free.

use crate::error::TupleError;

/// Borrows exactly `N` bytes at `pos`, or fails with a decode error.
fn take<const N: usize>(buf: &[u8], pos: usize) -> Result<[u8; N], TupleError> {
    buf.get(pos..pos + N)
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or_else(|| {
            TupleError::Decode(format!(
                "Unexpected end of buffer: need {} bytes at offset {}, buffer has {}",
                N,
                pos,
                buf.len()
            ))
        })
}

macro_rules! fixed_width_codec {
    ($write:ident, $read:ident, $t:ty, $n:literal) => {
        #[inline]
        pub fn $write(value: $t, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(&value.to_be_bytes());
        }

        #[inline]
        pub fn $read(buf: &[u8], pos: usize) -> Result<$t, TupleError> {
            take::<$n>(buf, pos).map(<$t>::from_be_bytes)
        }
    };
}

fixed_width_codec!(write_i32, read_i32, i32, 4);
fixed_width_codec!(write_i64, read_i64, i64, 8);
fixed_width_codec!(write_f32, read_f32, f32, 4);
fixed_width_codec!(write_f64, read_f64, f64, 8);

/// Reads one byte at `pos`.
#[inline]
pub fn read_u8(buf: &[u8], pos: usize) -> Result<u8, TupleError> {
    take::<1>(buf, pos).map(|[b]| b)
}
