//! This module defines shared traits used across different kernels.

/// Maps a signed integer type to its unsigned counterpart and provides the
/// zig-zag bijection between them.
pub trait ZigZag: Copy {
    type Unsigned: Copy;

    /// Interleaves negative and positive values: 0, -1, 1, -2, 2 ...
    fn zigzag_encode(self) -> Self::Unsigned;

    /// The inverse of `zigzag_encode`.
    fn zigzag_decode(value: Self::Unsigned) -> Self;
}

// Implement the trait for the integer widths used by VarInt fields.
macro_rules! impl_zigzag_pair {
    ($S:ty, $U:ty) => {
        impl ZigZag for $S {
            type Unsigned = $U;

            #[inline]
            fn zigzag_encode(self) -> $U {
                ((self << 1) ^ (self >> (<$S>::BITS - 1))) as $U
            }

            #[inline]
            fn zigzag_decode(value: $U) -> $S {
                ((value >> 1) as $S) ^ -((value & 1) as $S)
            }
        }
    };
}

impl_zigzag_pair!(i32, u32);
impl_zigzag_pair!(i64, u64);
