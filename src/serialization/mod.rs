//! Binary tuple serialization whose output the `TupleComparator` can order
//! without decoding.

pub mod codec;


pub use codec::TupleSerializer;
