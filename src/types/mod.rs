//! This module defines the core, strongly-typed data representations used
//! throughout tuplegroup.
//!
//! It includes the closed `FieldType` enum describing a field's semantic type
//! and the `Value` enum holding one field of one tuple.

pub mod field_type;
pub mod value;

// Re-export the main type(s) for easier access.
pub use field_type::FieldType;
pub use value::Value;
