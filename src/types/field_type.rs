//! This module defines the canonical, type-safe representation of field types
//! used throughout tuplegroup.

use crate::error::TupleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of semantic field types a tuple may carry.
///
/// Every match over this enum is exhaustive, so adding a type forces the
/// comparator, the serializer and the value model to be updated together.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    /// Fixed 4-byte big-endian signed integer.
    Int32,
    /// Fixed 8-byte big-endian signed integer.
    Int64,
    /// Zig-zag + LEB128 signed 32-bit integer.
    VarInt32,
    /// Zig-zag + LEB128 signed 64-bit integer.
    VarInt64,
    Float32,
    Float64,
    Boolean,
    /// An enum ordinal, stored as an unsigned LEB128.
    Enum,
    /// UTF-8 text, length-prefixed.
    String,
    /// Opaque bytes, length-prefixed.
    Bytes,
}

impl FieldType {
    /// Parses the short type names used by `Schema::parse`.
    pub fn from_type_name(name: &str) -> Result<Self, TupleError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" => Ok(Self::Int32),
            "long" => Ok(Self::Int64),
            "vint" => Ok(Self::VarInt32),
            "vlong" => Ok(Self::VarInt64),
            "float" => Ok(Self::Float32),
            "double" => Ok(Self::Float64),
            "boolean" => Ok(Self::Boolean),
            "enum" => Ok(Self::Enum),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            other => Err(TupleError::InvalidSchema(format!(
                "Unknown field type '{}'",
                other
            ))),
        }
    }

    /// The short type name, the inverse of `from_type_name`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int32 => "int",
            Self::Int64 => "long",
            Self::VarInt32 => "vint",
            Self::VarInt64 => "vlong",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }

    /// Width in bytes for fixed-size encodings, `None` for variable-size ones.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::Int32 | Self::Float32 => Some(4),
            Self::Int64 | Self::Float64 => Some(8),
            Self::Boolean => Some(1),
            Self::VarInt32 | Self::VarInt64 | Self::Enum | Self::String | Self::Bytes => None,
        }
    }

    /// Returns `true` for string and bytes fields.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
