//! The dynamically-typed value held by one tuple field.

use std::cmp::Ordering;
use std::fmt;

use crate::types::FieldType;

/// One field value. Which variants are legal for a field is decided by its
/// `FieldType` (see `Value::conforms_to`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// `Int32` and `VarInt32` fields.
    Int(i32),
    /// `Int64` and `VarInt64` fields.
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    /// Enum ordinal.
    Enum(u32),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this value may be stored in a field of type `ty`.
    /// `Null` conforms to every type.
    pub fn conforms_to(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (Value::Null, _)
                | (Value::Int(_), FieldType::Int32 | FieldType::VarInt32)
                | (Value::Long(_), FieldType::Int64 | FieldType::VarInt64)
                | (Value::Float(_), FieldType::Float32)
                | (Value::Double(_), FieldType::Float64)
                | (Value::Bool(_), FieldType::Boolean)
                | (Value::Enum(_), FieldType::Enum)
                | (Value::Str(_), FieldType::String)
                | (Value::Bytes(_), FieldType::Bytes)
        )
    }

    /// Short description of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Int(_) => "Int",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Bool(_) => "Bool",
            Value::Enum(_) => "Enum",
            Value::Str(_) => "Str",
            Value::Bytes(_) => "Bytes",
        }
    }

    /// The raw bytes of a string or bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s.as_bytes()),
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Long(_) => 3,
            Value::Float(_) => 4,
            Value::Double(_) => 5,
            Value::Enum(_) => 6,
            Value::Str(_) => 7,
            Value::Bytes(_) => 8,
        }
    }

    /// The natural ordering of two values.
    ///
    /// `Null` sorts first; floats use the IEEE total order so the result is a
    /// strict weak ordering even with NaN; strings and bytes compare as raw
    /// bytes, which matches the order of their serialized payloads. Values of
    /// different variants only meet when a schema is misused and are ordered
    /// by variant rank.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Enum(a), Value::Enum(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::Bytes(a), Value::Bytes(b)) => a.as_slice().cmp(b.as_slice()),
            (Value::Str(a), Value::Bytes(b)) => a.as_bytes().cmp(b.as_slice()),
            (Value::Bytes(a), Value::Str(b)) => a.as_slice().cmp(b.as_bytes()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Enum(v) => write!(f, "#{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "{:02x?}", v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
