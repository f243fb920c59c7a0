//! The `Tuple`: one record conforming to exactly one `Schema`.

use std::fmt;
use std::sync::Arc;

use crate::error::TupleError;
use crate::schema::{Schema, SOURCE_ID_FIELD};
use crate::types::Value;

/// A record with positional and name-based access.
///
/// Tuples have no intrinsic order; compare them through a
/// `sorting::TupleComparator`. Every value conforms to its field type, which
/// the setters enforce.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Tuple {
    /// A tuple with every field set to `Null`.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.len()];
        Self { schema, values }
    }

    /// Builds a tuple from values given in schema order.
    pub fn from_values(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self, TupleError> {
        if values.len() != schema.len() {
            return Err(TupleError::InvalidField(format!(
                "Schema '{}' has {} fields but {} values were given",
                schema.name(),
                schema.len(),
                values.len()
            )));
        }
        for (field, value) in schema.fields().iter().zip(&values) {
            check_conforms(&field.name, field.field_type, value)?;
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at position `pos`.
    pub fn get(&self, pos: usize) -> Result<&Value, TupleError> {
        self.values.get(pos).ok_or_else(|| {
            TupleError::InvalidField(format!(
                "Position {} out of range for schema '{}' ({} fields)",
                pos,
                self.schema.name(),
                self.values.len()
            ))
        })
    }

    /// Value of the field called `name`.
    pub fn get_by_name(&self, name: &str) -> Result<&Value, TupleError> {
        let pos = self.position(name)?;
        Ok(&self.values[pos])
    }

    /// Sets position `pos`, checking the value against the field type.
    pub fn set(&mut self, pos: usize, value: impl Into<Value>) -> Result<(), TupleError> {
        let value = value.into();
        let field = self.schema.field(pos).ok_or_else(|| {
            TupleError::InvalidField(format!(
                "Position {} out of range for schema '{}'",
                pos,
                self.schema.name()
            ))
        })?;
        check_conforms(&field.name, field.field_type, &value)?;
        self.values[pos] = value;
        Ok(())
    }

    /// Sets the field called `name`.
    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> Result<(), TupleError> {
        let pos = self.position(name)?;
        self.set(pos, value)
    }

    /// Builder-style `set_by_name`.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, TupleError> {
        self.set_by_name(name, value)?;
        Ok(self)
    }

    /// The source discriminator, if the schema declares one and it is set.
    pub fn source_id(&self) -> Option<i32> {
        match self.schema.index_of(SOURCE_ID_FIELD).map(|pos| &self.values[pos]) {
            Some(Value::Int(id)) => Some(*id),
            _ => None,
        }
    }

    fn position(&self, name: &str) -> Result<usize, TupleError> {
        self.schema.index_of(name).ok_or_else(|| {
            TupleError::InvalidField(format!(
                "Field '{}' not present in schema '{}'",
                name,
                self.schema.name()
            ))
        })
    }
}

fn check_conforms(
    field: &str,
    field_type: crate::types::FieldType,
    value: &Value,
) -> Result<(), TupleError> {
    if value.conforms_to(field_type) {
        Ok(())
    } else {
        Err(TupleError::TypeMismatch {
            field: field.to_string(),
            expected: field_type.to_string(),
            found: value.kind().to_string(),
        })
    }
}

/// Tab-separated values in schema order.
impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i != 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
