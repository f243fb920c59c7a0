//! Schemas: the named, ordered field lists describing a tuple's shape.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::TupleError;
use crate::types::FieldType;

/// Reserved name of the source discriminator field. Tuples from different
/// schemas sharing one stream carry their source id here.
pub const SOURCE_ID_FIELD: &str = "#source#";

/// One named, typed field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// The source discriminator field, always a `VarInt32`.
    pub fn source_id() -> Self {
        Self::new(SOURCE_ID_FIELD, FieldType::VarInt32)
    }

    pub fn is_source_id(&self) -> bool {
        self.name == SOURCE_ID_FIELD
    }
}

/// An immutable, ordered field list.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema, rejecting duplicate field names and a mistyped
    /// discriminator field.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self, TupleError> {
        let name = name.into();
        if fields.is_empty() {
            return Err(TupleError::InvalidSchema(format!(
                "Schema '{}' has no fields",
                name
            )));
        }

        let mut index = HashMap::with_capacity(fields.len());
        for (pos, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(TupleError::InvalidSchema(format!(
                    "Schema '{}' has an unnamed field at position {}",
                    name, pos
                )));
            }
            if field.is_source_id() && field.field_type != FieldType::VarInt32 {
                return Err(TupleError::InvalidSchema(format!(
                    "Field '{}' must be of type VarInt32, got {}",
                    SOURCE_ID_FIELD, field.field_type
                )));
            }
            if index.insert(field.name.clone(), pos).is_some() {
                return Err(TupleError::InvalidSchema(format!(
                    "Schema '{}' repeats field '{}'",
                    name, field.name
                )));
            }
        }

        Ok(Self {
            name,
            fields,
            index,
        })
    }

    /// Parses `name:type,name:type,...`, e.g. `country:string,age:vint`.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, TupleError> {
        let mut fields = Vec::new();
        for token in text.split(',') {
            let token = token.trim();
            let (field_name, type_name) = token.split_once(':').ok_or_else(|| {
                TupleError::InvalidSchema(format!(
                    "Expected 'name:type' but got '{}' in '{}'",
                    token, text
                ))
            })?;
            fields.push(Field::new(
                field_name.trim(),
                FieldType::from_type_name(type_name)?,
            ));
        }
        Self::new(name, fields)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn field(&self, pos: usize) -> Option<&Field> {
        self.fields.get(pos)
    }

    /// The field called `name`, or `TupleError::InvalidField`.
    pub fn field_by_name(&self, name: &str) -> Result<&Field, TupleError> {
        self.index_of(name)
            .map(|pos| &self.fields[pos])
            .ok_or_else(|| {
                TupleError::InvalidField(format!(
                    "Field '{}' not present in schema '{}'",
                    name, self.name
                ))
            })
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for Schema {}

/// Renders the `Schema::parse` format.
impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", field.name, field.field_type.type_name())?;
        }
        Ok(())
    }
}
