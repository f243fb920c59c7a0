//! Sort criteria: an ordered list of (field, direction, optional comparator).
//!
//! Grammar: `field1 [using comparatorId] (ASC|DESC), field2 ...`. The direction
//! and the `using` keyword are case-insensitive. `Display` renders the exact
//! inverse, so `parse(c.to_string()) == c`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TupleError;
use crate::sorting::registry::{ComparatorRef, ComparatorRegistry};

/// Sort direction of one element.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// Applies this direction to an ascending comparison result.
    #[inline]
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }
}

/// One field of a sort criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortElement {
    field_name: String,
    order: SortOrder,
    comparator: Option<ComparatorRef>,
}

impl SortElement {
    pub fn new(field_name: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field_name: field_name.into(),
            order,
            comparator: None,
        }
    }

    pub fn with_comparator(
        field_name: impl Into<String>,
        order: SortOrder,
        comparator: ComparatorRef,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            order,
            comparator: Some(comparator),
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn comparator(&self) -> Option<&ComparatorRef> {
        self.comparator.as_ref()
    }
}

impl fmt::Display for SortElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name)?;
        if let Some(comparator) = &self.comparator {
            write!(f, " using {}", comparator.id())?;
        }
        write!(f, " {}", self.order.abbreviation())
    }
}

/// An immutable, ordered list of `SortElement`s with unique field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriteria {
    elements: Vec<SortElement>,
}

impl SortCriteria {
    /// Builds a criteria, rejecting repeated field names and names or
    /// comparator identifiers that the textual grammar cannot carry.
    pub fn new(elements: Vec<SortElement>) -> Result<Self, TupleError> {
        for (i, element) in elements.iter().enumerate() {
            validate_token("field name", &element.field_name)?;
            if let Some(comparator) = &element.comparator {
                validate_token("comparator id", comparator.id())?;
            }
            if elements[..i]
                .iter()
                .any(|prev| prev.field_name == element.field_name)
            {
                return Err(TupleError::DuplicateSortField(element.field_name.clone()));
            }
        }
        Ok(Self { elements })
    }

    pub fn builder() -> SortCriteriaBuilder {
        SortCriteriaBuilder::default()
    }

    /// Parses the textual grammar, resolving comparator identifiers in `registry`.
    pub fn parse(text: &str, registry: &ComparatorRegistry) -> Result<Self, TupleError> {
        let mut elements = Vec::new();

        for token in text.split(',') {
            let parts: Vec<&str> = token.split_whitespace().collect();
            let element = match parts.as_slice() {
                [name, direction] => SortElement::new(*name, parse_direction(direction, text)?),
                [name, keyword, comparator_id, direction] if keyword.eq_ignore_ascii_case("using") => {
                    let comparator = registry.resolve(comparator_id)?;
                    SortElement::with_comparator(*name, parse_direction(direction, text)?, comparator)
                }
                _ => {
                    return Err(TupleError::InvalidSortCriteria(format!(
                        "Expected '<field> [using <comparator>] <ASC|DESC>' but got '{}' in '{}'",
                        token.trim(),
                        text
                    )))
                }
            };

            if elements
                .iter()
                .any(|prev: &SortElement| prev.field_name == element.field_name)
            {
                return Err(TupleError::DuplicateSortField(element.field_name));
            }
            elements.push(element);
        }

        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[SortElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.elements.iter().any(|e| e.field_name == field_name)
    }

    /// The field names, in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.field_name.as_str())
    }
}

/// A field name or comparator identifier must be one non-empty token with no
/// whitespace and no `,`.
pub(crate) fn validate_token(kind: &str, token: &str) -> Result<(), TupleError> {
    if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(TupleError::InvalidSortCriteria(format!(
            "Invalid {} '{}': expected a single token without whitespace or ','",
            kind, token
        )));
    }
    Ok(())
}

fn parse_direction(token: &str, text: &str) -> Result<SortOrder, TupleError> {
    SortOrder::parse(token).ok_or_else(|| {
        TupleError::InvalidSortCriteria(format!(
            "Invalid sort direction '{}' in '{}', expected ASC or DESC",
            token, text
        ))
    })
}

impl fmt::Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

/// Programmatic construction of a `SortCriteria`.
#[derive(Debug, Default)]
pub struct SortCriteriaBuilder {
    elements: Vec<SortElement>,
}

impl SortCriteriaBuilder {
    pub fn add(mut self, field_name: impl Into<String>, order: SortOrder) -> Self {
        self.elements.push(SortElement::new(field_name, order));
        self
    }

    pub fn add_using(
        mut self,
        field_name: impl Into<String>,
        order: SortOrder,
        comparator: ComparatorRef,
    ) -> Self {
        self.elements
            .push(SortElement::with_comparator(field_name, order, comparator));
        self
    }

    pub fn build(self) -> Result<SortCriteria, TupleError> {
        SortCriteria::new(self.elements)
    }
}
