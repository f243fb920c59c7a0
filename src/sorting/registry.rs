//! Custom field comparators and the registry that resolves them by identifier.
//!
//! A sort element written `field using <id> ASC` names a comparator in a
//! `ComparatorRegistry`. Identifiers are resolved once, when the criteria is
//! parsed, so a typo fails at setup rather than during a scan.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::TupleError;
use crate::sorting::criteria::validate_token;
use crate::types::{FieldType, Value};

/// A field-level ordering usable on both comparison paths.
///
/// `compare_bytes` receives the serialized payload of the field (raw bytes for
/// strings and bytes, the natural fixed or varint encoding otherwise) and must
/// agree in sign with `compare_values` on the decoded values.
pub trait FieldComparator: Send + Sync {
    /// Compares two decoded values. Must also order `Value::Null`.
    fn compare_values(&self, a: &Value, b: &Value) -> Ordering;

    /// Compares two serialized payloads.
    fn compare_bytes(&self, a: &[u8], b: &[u8]) -> Result<Ordering, TupleError>;

    /// Whether this comparator understands fields of `field_type`.
    fn supports(&self, field_type: FieldType) -> bool;
}

/// A resolved comparator together with the identifier it was registered under.
/// Two references are equal when their identifiers are.
#[derive(Clone)]
pub struct ComparatorRef {
    id: String,
    comparator: Arc<dyn FieldComparator>,
}

impl ComparatorRef {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn comparator(&self) -> &dyn FieldComparator {
        self.comparator.as_ref()
    }
}

impl PartialEq for ComparatorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComparatorRef {}

impl fmt::Debug for ComparatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComparatorRef").field(&self.id).finish()
    }
}

//==================================================================================
// 1. Registry
//==================================================================================

/// Identifier -> comparator lookup table.
#[derive(Clone)]
pub struct ComparatorRegistry {
    comparators: HashMap<String, Arc<dyn FieldComparator>>,
}

impl ComparatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            comparators: HashMap::new(),
        }
    }

    /// A registry holding the built-in comparators (`case_insensitive`, `shortlex`).
    pub fn with_builtins() -> Self {
        let mut comparators: HashMap<String, Arc<dyn FieldComparator>> = HashMap::new();
        comparators.insert(CaseInsensitiveComparator::ID.to_string(), Arc::new(CaseInsensitiveComparator));
        comparators.insert(ShortlexComparator::ID.to_string(), Arc::new(ShortlexComparator));
        Self { comparators }
    }

    /// Registers `comparator` under `id`, replacing any previous entry. The id
    /// must be a single token with no whitespace and no `,`.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        comparator: Arc<dyn FieldComparator>,
    ) -> Result<(), TupleError> {
        let id = id.into();
        validate_token("comparator id", &id)?;
        if self.comparators.insert(id.clone(), comparator).is_some() {
            log::warn!("Comparator '{}' was registered twice; keeping the latest", id);
        }
        Ok(())
    }

    /// Resolves `id`, failing with `TupleError::ComparatorNotFound`.
    pub fn resolve(&self, id: &str) -> Result<ComparatorRef, TupleError> {
        self.comparators
            .get(id)
            .map(|comparator| ComparatorRef {
                id: id.to_string(),
                comparator: Arc::clone(comparator),
            })
            .ok_or_else(|| TupleError::ComparatorNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.comparators.contains_key(id)
    }
}

impl Default for ComparatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

//==================================================================================
// 2. Built-in Comparators
//==================================================================================

/// Orders nulls first, then delegates to `cmp` on the raw bytes of string or
/// bytes values.
fn compare_binary_values(
    a: &Value,
    b: &Value,
    cmp: impl Fn(&[u8], &[u8]) -> Ordering,
) -> Ordering {
    match (a.as_bytes(), b.as_bytes()) {
        (Some(x), Some(y)) => cmp(x, y),
        _ => a.natural_cmp(b),
    }
}

fn case_insensitive_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

fn shortlex_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// ASCII case-insensitive ordering of strings and bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveComparator;

impl CaseInsensitiveComparator {
    pub const ID: &'static str = "case_insensitive";
}

impl FieldComparator for CaseInsensitiveComparator {
    fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        compare_binary_values(a, b, case_insensitive_cmp)
    }

    fn compare_bytes(&self, a: &[u8], b: &[u8]) -> Result<Ordering, TupleError> {
        Ok(case_insensitive_cmp(a, b))
    }

    fn supports(&self, field_type: FieldType) -> bool {
        field_type.is_binary()
    }
}

/// Shorter strings first, ties broken byte-lexicographically.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortlexComparator;

impl ShortlexComparator {
    pub const ID: &'static str = "shortlex";
}

impl FieldComparator for ShortlexComparator {
    fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        compare_binary_values(a, b, shortlex_cmp)
    }

    fn compare_bytes(&self, a: &[u8], b: &[u8]) -> Result<Ordering, TupleError> {
        Ok(shortlex_cmp(a, b))
    }

    fn supports(&self, field_type: FieldType) -> bool {
        field_type.is_binary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtins() {
        let registry = ComparatorRegistry::with_builtins();
        let cmp = registry.resolve("case_insensitive").unwrap();
        assert_eq!(cmp.id(), "case_insensitive");
        assert!(registry.contains("shortlex"));
    }

    #[test]
    fn test_unknown_comparator() {
        let registry = ComparatorRegistry::new();
        let err = registry.resolve("com.example.Missing").unwrap_err();
        assert!(matches!(err, TupleError::ComparatorNotFound(id) if id == "com.example.Missing"));
    }

    #[test]
    fn test_case_insensitive_paths_agree() {
        let cmp = CaseInsensitiveComparator;
        let pairs = [("Apple", "apple"), ("apple", "Banana"), ("b", "A"), ("", "a")];
        for (a, b) in pairs {
            let by_value = cmp.compare_values(&Value::from(a), &Value::from(b));
            let by_bytes = cmp.compare_bytes(a.as_bytes(), b.as_bytes()).unwrap();
            assert_eq!(by_value, by_bytes, "{} vs {}", a, b);
        }
        assert_eq!(
            cmp.compare_values(&Value::from("Apple"), &Value::from("apple")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_shortlex_orders_by_length_first() {
        let cmp = ShortlexComparator;
        assert_eq!(cmp.compare_bytes(b"zz", b"aaa").unwrap(), Ordering::Less);
        assert_eq!(cmp.compare_bytes(b"ab", b"aa").unwrap(), Ordering::Greater);
        assert_eq!(
            cmp.compare_values(&Value::Null, &Value::from("a")),
            Ordering::Less
        );
    }

    #[test]
    fn test_register_rejects_multi_word_ids() {
        let mut registry = ComparatorRegistry::new();
        for id in ["", "case folded", "a,b"] {
            let err = registry.register(id, Arc::new(ShortlexComparator)).unwrap_err();
            assert!(matches!(err, TupleError::InvalidSortCriteria(_)), "'{}'", id);
        }
        registry.register("length_first", Arc::new(ShortlexComparator)).unwrap();
        let reg_ref = registry.resolve("length_first").unwrap();
        assert_eq!(reg_ref.id(), "length_first");
    }

    #[test]
    fn test_comparator_refs_compare_by_id() {
        let registry = ComparatorRegistry::with_builtins();
        let a = registry.resolve("shortlex").unwrap();
        let b = registry.resolve("shortlex").unwrap();
        let c = registry.resolve("case_insensitive").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
