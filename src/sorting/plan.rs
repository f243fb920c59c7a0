//! The validated, read-only sort configuration shared by the comparator, the
//! serializer and the grouping engine.
//!
//! A `SortPlan` binds one or more source schemas (keyed by their discriminator
//! value) to a *common* criteria and optional per-source *specific* criteria.
//! All cross-checks happen in `SortPlanBuilder::build`, so a plan that exists
//! is consistent and nothing needs to be validated per comparison.
//!
//! Each source also gets an *ordered layout*: the order its fields are
//! serialized in. Common sort fields come first, then the source's specific
//! sort fields, then every remaining field in declaration order. Both binary
//! paths (serializer and comparator) walk this layout.

use std::collections::BTreeMap;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::TupleError;
use crate::schema::{Field, Schema, SOURCE_ID_FIELD};
use crate::sorting::criteria::SortCriteria;
use crate::tuple::Tuple;

/// Source id used by `SortPlan::single`.
pub const DEFAULT_SOURCE_ID: i32 = 0;

/// Everything the plan knows about one source.
#[derive(Debug, Clone)]
pub struct SourceLayout {
    source_id: i32,
    schema: Arc<Schema>,
    specific: Option<SortCriteria>,
    specific_fields: Vec<Field>,
    ordered_positions: Vec<usize>,
}

impl SourceLayout {
    pub fn source_id(&self) -> i32 {
        self.source_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The specific criteria registered for this source, if any.
    pub fn specific(&self) -> Option<&SortCriteria> {
        self.specific.as_ref()
    }

    /// Typed fields of the specific criteria, in criteria order.
    pub fn specific_fields(&self) -> &[Field] {
        &self.specific_fields
    }

    /// Schema positions in serialized order.
    pub fn ordered_positions(&self) -> &[usize] {
        &self.ordered_positions
    }
}

/// A validated multi-source sort configuration.
#[derive(Debug, Clone)]
pub struct SortPlan {
    common: SortCriteria,
    common_fields: Vec<Field>,
    source_field_index: Option<usize>,
    sources: BTreeMap<i32, SourceLayout>,
    by_schema_name: HashMap<String, i32>,
}

impl SortPlan {
    pub fn builder() -> SortPlanBuilder {
        SortPlanBuilder::default()
    }

    /// A plan with one source (id `DEFAULT_SOURCE_ID`) and no specific criteria.
    pub fn single(schema: Arc<Schema>, criteria: SortCriteria) -> Result<Self, TupleError> {
        Self::builder()
            .add_source(DEFAULT_SOURCE_ID, schema)
            .common_criteria(criteria)
            .build()
    }

    /// The criteria shared by every source.
    pub fn common(&self) -> &SortCriteria {
        &self.common
    }

    /// Typed fields of the common criteria, in criteria order.
    pub fn common_fields(&self) -> &[Field] {
        &self.common_fields
    }

    /// Position of `#source#` within the common criteria.
    pub fn source_field_index(&self) -> Option<usize> {
        self.source_field_index
    }

    pub fn is_multi_source(&self) -> bool {
        self.sources.len() > 1
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn source(&self, source_id: i32) -> Option<&SourceLayout> {
        self.sources.get(&source_id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceLayout> {
        self.sources.values()
    }

    /// The only source of a single-source plan.
    pub fn sole_source(&self) -> Option<&SourceLayout> {
        if self.sources.len() == 1 {
            self.sources.values().next()
        } else {
            None
        }
    }

    /// The source a tuple belongs to, found through its schema.
    pub fn source_of(&self, tuple: &Tuple) -> Result<&SourceLayout, TupleError> {
        let schema = tuple.schema();
        let layout = self
            .by_schema_name
            .get(schema.name())
            .and_then(|id| self.sources.get(id))
            .filter(|layout| layout.schema.as_ref() == schema.as_ref())
            .ok_or_else(|| {
                TupleError::InvalidField(format!(
                    "Schema '{}' is not registered in this sort plan",
                    schema.name()
                ))
            })?;

        if let Some(id) = tuple.source_id() {
            if id != layout.source_id {
                return Err(TupleError::InvalidField(format!(
                    "Tuple of schema '{}' carries {}={} but the schema is registered as source {}",
                    schema.name(),
                    SOURCE_ID_FIELD,
                    id,
                    layout.source_id
                )));
            }
        }
        Ok(layout)
    }
}

/// Collects sources and criteria, then validates them together.
#[derive(Debug, Default)]
pub struct SortPlanBuilder {
    sources: Vec<(i32, Arc<Schema>)>,
    common: Option<SortCriteria>,
    specific: Vec<(i32, SortCriteria)>,
}

impl SortPlanBuilder {
    pub fn add_source(mut self, source_id: i32, schema: Arc<Schema>) -> Self {
        self.sources.push((source_id, schema));
        self
    }

    pub fn common_criteria(mut self, criteria: SortCriteria) -> Self {
        self.common = Some(criteria);
        self
    }

    pub fn specific_criteria(mut self, source_id: i32, criteria: SortCriteria) -> Self {
        self.specific.push((source_id, criteria));
        self
    }

    pub fn build(self) -> Result<SortPlan, TupleError> {
        let common = self
            .common
            .ok_or_else(|| TupleError::InvalidConfig("A common sort criteria is required".to_string()))?;
        if common.is_empty() {
            return Err(TupleError::InvalidConfig(
                "The common sort criteria has no fields".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(TupleError::InvalidConfig(
                "At least one source schema is required".to_string(),
            ));
        }

        // --- 1. Sources: unique ids and schema names ---
        let mut by_schema_name = HashMap::new();
        let mut schemas = BTreeMap::new();
        for (id, schema) in self.sources {
            if by_schema_name.insert(schema.name().to_string(), id).is_some() {
                return Err(TupleError::InvalidConfig(format!(
                    "Schema name '{}' is registered twice",
                    schema.name()
                )));
            }
            if schemas.insert(id, schema).is_some() {
                return Err(TupleError::InvalidConfig(format!(
                    "Source id {} is registered twice",
                    id
                )));
            }
        }
        let multi_source = schemas.len() > 1;

        // --- 2. Common fields: present everywhere with one type ---
        let common_fields = resolve_common_fields(&common, &schemas)?;
        let source_field_index = common.field_names().position(|name| name == SOURCE_ID_FIELD);
        if multi_source && source_field_index.is_none() {
            return Err(TupleError::InvalidConfig(format!(
                "Several sources share this plan, so '{}' must be one of the common sort fields",
                SOURCE_ID_FIELD
            )));
        }

        // --- 3. Specific criteria: one per known source, on its own fields ---
        let mut specific_by_source: BTreeMap<i32, SortCriteria> = BTreeMap::new();
        for (id, criteria) in self.specific {
            if !schemas.contains_key(&id) {
                return Err(TupleError::InvalidConfig(format!(
                    "Specific sort criteria given for unknown source {}",
                    id
                )));
            }
            if specific_by_source.insert(id, criteria).is_some() {
                return Err(TupleError::InvalidConfig(format!(
                    "Specific sort criteria given twice for source {}",
                    id
                )));
            }
        }
        if !multi_source && !specific_by_source.is_empty() {
            log::warn!("Specific sort criteria on a single-source plan never break ties and are ignored");
        }

        // --- 4. Layouts ---
        let mut sources = BTreeMap::new();
        for (id, schema) in schemas {
            let specific = specific_by_source.remove(&id);
            let specific_fields = match &specific {
                Some(criteria) => resolve_specific_fields(criteria, &common, &schema)?,
                None => Vec::new(),
            };
            let ordered_positions = ordered_positions(&schema, &common, specific.as_ref());
            log::debug!(
                "Source {} ('{}'): ordered layout {:?}",
                id,
                schema.name(),
                ordered_positions
                    .iter()
                    .map(|&pos| schema.fields()[pos].name.as_str())
                    .collect::<Vec<_>>()
            );
            sources.insert(
                id,
                SourceLayout {
                    source_id: id,
                    schema,
                    specific,
                    specific_fields,
                    ordered_positions,
                },
            );
        }

        log::info!(
            "Built sort plan: {} source(s), common criteria '{}'",
            sources.len(),
            common
        );

        Ok(SortPlan {
            common,
            common_fields,
            source_field_index,
            sources,
            by_schema_name,
        })
    }
}

fn resolve_common_fields(
    common: &SortCriteria,
    schemas: &BTreeMap<i32, Arc<Schema>>,
) -> Result<Vec<Field>, TupleError> {
    let mut fields = Vec::with_capacity(common.len());
    for element in common.elements() {
        let mut resolved: Option<&Field> = None;
        for schema in schemas.values() {
            let field = schema.field_by_name(element.field_name()).map_err(|_| {
                TupleError::InvalidConfig(format!(
                    "Common sort field '{}' is missing from schema '{}'",
                    element.field_name(),
                    schema.name()
                ))
            })?;
            match resolved {
                Some(first) if first.field_type != field.field_type => {
                    return Err(TupleError::InvalidConfig(format!(
                        "Common sort field '{}' has type {} in one schema and {} in '{}'",
                        field.name,
                        first.field_type,
                        field.field_type,
                        schema.name()
                    )));
                }
                Some(_) => {}
                None => resolved = Some(field),
            }
        }
        let field = resolved
            .cloned()
            .ok_or_else(|| TupleError::InternalError("Plan has no schemas".to_string()))?;

        if let Some(comparator) = element.comparator() {
            if field.is_source_id() {
                return Err(TupleError::UnsupportedComparator {
                    comparator: comparator.id().to_string(),
                    field: field.name.clone(),
                    reason: "the source discriminator always uses its natural order".to_string(),
                });
            }
            if !comparator.comparator().supports(field.field_type) {
                return Err(TupleError::UnsupportedComparator {
                    comparator: comparator.id().to_string(),
                    field: field.name.clone(),
                    reason: format!("fields of type {} are not supported", field.field_type),
                });
            }
        }
        fields.push(field);
    }
    Ok(fields)
}

fn resolve_specific_fields(
    specific: &SortCriteria,
    common: &SortCriteria,
    schema: &Schema,
) -> Result<Vec<Field>, TupleError> {
    let mut fields = Vec::with_capacity(specific.len());
    for element in specific.elements() {
        if common.contains(element.field_name()) {
            return Err(TupleError::InvalidConfig(format!(
                "Field '{}' is already a common sort field and cannot be repeated in the specific criteria of '{}'",
                element.field_name(),
                schema.name()
            )));
        }
        // Custom comparators are only honored on common fields.
        if let Some(comparator) = element.comparator() {
            return Err(TupleError::UnsupportedComparator {
                comparator: comparator.id().to_string(),
                field: element.field_name().to_string(),
                reason: "custom comparators are only supported on common sort fields".to_string(),
            });
        }
        let field = schema.field_by_name(element.field_name()).map_err(|_| {
            TupleError::InvalidConfig(format!(
                "Specific sort field '{}' is missing from schema '{}'",
                element.field_name(),
                schema.name()
            ))
        })?;
        fields.push(field.clone());
    }
    Ok(fields)
}

fn ordered_positions(
    schema: &Schema,
    common: &SortCriteria,
    specific: Option<&SortCriteria>,
) -> Vec<usize> {
    let mut positions: Vec<usize> = common
        .field_names()
        .chain(specific.into_iter().flat_map(|c| c.field_names()))
        .filter_map(|name| schema.index_of(name))
        .collect();
    for pos in 0..schema.len() {
        if !positions.contains(&pos) {
            positions.push(pos);
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorting::registry::ComparatorRegistry;
    use crate::types::FieldType;

    fn criteria(text: &str) -> SortCriteria {
        SortCriteria::parse(text, &ComparatorRegistry::with_builtins()).unwrap()
    }

    fn users() -> Arc<Schema> {
        Arc::new(Schema::parse("users", "#source#:vint,user:string,age:vint,name:string").unwrap())
    }

    fn clicks() -> Arc<Schema> {
        Arc::new(Schema::parse("clicks", "url:string,#source#:vint,user:string,ts:long").unwrap())
    }

    #[test]
    fn test_single_source_layout() {
        let schema = Arc::new(Schema::parse("s", "a:int,b:string,c:long").unwrap());
        let plan = SortPlan::single(schema, criteria("c desc, a asc")).unwrap();
        let layout = plan.sole_source().unwrap();
        assert_eq!(layout.ordered_positions(), &[2, 0, 1]);
        assert_eq!(plan.common_fields()[0].field_type, FieldType::Int64);
        assert!(!plan.is_multi_source());
    }

    #[test]
    fn test_multi_source_layouts() {
        let plan = SortPlan::builder()
            .add_source(0, users())
            .add_source(1, clicks())
            .common_criteria(criteria("user asc, #source# asc"))
            .specific_criteria(0, criteria("age desc"))
            .specific_criteria(1, criteria("ts asc"))
            .build()
            .unwrap();

        assert_eq!(plan.source_field_index(), Some(1));
        let users_layout = plan.source(0).unwrap();
        assert_eq!(users_layout.ordered_positions(), &[1, 0, 2, 3]);
        assert_eq!(users_layout.specific_fields()[0].name, "age");
        let clicks_layout = plan.source(1).unwrap();
        assert_eq!(clicks_layout.ordered_positions(), &[2, 1, 3, 0]);
    }

    #[test]
    fn test_multi_source_requires_discriminator() {
        let err = SortPlan::builder()
            .add_source(0, users())
            .add_source(1, clicks())
            .common_criteria(criteria("user asc"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TupleError::InvalidConfig(msg) if msg.contains("#source#")));
    }

    #[test]
    fn test_common_field_must_exist_everywhere() {
        let err = SortPlan::builder()
            .add_source(0, users())
            .add_source(1, clicks())
            .common_criteria(criteria("user asc, #source# asc, age asc"))
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_common_field_types_must_agree() {
        let a = Arc::new(Schema::parse("a", "#source#:vint,k:int").unwrap());
        let b = Arc::new(Schema::parse("b", "#source#:vint,k:long").unwrap());
        let err = SortPlan::builder()
            .add_source(0, a)
            .add_source(1, b)
            .common_criteria(criteria("k asc, #source# asc"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TupleError::InvalidConfig(msg) if msg.contains("type")));
    }

    #[test]
    fn test_specific_criteria_rules() {
        // Comparator on a specific field.
        let err = SortPlan::builder()
            .add_source(0, users())
            .add_source(1, clicks())
            .common_criteria(criteria("user asc, #source# asc"))
            .specific_criteria(0, criteria("name using case_insensitive asc"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TupleError::UnsupportedComparator { .. }));

        // Unknown source.
        let err = SortPlan::builder()
            .add_source(0, users())
            .add_source(1, clicks())
            .common_criteria(criteria("user asc, #source# asc"))
            .specific_criteria(7, criteria("ts asc"))
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());

        // Repeats a common field.
        let err = SortPlan::builder()
            .add_source(0, users())
            .add_source(1, clicks())
            .common_criteria(criteria("user asc, #source# asc"))
            .specific_criteria(0, criteria("user desc"))
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_comparator_type_support_checked() {
        let schema = Arc::new(Schema::parse("s", "n:int").unwrap());
        let err = SortPlan::single(schema, criteria("n using shortlex asc")).unwrap_err();
        assert!(matches!(err, TupleError::UnsupportedComparator { ref field, .. } if field == "n"));
    }

    #[test]
    fn test_duplicate_registrations() {
        let err = SortPlan::builder()
            .add_source(0, users())
            .add_source(0, clicks())
            .common_criteria(criteria("user asc, #source# asc"))
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_source_of_checks_discriminator_value() {
        let plan = SortPlan::builder()
            .add_source(0, users())
            .add_source(1, clicks())
            .common_criteria(criteria("user asc, #source# asc"))
            .build()
            .unwrap();
        let good = Tuple::new(users()).with("#source#", 0).unwrap();
        assert_eq!(plan.source_of(&good).unwrap().source_id(), 0);

        let bad = Tuple::new(users()).with("#source#", 1).unwrap();
        assert!(plan.source_of(&bad).is_err());

        let stranger = Tuple::new(Arc::new(Schema::parse("x", "user:string").unwrap()));
        assert!(plan.source_of(&stranger).is_err());
    }
}
