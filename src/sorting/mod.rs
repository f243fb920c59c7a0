//! Sorting: criteria, comparator registry, the validated `SortPlan`, and the
//! `TupleComparator` that orders tuples in object form or serialized form.

pub mod comparator;
pub mod criteria;
pub mod plan;
pub mod registry;


pub use comparator::TupleComparator;
pub use criteria::{SortCriteria, SortCriteriaBuilder, SortElement, SortOrder};
pub use plan::{SortPlan, SortPlanBuilder, SourceLayout, DEFAULT_SOURCE_ID};
pub use registry::{
    CaseInsensitiveComparator, ComparatorRef, ComparatorRegistry, FieldComparator,
    ShortlexComparator,
};
