// In: src/config.rs

//! Declarative configuration of a sort-and-group job.
//!
//! A `JobConfig` is read once at the application boundary (typically from a
//! JSON file), compiled against a `ComparatorRegistry`, and from then on only
//! the validated `SortPlan` and `RollupGrouper` are shared, behind an `Arc`.
//! Every configuration error surfaces from `compile`, before any tuple is read.
//!
//! ```json
//! {
//!   "sources": [
//!     { "id": 0, "name": "users",  "fields": "#source#:vint,user:string,age:vint" },
//!     { "id": 1, "name": "clicks", "fields": "#source#:vint,user:string,url:string" }
//!   ],
//!   "sort_by": "user asc, #source# asc",
//!   "specific_sort_by": { "0": "age desc" },
//!   "group_by": ["user"]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TupleError;
use crate::grouping::RollupGrouper;
use crate::schema::Schema;
use crate::serialization::TupleSerializer;
use crate::sorting::{ComparatorRegistry, SortCriteria, SortPlan, TupleComparator, DEFAULT_SOURCE_ID};

//==================================================================================
// I. Configuration Structs
//==================================================================================

/// One input source: a schema and the discriminator value it is known by.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// The `#source#` value of this source's tuples.
    #[serde(default = "default_source_id")]
    pub id: i32,

    /// Schema name, unique within the job.
    pub name: String,

    /// Fields in `name:type,name:type` form.
    pub fields: String,
}

/// The whole job, as written by the user.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct JobConfig {
    pub sources: Vec<SourceConfig>,

    /// The common sort criteria, e.g. `"country asc, age desc"`.
    pub sort_by: String,

    /// Extra sort criteria per source id, applied after the common fields tie.
    #[serde(default)]
    pub specific_sort_by: BTreeMap<i32, String>,

    /// Group-by fields; a prefix of the fields in `sort_by`.
    #[serde(default)]
    pub group_by: Vec<String>,

    /// Shallowest group-by field to report. Defaults to the first one.
    #[serde(default)]
    pub rollup_from: Option<String>,
}

fn default_source_id() -> i32 {
    DEFAULT_SOURCE_ID
}

//==================================================================================
// II. Loading & Compilation
//==================================================================================

/// The validated result of `JobConfig::compile`.
#[derive(Debug, Clone)]
pub struct CompiledJob {
    pub plan: Arc<SortPlan>,
    pub grouper: RollupGrouper,
}

impl CompiledJob {
    pub fn comparator(&self) -> TupleComparator {
        TupleComparator::new(Arc::clone(&self.plan))
    }

    pub fn serializer(&self) -> TupleSerializer {
        TupleSerializer::new(Arc::clone(&self.plan))
    }

    /// The compiled schema registered under `name`.
    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.plan
            .sources()
            .map(|layout| layout.schema())
            .find(|schema| schema.name() == name)
    }
}

impl JobConfig {
    pub fn from_json_str(json: &str) -> Result<Self, TupleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TupleError> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded job configuration from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    /// Parses schemas and criteria and validates them together.
    pub fn compile(&self, registry: &ComparatorRegistry) -> Result<CompiledJob, TupleError> {
        if self.sort_by.trim().is_empty() {
            return Err(TupleError::InvalidConfig("'sort_by' is empty".to_string()));
        }

        let mut builder = SortPlan::builder()
            .common_criteria(SortCriteria::parse(&self.sort_by, registry)?);
        for source in &self.sources {
            let schema = Schema::parse(&source.name, &source.fields)?;
            builder = builder.add_source(source.id, Arc::new(schema));
        }
        for (id, text) in &self.specific_sort_by {
            builder = builder.specific_criteria(*id, SortCriteria::parse(text, registry)?);
        }
        let plan = Arc::new(builder.build()?);

        let grouper = RollupGrouper::new(
            Arc::clone(&plan),
            self.group_by.clone(),
            self.rollup_from.as_deref(),
        )?;
        Ok(CompiledJob { plan, grouper })
    }
}
