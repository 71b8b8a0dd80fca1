//! Read-model pipelines
//!
//! A [`Pipeline`] is an ordered list of typed stages that turns documents
//! from one collection into denormalized read models: filter, join related
//! collections, derive computed fields, project and sort. Pipelines are plain
//! values built with a small builder API and run by [`execute`] against any
//! [`crate::store::DocumentStore`].
//!
//! ```rust
//! use common::pipeline::{Expr, Join, Pipeline, SortDirection};
//! use common::store::Filter;
//!
//! let likes = Pipeline::new()
//!     .filter(Filter::eq("likedBy", "user-id"))
//!     .join(Join::new("videos", "video", "_id", "video"))
//!     .derive("video", Expr::First("video".into()))
//!     .sort("createdAt", SortDirection::Descending);
//! assert_eq!(likes.stages().len(), 4);
//! ```

use serde_json::Value;

use crate::store::Filter;

mod exec;
mod page;

pub use exec::{execute, execute_paged};
pub use page::{DEFAULT_LIMIT, MAX_LIMIT, Page, PageRequest};

/// Sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `"asc"` (any case) is ascending, anything else descending
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }
}

/// Computed value written by [`Stage::Derive`]
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Length of the array at path (0 when missing)
    Size(String),
    /// Whether `value` occurs among the values at path
    Contains { path: String, value: Value },
    /// Sum of the numeric values at path
    Sum(String),
    /// First element of the array at path, `null` when empty
    First(String),
    /// Last element of the array at path, `null` when empty
    Last(String),
    /// RFC 3339 timestamp at path split into calendar parts
    DateParts(String),
    Literal(Value),
}

impl Expr {
    pub fn contains(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Contains {
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Left join against another collection
///
/// Every document gets `as_field` set to the array of foreign documents whose
/// `foreign_field` matches a value of `local_field`. When the local field is
/// an array of ids the joined documents follow that array's order.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
    /// Shapes each joined document
    pub pipeline: Pipeline,
}

impl Join {
    pub fn new(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        Self {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
            pipeline: Pipeline::new(),
        }
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }
}

/// Field selection
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub fields: Vec<String>,
    pub exclude_id: bool,
}

impl Projection {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            exclude_id: false,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.exclude_id = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Search { fields: Vec<String>, query: String },
    Match(Filter),
    Join(Join),
    /// One output document per element of the array at the path
    Unwind(String),
    Derive { field: String, expr: Expr },
    Project(Projection),
    Sort { field: String, direction: SortDirection },
}

/// Ordered list of stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Case-insensitive search, always placed ahead of every other stage
    pub fn search(mut self, fields: &[&str], query: impl Into<String>) -> Self {
        self.stages.insert(
            0,
            Stage::Search {
                fields: fields.iter().map(|f| f.to_string()).collect(),
                query: query.into(),
            },
        );
        self
    }

    pub fn filter(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn join(self, join: Join) -> Self {
        self.stage(Stage::Join(join))
    }

    pub fn unwind(self, field: &str) -> Self {
        self.stage(Stage::Unwind(field.to_string()))
    }

    pub fn derive(self, field: &str, expr: Expr) -> Self {
        self.stage(Stage::Derive {
            field: field.to_string(),
            expr,
        })
    }

    pub fn project(self, projection: Projection) -> Self {
        self.stage(Stage::Project(projection))
    }

    pub fn sort(self, field: &str, direction: SortDirection) -> Self {
        self.stage(Stage::Sort {
            field: field.to_string(),
            direction,
        })
    }

    /// Append every stage of `other`
    pub fn then(mut self, other: Pipeline) -> Self {
        self.stages.extend(other.stages);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_is_placed_first() {
        let pipeline = Pipeline::new()
            .filter(Filter::eq("isPublished", true))
            .search(&["title"], "rust");
        assert!(matches!(pipeline.stages()[0], Stage::Search { .. }));
        assert!(matches!(pipeline.stages()[1], Stage::Match(_)));
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!(SortDirection::parse("asc"), SortDirection::Ascending);
        assert_eq!(SortDirection::parse("ASC"), SortDirection::Ascending);
        assert_eq!(SortDirection::parse("desc"), SortDirection::Descending);
        assert_eq!(SortDirection::parse("sideways"), SortDirection::Descending);
    }
}
