//! Domain models for the collection import/export pipeline.

pub mod collection;
pub mod results;

pub use collection::{
    CollectionRow, CollectionRule, CollectionType, RuleColumn, RuleRelation, SortOrder,
};
pub use results::{ImportReport, RowResult, RowStatus};
