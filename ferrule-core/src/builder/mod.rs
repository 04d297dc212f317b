//! Statement builders

pub mod common;
pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use common::{
    avg, count, count_of, max, min, sum, AggregateFunction, ColumnRef, IntoColumns, OrderByClause,
    QueryBuilder, SortDirection, Statement,
};
pub use delete::{DeleteBuilderComplete, DeleteBuilderInitial};
pub use insert::{BatchOptions, InsertBuilder};
pub use select::SelectBuilder;
pub use update::{UpdateBuilder, UpdateOptions};
