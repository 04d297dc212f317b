//! Common types and traits shared across all statement builders

use crate::entity::{Field, FieldRef};
use crate::naming::Naming;
use crate::{Result, Value};

/// Core trait for all statement builders
pub trait QueryBuilder {
    /// Generate the SQL text
    fn to_sql(&self) -> Result<String>;

    /// Parameters in placeholder order
    fn parameters(&self) -> Vec<Value>;

    /// SQL text and parameters together
    fn build(&self) -> Result<Statement> {
        Ok(Statement {
            sql: self.to_sql()?,
            params: self.parameters(),
        })
    }
}

/// A finished statement: SQL text plus its flattened parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Aggregation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "count"),
            AggregateFunction::Sum => write!(f, "sum"),
            AggregateFunction::Avg => write!(f, "avg"),
            AggregateFunction::Min => write!(f, "min"),
            AggregateFunction::Max => write!(f, "max"),
        }
    }
}

/// A column as written by the caller, rendered once a naming convention is known
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRef {
    /// Raw column name, used verbatim
    Name(String),
    /// Entity field, mapped through the naming convention
    Field(FieldRef),
    /// `count(*)`
    CountAll,
    /// Aggregate over a column
    Aggregate(AggregateFunction, Box<ColumnRef>),
}

impl ColumnRef {
    pub fn render(&self, naming: &Naming) -> String {
        match self {
            ColumnRef::Name(name) => name.clone(),
            ColumnRef::Field(field) => field.column_name(naming),
            ColumnRef::CountAll => "count(*)".to_string(),
            ColumnRef::Aggregate(function, column) => {
                format!("{}({})", function, column.render(naming))
            }
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}

impl<E, V> From<Field<E, V>> for ColumnRef {
    fn from(field: Field<E, V>) -> Self {
        ColumnRef::Field(field.field_ref())
    }
}

/// `count(*)`
pub fn count() -> ColumnRef {
    ColumnRef::CountAll
}

/// `count(<column>)`
pub fn count_of(column: impl Into<ColumnRef>) -> ColumnRef {
    ColumnRef::Aggregate(AggregateFunction::Count, Box::new(column.into()))
}

/// `sum(<column>)`
pub fn sum(column: impl Into<ColumnRef>) -> ColumnRef {
    ColumnRef::Aggregate(AggregateFunction::Sum, Box::new(column.into()))
}

/// `avg(<column>)`
pub fn avg(column: impl Into<ColumnRef>) -> ColumnRef {
    ColumnRef::Aggregate(AggregateFunction::Avg, Box::new(column.into()))
}

/// `min(<column>)`
pub fn min(column: impl Into<ColumnRef>) -> ColumnRef {
    ColumnRef::Aggregate(AggregateFunction::Min, Box::new(column.into()))
}

/// `max(<column>)`
pub fn max(column: impl Into<ColumnRef>) -> ColumnRef {
    ColumnRef::Aggregate(AggregateFunction::Max, Box::new(column.into()))
}

/// Trait to convert various types into column lists
pub trait IntoColumns {
    fn into_columns(self) -> Vec<ColumnRef>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<ColumnRef> {
        vec![self.into()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<ColumnRef> {
        vec![self.into()]
    }
}

impl IntoColumns for ColumnRef {
    fn into_columns(self) -> Vec<ColumnRef> {
        vec![self]
    }
}

impl<E, V> IntoColumns for Field<E, V> {
    fn into_columns(self) -> Vec<ColumnRef> {
        vec![self.into()]
    }
}

impl<C: Into<ColumnRef>> IntoColumns for Vec<C> {
    fn into_columns(self) -> Vec<ColumnRef> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<C: Into<ColumnRef>, const N: usize> IntoColumns for [C; N] {
    fn into_columns(self) -> Vec<ColumnRef> {
        self.into_iter().map(Into::into).collect()
    }
}

macro_rules! tuple_columns {
    ($($name:ident),+) => {
        impl<$($name: Into<ColumnRef>),+> IntoColumns for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_columns(self) -> Vec<ColumnRef> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

tuple_columns!(A, B);
tuple_columns!(A, B, C);
tuple_columns!(A, B, C, D);
tuple_columns!(A, B, C, D, E);
tuple_columns!(A, B, C, D, E, F);
tuple_columns!(A, B, C, D, E, F, G);
tuple_columns!(A, B, C, D, E, F, G, H);

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub column: ColumnRef,
    pub direction: SortDirection,
}
