//! Condition expression trees for WHERE and HAVING clauses.
//!
//! Leaves come from the [`Predicate`] methods on [`Field`]s and raw [`col`]umns;
//! nodes combine with [`Condition::and`], [`Condition::or`] and
//! [`Condition::not`]. A node's parameters are produced in exactly the order
//! its placeholders appear in the rendered SQL.
//!
//! Chains render left to right without added parentheses, so
//! `a.and(b.or(c))` is `a and b or c`. Wrap a sub-expression in [`group`]
//! (or use [`Condition::and_group`] / [`Condition::or_group`]) to keep it
//! together:
//!
//! ```
//! use ferrule_core::condition::{col, group, Predicate};
//!
//! let cond = col("age").gt(18).and(group(col("name").like("A%").or(col("vip").eq(true))));
//! assert_eq!(cond.to_sql(), "age > ? and (name like ? or vip = ?)");
//! assert_eq!(cond.params().len(), 3);
//! ```

use crate::builder::common::ColumnRef;
use crate::entity::Field;
use crate::naming::Naming;
use crate::{Error, Operator, Result, Value};

/// A node of the condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// No condition; renders `1 = 1` on its own and vanishes when combined
    Empty,
    /// `<column> <op> ?`
    Base {
        column: ColumnRef,
        operator: Operator,
        value: Value,
    },
    /// `<column> is [not] null`
    Null { column: ColumnRef, operator: Operator },
    /// `<column> [not] between ? and ?`
    Between {
        column: ColumnRef,
        operator: Operator,
        low: Value,
        high: Value,
    },
    /// `<column> [not] in (?, ...)`, never empty
    In {
        column: ColumnRef,
        operator: Operator,
        values: Vec<Value>,
    },
    /// `exists (<subquery>)`, subquery text used verbatim
    Exists(String),
    /// `not exists (<subquery>)`
    NotExists(String),
    /// `not (<inner>)`
    Not(Box<Condition>),
    And {
        left: Box<Condition>,
        right: Box<Condition>,
        parenthesize: bool,
    },
    Or {
        left: Box<Condition>,
        right: Box<Condition>,
        parenthesize: bool,
    },
}

impl Condition {
    pub fn is_empty(&self) -> bool {
        matches!(self, Condition::Empty)
    }

    /// `self and other`
    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::Empty, other) => other,
            (this, Condition::Empty) => this,
            (left, right) => Condition::And {
                left: Box::new(left),
                right: Box::new(right),
                parenthesize: false,
            },
        }
    }

    /// `self or other`
    pub fn or(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::Empty, other) => other,
            (this, Condition::Empty) => this,
            (left, right) => Condition::Or {
                left: Box::new(left),
                right: Box::new(right),
                parenthesize: false,
            },
        }
    }

    /// `self and other` for clauses a builder appends one call at a time.
    ///
    /// A side that would expose a bare `or` is grouped, so appending never
    /// rebinds what the caller already wrote.
    pub(crate) fn and_clause(self, other: Condition) -> Condition {
        if self.is_empty() || other.is_empty() {
            return self.and(other);
        }
        let wrap = |c: Condition| if c.exposes_or() { group(c) } else { c };
        wrap(self).and(wrap(other))
    }

    /// Whether an unparenthesized `or` sits at the top level of the rendered text
    fn exposes_or(&self) -> bool {
        match self {
            Condition::Or { parenthesize, .. } => !parenthesize,
            Condition::And {
                left,
                right,
                parenthesize: false,
            } => left.exposes_or() || right.exposes_or(),
            _ => false,
        }
    }

    /// `not (self)`
    pub fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    /// `self and (<built>)`
    pub fn and_group(self, build: impl FnOnce() -> Condition) -> Condition {
        self.and(group(build()))
    }

    /// `self or (<built>)`
    pub fn or_group(self, build: impl FnOnce() -> Condition) -> Condition {
        self.or(group(build()))
    }

    /// Render with the default naming convention
    pub fn to_sql(&self) -> String {
        self.to_sql_with(&Naming::default())
    }

    /// Render with `naming` applied to field references
    pub fn to_sql_with(&self, naming: &Naming) -> String {
        let mut sql = String::new();
        self.write_sql(naming, &mut sql);
        sql
    }

    fn write_sql(&self, naming: &Naming, sql: &mut String) {
        match self {
            Condition::Empty => sql.push_str("1 = 1"),
            Condition::Base {
                column, operator, ..
            } => {
                sql.push_str(&column.render(naming));
                sql.push(' ');
                sql.push_str(operator.as_str());
                sql.push_str(" ?");
            }
            Condition::Null { column, operator } => {
                sql.push_str(&column.render(naming));
                sql.push(' ');
                sql.push_str(operator.as_str());
            }
            Condition::Between {
                column, operator, ..
            } => {
                sql.push_str(&column.render(naming));
                sql.push(' ');
                sql.push_str(operator.as_str());
                sql.push_str(" ? and ?");
            }
            Condition::In {
                column,
                operator,
                values,
            } => {
                sql.push_str(&column.render(naming));
                sql.push(' ');
                sql.push_str(operator.as_str());
                sql.push_str(" (");
                sql.push_str(&vec!["?"; values.len()].join(", "));
                sql.push(')');
            }
            Condition::Exists(subquery) => {
                sql.push_str("exists (");
                sql.push_str(subquery);
                sql.push(')');
            }
            Condition::NotExists(subquery) => {
                sql.push_str("not exists (");
                sql.push_str(subquery);
                sql.push(')');
            }
            Condition::Not(inner) => {
                sql.push_str("not (");
                inner.write_sql(naming, sql);
                sql.push(')');
            }
            Condition::And {
                left,
                right,
                parenthesize,
            } => write_binary(naming, sql, left, "and", right, *parenthesize),
            Condition::Or {
                left,
                right,
                parenthesize,
            } => write_binary(naming, sql, left, "or", right, *parenthesize),
        }
    }

    /// Bound values, left to right
    pub fn params(&self) -> Vec<Value> {
        let mut params = Vec::new();
        self.collect_params(&mut params);
        params
    }

    fn collect_params(&self, params: &mut Vec<Value>) {
        match self {
            Condition::Empty
            | Condition::Null { .. }
            | Condition::Exists(_)
            | Condition::NotExists(_) => {}
            Condition::Base { value, .. } => params.push(value.clone()),
            Condition::Between { low, high, .. } => {
                params.push(low.clone());
                params.push(high.clone());
            }
            Condition::In { values, .. } => params.extend(values.iter().cloned()),
            Condition::Not(inner) => inner.collect_params(params),
            Condition::And { left, right, .. } | Condition::Or { left, right, .. } => {
                left.collect_params(params);
                right.collect_params(params);
            }
        }
    }
}

fn write_binary(
    naming: &Naming,
    sql: &mut String,
    left: &Condition,
    keyword: &str,
    right: &Condition,
    parenthesize: bool,
) {
    if parenthesize {
        sql.push('(');
    }
    left.write_sql(naming, sql);
    sql.push(' ');
    sql.push_str(keyword);
    sql.push(' ');
    right.write_sql(naming, sql);
    if parenthesize {
        sql.push(')');
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Empty
    }
}

/// Mark a sub-expression to render inside parentheses.
///
/// Only `and`/`or` nodes change; every other node already renders as one unit.
pub fn group(condition: Condition) -> Condition {
    match condition {
        Condition::And { left, right, .. } => Condition::And {
            left,
            right,
            parenthesize: true,
        },
        Condition::Or { left, right, .. } => Condition::Or {
            left,
            right,
            parenthesize: true,
        },
        other => other,
    }
}

/// `not (<condition>)`
pub fn not(condition: Condition) -> Condition {
    condition.not()
}

/// `exists (<subquery>)`
pub fn exists(subquery: impl Into<String>) -> Condition {
    Condition::Exists(subquery.into())
}

/// `not exists (<subquery>)`
pub fn not_exists(subquery: impl Into<String>) -> Condition {
    Condition::NotExists(subquery.into())
}

/// Leaf constructors shared by typed fields and raw columns
pub trait Predicate {
    /// Type of the values compared against
    type Value: Into<Value>;

    fn column_ref(&self) -> ColumnRef;

    fn compare(&self, operator: Operator, value: impl Into<Self::Value>) -> Condition {
        Condition::Base {
            column: self.column_ref(),
            operator,
            value: lift::<Self>(value),
        }
    }

    fn eq(&self, value: impl Into<Self::Value>) -> Condition {
        self.compare(Operator::EQ, value)
    }

    fn ne(&self, value: impl Into<Self::Value>) -> Condition {
        self.compare(Operator::NEQ, value)
    }

    fn gt(&self, value: impl Into<Self::Value>) -> Condition {
        self.compare(Operator::GT, value)
    }

    fn lt(&self, value: impl Into<Self::Value>) -> Condition {
        self.compare(Operator::LT, value)
    }

    fn ge(&self, value: impl Into<Self::Value>) -> Condition {
        self.compare(Operator::GTE, value)
    }

    fn le(&self, value: impl Into<Self::Value>) -> Condition {
        self.compare(Operator::LTE, value)
    }

    fn like(&self, pattern: impl Into<String>) -> Condition {
        Condition::Base {
            column: self.column_ref(),
            operator: Operator::LIKE,
            value: Value::String(pattern.into()),
        }
    }

    fn not_like(&self, pattern: impl Into<String>) -> Condition {
        Condition::Base {
            column: self.column_ref(),
            operator: Operator::NOT_LIKE,
            value: Value::String(pattern.into()),
        }
    }

    fn is_null(&self) -> Condition {
        Condition::Null {
            column: self.column_ref(),
            operator: Operator::IS_NULL,
        }
    }

    fn is_not_null(&self) -> Condition {
        Condition::Null {
            column: self.column_ref(),
            operator: Operator::IS_NOT_NULL,
        }
    }

    fn between(&self, low: impl Into<Self::Value>, high: impl Into<Self::Value>) -> Condition {
        Condition::Between {
            column: self.column_ref(),
            operator: Operator::BETWEEN,
            low: lift::<Self>(low),
            high: lift::<Self>(high),
        }
    }

    fn not_between(&self, low: impl Into<Self::Value>, high: impl Into<Self::Value>) -> Condition {
        Condition::Between {
            column: self.column_ref(),
            operator: Operator::NOT_BETWEEN,
            low: lift::<Self>(low),
            high: lift::<Self>(high),
        }
    }

    /// `<column> in (...)`; an empty list is rejected
    fn in_list<I>(&self, values: I) -> Result<Condition>
    where
        I: IntoIterator,
        I::Item: Into<Self::Value>,
    {
        membership(self.column_ref(), Operator::IN, values.into_iter().map(lift::<Self>).collect())
    }

    /// `<column> not in (...)`; an empty list is rejected
    fn not_in<I>(&self, values: I) -> Result<Condition>
    where
        I: IntoIterator,
        I::Item: Into<Self::Value>,
    {
        membership(self.column_ref(), Operator::NOT_IN, values.into_iter().map(lift::<Self>).collect())
    }
}

fn lift<P: Predicate + ?Sized>(value: impl Into<P::Value>) -> Value {
    let typed: P::Value = value.into();
    typed.into()
}

fn membership(column: ColumnRef, operator: Operator, values: Vec<Value>) -> Result<Condition> {
    if values.is_empty() {
        return Err(Error::invalid_input(format!(
            "'{}' requires at least one value",
            operator
        )));
    }
    Ok(Condition::In {
        column,
        operator,
        values,
    })
}

impl<E, V: Into<Value>> Predicate for Field<E, V> {
    type Value = V;

    fn column_ref(&self) -> ColumnRef {
        ColumnRef::Field(self.field_ref())
    }
}

/// A raw column reference, compared against untyped values
#[derive(Debug, Clone)]
pub struct Column(String);

/// Refer to a column by its SQL name
pub fn col(name: impl Into<String>) -> Column {
    Column(name.into())
}

impl Column {
    /// `<column> <op> ?` with an operator given as text, e.g. `">="`
    pub fn op(&self, operator: &str, value: impl Into<Value>) -> Result<Condition> {
        Ok(self.compare(Operator::parse(operator)?, value))
    }
}

impl Predicate for Column {
    type Value = Value;

    fn column_ref(&self) -> ColumnRef {
        ColumnRef::Name(self.0.clone())
    }
}

impl Predicate for ColumnRef {
    type Value = Value;

    fn column_ref(&self) -> ColumnRef {
        self.clone()
    }
}
