//! SELECT statement builder

use super::common::{count, ColumnRef, IntoColumns, OrderByClause, QueryBuilder, SortDirection};
use crate::condition::Condition;
use crate::config::Settings;
use crate::entity::Entity;
use crate::naming::Naming;
use crate::{Error, Result, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Limit {
    Rows(u64),
    Page { size: u64, number: u64 },
}

/// SELECT statement builder
///
/// # Examples
/// ```
/// use ferrule_core::{QueryBuilder, SelectBuilder, Value};
/// use ferrule_core::condition::{col, Predicate};
///
/// let query = SelectBuilder::new()
///     .select(("id", "name"))
///     .from("students")
///     .where_(col("id").eq(3))
///     .limit(1);
///
/// assert_eq!(query.to_sql().unwrap(), "select id,name from students where id = ? limit ?");
/// assert_eq!(query.parameters(), vec![Value::I32(3), Value::I64(1)]);
/// ```
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    naming: Naming,
    table: Option<String>,
    columns: Vec<ColumnRef>,
    distinct: bool,
    where_condition: Condition,
    group_by: Vec<ColumnRef>,
    having: Condition,
    order_by: Vec<OrderByClause>,
    limit: Option<Limit>,
}

impl SelectBuilder {
    /// Create a builder using the default naming convention
    pub fn new() -> Self {
        Self::with_naming(Naming::default())
    }

    pub fn with_naming(naming: Naming) -> Self {
        Self {
            naming,
            table: None,
            columns: Vec::new(),
            distinct: false,
            where_condition: Condition::Empty,
            group_by: Vec::new(),
            having: Condition::Empty,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Render field references with `naming` instead
    pub fn naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }

    /// Select these columns
    pub fn select<C: IntoColumns>(mut self, columns: C) -> Self {
        self.columns = columns.into_columns();
        self.distinct = false;
        self
    }

    /// `select distinct` over these columns
    pub fn select_distinct<C: IntoColumns>(mut self, columns: C) -> Self {
        self.columns = columns.into_columns();
        self.distinct = true;
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Read from the table `settings` maps `E` to, adopting its naming
    pub fn from_entity<E: Entity>(mut self, settings: &Settings) -> Self {
        self.naming = settings.naming().clone();
        self.from(settings.meta::<E>().table.clone())
    }

    /// Add a WHERE condition, and-ed with any existing one
    pub fn where_(mut self, condition: Condition) -> Self {
        let current = std::mem::take(&mut self.where_condition);
        self.where_condition = current.and_clause(condition);
        self
    }

    /// Add an OR WHERE condition
    pub fn or_where(mut self, condition: Condition) -> Self {
        let current = std::mem::take(&mut self.where_condition);
        self.where_condition = current.or(condition);
        self
    }

    pub fn group_by<C: IntoColumns>(mut self, columns: C) -> Self {
        self.group_by.extend(columns.into_columns());
        self
    }

    pub fn having(mut self, condition: Condition) -> Self {
        let current = std::mem::take(&mut self.having);
        self.having = current.and_clause(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<ColumnRef>, direction: SortDirection) -> Self {
        self.order_by.push(OrderByClause {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn order_by_asc(self, column: impl Into<ColumnRef>) -> Self {
        self.order_by(column, SortDirection::Asc)
    }

    pub fn order_by_desc(self, column: impl Into<ColumnRef>) -> Self {
        self.order_by(column, SortDirection::Desc)
    }

    /// `limit ?`
    pub fn limit(mut self, rows: u64) -> Self {
        self.limit = Some(Limit::Rows(rows));
        self
    }

    /// `limit ? offset ?` for a 1-based page number
    pub fn limit_page(mut self, page_size: u64, page_number: u64) -> Self {
        self.limit = Some(Limit::Page {
            size: page_size,
            number: page_number,
        });
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn where_condition(&self) -> &Condition {
        &self.where_condition
    }

    /// Fill in the table when none was given
    pub(crate) fn or_from(self, table: &str) -> Self {
        if self.table.is_some() {
            self
        } else {
            self.from(table)
        }
    }

    /// `select count(*)` over the same table and WHERE, without grouping, ordering or limits
    pub fn count_query(&self) -> SelectBuilder {
        let mut counted = SelectBuilder::with_naming(self.naming.clone()).select(count());
        counted.table = self.table.clone();
        counted.where_condition = self.where_condition.clone();
        counted
    }

    fn render_columns(&self, columns: &[ColumnRef], separator: &str) -> String {
        columns
            .iter()
            .map(|c| c.render(&self.naming))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl Default for SelectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder for SelectBuilder {
    fn to_sql(&self) -> Result<String> {
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| Error::invalid_input("select requires a table"))?;

        if let Some(Limit::Page { size, number }) = self.limit {
            if size == 0 {
                return Err(Error::invalid_input("page size must be greater than zero"));
            }
            if number == 0 {
                return Err(Error::invalid_input("page numbers start at 1"));
            }
        }

        let mut sql = String::from("select ");
        if self.distinct {
            sql.push_str("distinct ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.render_columns(&self.columns, ","));
        }

        sql.push_str(" from ");
        sql.push_str(table);

        if !self.where_condition.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&self.where_condition.to_sql_with(&self.naming));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" group by ");
            sql.push_str(&self.render_columns(&self.group_by, ", "));
        }

        if !self.having.is_empty() {
            sql.push_str(" having ");
            sql.push_str(&self.having.to_sql_with(&self.naming));
        }

        if !self.order_by.is_empty() {
            let clauses: Vec<String> = self
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.column.render(&self.naming), o.direction))
                .collect();
            sql.push_str(" order by ");
            sql.push_str(&clauses.join(", "));
        }

        match self.limit {
            Some(Limit::Rows(_)) => sql.push_str(" limit ?"),
            Some(Limit::Page { .. }) => sql.push_str(" limit ? offset ?"),
            None => {}
        }

        Ok(sql)
    }

    fn parameters(&self) -> Vec<Value> {
        let mut params = self.where_condition.params();
        params.extend(self.having.params());
        match self.limit {
            Some(Limit::Rows(rows)) => params.push(Value::I64(clamp(rows))),
            Some(Limit::Page { size, number }) => {
                let offset = number.saturating_sub(1).saturating_mul(size);
                params.push(Value::I64(clamp(size)));
                params.push(Value::I64(clamp(offset)));
            }
            None => {}
        }
        params
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
