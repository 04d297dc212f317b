//! DELETE statement builder

use super::common::QueryBuilder;
use crate::condition::{col, Condition, Predicate};
use crate::config::{LogicDelete, Settings};
use crate::entity::Entity;
use crate::naming::Naming;
use crate::{Error, Result, Value};

/// DELETE builder before any WHERE condition is given; cannot render
#[derive(Debug, Clone)]
pub struct DeleteBuilderInitial {
    naming: Naming,
    table: String,
    logic_delete: LogicDelete,
}

/// DELETE builder with a WHERE condition
#[derive(Debug, Clone)]
pub struct DeleteBuilderComplete {
    naming: Naming,
    table: String,
    logic_delete: LogicDelete,
    where_condition: Condition,
}

impl DeleteBuilderInitial {
    /// Physical delete from `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            naming: Naming::default(),
            table: table.into(),
            logic_delete: LogicDelete::Disable,
        }
    }

    /// Delete rows of `E`, following the configured naming and logical-delete policy
    pub fn for_entity<E: Entity>(settings: &Settings) -> Self {
        Self {
            naming: settings.naming().clone(),
            table: settings.meta::<E>().table.clone(),
            logic_delete: settings.logic_delete().clone(),
        }
    }

    /// Delete the row identified by `entity`'s key fields
    pub fn by_id<E: Entity>(settings: &Settings, entity: &E) -> Result<DeleteBuilderComplete> {
        let meta = settings.meta::<E>();
        let condition = meta
            .values_of(entity)?
            .into_iter()
            .filter(|(column, _)| column.is_key())
            .fold(Condition::Empty, |acc, (column, value)| {
                acc.and(col(column.column.clone()).eq(value))
            });
        if condition.is_empty() {
            return Err(Error::invalid_input(format!(
                "'{}' has no identifier field to delete by",
                meta.table
            )));
        }
        Ok(Self::for_entity::<E>(settings).where_(condition))
    }

    pub fn logic_delete(mut self, policy: LogicDelete) -> Self {
        self.logic_delete = policy;
        self
    }

    /// Add the WHERE condition, which makes the statement renderable
    pub fn where_(self, condition: Condition) -> DeleteBuilderComplete {
        DeleteBuilderComplete {
            naming: self.naming,
            table: self.table,
            logic_delete: self.logic_delete,
            where_condition: condition,
        }
    }
}

impl DeleteBuilderComplete {
    /// And another condition onto the WHERE clause
    pub fn where_(mut self, condition: Condition) -> Self {
        let current = std::mem::take(&mut self.where_condition);
        self.where_condition = current.and_clause(condition);
        self
    }

    pub fn and_where(self, condition: Condition) -> Self {
        self.where_(condition)
    }

    pub fn or_where(mut self, condition: Condition) -> Self {
        let current = std::mem::take(&mut self.where_condition);
        self.where_condition = current.or(condition);
        self
    }

    pub fn is_logical(&self) -> bool {
        self.logic_delete.is_enabled()
    }
}

impl QueryBuilder for DeleteBuilderInitial {
    fn to_sql(&self) -> Result<String> {
        Err(Error::invalid_input("delete requires a where condition"))
    }

    fn parameters(&self) -> Vec<Value> {
        Vec::new()
    }
}

impl QueryBuilder for DeleteBuilderComplete {
    fn to_sql(&self) -> Result<String> {
        if self.where_condition.is_empty() {
            return Err(Error::invalid_input("delete requires a non-empty where condition"));
        }

        let mut sql = String::new();
        match &self.logic_delete {
            LogicDelete::Disable => {
                sql.push_str("delete from ");
                sql.push_str(&self.table);
            }
            LogicDelete::Enable {
                column, deleted, ..
            } => {
                sql.push_str("update ");
                sql.push_str(&self.table);
                sql.push_str(" set ");
                sql.push_str(column);
                sql.push_str(" = ");
                sql.push_str(&deleted.to_sql_literal()?);
            }
        }

        sql.push_str(" where ");
        sql.push_str(&self.where_condition.to_sql_with(&self.naming));
        Ok(sql)
    }

    fn parameters(&self) -> Vec<Value> {
        self.where_condition.params()
    }
}
