//! UPDATE statement builder

use super::common::QueryBuilder;
use crate::condition::{col, Condition, Predicate};
use crate::config::Settings;
use crate::entity::Entity;
use crate::naming::Naming;
use crate::{Error, Result, Value};

/// Options for entity updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Leave null-valued fields out of the set clause
    pub ignore_nulls: bool,
}

impl UpdateOptions {
    pub fn ignore_nulls() -> Self {
        Self { ignore_nulls: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SetClause {
    /// `<column> = ?`
    Assign(String, Value),
    /// `<column> = <column> + 1`
    Increment(String),
}

/// UPDATE statement builder
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    naming: Naming,
    table: String,
    sets: Vec<SetClause>,
    keys: Vec<(String, Value)>,
    where_condition: Condition,
    lock_condition: Condition,
}

impl UpdateBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            naming: Naming::default(),
            table: table.into(),
            sets: Vec::new(),
            keys: Vec::new(),
            where_condition: Condition::Empty,
            lock_condition: Condition::Empty,
        }
    }

    /// Set clause from every non-key field of `entity`.
    ///
    /// With optimistic locking configured and a field on the version column,
    /// that column is incremented and its current value joins the WHERE clause.
    pub fn for_entity<E: Entity>(settings: &Settings, entity: &E, options: UpdateOptions) -> Result<Self> {
        let meta = settings.meta::<E>();
        let lock_column = settings.optimistic_lock().column();

        let mut builder = Self::new(meta.table.clone());
        builder.naming = settings.naming().clone();

        for (column, value) in meta.values_of(entity)? {
            if column.is_key() {
                builder.keys.push((column.column.clone(), value));
                continue;
            }
            let is_version = lock_column.map_or(false, |c| c.eq_ignore_ascii_case(&column.column));
            if is_version {
                builder.sets.push(SetClause::Increment(column.column.clone()));
                builder.lock_condition = col(column.column.clone()).eq(value);
                continue;
            }
            if options.ignore_nulls && value.is_null() {
                continue;
            }
            builder.sets.push(SetClause::Assign(column.column.clone(), value));
        }

        Ok(builder)
    }

    /// `<column> = ?`
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push(SetClause::Assign(column.into(), value.into()));
        self
    }

    /// Restrict the update to the entity's identifier values
    pub fn by_id(self) -> Result<Self> {
        if self.keys.is_empty() {
            return Err(Error::invalid_input(format!(
                "'{}' has no identifier field to update by",
                self.table
            )));
        }
        let condition = self
            .keys
            .iter()
            .fold(Condition::Empty, |acc, (column, value)| {
                acc.and(col(column.clone()).eq(value.clone()))
            });
        Ok(self.where_(condition))
    }

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

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the statement carries a version check
    pub fn is_versioned(&self) -> bool {
        !self.lock_condition.is_empty()
    }

    fn effective_where(&self) -> Condition {
        if self.lock_condition.is_empty() {
            self.where_condition.clone()
        } else {
            self.where_condition.clone().and_clause(self.lock_condition.clone())
        }
    }
}

impl QueryBuilder for UpdateBuilder {
    fn to_sql(&self) -> Result<String> {
        if self.table.is_empty() {
            return Err(Error::invalid_input("update requires a table"));
        }
        if self.sets.is_empty() {
            return Err(Error::invalid_input(format!(
                "nothing to set on '{}'",
                self.table
            )));
        }

        let mut sql = String::from("update ");
        sql.push_str(&self.table);
        sql.push_str(" set ");

        let assignments: Vec<String> = self
            .sets
            .iter()
            .map(|clause| match clause {
                SetClause::Assign(column, _) => format!("{} = ?", column),
                SetClause::Increment(column) => format!("{0} = {0} + 1", column),
            })
            .collect();
        sql.push_str(&assignments.join(", "));

        let condition = self.effective_where();
        if !condition.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&condition.to_sql_with(&self.naming));
        }

        Ok(sql)
    }

    fn parameters(&self) -> Vec<Value> {
        let mut params: Vec<Value> = self
            .sets
            .iter()
            .filter_map(|clause| match clause {
                SetClause::Assign(_, value) => Some(value.clone()),
                SetClause::Increment(_) => None,
            })
            .collect();
        params.extend(self.effective_where().params());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimisticLock;
    use crate::entity::fixtures::{AuditLog, CourseRecord, Student};

    fn student() -> Student {
        Student {
            id: 5,
            name: None,
            age: Some(30),
        }
    }

    #[test]
    fn test_scenario_update_ignoring_nulls() {
        let settings = Settings::default();
        let query = UpdateBuilder::for_entity(&settings, &student(), UpdateOptions::ignore_nulls())
            .unwrap()
            .by_id()
            .unwrap();
        assert_eq!(
            query.to_sql().unwrap(),
            "update students set age = ? where id = ?"
        );
        assert_eq!(query.parameters(), vec![Value::I32(30), Value::I64(5)]);
    }

    #[test]
    fn test_nulls_written_by_default() {
        let settings = Settings::default();
        let query = UpdateBuilder::for_entity(&settings, &student(), UpdateOptions::default())
            .unwrap()
            .where_(Student::AGE.lt(40));
        assert_eq!(
            query.to_sql().unwrap(),
            "update students set name = ?, age = ? where age < ?"
        );
        assert_eq!(
            query.parameters(),
            vec![Value::Null, Value::I32(30), Value::I32(40)]
        );
    }

    #[test]
    fn test_raw_update() {
        let query = UpdateBuilder::new("students")
            .set("name", "Bo")
            .set("age", 31)
            .where_(col("id").eq(2))
            .or_where(col("id").eq(3));
        assert_eq!(
            query.to_sql().unwrap(),
            "update students set name = ?, age = ? where id = ? or id = ?"
        );
        assert_eq!(query.parameters().len(), 4);
    }

    #[test]
    fn test_empty_set_is_an_error() {
        assert!(UpdateBuilder::new("students").to_sql().is_err());

        let settings = Settings::default();
        let only_key = Student {
            id: 1,
            name: None,
            age: None,
        };
        let query = UpdateBuilder::for_entity(&settings, &only_key, UpdateOptions::ignore_nulls()).unwrap();
        assert!(matches!(query.to_sql(), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_by_id_without_key_values() {
        let query = UpdateBuilder::new("students").set("age", 1);
        assert!(query.by_id().is_err());
    }

    #[test]
    fn test_optimistic_lock() {
        let settings = Settings::builder()
            .optimistic_lock(OptimisticLock::enable("version"))
            .build()
            .unwrap();
        let course = CourseRecord {
            record_id: Some("r-1".into()),
            course_name: "Algebra".into(),
            credit_hours: 4,
            is_deleted: false,
            version: 7,
        };
        let query = UpdateBuilder::for_entity(&settings, &course, UpdateOptions::default())
            .unwrap()
            .where_(CourseRecord::COURSE_NAME.eq("Algebra"))
            .or_where(CourseRecord::CREDIT_HOURS.gt(2i16));

        assert!(query.is_versioned());
        assert_eq!(
            query.to_sql().unwrap(),
            "update course_record set course_name = ?, credits = ?, is_deleted = ?, version = version + 1 \
             where (course_name = ? or credits > ?) and version = ?"
        );
        assert_eq!(
            query.parameters(),
            vec![
                Value::from("Algebra"),
                Value::I16(4),
                Value::Bool(false),
                Value::from("Algebra"),
                Value::I16(2),
                Value::I32(7),
            ]
        );
    }

    #[test]
    fn test_lock_ignored_without_version_field() {
        let settings = Settings::builder()
            .optimistic_lock(OptimisticLock::enable("version"))
            .build()
            .unwrap();
        let log = AuditLog {
            id: Some(3),
            message: "x".into(),
        };
        let query = UpdateBuilder::for_entity(&settings, &log, UpdateOptions::default())
            .unwrap()
            .by_id()
            .unwrap();
        assert!(!query.is_versioned());
        assert_eq!(
            query.to_sql().unwrap(),
            "update audit_log set message = ? where id = ?"
        );
    }

    #[test]
    fn test_appended_or_stays_grouped() {
        let settings = Settings::default();
        let query = UpdateBuilder::for_entity(&settings, &student(), UpdateOptions::ignore_nulls())
            .unwrap()
            .by_id()
            .unwrap()
            .where_(col("a").eq(1).or(col("b").eq(2)));
        assert_eq!(
            query.to_sql().unwrap(),
            "update students set age = ? where id = ? and (a = ? or b = ?)"
        );
        assert_eq!(
            query.parameters(),
            vec![Value::I32(30), Value::I64(5), Value::I32(1), Value::I32(2)]
        );

        let query = UpdateBuilder::new("students")
            .set("x", 1)
            .where_(col("a").eq(1).or(col("b").eq(2)))
            .and_where(col("tenant").eq(9));
        assert_eq!(
            query.to_sql().unwrap(),
            "update students set x = ? where (a = ? or b = ?) and tenant = ?"
        );
    }
}
