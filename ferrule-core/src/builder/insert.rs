//! INSERT statement builder

use super::common::{QueryBuilder, Statement};
use crate::config::Settings;
use crate::entity::Entity;
use crate::keygen::KeyStrategy;
use crate::{Error, Result, Value};

/// Options for multi-row inserts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Accept FlexId keys despite their duplicate risk within one batch
    pub allow_flex_id: bool,
}

impl BatchOptions {
    pub fn allow_flex_id(mut self) -> Self {
        self.allow_flex_id = true;
        self
    }
}

/// INSERT builder for one or more entities of the same type.
///
/// Key columns resolving to [`KeyStrategy::Auto`] are left out; generated
/// strategies draw a fresh key per row from the settings' generators.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    generated_keys: Vec<Option<Value>>,
}

impl InsertBuilder {
    /// Single-row insert; any key strategy is allowed
    pub fn for_entity<E: Entity>(settings: &Settings, entity: &E) -> Result<Self> {
        Self::for_entities(
            settings,
            std::slice::from_ref(entity),
            BatchOptions::default().allow_flex_id(),
        )
    }

    /// Insert every entity in `entities`, one statement per row
    pub fn for_entities<E: Entity>(
        settings: &Settings,
        entities: &[E],
        options: BatchOptions,
    ) -> Result<Self> {
        if entities.is_empty() {
            return Err(Error::configuration("batch insert requires at least one entity"));
        }

        let meta = settings.meta::<E>();
        let default = settings.default_key_strategy();
        let strategies: Vec<Option<KeyStrategy>> = meta
            .columns
            .iter()
            .map(|column| column.resolve_strategy(default))
            .collect();

        if !options.allow_flex_id {
            if let Some(column) = meta
                .columns
                .iter()
                .zip(&strategies)
                .find(|(_, s)| **s == Some(KeyStrategy::FlexId))
                .map(|(c, _)| c)
            {
                return Err(Error::invalid_input(format!(
                    "FlexId keys on '{}.{}' may repeat within a batch; opt in with BatchOptions::allow_flex_id",
                    meta.table, column.column
                )));
            }
        }

        let columns: Vec<String> = meta
            .columns
            .iter()
            .zip(&strategies)
            .filter(|(_, s)| **s != Some(KeyStrategy::Auto))
            .map(|(c, _)| c.column.clone())
            .collect();
        if columns.is_empty() {
            return Err(Error::invalid_input(format!(
                "no insertable columns on '{}'",
                meta.table
            )));
        }

        let mut rows = Vec::with_capacity(entities.len());
        let mut generated_keys = Vec::with_capacity(entities.len());
        for entity in entities {
            let mut row = Vec::with_capacity(columns.len());
            let mut generated = None;
            for ((_, value), strategy) in meta.values_of(entity)?.into_iter().zip(&strategies) {
                match strategy {
                    Some(KeyStrategy::Auto) => continue,
                    Some(strategy) if strategy.is_generated() => {
                        let key = settings.keys().generate(*strategy)?.unwrap_or(value);
                        generated.get_or_insert_with(|| key.clone());
                        row.push(key);
                    }
                    _ => row.push(value),
                }
            }
            rows.push(row);
            generated_keys.push(generated);
        }

        Ok(Self {
            table: meta.table.clone(),
            columns,
            rows,
            generated_keys,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Parameter rows, one per entity, in column order
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Key produced for each row, when a generator ran
    pub fn generated_keys(&self) -> &[Option<Value>] {
        &self.generated_keys
    }

    /// One statement per row, all sharing the same SQL text
    pub fn statements(&self) -> Result<Vec<Statement>> {
        let sql = self.to_sql()?;
        Ok(self
            .rows
            .iter()
            .map(|row| Statement::new(sql.clone(), row.clone()))
            .collect())
    }
}

impl QueryBuilder for InsertBuilder {
    fn to_sql(&self) -> Result<String> {
        let mut sql = String::from("insert into ");
        sql.push_str(&self.table);
        sql.push_str(" (");
        sql.push_str(&self.columns.join(", "));
        sql.push_str(") values (");
        sql.push_str(&vec!["?"; self.columns.len()].join(", "));
        sql.push(')');
        Ok(sql)
    }

    /// Parameters of the first row
    fn parameters(&self) -> Vec<Value> {
        self.rows.first().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::fixtures::{AuditLog, CourseRecord, Student};
    use crate::entity::{EntityDescriptor, Field};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Ticket {
        id: Option<i64>,
        title: String,
    }

    impl Ticket {
        const ID: Field<Ticket, Option<i64>> = Field::new("id");
        const TITLE: Field<Ticket, String> = Field::new("title");
    }

    impl Entity for Ticket {
        fn descriptor() -> EntityDescriptor<Self> {
            EntityDescriptor::new()
                .id_with(Self::ID, KeyStrategy::FlexId)
                .field(Self::TITLE)
        }
    }

    fn ticket(title: &str) -> Ticket {
        Ticket {
            id: None,
            title: title.to_string(),
        }
    }

    #[test]
    fn test_insert_with_caller_supplied_key() {
        let settings = Settings::default();
        let student = Student {
            id: 9,
            name: Some("Ann".into()),
            age: None,
        };
        let insert = InsertBuilder::for_entity(&settings, &student).unwrap();
        assert_eq!(
            insert.to_sql().unwrap(),
            "insert into students (id, name, age) values (?, ?, ?)"
        );
        assert_eq!(
            insert.parameters(),
            vec![Value::I64(9), Value::from("Ann"), Value::Null]
        );
        assert_eq!(insert.generated_keys().to_vec(), vec![None]);
    }

    #[test]
    fn test_auto_key_left_out() {
        let settings = Settings::builder()
            .default_key_strategy(KeyStrategy::Auto)
            .build()
            .unwrap();
        let insert = InsertBuilder::for_entity(
            &settings,
            &AuditLog {
                id: None,
                message: "login".into(),
            },
        )
        .unwrap();
        assert_eq!(
            insert.to_sql().unwrap(),
            "insert into audit_log (message) values (?)"
        );
        assert_eq!(insert.parameters(), vec![Value::from("login")]);
    }

    #[test]
    fn test_field_override_beats_default() {
        let settings = Settings::builder()
            .default_key_strategy(KeyStrategy::Auto)
            .build()
            .unwrap();
        let course = CourseRecord {
            record_id: None,
            course_name: "Algebra".into(),
            credit_hours: 3,
            is_deleted: false,
            version: 1,
        };
        let insert = InsertBuilder::for_entity(&settings, &course).unwrap();
        assert_eq!(
            insert.to_sql().unwrap(),
            "insert into course_record (record_id, course_name, credits, is_deleted, version) \
             values (?, ?, ?, ?, ?)"
        );

        let params = insert.parameters();
        let key = match &params[0] {
            Value::String(s) => s.clone(),
            other => panic!("expected uuid string, got {:?}", other),
        };
        assert!(uuid::Uuid::parse_str(&key).is_ok());
        assert_eq!(insert.generated_keys().to_vec(), vec![Some(Value::String(key))]);
        assert_eq!(params[2], Value::I16(3));
    }

    #[test]
    fn test_default_snowflake_keys_are_distinct_per_row() {
        let settings = Settings::builder()
            .default_key_strategy(KeyStrategy::Snowflake)
            .build()
            .unwrap();
        let students: Vec<Student> = (0..50)
            .map(|i| Student {
                id: 0,
                name: Some(format!("s{}", i)),
                age: Some(i),
            })
            .collect();
        let insert = InsertBuilder::for_entities(&settings, &students, BatchOptions::default()).unwrap();
        assert_eq!(insert.rows().len(), 50);

        let mut keys: Vec<i64> = insert
            .rows()
            .iter()
            .map(|row| row[0].as_i64().unwrap())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 50);

        let statements = insert.statements().unwrap();
        assert_eq!(statements.len(), 50);
        assert!(statements.iter().all(|s| s.placeholder_count() == s.params.len()));
    }

    #[test]
    fn test_empty_batch_is_configuration_error() {
        let settings = Settings::default();
        let err = InsertBuilder::for_entities::<Student>(&settings, &[], BatchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_flex_id_batch_requires_opt_in() {
        let settings = Settings::default();
        let batch = vec![ticket("a"), ticket("b")];

        let err = InsertBuilder::for_entities(&settings, &batch, BatchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));

        let insert = InsertBuilder::for_entities(&settings, &batch, BatchOptions::default().allow_flex_id()).unwrap();
        assert_eq!(insert.rows().len(), 2);

        // single rows are always allowed
        let single = InsertBuilder::for_entity(&settings, &ticket("c")).unwrap();
        assert!(single.parameters()[0].as_i64().is_some());
    }
}
