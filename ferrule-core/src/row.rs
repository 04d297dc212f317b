//! Driver-neutral result rows and their mapping onto entities

use crate::entity::TableMeta;
use crate::types::SqlType;
use crate::{Error, Result, Value};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Per-call type hints, keyed by entity field name; they win over the settings' hints
pub type FieldHints = HashMap<&'static str, SqlType>;

/// One result row: column names and values in select order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(Error::driver(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, C, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of `column`, matched case-insensitively
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Map this row onto `T` using its resolved metadata.
    ///
    /// Columns with no matching field are ignored; fields with no column are
    /// left for serde to default (`None` for optional fields).
    pub fn decode<T: DeserializeOwned>(&self, meta: &TableMeta, hints: &FieldHints) -> Result<T> {
        let mut object = serde_json::Map::with_capacity(self.columns.len());
        for (column, value) in self.columns.iter().zip(&self.values) {
            let Some(field) = meta.by_column(column) else {
                continue;
            };
            let json = match hints.get(field.field).copied().or(field.sql_type) {
                Some(sql_type) => sql_type.to_json(value),
                None => value.to_json(),
            };
            object.insert(field.field.to_string(), json);
        }

        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            Error::mapping(format!("cannot map row onto '{}': {}", meta.table, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::fixtures::{CourseRecord, Student};
    use crate::naming::Naming;
    use crate::types::TypeHints;

    #[test]
    fn test_decode_matches_columns_case_insensitively() {
        let meta = TableMeta::of::<Student>(&Naming::default(), &TypeHints::default());
        let row = Row::from_pairs([
            ("ID", Value::I64(4)),
            ("Name", Value::from("Ann")),
            ("extra", Value::I32(1)),
        ]);
        let student: Student = row.decode(&meta, &FieldHints::new()).unwrap();
        assert_eq!(
            student,
            Student {
                id: 4,
                name: Some("Ann".into()),
                age: None,
            }
        );
    }

    #[test]
    fn test_decode_applies_settings_hints() {
        let meta = TableMeta::of::<CourseRecord>(&Naming::default(), &TypeHints::default());
        // drivers commonly hand booleans back as integers
        let row = Row::from_pairs([
            ("record_id", Value::from("r-1")),
            ("course_name", Value::from("Algebra")),
            ("credits", Value::I64(3)),
            ("is_deleted", Value::I64(1)),
            ("version", Value::I64(2)),
        ]);
        let course: CourseRecord = row.decode(&meta, &FieldHints::new()).unwrap();
        assert!(course.is_deleted);
        assert_eq!(course.course_name, "Algebra");
        assert_eq!(course.credit_hours, 3);
    }

    #[test]
    fn test_per_call_hints_override() {
        #[derive(Debug, serde::Deserialize)]
        struct Flag {
            #[allow(dead_code)]
            id: i64,
            name: bool,
        }
        let meta = TableMeta::of::<Student>(&Naming::default(), &TypeHints::default());
        let row = Row::from_pairs([("id", Value::I64(1)), ("name", Value::I64(0))]);

        let mut hints = FieldHints::new();
        hints.insert("name", SqlType::Boolean);
        let flag: Flag = row.decode(&meta, &hints).unwrap();
        assert!(!flag.name);
    }

    #[test]
    fn test_decode_failure_is_mapping_error() {
        let meta = TableMeta::of::<Student>(&Naming::default(), &TypeHints::default());
        let row = Row::from_pairs([("name", Value::from("no id"))]);
        let err = row.decode::<Student>(&meta, &FieldHints::new()).unwrap_err();
        assert!(matches!(err, Error::Mapping { .. }));
    }

    #[test]
    fn test_row_shape_checked() {
        assert!(Row::new(vec!["a".into()], vec![]).is_err());
        let row = Row::new(vec!["a".into()], vec![Value::I32(1)]).unwrap();
        assert_eq!(row.get("A"), Some(&Value::I32(1)));
        assert_eq!(row.get_index(1), None);
    }
}
