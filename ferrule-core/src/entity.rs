//! Entity metadata: typed field references, the per-type field table, and
//! the resolved table/column names cached per settings.

use crate::keygen::KeyStrategy;
use crate::naming::Naming;
use crate::types::{untyped_value, FieldType, SqlType, TypeHints};
use crate::{Error, Result, Value};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Name of the field treated as the identifier when none is marked
pub const DEFAULT_ID_FIELD: &str = "id";

/// A mapped struct.
///
/// ```
/// use ferrule_core::{Entity, EntityDescriptor, Field, KeyStrategy};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Student {
///     id: i64,
///     student_name: Option<String>,
///     age: Option<i32>,
/// }
///
/// impl Student {
///     const ID: Field<Student, i64> = Field::new("id");
///     const NAME: Field<Student, Option<String>> = Field::with_column("student_name", "name");
///     const AGE: Field<Student, Option<i32>> = Field::new("age");
/// }
///
/// impl Entity for Student {
///     fn descriptor() -> EntityDescriptor<Self> {
///         EntityDescriptor::new()
///             .table("students")
///             .id_with(Self::ID, KeyStrategy::Snowflake)
///             .field(Self::NAME)
///             .field(Self::AGE)
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// The field table, built once per settings and cached
    fn descriptor() -> EntityDescriptor<Self>;
}

/// Typed reference to a field of entity `E` holding values of type `V`
pub struct Field<E, V> {
    name: &'static str,
    column: Option<&'static str>,
    _marker: PhantomData<fn() -> (E, V)>,
}

impl<E, V> Field<E, V> {
    /// A field whose column name is derived by the naming convention
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            _marker: PhantomData,
        }
    }

    /// A field mapped to an explicit column
    pub const fn with_column(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column: Some(column),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn column_override(&self) -> Option<&'static str> {
        self.column
    }

    pub fn field_ref(&self) -> FieldRef {
        FieldRef {
            name: self.name,
            column: self.column,
        }
    }
}

impl<E, V> Clone for Field<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for Field<E, V> {}

impl<E, V> fmt::Debug for Field<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("column", &self.column)
            .finish()
    }
}

/// Untyped field reference carried by conditions and column lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub name: &'static str,
    pub column: Option<&'static str>,
}

impl FieldRef {
    pub fn column_name(&self, naming: &Naming) -> String {
        naming.column_name(self.name, self.column)
    }
}

/// One row of an entity's field table
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub type_key: &'static str,
    pub id: bool,
    pub key_strategy: Option<KeyStrategy>,
}

/// Field table of entity `E`, in column declaration order
#[derive(Debug, Clone)]
pub struct EntityDescriptor<E> {
    type_name: &'static str,
    table: Option<&'static str>,
    fields: Vec<FieldDescriptor>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> EntityDescriptor<E> {
    /// Start a table for `E`, named after the type
    pub fn new() -> Self {
        let full = std::any::type_name::<E>();
        let base = full.split('<').next().unwrap_or(full);
        let simple = base.rsplit("::").next().unwrap_or(base);
        Self::named(simple)
    }

    /// Start a table with an explicit type name, still subject to prefix and naming
    pub fn named(type_name: &'static str) -> Self {
        Self {
            type_name,
            table: None,
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Use `table` verbatim as the table name
    pub fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    /// Add a plain field
    pub fn field<V: FieldType>(self, field: Field<E, V>) -> Self {
        self.push(field, false, None)
    }

    /// Add the identifier field; its key strategy follows the configured default
    pub fn id<V: FieldType>(self, field: Field<E, V>) -> Self {
        self.push(field, true, None)
    }

    /// Add the identifier field with its own key strategy
    pub fn id_with<V: FieldType>(self, field: Field<E, V>, strategy: KeyStrategy) -> Self {
        self.push(field, true, Some(strategy))
    }

    fn push<V: FieldType>(
        mut self,
        field: Field<E, V>,
        id: bool,
        key_strategy: Option<KeyStrategy>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: field.name,
            column: field.column,
            type_key: V::type_key(),
            id,
            key_strategy,
        });
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

impl<E> Default for EntityDescriptor<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A field resolved against a naming convention and type hints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub field: &'static str,
    pub column: String,
    pub sql_type: Option<SqlType>,
    pub id: bool,
    pub key_strategy: Option<KeyStrategy>,
}

impl ColumnMeta {
    /// Marked as identifier, or named `id`
    pub fn is_key(&self) -> bool {
        self.id || self.field == DEFAULT_ID_FIELD
    }

    /// Key strategy for this column: its own override, else `default` for
    /// key columns, else `None` for plain columns.
    pub fn resolve_strategy(&self, default: KeyStrategy) -> Option<KeyStrategy> {
        match self.key_strategy {
            Some(strategy) => Some(strategy),
            None if self.is_key() => Some(default),
            None => None,
        }
    }

    /// Convert a serialized field into a bindable value
    pub fn to_value(&self, json: &serde_json::Value) -> Result<Value> {
        match self.sql_type {
            Some(sql_type) => sql_type.to_value(json),
            None => Ok(untyped_value(json)),
        }
    }
}

/// Resolved table and column names of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TableMeta {
    pub table: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableMeta {
    pub fn resolve<E>(descriptor: &EntityDescriptor<E>, naming: &Naming, hints: &TypeHints) -> Self {
        let columns = descriptor
            .fields
            .iter()
            .map(|field| ColumnMeta {
                field: field.name,
                column: naming.column_name(field.name, field.column),
                sql_type: hints.get(field.type_key),
                id: field.id,
                key_strategy: field.key_strategy,
            })
            .collect();

        Self {
            table: naming.table_name(descriptor.type_name, descriptor.table),
            columns,
        }
    }

    pub fn of<E: Entity>(naming: &Naming, hints: &TypeHints) -> Self {
        Self::resolve(&E::descriptor(), naming, hints)
    }

    pub fn by_field(&self, field: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Column lookup used by row mapping; SQL identifiers are case-insensitive
    pub fn by_column(&self, column: &str) -> Option<&ColumnMeta> {
        self.columns
            .iter()
            .find(|c| c.column.eq_ignore_ascii_case(column))
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter(|c| c.is_key())
    }

    /// Serialize `entity` and pair every described column with its value
    pub fn values_of<E: Serialize>(&self, entity: &E) -> Result<Vec<(&ColumnMeta, Value)>> {
        let object = match serde_json::to_value(entity)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(Error::mapping(format!(
                    "entity for table '{}' must serialize to an object, got {}",
                    self.table, other
                )))
            }
        };

        self.columns
            .iter()
            .map(|column| {
                let json = object
                    .get(column.field)
                    .unwrap_or(&serde_json::Value::Null);
                Ok((column, column.to_value(json)?))
            })
            .collect()
    }
}

/// Per-type metadata cache
#[derive(Default)]
pub struct MetaCache {
    entries: RwLock<HashMap<TypeId, Arc<TableMeta>>>,
}

impl MetaCache {
    pub fn get_or_resolve<E: Entity>(&self, naming: &Naming, hints: &TypeHints) -> Arc<TableMeta> {
        let key = TypeId::of::<E>();
        if let Some(meta) = self.entries.read().get(&key) {
            return Arc::clone(meta);
        }
        let meta = Arc::new(TableMeta::of::<E>(naming, hints));
        Arc::clone(self.entries.write().entry(key).or_insert(meta))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for MetaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Student {
        pub id: i64,
        pub name: Option<String>,
        pub age: Option<i32>,
    }

    impl Student {
        pub const ID: Field<Student, i64> = Field::new("id");
        pub const NAME: Field<Student, Option<String>> = Field::new("name");
        pub const AGE: Field<Student, Option<i32>> = Field::new("age");
    }

    impl Entity for Student {
        fn descriptor() -> EntityDescriptor<Self> {
            EntityDescriptor::new()
                .table("students")
                .id(Self::ID)
                .field(Self::NAME)
                .field(Self::AGE)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CourseRecord {
        pub record_id: Option<String>,
        pub course_name: String,
        pub credit_hours: i16,
        pub is_deleted: bool,
        pub version: i32,
    }

    impl CourseRecord {
        pub const RECORD_ID: Field<CourseRecord, Option<String>> = Field::new("record_id");
        pub const COURSE_NAME: Field<CourseRecord, String> = Field::new("courseName");
        pub const CREDIT_HOURS: Field<CourseRecord, i16> = Field::with_column("credit_hours", "credits");
        pub const IS_DELETED: Field<CourseRecord, bool> = Field::new("is_deleted");
        pub const VERSION: Field<CourseRecord, i32> = Field::new("version");
    }

    impl Entity for CourseRecord {
        fn descriptor() -> EntityDescriptor<Self> {
            EntityDescriptor::new()
                .id_with(Self::RECORD_ID, KeyStrategy::Uuid)
                .field(Self::COURSE_NAME)
                .field(Self::CREDIT_HOURS)
                .field(Self::IS_DELETED)
                .field(Self::VERSION)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct AuditLog {
        pub id: Option<i64>,
        pub message: String,
    }

    impl AuditLog {
        pub const ID: Field<AuditLog, Option<i64>> = Field::new("id");
        pub const MESSAGE: Field<AuditLog, String> = Field::new("message");
    }

    impl Entity for AuditLog {
        fn descriptor() -> EntityDescriptor<Self> {
            EntityDescriptor::new().field(Self::ID).field(Self::MESSAGE)
        }
    }
}
