//! Ferrule Core - typed SQL statement builders over sqlx
//!
//! Entities describe their fields once through [`Entity::descriptor`]; from
//! that table the crate builds parameterized `select`, `insert`, `update` and
//! `delete` statements, generates primary keys, maps rows back onto entities
//! and runs everything through a [`Database`] handle.
//!
//! ```
//! use ferrule_core::{QueryBuilder, SelectBuilder, Value};
//! use ferrule_core::condition::{col, group, Predicate};
//!
//! let query = SelectBuilder::new()
//!     .select(("id", "name"))
//!     .from("students")
//!     .where_(col("age").ge(18).and(group(col("name").like("A%").or(col("vip").eq(true)))))
//!     .order_by_desc("age")
//!     .limit(10);
//!
//! assert_eq!(
//!     query.to_sql().unwrap(),
//!     "select id,name from students where age >= ? and (name like ? or vip = ?) order by age desc limit ?"
//! );
//! assert_eq!(query.parameters().len(), 4);
//! assert_eq!(query.parameters()[3], Value::I64(10));
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod keygen;
pub mod naming;
pub mod operator;
pub mod page;
pub mod row;
pub mod types;
pub mod value;

// Re-export main types
pub use builder::{
    BatchOptions, DeleteBuilderComplete, DeleteBuilderInitial, InsertBuilder, QueryBuilder,
    SelectBuilder, SortDirection, Statement, UpdateBuilder, UpdateOptions,
};
pub use condition::{col, group, Condition, Predicate};
pub use config::{AuditHooks, LogicDelete, OptimisticLock, Settings, SettingsBuilder};
pub use entity::{Entity, EntityDescriptor, Field, TableMeta};
pub use error::{Error, ErrorKind, Result};
pub use executor::{Connection, ConnectionPool, Database, RowStream, Transaction};
pub use keygen::{KeyGenerator, KeyStrategy};
pub use naming::Naming;
pub use operator::Operator;
pub use page::Page;
pub use row::{FieldHints, Row};
pub use types::SqlType;
pub use value::Value;
