//! Runtime settings shared by builders and executors

use crate::entity::{Entity, MetaCache, TableMeta};
use crate::keygen::{FlexId, KeyGenerators, KeyStrategy, Snowflake};
use crate::naming::Naming;
use crate::types::{FieldType, SqlType, TypeHints};
use crate::{Error, Result, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::Level;

/// Logical delete policy
#[derive(Debug, Clone, PartialEq)]
pub enum LogicDelete {
    /// Deletes remove rows
    Disable,
    /// Deletes set `column` to `deleted`; live rows hold `normal`
    Enable {
        column: String,
        normal: Value,
        deleted: Value,
    },
}

impl LogicDelete {
    pub fn enable(column: impl Into<String>, normal: impl Into<Value>, deleted: impl Into<Value>) -> Self {
        LogicDelete::Enable {
            column: column.into(),
            normal: normal.into(),
            deleted: deleted.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, LogicDelete::Enable { .. })
    }
}

impl Default for LogicDelete {
    fn default() -> Self {
        LogicDelete::Disable
    }
}

/// Optimistic lock policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimisticLock {
    Disable,
    /// Entity updates bump `column` and require its current value to match
    Enable { column: String },
}

impl OptimisticLock {
    pub fn enable(column: impl Into<String>) -> Self {
        OptimisticLock::Enable {
            column: column.into(),
        }
    }

    /// The version column, when enabled
    pub fn column(&self) -> Option<&str> {
        match self {
            OptimisticLock::Disable => None,
            OptimisticLock::Enable { column } => Some(column),
        }
    }
}

impl Default for OptimisticLock {
    fn default() -> Self {
        OptimisticLock::Disable
    }
}

/// Called before every statement, whether or not it then succeeds
pub type BeforeExecute = Arc<dyn Fn(&str, &[Value]) + Send + Sync>;

/// Called after a statement succeeded and its connection was released, with elapsed milliseconds
pub type AfterExecute = Arc<dyn Fn(&str, &[Value], u64) + Send + Sync>;

/// The two audit callbacks
#[derive(Clone, Default)]
pub struct AuditHooks {
    before: Option<BeforeExecute>,
    after: Option<AfterExecute>,
}

impl AuditHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, hook: impl Fn(&str, &[Value]) + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn after(mut self, hook: impl Fn(&str, &[Value], u64) + Send + Sync + 'static) -> Self {
        self.after = Some(Arc::new(hook));
        self
    }

    /// Hooks that emit `tracing` events on the `ferrule::sql` target
    pub fn tracing(level: Level) -> Self {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN => tracing::warn!($($field)*),
                    Level::INFO => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        Self::new()
            .before(move |sql, params| {
                emit_at_level!(level, target: "ferrule::sql", sql, params = ?params, "executing statement")
            })
            .after(move |sql, params, elapsed_ms| {
                emit_at_level!(
                    level,
                    target: "ferrule::sql",
                    sql,
                    params = params.len(),
                    elapsed_ms,
                    "statement finished"
                )
            })
    }

    pub fn fire_before(&self, sql: &str, params: &[Value]) {
        if let Some(hook) = &self.before {
            hook(sql, params);
        }
    }

    pub fn fire_after(&self, sql: &str, params: &[Value], elapsed_ms: u64) {
        if let Some(hook) = &self.after {
            hook(sql, params, elapsed_ms);
        }
    }
}

impl fmt::Debug for AuditHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditHooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Everything the builders and executors read at runtime
#[derive(Debug)]
pub struct Settings {
    naming: Naming,
    default_key_strategy: KeyStrategy,
    logic_delete: LogicDelete,
    optimistic_lock: OptimisticLock,
    type_hints: TypeHints,
    audit: AuditHooks,
    keys: KeyGenerators,
    meta: MetaCache,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    pub fn default_key_strategy(&self) -> KeyStrategy {
        self.default_key_strategy
    }

    pub fn logic_delete(&self) -> &LogicDelete {
        &self.logic_delete
    }

    pub fn optimistic_lock(&self) -> &OptimisticLock {
        &self.optimistic_lock
    }

    pub fn type_hints(&self) -> &TypeHints {
        &self.type_hints
    }

    pub fn audit(&self) -> &AuditHooks {
        &self.audit
    }

    pub fn keys(&self) -> &KeyGenerators {
        &self.keys
    }

    /// Resolved metadata of `E`, computed on first use
    pub fn meta<E: Entity>(&self) -> Arc<TableMeta> {
        self.meta.get_or_resolve::<E>(&self.naming, &self.type_hints)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            naming: Naming::default(),
            default_key_strategy: KeyStrategy::None,
            logic_delete: LogicDelete::Disable,
            optimistic_lock: OptimisticLock::Disable,
            type_hints: TypeHints::default(),
            audit: AuditHooks::default(),
            keys: KeyGenerators::default(),
            meta: MetaCache::default(),
        }
    }
}

/// Builder for [`Settings`]
#[derive(Debug)]
pub struct SettingsBuilder {
    underscore: bool,
    table_prefix: Option<String>,
    default_key_strategy: KeyStrategy,
    logic_delete: LogicDelete,
    optimistic_lock: OptimisticLock,
    type_hints: TypeHints,
    audit: AuditHooks,
    snowflake_ids: Option<(i64, i64)>,
    flex_worker_id: Option<i64>,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            underscore: true,
            table_prefix: None,
            default_key_strategy: KeyStrategy::None,
            logic_delete: LogicDelete::Disable,
            optimistic_lock: OptimisticLock::Disable,
            type_hints: TypeHints::default(),
            audit: AuditHooks::default(),
            snowflake_ids: None,
            flex_worker_id: None,
        }
    }
}

impl SettingsBuilder {
    /// Toggle the camelCase to snake_case transform (on by default)
    pub fn underscore(mut self, enabled: bool) -> Self {
        self.underscore = enabled;
        self
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    pub fn default_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.default_key_strategy = strategy;
        self
    }

    pub fn logic_delete(mut self, policy: LogicDelete) -> Self {
        self.logic_delete = policy;
        self
    }

    pub fn optimistic_lock(mut self, policy: OptimisticLock) -> Self {
        self.optimistic_lock = policy;
        self
    }

    /// Replace the whole type-hint map
    pub fn type_hints(mut self, hints: TypeHints) -> Self {
        self.type_hints = hints;
        self
    }

    /// Override the hint for one field type
    pub fn type_hint<T: FieldType>(mut self, sql_type: SqlType) -> Self {
        self.type_hints.insert::<T>(sql_type);
        self
    }

    /// Snowflake worker and datacenter ids, each `0..=31`
    pub fn snowflake_ids(mut self, worker_id: i64, datacenter_id: i64) -> Self {
        self.snowflake_ids = Some((worker_id, datacenter_id));
        self
    }

    /// FlexId worker id, `0..=99`
    pub fn flex_worker_id(mut self, worker_id: i64) -> Self {
        self.flex_worker_id = Some(worker_id);
        self
    }

    pub fn audit(mut self, hooks: AuditHooks) -> Self {
        self.audit = hooks;
        self
    }

    pub fn build(self) -> Result<Settings> {
        let snowflake = match self.snowflake_ids {
            Some((worker_id, datacenter_id)) => Snowflake::new(worker_id, datacenter_id)?,
            None => Snowflake::with_default_ids(),
        };
        let flex = match self.flex_worker_id {
            Some(worker_id) => FlexId::new(worker_id)?,
            None => FlexId::default(),
        };
        if let LogicDelete::Enable { column, .. } = &self.logic_delete {
            if column.trim().is_empty() {
                return Err(Error::configuration("logical delete column must not be empty"));
            }
        }
        if let OptimisticLock::Enable { column } = &self.optimistic_lock {
            if column.trim().is_empty() {
                return Err(Error::configuration("optimistic lock column must not be empty"));
            }
        }

        Ok(Settings {
            naming: Naming::new(self.underscore, self.table_prefix),
            default_key_strategy: self.default_key_strategy,
            logic_delete: self.logic_delete,
            optimistic_lock: self.optimistic_lock,
            type_hints: self.type_hints,
            audit: self.audit,
            keys: KeyGenerators::new(snowflake, flex),
            meta: MetaCache::default(),
        })
    }
}

static GLOBAL: OnceLock<Arc<Settings>> = OnceLock::new();

/// Install the process-wide settings; only the first call succeeds
pub fn init(settings: Settings) -> Result<Arc<Settings>> {
    let settings = Arc::new(settings);
    GLOBAL
        .set(Arc::clone(&settings))
        .map_err(|_| Error::AlreadyInitialized)?;
    tracing::debug!(target: "ferrule::config", naming = ?settings.naming(), "settings initialized");
    Ok(settings)
}

/// The process-wide settings installed by [`init`]
pub fn global() -> Result<Arc<Settings>> {
    GLOBAL.get().cloned().ok_or(Error::NotInitialized)
}
