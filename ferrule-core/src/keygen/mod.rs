//! Primary key generation strategies

pub mod flex;
pub mod snowflake;

pub use flex::FlexId;
pub use snowflake::Snowflake;

use crate::{Result, Value};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How a key column receives its value at insert time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyStrategy {
    /// The caller supplies the value on the entity
    None,
    /// The database assigns it; the column is left out of the insert
    Auto,
    /// Random v4 UUID in canonical string form
    Uuid,
    /// 64-bit time/datacenter/worker/sequence id
    Snowflake,
    /// Decimal time/sequence/worker/random id, unsafe for batches
    FlexId,
}

impl KeyStrategy {
    /// Whether the strategy produces a value the core must generate
    pub fn is_generated(self) -> bool {
        matches!(self, KeyStrategy::Uuid | KeyStrategy::Snowflake | KeyStrategy::FlexId)
    }
}

impl Default for KeyStrategy {
    fn default() -> Self {
        KeyStrategy::None
    }
}

/// A source of primary key values
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Result<Value>;
}

/// Millisecond clock used by the time-based generators
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;

    /// Block the calling thread for `millis` milliseconds.
    ///
    /// Generators call this synchronously, also from async callers such as
    /// `Database::insert`, so the wait occupies the runtime worker thread.
    /// The snowflake generator never asks for more than
    /// `2 * MAX_BACKWARD_MILLIS`.
    fn sleep(&self, millis: i64) {
        if millis > 0 {
            std::thread::sleep(Duration::from_millis(millis as u64));
        }
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Random UUID keys
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl KeyGenerator for UuidGenerator {
    fn generate(&self) -> Result<Value> {
        Ok(Value::String(uuid::Uuid::new_v4().to_string()))
    }
}

/// The generator instances shared by everything built from one `Settings`
#[derive(Debug)]
pub struct KeyGenerators {
    uuid: UuidGenerator,
    snowflake: Snowflake,
    flex: FlexId,
}

impl KeyGenerators {
    pub fn new(snowflake: Snowflake, flex: FlexId) -> Self {
        Self {
            uuid: UuidGenerator,
            snowflake,
            flex,
        }
    }

    /// Produce a key for `strategy`, or `None` when the core does not generate one
    pub fn generate(&self, strategy: KeyStrategy) -> Result<Option<Value>> {
        let value = match strategy {
            KeyStrategy::None | KeyStrategy::Auto => return Ok(None),
            KeyStrategy::Uuid => self.uuid.generate()?,
            KeyStrategy::Snowflake => self.snowflake.generate()?,
            KeyStrategy::FlexId => self.flex.generate()?,
        };
        Ok(Some(value))
    }

    pub fn snowflake(&self) -> &Snowflake {
        &self.snowflake
    }

    pub fn flex(&self) -> &FlexId {
        &self.flex
    }
}

impl Default for KeyGenerators {
    fn default() -> Self {
        Self::new(Snowflake::with_default_ids(), FlexId::default())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_keys_are_canonical_strings() {
        let value = UuidGenerator.generate().unwrap();
        match value {
            Value::String(s) => {
                assert_eq!(s.len(), 36);
                assert!(uuid::Uuid::parse_str(&s).is_ok());
            }
            other => panic!("expected string key, got {:?}", other),
        }
    }

    #[test]
    fn test_uuid_keys_are_unique() {
        let keys: HashSet<String> = (0..1000)
            .map(|_| match UuidGenerator.generate().unwrap() {
                Value::String(s) => s,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_generators_skip_caller_and_database_keys() {
        let keys = KeyGenerators::default();
        assert_eq!(keys.generate(KeyStrategy::None).unwrap(), None);
        assert_eq!(keys.generate(KeyStrategy::Auto).unwrap(), None);
        assert!(matches!(
            keys.generate(KeyStrategy::Snowflake).unwrap(),
            Some(Value::I64(_))
        ));
        assert!(matches!(
            keys.generate(KeyStrategy::FlexId).unwrap(),
            Some(Value::I64(_))
        ));
    }

    #[test]
    fn test_strategy_classification() {
        assert!(KeyStrategy::Uuid.is_generated());
        assert!(!KeyStrategy::Auto.is_generated());
        assert_eq!(KeyStrategy::default(), KeyStrategy::None);
    }
}
