//! Snowflake ids: 41-bit milliseconds since a custom epoch, 5-bit datacenter,
//! 5-bit worker and a 12-bit per-millisecond sequence.

use super::{Clock, KeyGenerator, SystemClock};
use crate::{Error, Result, Value};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 2023-04-02T05:01:00Z
pub const EPOCH_MILLIS: i64 = 1_680_411_660_000;

const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;

pub const MAX_WORKER_ID: i64 = !(-1i64 << WORKER_ID_BITS);
pub const MAX_DATACENTER_ID: i64 = !(-1i64 << DATACENTER_ID_BITS);
const SEQUENCE_MASK: i64 = !(-1i64 << SEQUENCE_BITS);

const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

/// Largest backwards clock step that is waited out instead of rejected
pub const MAX_BACKWARD_MILLIS: i64 = 5;

#[derive(Debug)]
struct State {
    /// Timestamp encoded into the last id; runs ahead of the clock after sequence exhaustion
    last_timestamp: i64,
    /// Last physical clock reading, used to detect rollback
    last_reading: i64,
    sequence: i64,
}

/// Snowflake id generator; one lock per instance
#[derive(Debug)]
pub struct Snowflake {
    worker_id: i64,
    datacenter_id: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl Snowflake {
    /// Create a generator with explicit ids, each in `0..=31`
    pub fn new(worker_id: i64, datacenter_id: i64) -> Result<Self> {
        if !(0..=MAX_WORKER_ID).contains(&worker_id) {
            return Err(Error::configuration(format!(
                "snowflake worker id {} out of range 0..={}",
                worker_id, MAX_WORKER_ID
            )));
        }
        if !(0..=MAX_DATACENTER_ID).contains(&datacenter_id) {
            return Err(Error::configuration(format!(
                "snowflake datacenter id {} out of range 0..={}",
                datacenter_id, MAX_DATACENTER_ID
            )));
        }
        Ok(Self::unchecked(worker_id, datacenter_id))
    }

    /// Create a generator with ids derived from the host name and process id
    pub fn with_default_ids() -> Self {
        let datacenter_id = default_datacenter_id();
        let worker_id = default_worker_id(datacenter_id);
        Self::unchecked(worker_id, datacenter_id)
    }

    fn unchecked(worker_id: i64, datacenter_id: i64) -> Self {
        Self {
            worker_id,
            datacenter_id,
            clock: Arc::new(SystemClock),
            state: Mutex::new(State {
                last_timestamp: -1,
                last_reading: -1,
                sequence: 0,
            }),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    pub fn datacenter_id(&self) -> i64 {
        self.datacenter_id
    }

    /// Generate the next id.
    ///
    /// A clock that moved back by at most [`MAX_BACKWARD_MILLIS`] is waited for
    /// (twice the offset) and read again; anything larger, or a clock still
    /// behind after the wait, fails with [`Error::ClockMovedBackwards`].
    ///
    /// The wait blocks the calling thread while holding the generator lock,
    /// so concurrent callers, async tasks included, stall for at most
    /// `2 * MAX_BACKWARD_MILLIS` ms.
    pub fn next_id(&self) -> Result<i64> {
        let mut state = self.state.lock();

        let mut now = self.clock.now_millis();
        if now < state.last_reading {
            let offset = state.last_reading - now;
            if offset > MAX_BACKWARD_MILLIS {
                return Err(Error::ClockMovedBackwards { millis: offset });
            }
            tracing::warn!(
                target: "ferrule::keygen",
                offset_ms = offset,
                "clock moved backwards, waiting before generating snowflake id"
            );
            self.clock.sleep(offset << 1);
            now = self.clock.now_millis();
            if now < state.last_reading {
                return Err(Error::ClockMovedBackwards {
                    millis: state.last_reading - now,
                });
            }
        }
        state.last_reading = now;

        let timestamp = if now > state.last_timestamp {
            state.sequence = 0;
            now
        } else {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.last_timestamp + 1
            } else {
                state.last_timestamp
            }
        };
        state.last_timestamp = timestamp;

        Ok(((timestamp - EPOCH_MILLIS) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | state.sequence)
    }
}

impl KeyGenerator for Snowflake {
    fn generate(&self) -> Result<Value> {
        self.next_id().map(Value::I64)
    }
}

/// Split an id into (millis since epoch, datacenter, worker, sequence)
pub fn decompose(id: i64) -> (i64, i64, i64, i64) {
    (
        id >> TIMESTAMP_SHIFT,
        (id >> DATACENTER_ID_SHIFT) & MAX_DATACENTER_ID,
        (id >> WORKER_ID_SHIFT) & MAX_WORKER_ID,
        id & SEQUENCE_MASK,
    )
}

fn default_datacenter_id() -> i64 {
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string());
    let mut hasher = DefaultHasher::new();
    host.hash(&mut hasher);
    ((hasher.finish() >> 6) as i64 & 0xffff) % (MAX_DATACENTER_ID + 1)
}

fn default_worker_id(datacenter_id: i64) -> i64 {
    let mut hasher = DefaultHasher::new();
    format!("{}{}", datacenter_id, std::process::id()).hash(&mut hasher);
    (hasher.finish() as i64 & 0xffff) % (MAX_WORKER_ID + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::testing::ScriptedClock;
    use std::collections::HashSet;
    use std::thread;

    const T0: i64 = EPOCH_MILLIS + 86_400_000;

    fn frozen(worker: i64, datacenter: i64) -> Snowflake {
        Snowflake::new(worker, datacenter)
            .unwrap()
            .with_clock(Arc::new(ScriptedClock::frozen(T0)))
    }

    #[test]
    fn test_rejects_out_of_range_ids() {
        assert!(matches!(
            Snowflake::new(32, 0),
            Err(Error::Configuration { .. })
        ));
        assert!(matches!(
            Snowflake::new(0, -1),
            Err(Error::Configuration { .. })
        ));
        assert!(Snowflake::new(31, 31).is_ok());
    }

    #[test]
    fn test_default_ids_in_range() {
        let generator = Snowflake::with_default_ids();
        assert!((0..=MAX_WORKER_ID).contains(&generator.worker_id()));
        assert!((0..=MAX_DATACENTER_ID).contains(&generator.datacenter_id()));
    }

    #[test]
    fn test_bit_layout() {
        let generator = frozen(7, 3);
        let first = generator.next_id().unwrap();
        let second = generator.next_id().unwrap();
        assert_eq!(decompose(first), (T0 - EPOCH_MILLIS, 3, 7, 0));
        assert_eq!(decompose(second), (T0 - EPOCH_MILLIS, 3, 7, 1));
        assert!(first > 0);
    }

    #[test]
    fn test_frozen_clock_never_repeats() {
        let generator = frozen(1, 1);
        let mut seen = HashSet::with_capacity(100_001);
        let mut previous = i64::MIN;
        for _ in 0..100_000 {
            let id = generator.next_id().unwrap();
            assert!(id > previous);
            previous = id;
            assert!(seen.insert(id));
        }
        let next = generator.next_id().unwrap();
        assert!(seen.insert(next));
        assert!(decompose(next).0 > 0);
    }

    #[test]
    fn test_sequence_exhaustion_rolls_to_next_millisecond() {
        let generator = frozen(0, 0);
        let ids: Vec<i64> = (0..4097).map(|_| generator.next_id().unwrap()).collect();
        assert_eq!(decompose(ids[4095]), (T0 - EPOCH_MILLIS, 0, 0, 4095));
        assert_eq!(decompose(ids[4096]), (T0 - EPOCH_MILLIS + 1, 0, 0, 0));
    }

    #[test]
    fn test_new_millisecond_resets_sequence() {
        let clock = Arc::new(ScriptedClock::new([T0, T0, T0 + 1]));
        let generator = Snowflake::new(0, 0).unwrap().with_clock(clock);
        generator.next_id().unwrap();
        assert_eq!(decompose(generator.next_id().unwrap()).3, 1);
        assert_eq!(decompose(generator.next_id().unwrap()), (T0 - EPOCH_MILLIS + 1, 0, 0, 0));
    }

    #[test]
    fn test_small_rollback_waits_then_continues() {
        let clock = Arc::new(ScriptedClock::new([T0, T0 - 2, T0 + 1]));
        let generator = Snowflake::new(0, 0).unwrap().with_clock(clock.clone());
        let first = generator.next_id().unwrap();
        let second = generator.next_id().unwrap();
        assert!(second > first);
        assert_eq!(*clock.slept.lock(), vec![4]);
    }

    #[test]
    fn test_rollback_wait_is_bounded() {
        let clock = Arc::new(ScriptedClock::new([
            T0,
            T0 - MAX_BACKWARD_MILLIS,
            T0,
            T0 - MAX_BACKWARD_MILLIS - 1,
        ]));
        let generator = Snowflake::new(0, 0).unwrap().with_clock(clock.clone());
        generator.next_id().unwrap();
        generator.next_id().unwrap();
        assert!(generator.next_id().is_err());
        assert_eq!(*clock.slept.lock(), vec![2 * MAX_BACKWARD_MILLIS]);
    }

    #[test]
    fn test_small_rollback_still_behind_fails() {
        let clock = Arc::new(ScriptedClock::new([T0, T0 - 3]));
        let generator = Snowflake::new(0, 0).unwrap().with_clock(clock);
        generator.next_id().unwrap();
        assert!(matches!(
            generator.next_id(),
            Err(Error::ClockMovedBackwards { millis: 3 })
        ));
    }

    #[test]
    fn test_large_rollback_fails_without_waiting() {
        let clock = Arc::new(ScriptedClock::new([T0, T0 - 1_000]));
        let generator = Snowflake::new(0, 0).unwrap().with_clock(clock.clone());
        generator.next_id().unwrap();
        assert!(matches!(
            generator.next_id(),
            Err(Error::ClockMovedBackwards { millis: 1_000 })
        ));
        assert!(clock.slept.lock().is_empty());
    }

    #[test]
    fn test_concurrent_callers_share_one_sequence() {
        let generator = Arc::new(frozen(2, 2));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || {
                    (0..2_000)
                        .map(|_| generator.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 16_000);
    }
}
