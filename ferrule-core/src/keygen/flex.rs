//! Decimal ids laid out as `millis | sequence(2) | worker(2) | random(2)`.
//!
//! Cheap and roughly time ordered, but the sequence only covers 100 ids per
//! millisecond and ignores clock rollback, so ids generated in a tight loop may
//! repeat. Batch inserts refuse this strategy unless explicitly allowed.

use super::{Clock, KeyGenerator, SystemClock};
use crate::{Error, Result, Value};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;

pub const EPOCH_MILLIS: i64 = 1_680_411_660_000;
pub const MAX_SEQUENCE: i64 = 99;
pub const MAX_WORKER_ID: i64 = 99;

#[derive(Debug, Default)]
struct State {
    last_millis: i64,
    sequence: i64,
}

#[derive(Debug)]
pub struct FlexId {
    worker_id: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl FlexId {
    pub fn new(worker_id: i64) -> Result<Self> {
        if !(0..=MAX_WORKER_ID).contains(&worker_id) {
            return Err(Error::configuration(format!(
                "flex id worker id {} out of range 0..={}",
                worker_id, MAX_WORKER_ID
            )));
        }
        Ok(Self {
            worker_id,
            clock: Arc::new(SystemClock),
            state: Mutex::new(State::default()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock();

        let mut now = self.clock.now_millis().max(state.last_millis);
        if now == state.last_millis {
            state.sequence += 1;
            if state.sequence > MAX_SEQUENCE {
                state.sequence = 0;
                now += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_millis = now;

        let salt: i64 = rand::thread_rng().gen_range(0..100);
        (now - EPOCH_MILLIS) * 1_000_000 + state.sequence * 10_000 + self.worker_id * 100 + salt
    }
}

impl Default for FlexId {
    fn default() -> Self {
        Self {
            worker_id: 1,
            clock: Arc::new(SystemClock),
            state: Mutex::new(State::default()),
        }
    }
}

impl KeyGenerator for FlexId {
    fn generate(&self) -> Result<Value> {
        Ok(Value::I64(self.next_id()))
    }
}
