//! Timer child API.
//!
//! The guest schedules timers through `_schedule(kind, delay_ms) -> id` and
//! cancels them with `_cancel(id)`. The host drives time explicitly with
//! [`Timer::tick`], which calls the guest export `_timer_callback(id)` for
//! every timer that is due.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use wasmapi_types::{Enum, EnumValue, Primitive};

use crate::bridge::WasmBridge;
use crate::error::BridgeResult;
use crate::registry::{ApiLinker, InitFuture, WasmApi};

pub const TIMER_ID: &str = "timer";

/// Guest export invoked for each firing timer.
pub const TIMER_CALLBACK: &str = "_timer_callback";

const IMPORTS: &[&str] = &["_schedule", "_cancel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TimerType {
    /// Fires once after the delay.
    Once = 0,
    /// Fires every `delay` ms until cancelled.
    Interval = 1,
    /// Fires on the next tick regardless of delay.
    Immediate = 2,
}

impl TimerType {
    /// Schema of this enum, for generating guest bindings.
    pub fn schema() -> Enum {
        Enum::new(
            "TimerType",
            Primitive::I32,
            vec![
                EnumValue::from("once"),
                EnumValue::from("interval"),
                EnumValue::from("immediate"),
            ],
        )
    }
}

impl TryFrom<i32> for TimerType {
    type Error = i32;

    fn try_from(kind: i32) -> Result<Self, i32> {
        match kind {
            0 => Ok(Self::Once),
            1 => Ok(Self::Interval),
            2 => Ok(Self::Immediate),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    kind: TimerType,
    delay: f64,
    due: f64,
}

#[derive(Debug, Default)]
struct TimerState {
    now: f64,
    last_id: u32,
    timers: BTreeMap<u32, Scheduled>,
}

/// Timer API. Clones share state: register one clone and keep another to
/// call [`Timer::tick`].
#[derive(Debug, Clone, Default)]
pub struct Timer {
    state: Arc<Mutex<TimerState>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule relative to the last tick time. Ids start at 1.
    pub fn schedule(&self, kind: TimerType, delay_ms: f64) -> u32 {
        let mut st = self.state();
        st.last_id += 1;
        let id = st.last_id;
        let due = match kind {
            TimerType::Immediate => st.now,
            TimerType::Once | TimerType::Interval => st.now + delay_ms,
        };
        st.timers.insert(
            id,
            Scheduled {
                kind,
                delay: delay_ms,
                due,
            },
        );
        debug!(target: "wasmapi", id, ?kind, delay_ms, "timer scheduled");
        id
    }

    /// Returns `false` for unknown or already finished timers.
    pub fn cancel(&self, id: u32) -> bool {
        self.state().timers.remove(&id).is_some()
    }

    pub fn pending(&self) -> usize {
        self.state().timers.len()
    }

    /// Advance the clock to `now` (ms) and fire every due timer, earliest
    /// first. Timers scheduled by a callback wait for the next tick.
    /// Returns the number of callbacks made.
    pub fn tick(&self, bridge: &mut WasmBridge, now: f64) -> BridgeResult<usize> {
        let due: Vec<u32> = {
            let mut st = self.state();
            st.now = now;
            let mut due: Vec<(f64, u32)> = st
                .timers
                .iter()
                .filter(|(_, t)| t.due <= now)
                .map(|(id, t)| (t.due, *id))
                .collect();
            due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            due.into_iter().map(|(_, id)| id).collect()
        };

        let mut fired = 0;
        for id in due {
            // an earlier callback may have cancelled it
            let live = {
                let mut st = self.state();
                match st.timers.get(&id).copied() {
                    None => false,
                    Some(t) if t.kind == TimerType::Interval => {
                        if let Some(slot) = st.timers.get_mut(&id) {
                            slot.due = now + t.delay;
                        }
                        true
                    }
                    Some(_) => {
                        st.timers.remove(&id);
                        true
                    }
                }
            };
            if live {
                bridge.call::<i32, ()>(TIMER_CALLBACK, id as i32)?;
                fired += 1;
            }
        }
        Ok(fired)
    }
}

impl WasmApi for Timer {
    fn id(&self) -> &str {
        TIMER_ID
    }

    fn import_names(&self) -> &[&str] {
        IMPORTS
    }

    fn link(&self, linker: &mut ApiLinker<'_>) -> BridgeResult<()> {
        let timer = self.clone();
        linker.func("_schedule", move |kind: i32, delay: i32| -> i32 {
            match TimerType::try_from(kind) {
                Ok(kind) => timer.schedule(kind, f64::from(delay.max(0))) as i32,
                Err(kind) => {
                    warn!(target: "wasmapi", kind, "invalid timer type");
                    0
                }
            }
        })?;
        let timer = self.clone();
        linker.func("_cancel", move |id: i32| {
            timer.cancel(id as u32);
        })?;
        Ok(())
    }

    fn init<'a>(&'a mut self, bridge: &'a mut WasmBridge) -> InitFuture<'a> {
        Box::pin(async move {
            let ok = bridge.typed_func::<i32, ()>(TIMER_CALLBACK).is_ok();
            if !ok {
                warn!(target: "wasmapi", export = TIMER_CALLBACK, "guest has no timer callback");
            }
            ok
        })
    }
}
