//! One-shot background workers.
//!
//! Both long operations - capture+save and battery read - follow the same
//! shape: the caller claims the operation's in-progress flag and spawns a
//! task; the task acquires what it needs through the arbiter (bounded
//! wait), does the work, releases lines in reverse acquisition order,
//! reports exactly one result on the caller's single-slot channel, clears
//! the flag, and terminates. There is no cancellation - a running worker
//! always finishes; the flag is what prevents a second concurrent request.

pub mod battery;
pub mod save;

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;

use crate::battery::BatteryReading;
use crate::error::{BatteryError, SaveError};

/// Single-slot result queue of the capture-and-save worker.
pub type SaveResultChannel = Channel<CriticalSectionRawMutex, Result<(), SaveError>, 1>;

/// Single-slot result queue of the battery-read worker.
pub type BatteryResultChannel =
    Channel<CriticalSectionRawMutex, Result<BatteryReading, BatteryError>, 1>;

/// Lock-guarded in-progress flag: at most one worker of a kind at a time.
pub struct OpFlag {
    flag: BlockingMutex<CriticalSectionRawMutex, Cell<bool>>,
}

impl OpFlag {
    pub const fn new() -> Self {
        Self {
            flag: BlockingMutex::new(Cell::new(false)),
        }
    }

    /// Atomically claim the operation. Returns false if one is already
    /// running; the check and the set happen under the same lock.
    pub fn try_begin(&self) -> bool {
        self.flag.lock(|f| {
            if f.get() {
                false
            } else {
                f.set(true);
                true
            }
        })
    }

    /// Release the claim. The worker calls this after its result is sent,
    /// so an observer that saw the flag drop can already receive the
    /// outcome.
    pub fn clear(&self) {
        self.flag.lock(|f| f.set(false));
    }

    pub fn is_set(&self) -> bool {
        self.flag.lock(|f| f.get())
    }
}

impl Default for OpFlag {
    fn default() -> Self {
        Self::new()
    }
}
