//! Arbitration for the electrically shared peripheral lines.
//!
//! Four logical resources sit on three exclusive lines: the display bus,
//! the battery-sense rail, and the radio rail. The card shares wiring with
//! both the display and the sense rail, so storage access is a composite
//! that must hold two underlying locks at once.
//!
//! Lock order is a single global total order: display before sense. Every
//! composite acquisition goes through [`Arbiter::lock_storage`], which
//! takes the locks in that order and releases them in reverse (encoded in
//! the guard's field order), so no two callers can deadlock by choosing
//! differently. A composite acquisition that times out on the second lock
//! drops the first before reporting failure - a failed `lock_storage`
//! never leaves a line held.
//!
//! Guards are witnesses: holding one is the only sanctioned way to touch
//! the corresponding peripheral lines.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{with_timeout, Duration};

type Line = Mutex<CriticalSectionRawMutex, ()>;
type LineGuard<'a> = MutexGuard<'a, CriticalSectionRawMutex, ()>;

/// Witness that the display lines are held. Drop releases them.
pub struct DisplayGuard<'a> {
    _line: LineGuard<'a>,
}

/// Witness that the battery-sense rail is held.
pub struct BatteryGuard<'a> {
    _line: LineGuard<'a>,
}

/// Witness that the radio rail is held.
pub struct RadioGuard<'a> {
    _line: LineGuard<'a>,
}

/// Witness for the storage composite (display + sense).
pub struct StorageGuard<'a> {
    // field order is drop order: the sense rail is released first, the
    // display lines last - the reverse of acquisition
    _sense: LineGuard<'a>,
    _display: LineGuard<'a>,
}

/// One lock per exclusive line, bounded-wait acquisition.
pub struct Arbiter {
    display: Line,
    sense: Line,
    radio: Line,
}

impl Arbiter {
    pub const fn new() -> Self {
        Self {
            display: Mutex::new(()),
            sense: Mutex::new(()),
            radio: Mutex::new(()),
        }
    }

    async fn take(line: &Line, timeout: Duration) -> Option<LineGuard<'_>> {
        with_timeout(timeout, line.lock()).await.ok()
    }

    pub async fn lock_display(&self, timeout: Duration) -> Option<DisplayGuard<'_>> {
        Some(DisplayGuard {
            _line: Self::take(&self.display, timeout).await?,
        })
    }

    pub async fn lock_battery(&self, timeout: Duration) -> Option<BatteryGuard<'_>> {
        Some(BatteryGuard {
            _line: Self::take(&self.sense, timeout).await?,
        })
    }

    pub async fn lock_radio(&self, timeout: Duration) -> Option<RadioGuard<'_>> {
        Some(RadioGuard {
            _line: Self::take(&self.radio, timeout).await?,
        })
    }

    /// Acquire the storage composite: display lines first, sense rail
    /// second. The timeout applies to each underlying lock.
    pub async fn lock_storage(&self, timeout: Duration) -> Option<StorageGuard<'_>> {
        let display = Self::take(&self.display, timeout).await?;
        match Self::take(&self.sense, timeout).await {
            Some(sense) => Some(StorageGuard {
                _sense: sense,
                _display: display,
            }),
            // the display guard drops here; a partial acquisition is
            // never handed back to the caller
            None => None,
        }
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}
