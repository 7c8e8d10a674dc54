//! Debounce and long-press classification for the shutter button.
//!
//! Pure state machine over (level, timestamp) samples, so the filter is
//! testable on the host without pins or timers. The processing task
//! re-samples the pin on every wake - edge or periodic tick - and feeds
//! the result here.

use crate::button::ButtonEvent;
use crate::config::{DEBOUNCE_MS, LONG_PRESS_MS};

/// Collapses raw pin samples into accepted `Pressed` / `Released` /
/// `LongPressed` transitions.
///
/// A level change is accepted only when it differs from the last accepted
/// level and the debounce window has elapsed since that change; contact
/// bounce inside the window is discarded. A press held continuously past
/// the long-press threshold yields exactly one `LongPressed`, re-armed by
/// the next accepted release.
#[derive(Debug)]
pub struct Debouncer {
    accepted_pressed: bool,
    last_change_ms: u64,
    long_fired: bool,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            accepted_pressed: false,
            last_change_ms: 0,
            long_fired: false,
        }
    }

    /// Feed one raw sample; returns the accepted event, if any.
    pub fn sample(&mut self, pressed: bool, now_ms: u64) -> Option<ButtonEvent> {
        if pressed != self.accepted_pressed {
            if now_ms.saturating_sub(self.last_change_ms) < DEBOUNCE_MS {
                return None;
            }
            self.accepted_pressed = pressed;
            self.last_change_ms = now_ms;
            return Some(if pressed {
                ButtonEvent::Pressed
            } else {
                self.long_fired = false;
                ButtonEvent::Released
            });
        }

        if pressed
            && !self.long_fired
            && now_ms.saturating_sub(self.last_change_ms) >= LONG_PRESS_MS
        {
            self.long_fired = true;
            return Some(ButtonEvent::LongPressed);
        }

        None
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
