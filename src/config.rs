//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and electrical
//! thresholds live here so they can be tuned in one place.

// Shutter button

/// Debounce window (ms). A level change is accepted only if it differs from
/// the last accepted level and at least this long has passed since that
/// change.
pub const DEBOUNCE_MS: u64 = 50;

/// Continuous hold after an accepted press before the single `LongPressed`
/// event fires (ms). Re-armed by the next accepted release.
pub const LONG_PRESS_MS: u64 = 1_000;

/// Fallback re-sample period of the processing loop when no edge arrives
/// (ms). Also bounds how long `end()` takes to be honoured.
pub const PERIODIC_CHECK_MS: u64 = 50;

/// Maximum number of subscriber channels on the shutter event bus.
pub const MAX_SUBSCRIBERS: usize = 10;

/// Depth of each subscriber's event queue.
pub const EVENT_QUEUE_DEPTH: usize = 10;

// Program screens

/// Idle timeout on the Home screen (ms); re-renders and kicks a battery read.
pub const HOME_SCREEN_TIMEOUT_MS: u64 = 10_000;

/// Idle timeout on the Flash screen before falling back to Home (ms).
pub const FLASH_SCREEN_TIMEOUT_MS: u64 = 50_000;

/// Idle timeout on the FilmDownload screen before falling back to Home (ms).
pub const FILM_SCREEN_TIMEOUT_MS: u64 = 30_000;

/// How long a press may dangle without a release or long-press before the
/// interaction is abandoned (ms).
pub const PRESS_CANCEL_TIMEOUT_MS: u64 = 5_000;

// Shared-line arbitration

/// Bounded wait for the display line when rendering a screen (ms).
pub const DISPLAY_TAKE_MS: u64 = 100;

/// Bounded wait per underlying lock of the storage composite (ms).
pub const STORAGE_TAKE_MS: u64 = 100;

/// Bounded wait for the battery-sense line (ms).
pub const BATTERY_TAKE_MS: u64 = 1_000;

// Capture

/// 8.3 filename the capture worker writes on the card root. One file per
/// capture; a new capture overwrites the previous one.
pub const SAVE_PATH: &str = "PICTURE.JPG";

// Battery sense

/// Full-scale count of the 12-bit sense ADC.
pub const ADC_FULL_SCALE: u16 = 4095;

/// ADC reference (mV); raw counts map linearly onto this.
pub const ADC_REF_MV: u32 = 3_300;

/// Cell voltage treated as empty (mV).
pub const VBAT_EMPTY_MV: u16 = 3_000;

/// Cell voltage treated as full (mV).
pub const VBAT_FULL_MV: u16 = 4_200;

/// Settle time after raising the divider gate before sampling (ms).
pub const SENSE_SETTLE_MS: u64 = 10;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`. Adjust for your custom PCB.
//
//   Shutter button   → P0.11 (active low, internal pull-up)
//   Flash lamp       → P0.13
//   I²C SDA          → P0.26
//   I²C SCL          → P0.27
//   Camera SPI       → SCK P0.19 / MISO P0.21 / MOSI P0.22 / CS P0.17
//   Card SPI         → SCK P0.14 / MISO P0.15 / MOSI P0.16 / CS P0.20
//   Battery sense    → AIN0 (P0.02), divider gate P0.31
