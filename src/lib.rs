//! shutterbox - one-button camera firmware.
//!
//! The concurrency core is platform independent and tested on the host:
//! the debounced shutter event pipeline, the shared-line arbiter, the
//! one-shot worker pattern, and the screen state machine. Hardware
//! bindings (`hw`, `main.rs`) only build with the `embedded` feature for
//! the nRF52840 target.
//!
//! Usage: `cargo test` on the host;
//! `cargo build --release --features embedded --target thumbv7em-none-eabihf`
//! for the device image.

#![cfg_attr(not(test), no_std)]
// single-executor firmware: subscriber traits don't need Send futures
#![allow(async_fn_in_trait)]

pub mod arbiter;
pub mod battery;
pub mod button;
pub mod config;
pub mod error;
pub mod program;
pub mod tasks;
pub mod ui;

#[cfg(feature = "embedded")]
pub mod hw;

// ═══════════════════════════════════════════════════════════════════════════
// Unit tests - pure logic (debounce, gauge math, transition table, bus)
// ═══════════════════════════════════════════════════════════════════════════
