//! User interface subsystem - OLED screens for the one-button camera.
//!
//! Output only: the program task renders one screen at a time on the
//! SSD1306 through [`Screens`], while input arrives separately through the
//! shutter event bus. Rendering happens strictly under the arbiter's
//! display guard.
//!
//! ## Screens
//!
//! - **Home**: battery gauge, flash marker, idle prompt
//! - **Taking picture**: transient feedback while the save worker runs
//! - **Flash**: long-press toggles the lamp for the next capture
//! - **Film download**: placeholder for the film-transfer collaborator

pub mod display;

pub use display::Screens;
