//! Hardware bindings for the nRF52840 build.
//!
//! Everything in here implements one of the narrow boundaries the core
//! modules define (`ShutterPin`, `Camera`, `StorageCard`, `BatterySense`,
//! `Lamp`) on top of `embassy-nrf` peripherals. None of it is compiled for
//! the host.

pub mod camera;
pub mod sdcard;
pub mod sense;
pub mod shutter;

use embassy_nrf::gpio::Output;

use crate::program::Lamp;

impl Lamp for Output<'static> {
    fn set(&mut self, on: bool) {
        if on {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}
