//! The physical shutter button.
//!
//! GPIOTE does the interrupt work inside the HAL: `wait_for_any_edge`
//! arms the channel and suspends the processing task until the line
//! moves. The ISR itself only wakes us - every further decision happens
//! in task context.

use embassy_nrf::gpio::{Input, Level};

use crate::button::ShutterPin;

pub struct ShutterButton {
    pin: Input<'static>,
    active: Level,
}

impl ShutterButton {
    /// `active` is the level at which the button reads as pressed
    /// (nRF52840-DK buttons are active low).
    pub fn new(pin: Input<'static>, active: Level) -> Self {
        Self { pin, active }
    }
}

impl ShutterPin for ShutterButton {
    async fn wait_for_edge(&mut self) {
        self.pin.wait_for_any_edge().await;
    }

    fn is_pressed(&mut self) -> bool {
        self.pin.get_level() == self.active
    }
}
