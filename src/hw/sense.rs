//! Battery sense: gated divider into the SAADC.
//!
//! The divider sits behind a control pin so it does not drain the cell
//! while idle. A sample raises the gate, waits for the node to settle,
//! reads one conversion, and drops the gate again.

use embassy_nrf::gpio::Output;
use embassy_nrf::saadc::Saadc;
use embassy_time::{Duration, Timer};

use crate::config::SENSE_SETTLE_MS;
use crate::error::BatteryError;
use crate::tasks::battery::BatterySense;

pub struct AdcBatterySense {
    adc: Saadc<'static, 1>,
    gate: Output<'static>,
}

impl AdcBatterySense {
    pub fn new(adc: Saadc<'static, 1>, gate: Output<'static>) -> Self {
        Self { adc, gate }
    }
}

impl BatterySense for AdcBatterySense {
    async fn sample_raw(&mut self) -> Result<u16, BatteryError> {
        self.gate.set_high();
        Timer::after(Duration::from_millis(SENSE_SETTLE_MS)).await;

        let mut buf = [0i16; 1];
        self.adc.sample(&mut buf).await;

        self.gate.set_low();

        // single-ended conversions can dip slightly below zero
        Ok(buf[0].max(0) as u16)
    }
}
