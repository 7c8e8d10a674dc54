//! Battery-read worker.

use embassy_time::Duration;

use super::{BatteryResultChannel, OpFlag};
use crate::arbiter::Arbiter;
use crate::battery::BatteryReading;
use crate::error::BatteryError;

/// Analog sense boundary: raise the divider gate, settle, sample, drop the
/// gate. One raw 12-bit count per call.
pub trait BatterySense {
    async fn sample_raw(&mut self) -> Result<u16, BatteryError>;
}

/// Worker body: one gauge reading, exactly one result, flag cleared last.
///
/// The caller must have claimed `flag` before invoking this.
pub async fn run_battery_read<S: BatterySense>(
    arbiter: &Arbiter,
    sense: &mut S,
    flag: &OpFlag,
    results: &BatteryResultChannel,
    take_timeout: Duration,
) -> Result<BatteryReading, BatteryError> {
    let outcome = read_once(arbiter, sense, take_timeout).await;
    let _ = results.try_send(outcome);
    flag.clear();
    outcome
}

async fn read_once<S: BatterySense>(
    arbiter: &Arbiter,
    sense: &mut S,
    take_timeout: Duration,
) -> Result<BatteryReading, BatteryError> {
    let Some(_line) = arbiter.lock_battery(take_timeout).await else {
        return Err(BatteryError::LineTimeout);
    };
    let raw = sense.sample_raw().await?;
    Ok(BatteryReading::from_raw(raw))
}
