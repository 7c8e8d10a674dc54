//! Battery gauge arithmetic.
//!
//! The sense line reads the cell through a divider that is gated by a
//! control pin (the divider would otherwise drain the battery). Raw ADC
//! counts map linearly to millivolts against the reference; the usable
//! Li-ion window is 3.0 V (empty) to 4.2 V (full).

use crate::config::{ADC_FULL_SCALE, ADC_REF_MV, VBAT_EMPTY_MV, VBAT_FULL_MV};

/// One gauge sample, as delivered by the battery-read worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryReading {
    pub millivolts: u16,
    pub percent: u8,
}

impl BatteryReading {
    pub fn from_raw(raw: u16) -> Self {
        let millivolts = raw_to_millivolts(raw);
        Self {
            millivolts,
            percent: millivolts_to_percent(millivolts),
        }
    }
}

/// Convert a raw 12-bit count to millivolts at the ADC input.
pub fn raw_to_millivolts(raw: u16) -> u16 {
    let raw = raw.min(ADC_FULL_SCALE) as u32;
    (raw * ADC_REF_MV / ADC_FULL_SCALE as u32) as u16
}

/// Map a cell voltage onto 0-100 %, clamped to the usable window.
pub fn millivolts_to_percent(millivolts: u16) -> u8 {
    let mv = millivolts.clamp(VBAT_EMPTY_MV, VBAT_FULL_MV) as u32;
    let span = (VBAT_FULL_MV - VBAT_EMPTY_MV) as u32;
    ((mv - VBAT_EMPTY_MV as u32) * 100 / span) as u8
}
