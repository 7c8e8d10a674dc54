//! Unified error types for shutterbox.
//!
//! All variants carry only fixed-size data - no `alloc`. `defmt::Format`
//! derives are gated on the `defmt` feature so the host test build stays
//! free of a logging backend.

/// Failure modes of the capture-and-save worker.
///
/// `code()` preserves the numeric scheme of the worker result payload;
/// code 0 (success) lives on the `Ok` side of the result channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SaveError {
    /// Could not obtain the storage composite (display + sense lines).
    BusTimeout,

    /// The card did not answer the initialisation handshake.
    CardInit,

    /// The card answered but no usable volume was found.
    CardMount,

    /// The camera failed to produce a frame.
    Capture,

    /// Opening the target file failed.
    FileOpen,

    /// Writing the frame data failed.
    FileWrite,
}

impl SaveError {
    pub fn code(&self) -> u8 {
        match self {
            SaveError::BusTimeout => 1,
            SaveError::CardInit => 2,
            SaveError::CardMount => 3,
            SaveError::Capture => 4,
            SaveError::FileOpen => 5,
            SaveError::FileWrite => 6,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SaveError::BusTimeout => "failed to take storage lines",
            SaveError::CardInit => "card did not initialise",
            SaveError::CardMount => "no volume on card",
            SaveError::Capture => "camera capture failed",
            SaveError::FileOpen => "failed to open file for writing",
            SaveError::FileWrite => "failed to write file",
        }
    }
}

/// Failure modes of the battery-read worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryError {
    /// Could not obtain the sense line.
    LineTimeout,

    /// The ADC did not deliver a sample.
    Adc,
}

impl BatteryError {
    pub fn code(&self) -> u8 {
        match self {
            BatteryError::LineTimeout => 1,
            BatteryError::Adc => 2,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BatteryError::LineTimeout => "failed to take sense line",
            BatteryError::Adc => "battery sample failed",
        }
    }
}

/// Why a subscriber could not be registered with the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubscribeError {
    /// The fixed-capacity registry is full.
    Full,
}
