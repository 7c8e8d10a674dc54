//! Capture-and-save worker.
//!
//! Grabs the storage composite, mounts the card, pulls one encoded frame
//! from the camera, writes it to the fixed path and reports. Any failure
//! short-circuits into the same cleanup: frame returned to the driver,
//! card closed, lines freed, one result sent.

use embassy_time::Duration;

use super::{OpFlag, SaveResultChannel};
use crate::arbiter::Arbiter;
use crate::config::SAVE_PATH;
use crate::error::SaveError;

/// Capture device boundary.
///
/// `capture` hands out the encoded frame; the buffer stays owned by the
/// driver until `release_frame` returns it.
pub trait Camera {
    fn capture(&mut self) -> Result<&[u8], SaveError>;

    /// Return the frame buffer to the driver. Harmless when no frame is
    /// outstanding.
    fn release_frame(&mut self);
}

/// Removable-card boundary.
pub trait StorageCard {
    fn mount(&mut self) -> Result<(), SaveError>;

    fn write_jpeg(&mut self, name: &str, data: &[u8]) -> Result<(), SaveError>;

    fn unmount(&mut self);
}

/// Worker body: one capture+save, exactly one result, flag cleared last.
///
/// The caller must have claimed `flag` (via [`OpFlag::try_begin`]) before
/// invoking this. The returned copy of the outcome is for the spawn site's
/// log; the authoritative delivery is the channel send.
pub async fn run_image_save<C: Camera, S: StorageCard>(
    arbiter: &Arbiter,
    camera: &mut C,
    card: &mut S,
    flag: &OpFlag,
    results: &SaveResultChannel,
    take_timeout: Duration,
) -> Result<(), SaveError> {
    let outcome = save_once(arbiter, camera, card, take_timeout).await;
    let _ = results.try_send(outcome);
    flag.clear();
    outcome
}

async fn save_once<C: Camera, S: StorageCard>(
    arbiter: &Arbiter,
    camera: &mut C,
    card: &mut S,
    take_timeout: Duration,
) -> Result<(), SaveError> {
    let Some(_lines) = arbiter.lock_storage(take_timeout).await else {
        return Err(SaveError::BusTimeout);
    };

    card.mount()?;

    let written = match camera.capture() {
        Ok(frame) => card.write_jpeg(SAVE_PATH, frame),
        Err(e) => Err(e),
    };

    // the frame buffer goes back to the driver before anything is reported
    camera.release_frame();
    card.unmount();

    written
    // _lines drops here: sense rail released first, display lines last
}
