//! Removable card over SPI with a FAT volume.
//!
//! No RTC on the board; file timestamps are fixed.

use embedded_sdmmc::{Mode, SdCard, TimeSource, Timestamp, VolumeIdx, VolumeManager};

use crate::error::SaveError;
use crate::tasks::save::StorageCard;

#[derive(Default, Clone, Copy)]
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 56,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdStorage<SPI, D>
where
    SPI: embedded_hal::spi::SpiDevice,
    D: embedded_hal::delay::DelayNs,
{
    volume_mgr: VolumeManager<SdCard<SPI, D>, FixedTimeSource>,
}

impl<SPI, D> SdStorage<SPI, D>
where
    SPI: embedded_hal::spi::SpiDevice,
    D: embedded_hal::delay::DelayNs,
{
    pub fn new(spi: SPI, delay: D) -> Self {
        let card = SdCard::new(spi, delay);
        Self {
            volume_mgr: VolumeManager::new(card, FixedTimeSource),
        }
    }
}

impl<SPI, D> StorageCard for SdStorage<SPI, D>
where
    SPI: embedded_hal::spi::SpiDevice,
    D: embedded_hal::delay::DelayNs,
{
    fn mount(&mut self) -> Result<(), SaveError> {
        // the card may have been swapped since the last capture; force a
        // fresh init handshake
        self.volume_mgr.device().mark_card_uninit();

        if self.volume_mgr.device().num_bytes().is_err() {
            return Err(SaveError::CardInit);
        }

        match self.volume_mgr.open_volume(VolumeIdx(0)) {
            Ok(_) => Ok(()),
            Err(_) => Err(SaveError::CardMount),
        }
    }

    fn write_jpeg(&mut self, name: &str, data: &[u8]) -> Result<(), SaveError> {
        let mut volume = self
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(|_| SaveError::CardMount)?;
        let mut root = volume.open_root_dir().map_err(|_| SaveError::FileOpen)?;
        let mut file = root
            .open_file_in_dir(name, Mode::ReadWriteCreateOrTruncate)
            .map_err(|_| SaveError::FileOpen)?;

        file.write(data).map_err(|_| SaveError::FileWrite)?;
        file.flush().map_err(|_| SaveError::FileWrite)?;
        Ok(())
    }

    fn unmount(&mut self) {
        // volume, directory and file handles are all scoped to the calls
        // above; nothing persistent to tear down
    }
}
