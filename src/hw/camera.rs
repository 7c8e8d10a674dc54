//! SPI camera module.
//!
//! The capture device is a self-contained module with an ArduCAM-style
//! command set: one command starts a capture into the module's internal
//! FIFO, a status register reports completion, then the encoded JPEG
//! streams out over SPI. Only the narrow boundary the save worker needs
//! is implemented here.

use embedded_hal::spi::{Operation, SpiDevice};

use crate::error::SaveError;
use crate::tasks::save::Camera;

const CMD_CAPTURE: u8 = 0x10;
const CMD_STATUS: u8 = 0x11;
const CMD_FIFO_LEN: u8 = 0x12;
const CMD_FIFO_READ: u8 = 0x13;

const STATUS_CAPTURE_DONE: u8 = 0x04;

/// Status polls before the capture is declared failed.
const CAPTURE_POLL_LIMIT: u32 = 200_000;

/// Largest JPEG the module is configured to emit.
pub const FRAME_CAPACITY: usize = 32 * 1024;

pub struct SpiCamera<SPI> {
    spi: SPI,
    frame: [u8; FRAME_CAPACITY],
    frame_len: usize,
}

impl<SPI> SpiCamera<SPI>
where
    SPI: SpiDevice,
{
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            frame: [0; FRAME_CAPACITY],
            frame_len: 0,
        }
    }

    fn command(&mut self, cmd: u8) -> Result<(), SaveError> {
        self.spi.write(&[cmd]).map_err(|_| SaveError::Capture)
    }

    fn read_reg(&mut self, cmd: u8) -> Result<u8, SaveError> {
        let mut value = [0u8; 1];
        self.spi
            .transaction(&mut [Operation::Write(&[cmd]), Operation::Read(&mut value)])
            .map_err(|_| SaveError::Capture)?;
        Ok(value[0])
    }

    fn read_fifo_len(&mut self) -> Result<usize, SaveError> {
        let mut len = [0u8; 4];
        self.spi
            .transaction(&mut [Operation::Write(&[CMD_FIFO_LEN]), Operation::Read(&mut len)])
            .map_err(|_| SaveError::Capture)?;
        Ok(u32::from_le_bytes(len) as usize)
    }
}

impl<SPI> Camera for SpiCamera<SPI>
where
    SPI: SpiDevice,
{
    fn capture(&mut self) -> Result<&[u8], SaveError> {
        self.command(CMD_CAPTURE)?;

        let mut polls: u32 = 0;
        while self.read_reg(CMD_STATUS)? & STATUS_CAPTURE_DONE == 0 {
            polls += 1;
            if polls > CAPTURE_POLL_LIMIT {
                return Err(SaveError::Capture);
            }
        }

        let len = self.read_fifo_len()?;
        if len == 0 || len > FRAME_CAPACITY {
            return Err(SaveError::Capture);
        }

        self.spi
            .transaction(&mut [
                Operation::Write(&[CMD_FIFO_READ]),
                Operation::Read(&mut self.frame[..len]),
            ])
            .map_err(|_| SaveError::Capture)?;

        self.frame_len = len;
        Ok(&self.frame[..self.frame_len])
    }

    fn release_frame(&mut self) {
        self.frame_len = 0;
    }
}
