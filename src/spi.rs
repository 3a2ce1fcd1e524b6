use log::{debug, info};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

use crate::config::SpiConfig;
use crate::error::{Error, Result};
use crate::registers::FRAME_LEN;

/// One blocking, fixed-length, full-duplex SPI exchange.
///
/// The driver issues every register operation through this trait, so tests
/// substitute a scripted transport and the hardware path stays a single
/// implementation below.
pub trait SpiTransport {
    /// Clocks `tx` out and returns the bytes clocked in. The receive buffer
    /// always has the same length as the request; a failed transfer
    /// surfaces the underlying I/O error with no retry.
    fn transfer(&mut self, tx: &[u8; FRAME_LEN]) -> Result<[u8; FRAME_LEN]>;
}

/// Transport backed by a Linux `spidev` character device.
///
/// Owns the open handle for its whole lifetime; the device is released when
/// the transport is dropped.
pub struct SpidevTransport {
    dev: Spidev,
    device_path: String,
}

impl SpidevTransport {
    /// Opens the SPI device node read-write and applies the bus settings.
    pub fn open(config: &SpiConfig) -> Result<Self> {
        let mut dev = Spidev::open(&config.device).map_err(|e| Error::Init {
            path: config.device.clone(),
            source: e,
        })?;

        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(config.speed_hz)
            .lsb_first(false)
            .mode(SpiModeFlags::from_bits_truncate(config.mode as u32))
            .build();
        dev.configure(&options).map_err(|e| Error::Init {
            path: config.device.clone(),
            source: e,
        })?;

        info!(
            "SPI device {} opened ({} Hz, mode {})",
            config.device, config.speed_hz, config.mode
        );

        Ok(SpidevTransport {
            dev,
            device_path: config.device.clone(),
        })
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl SpiTransport for SpidevTransport {
    fn transfer(&mut self, tx: &[u8; FRAME_LEN]) -> Result<[u8; FRAME_LEN]> {
        let mut rx = [0u8; FRAME_LEN];
        {
            let mut xfer = SpidevTransfer::read_write(tx, &mut rx);
            self.dev.transfer(&mut xfer)?;
        }
        debug!("spi transfer tx={:02x?} rx={:02x?}", tx, rx);
        Ok(rx)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::{FRAME_LEN, Result, SpiTransport};

    /// Everything the mock bus observed: each raw frame in order, plus a
    /// register file emulating one chip per hardware address.
    #[derive(Debug, Default)]
    pub struct BusState {
        pub sent: Vec<[u8; FRAME_LEN]>,
        pub regs: HashMap<(u8, u8), u8>,
    }

    impl BusState {
        pub fn prime(&mut self, board: u8, register: u8, value: u8) {
            self.regs.insert((board, register), value);
        }

        pub fn register(&self, board: u8, register: u8) -> u8 {
            self.regs.get(&(board, register)).copied().unwrap_or(0)
        }
    }

    /// Transport double that behaves like a chain of MCP23S17s: writes land
    /// in the register file, reads return it, and the write data byte is
    /// echoed back the way the real chip does.
    #[derive(Clone, Default)]
    pub struct MockSpi(pub Rc<RefCell<BusState>>);

    impl SpiTransport for MockSpi {
        fn transfer(&mut self, tx: &[u8; FRAME_LEN]) -> Result<[u8; FRAME_LEN]> {
            let mut state = self.0.borrow_mut();
            state.sent.push(*tx);

            let board = (tx[0] >> 1) & 0x07;
            let register = tx[1];
            if tx[0] & 1 == 1 {
                Ok([0, 0, state.register(board, register)])
            } else {
                state.regs.insert((board, register), tx[2]);
                Ok([0, 0, tx[2]])
            }
        }
    }
}
