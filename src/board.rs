use std::cell::RefCell;

use log::{debug, info};

use crate::config::SpiConfig;
use crate::error::Result;
use crate::pins::Board;
use crate::registers::{
    self, Direction, Register, INPUT_PORT, INPUT_PULLUP, IOCON_HAEN, OUTPUT_PORT,
};
use crate::spi::{SpiTransport, SpidevTransport};

/// Number of hardware addresses the opcode can carry. Bring-up always
/// programs the full range regardless of how many boards are fitted.
pub const MAX_BOARDS: u8 = 8;

/// Driver for one SPI bus of PiFace Digital boards.
///
/// Owns the transport for its whole lifetime; dropping the driver (or
/// calling [`PiFaceDigital::deinit`]) releases the device node, and the
/// borrow checker rules out register access after that point.
///
/// Every operation is one or two blocking SPI transactions issued on the
/// calling thread, and port values are never cached: each read hits the
/// bus. The read-modify-write sequences behind `digital_write` and
/// `digital_write_pullup` span two transactions and are not atomic; callers
/// that mutate the same register from several contexts must serialise the
/// whole sequence themselves. The interior `RefCell` only serves the shared
/// pin-item views and does not change that contract.
pub struct PiFaceDigital<T: SpiTransport = SpidevTransport> {
    spi: RefCell<T>,
}

impl PiFaceDigital<SpidevTransport> {
    /// Opens the SPI device and runs the port configuration sequence on
    /// every addressable board.
    pub fn init(config: &SpiConfig) -> Result<Self> {
        let pfd = Self::open(config)?;
        pfd.init_ports()?;
        Ok(pfd)
    }

    /// Opens the SPI device without touching any registers, for callers
    /// that configured the ports out-of-band.
    pub fn open(config: &SpiConfig) -> Result<Self> {
        Ok(Self::with_transport(SpidevTransport::open(config)?))
    }
}

impl<T: SpiTransport> PiFaceDigital<T> {
    /// Builds a driver over an already-open transport.
    pub fn with_transport(spi: T) -> Self {
        PiFaceDigital {
            spi: RefCell::new(spi),
        }
    }

    /// Releases the SPI device. Consumes the driver, so no further register
    /// access can be attempted on a closed handle.
    pub fn deinit(self) {
        info!("SPI device released");
    }

    /// Programs the start-up register configuration for each board index in
    /// turn: hardware addressing on, port A all outputs and driven low,
    /// port B all inputs with pull-ups enabled.
    ///
    /// The sequence never probes for board presence - a probe would flash
    /// the outputs of whatever boards are fitted - so absent addresses are
    /// simply written into the void.
    pub fn init_ports(&self) -> Result<()> {
        for board in 0..MAX_BOARDS {
            self.write_register(Register::IOCON, IOCON_HAEN, board)?;
            self.write_register(Register::GPIOA, 0x00, board)?;
            self.write_register(Register::IODIRA, 0x00, board)?;
            self.write_register(Register::IODIRB, 0xFF, board)?;
            self.write_register(Register::GPPUB, 0xFF, board)?;

            // outputs off once the directions are in place
            self.write_output(0x00, board)?;
        }
        info!("ports initialised on {} board addresses", MAX_BOARDS);
        Ok(())
    }

    /// Reads one register, returning the data byte of the response frame.
    pub fn read_register(&self, register: Register, board: u8) -> Result<u8> {
        let request = registers::frame(registers::opcode(board, Direction::Read), register, 0);
        let response = self.spi.borrow_mut().transfer(&request)?;
        debug!(
            "read  board {} register 0x{:02x} -> 0x{:02x}",
            board, register as u8, response[2]
        );
        Ok(response[2])
    }

    /// Writes one register. Returns the data byte the device clocked back
    /// during the transfer; it is reported as-is, not checked against
    /// `data`.
    pub fn write_register(&self, register: Register, data: u8, board: u8) -> Result<u8> {
        let request = registers::frame(registers::opcode(board, Direction::Write), register, data);
        let response = self.spi.borrow_mut().transfer(&request)?;
        debug!(
            "write board {} register 0x{:02x} <- 0x{:02x}",
            board, register as u8, data
        );
        Ok(response[2])
    }

    /// Returns the output port byte. Outputs are active-high; no inversion.
    pub fn read_output(&self, board: u8) -> Result<u8> {
        self.read_register(OUTPUT_PORT, board)
    }

    /// Returns the input port byte with the hardware's active-low polarity
    /// inverted, so a pressed switch reads as a set bit.
    pub fn read_input(&self, board: u8) -> Result<u8> {
        Ok(self.read_register(INPUT_PORT, board)? ^ 0xFF)
    }

    /// Returns the input pull-up register, uninverted.
    pub fn read_pullup(&self, board: u8) -> Result<u8> {
        self.read_register(INPUT_PULLUP, board)
    }

    /// Replaces the whole output port byte.
    pub fn write_output(&self, data: u8, board: u8) -> Result<u8> {
        self.write_register(OUTPUT_PORT, data, board)
    }

    /// Replaces the whole input pull-up register.
    pub fn write_pullup(&self, data: u8, board: u8) -> Result<u8> {
        self.write_register(INPUT_PULLUP, data, board)
    }

    /// Sets or clears one output pin, leaving the rest of the port
    /// untouched. Read-modify-write: two SPI transactions, no atomicity
    /// across them.
    pub fn digital_write(&self, pin: u8, value: bool, board: u8) -> Result<()> {
        let mask = registers::pin_mask(pin)?;
        let old_values = self.read_output(board)?;
        let new_values = if value {
            old_values | mask
        } else {
            old_values & !mask
        };
        self.write_output(new_values, board)?;
        Ok(())
    }

    /// Returns the logical level of one input pin; the port read is already
    /// polarity-corrected.
    pub fn digital_read(&self, pin: u8, board: u8) -> Result<bool> {
        let mask = registers::pin_mask(pin)?;
        Ok(self.read_input(board)? & mask != 0)
    }

    /// Enables or disables the pull-up on one input pin; same
    /// read-modify-write shape as [`PiFaceDigital::digital_write`].
    pub fn digital_write_pullup(&self, pin: u8, value: bool, board: u8) -> Result<()> {
        let mask = registers::pin_mask(pin)?;
        let old_values = self.read_pullup(board)?;
        let new_values = if value {
            old_values | mask
        } else {
            old_values & !mask
        };
        self.write_pullup(new_values, board)?;
        Ok(())
    }

    /// Returns the pull-up state of one input pin.
    pub fn digital_read_pullup(&self, pin: u8, board: u8) -> Result<bool> {
        let mask = registers::pin_mask(pin)?;
        Ok(self.read_pullup(board)? & mask != 0)
    }

    /// Composes the full pin set of one board index: 8 LEDs, 2 relays,
    /// 4 switches, all delegating to this driver.
    pub fn board(&self, board: u8) -> Result<Board<'_, T>> {
        Board::new(self, board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::spi::mock::MockSpi;

    fn driver() -> (PiFaceDigital<MockSpi>, MockSpi) {
        let spi = MockSpi::default();
        (PiFaceDigital::with_transport(spi.clone()), spi)
    }

    #[test]
    fn test_read_register_returns_data_byte() {
        let (pfd, spi) = driver();
        spi.0.borrow_mut().prime(0, Register::GPIOB as u8, 0x5A);

        assert_eq!(pfd.read_register(Register::GPIOB, 0).unwrap(), 0x5A);
        assert_eq!(spi.0.borrow().sent, vec![[0x41, 0x13, 0x00]]);
    }

    #[test]
    fn test_write_register_frame_and_echo() {
        let (pfd, spi) = driver();

        let echo = pfd.write_register(Register::GPIOA, 0xAA, 0).unwrap();
        assert_eq!(echo, 0xAA);
        assert_eq!(spi.0.borrow().sent, vec![[0x40, 0x12, 0xAA]]);
    }

    #[test]
    fn test_board_index_selects_hardware_address() {
        let (pfd, spi) = driver();

        pfd.write_register(Register::GPIOA, 0x01, 1).unwrap();
        pfd.read_register(Register::GPIOB, 3).unwrap();

        let sent = &spi.0.borrow().sent;
        assert_eq!(sent[0][0], 0x42);
        assert_eq!(sent[1][0], 0x47);
    }

    #[test]
    fn test_read_input_inverts_active_low_port() {
        let (pfd, spi) = driver();
        // all lines electrically high means nothing is pressed
        spi.0.borrow_mut().prime(0, Register::GPIOB as u8, 0xFF);

        assert_eq!(pfd.read_input(0).unwrap(), 0x00);
        for pin in 0..=7 {
            assert!(!pfd.digital_read(pin, 0).unwrap());
        }
    }

    #[test]
    fn test_digital_read_masks_single_pin() {
        let (pfd, spi) = driver();
        // switch 2 pulls its line low
        spi.0.borrow_mut().prime(0, Register::GPIOB as u8, 0xFB);

        assert!(pfd.digital_read(2, 0).unwrap());
        assert!(!pfd.digital_read(0, 0).unwrap());
        assert!(!pfd.digital_read(7, 0).unwrap());
    }

    #[test]
    fn test_digital_write_preserves_other_bits() {
        let (pfd, _spi) = driver();
        pfd.write_output(0b0100_0101, 0).unwrap();

        pfd.digital_write(3, true, 0).unwrap();
        assert_eq!(pfd.read_output(0).unwrap(), 0b0100_1101);

        pfd.digital_write(3, false, 0).unwrap();
        assert_eq!(pfd.read_output(0).unwrap(), 0b0100_0101);
    }

    #[test]
    fn test_digital_write_rejects_bad_pin() {
        let (pfd, spi) = driver();

        assert!(matches!(
            pfd.digital_write(8, true, 0),
            Err(Error::PinRange(8))
        ));
        // the range check fires before any bus traffic
        assert!(spi.0.borrow().sent.is_empty());
    }

    #[test]
    fn test_pullup_read_modify_write() {
        let (pfd, _spi) = driver();
        pfd.write_pullup(0xFF, 0).unwrap();

        pfd.digital_write_pullup(0, false, 0).unwrap();
        assert_eq!(pfd.read_pullup(0).unwrap(), 0xFE);
        assert!(!pfd.digital_read_pullup(0, 0).unwrap());
        assert!(pfd.digital_read_pullup(5, 0).unwrap());
    }

    #[test]
    fn test_init_ports_sequence() {
        let (pfd, spi) = driver();
        pfd.init_ports().unwrap();

        let mut expected = Vec::new();
        for board in 0..MAX_BOARDS {
            let op = 0x40 | (board << 1);
            expected.push([op, 0x0A, 0x08]); // hardware addressing on
            expected.push([op, 0x12, 0x00]); // outputs low
            expected.push([op, 0x00, 0x00]); // port A all outputs
            expected.push([op, 0x01, 0xFF]); // port B all inputs
            expected.push([op, 0x0D, 0xFF]); // input pull-ups on
            expected.push([op, 0x12, 0x00]); // outputs off, final pass
        }
        assert_eq!(spi.0.borrow().sent, expected);
    }

    #[test]
    fn test_output_reads_are_never_cached() {
        let (pfd, spi) = driver();
        pfd.write_output(0x0F, 0).unwrap();

        pfd.read_output(0).unwrap();
        pfd.read_output(0).unwrap();

        // one write plus two reads - every call reached the bus
        assert_eq!(spi.0.borrow().sent.len(), 3);
    }
}
