//! User-space driver for the PiFace Digital I/O expander board.
//!
//! The board is an MCP23S17-class SPI GPIO expander wired to eight LEDs,
//! two relays and four switches. This crate owns the Linux `spidev`
//! character device and speaks the chip's 3-byte register protocol:
//! an opcode byte carrying the hardware address and transfer direction,
//! a register address byte, and a data byte.
//!
//! Up to eight boards share the bus through the chip's hardware address
//! pins. All access is synchronous and blocking; the driver performs no
//! internal locking, so concurrent read-modify-write sequences against the
//! same register must be serialised by the caller.

pub mod board;
pub mod config;
pub mod error;
pub mod pins;
pub mod registers;
pub mod spi;

// Re-export the main types for convenience
pub use board::{PiFaceDigital, MAX_BOARDS};
pub use config::SpiConfig;
pub use error::{Error, Result};
pub use pins::{Board, Led, PinItem, Relay, Switch};
pub use registers::{Direction, Register};
pub use spi::{SpiTransport, SpidevTransport};
