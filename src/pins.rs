//! View types for the things wired to a PiFace Digital board: LEDs, relays
//! and switches.
//!
//! Each item records only its pin and board number and borrows the driver
//! it delegates to; the board's registers remain the single source of
//! truth. Outputs additionally remember the last value written through
//! them, purely so `toggle` has something to flip.

use std::cell::Cell;

use crate::board::PiFaceDigital;
use crate::error::{Error, Result};
use crate::spi::SpiTransport;

/// Uniform access to anything wired to a pin.
///
/// LEDs and relays implement both directions; a switch answers `value` and
/// categorically rejects `set_value` with [`Error::InputDevice`] before any
/// bus traffic happens. The trait exists so a composed pin set can be
/// iterated without caring which variant each entry is.
pub trait PinItem {
    fn value(&self) -> Result<bool>;
    fn set_value(&self, value: bool) -> Result<()>;
}

/// Shared plumbing for the two writable variants.
struct OutputPin<'a, T: SpiTransport> {
    pfd: &'a PiFaceDigital<T>,
    pin: u8,
    board: u8,
    current: Cell<bool>,
}

impl<'a, T: SpiTransport> OutputPin<'a, T> {
    fn new(pfd: &'a PiFaceDigital<T>, pin: u8, board: u8) -> Self {
        OutputPin {
            pfd,
            pin,
            board,
            current: Cell::new(false),
        }
    }

    fn write(&self, value: bool) -> Result<()> {
        self.pfd.digital_write(self.pin, value, self.board)?;
        self.current.set(value);
        Ok(())
    }

    fn toggle(&self) -> Result<()> {
        self.write(!self.current.get())
    }
}

/// One of the eight LEDs on a board (indices 0-7).
pub struct Led<'a, T: SpiTransport>(OutputPin<'a, T>);

impl<'a, T: SpiTransport> Led<'a, T> {
    pub fn new(pfd: &'a PiFaceDigital<T>, led: u8, board: u8) -> Result<Self> {
        if led > 7 {
            return Err(Error::LedRange(led));
        }
        Ok(Led(OutputPin::new(pfd, led, board)))
    }

    pub fn turn_on(&self) -> Result<()> {
        self.0.write(true)
    }

    pub fn turn_off(&self) -> Result<()> {
        self.0.write(false)
    }

    pub fn toggle(&self) -> Result<()> {
        self.0.toggle()
    }
}

impl<T: SpiTransport> PinItem for Led<'_, T> {
    /// Last value written through this item.
    fn value(&self) -> Result<bool> {
        Ok(self.0.current.get())
    }

    fn set_value(&self, value: bool) -> Result<()> {
        self.0.write(value)
    }
}

/// One of the two relays (indices 0-1, sharing output pins 0 and 1).
pub struct Relay<'a, T: SpiTransport>(OutputPin<'a, T>);

impl<'a, T: SpiTransport> Relay<'a, T> {
    pub fn new(pfd: &'a PiFaceDigital<T>, relay: u8, board: u8) -> Result<Self> {
        if relay > 1 {
            return Err(Error::RelayRange(relay));
        }
        Ok(Relay(OutputPin::new(pfd, relay, board)))
    }

    pub fn turn_on(&self) -> Result<()> {
        self.0.write(true)
    }

    pub fn turn_off(&self) -> Result<()> {
        self.0.write(false)
    }

    pub fn toggle(&self) -> Result<()> {
        self.0.toggle()
    }
}

impl<T: SpiTransport> PinItem for Relay<'_, T> {
    fn value(&self) -> Result<bool> {
        Ok(self.0.current.get())
    }

    fn set_value(&self, value: bool) -> Result<()> {
        self.0.write(value)
    }
}

/// One of the four on-board switches (indices 0-3).
pub struct Switch<'a, T: SpiTransport> {
    pfd: &'a PiFaceDigital<T>,
    pin: u8,
    board: u8,
}

impl<'a, T: SpiTransport> Switch<'a, T> {
    pub fn new(pfd: &'a PiFaceDigital<T>, switch: u8, board: u8) -> Result<Self> {
        if switch > 3 {
            return Err(Error::SwitchRange(switch));
        }
        Ok(Switch {
            pfd,
            pin: switch,
            board,
        })
    }
}

impl<T: SpiTransport> PinItem for Switch<'_, T> {
    /// Live state of the switch; a pressed (pulled-down) switch reads true.
    fn value(&self) -> Result<bool> {
        self.pfd.digital_read(self.pin, self.board)
    }

    fn set_value(&self, _value: bool) -> Result<()> {
        Err(Error::InputDevice)
    }
}

/// The full pin set of one board index.
pub struct Board<'a, T: SpiTransport> {
    pub leds: Vec<Led<'a, T>>,
    pub relays: Vec<Relay<'a, T>>,
    pub switches: Vec<Switch<'a, T>>,
    board: u8,
}

impl<'a, T: SpiTransport> Board<'a, T> {
    pub fn new(pfd: &'a PiFaceDigital<T>, board: u8) -> Result<Self> {
        Ok(Board {
            leds: (0..8)
                .map(|i| Led::new(pfd, i, board))
                .collect::<Result<_>>()?,
            relays: (0..2)
                .map(|i| Relay::new(pfd, i, board))
                .collect::<Result<_>>()?,
            switches: (0..4)
                .map(|i| Switch::new(pfd, i, board))
                .collect::<Result<_>>()?,
            board,
        })
    }

    pub fn board_num(&self) -> u8 {
        self.board
    }
}
