use thiserror::Error;

/// Errors raised by the PiFace Digital driver.
///
/// None of these are retried internally; every failure aborts the register
/// operation in progress and surfaces to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The SPI device node could not be opened or configured.
    #[error("failed to initialise SPI device {path}")]
    Init {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Pin number outside the 0-7 range of one expander port.
    #[error("specified pin number ({0}) out of range")]
    PinRange(u8),

    /// LED index outside 0-7.
    #[error("specified LED index ({0}) out of range")]
    LedRange(u8),

    /// Relay index outside 0-1.
    #[error("specified relay index ({0}) out of range")]
    RelayRange(u8),

    /// Switch index outside 0-3.
    #[error("specified switch index ({0}) out of range")]
    SwitchRange(u8),

    /// A value was written to an input-only pin item.
    #[error("you cannot set an input's value")]
    InputDevice,

    /// An SPI transfer failed; the underlying I/O error is passed through
    /// unmodified.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
