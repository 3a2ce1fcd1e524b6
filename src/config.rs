use serde::{Deserialize, Serialize};

/// SPI bus settings for the PiFace Digital board.
///
/// The defaults match the board's wiring on a Raspberry Pi: chip-select 0
/// on bus 0, SPI mode 0. A YAML file with the same shape can override them
/// for non-standard setups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiConfig {
    pub device: String,
    pub speed_hz: u32,
    pub mode: u8,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            device: "/dev/spidev0.0".to_string(),
            speed_hz: 1_000_000,
            mode: 0,
        }
    }
}
