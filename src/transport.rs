//! Byte transports between the daemon and the RS485 bus

use crate::config::Config;
use crate::error::Result;

pub mod serial;
pub mod simulated;

pub use serial::SerialTransport;
pub use simulated::SimulatedTransport;

/// Non-blocking byte pipe to the inverter.
///
/// Any error returned here is treated as a broken link and ends the daemon.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Everything received since the last call; empty when the bus is quiet.
    async fn read_available(&mut self) -> Result<Vec<u8>>;

    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Short description used in logs and diagnostics
    fn describe(&self) -> String {
        "transport".to_string()
    }
}

/// Open the transport selected by `config`.
pub fn open(config: &Config) -> Result<Box<dyn Transport>> {
    if config.simulate {
        return Ok(Box::new(SimulatedTransport::new()));
    }
    Ok(Box::new(SerialTransport::open(&config.serial)?))
}
