//! Replays captured inverter replies instead of talking to hardware.
//!
//! Reads cycle: nothing, broadcast reply, address confirmation, then the two
//! live data replies forever.

use super::Transport;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::protocol::hex_dump;

/// Broadcast reply carrying serial "12345677654321"
pub const RX_BROADCAST_REPLY: [u8; 25] = [
    0xAA, 0x55, 0x00, 0xFF, 0x01, 0x00, 0x10, 0x80, 0x0E, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37,
    0x37, 0x36, 0x35, 0x34, 0x33, 0x32, 0x31, 0x05, 0x75,
];

/// Positive address confirmation
pub const RX_ADDRESS_REPLY: [u8; 12] = [
    0xAA, 0x55, 0x00, 0x0A, 0x00, 0x00, 0x10, 0x81, 0x01, 0x06, 0x01, 0xA1,
];

/// Live data reply, 487 W
pub const RX_LIVE_DATA_1: [u8; 61] = [
    0xAA, 0x55, 0x00, 0x0A, 0x01, 0x00, 0x11, 0x82, 0x32, 0x00, 0x0B, 0x00, 0x01, 0x06, 0xDD, 0x00,
    0x00, 0x00, 0x1F, 0x00, 0x00, 0x00, 0x15, 0x09, 0x21, 0x13, 0x87, 0x01, 0xE7, 0xFF, 0xFF, 0x00,
    0x00, 0x12, 0xD3, 0x00, 0x00, 0x0A, 0x0F, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, 0x9C,
];

/// Live data reply, 471 W
pub const RX_LIVE_DATA_2: [u8; 61] = [
    0xAA, 0x55, 0x00, 0x0A, 0x01, 0x00, 0x11, 0x82, 0x32, 0x00, 0x0B, 0x00, 0x01, 0x06, 0xCB, 0x00,
    0x00, 0x00, 0x1E, 0x00, 0x00, 0x00, 0x14, 0x09, 0x22, 0x13, 0x89, 0x01, 0xD7, 0xFF, 0xFF, 0x00,
    0x00, 0x12, 0xD3, 0x00, 0x00, 0x0A, 0x0F, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, 0x7B,
];

/// Transport serving the captured replies in a fixed cycle
pub struct SimulatedTransport {
    reads: u8,
    written: Vec<Vec<u8>>,
    logger: StructuredLogger,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self {
            reads: 0,
            written: Vec::new(),
            logger: get_logger("simulated"),
        }
    }

    /// Frames written so far, oldest first
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }
}

#[async_trait::async_trait]
impl Transport for SimulatedTransport {
    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let reply: &[u8] = match self.reads {
            1 => &RX_BROADCAST_REPLY,
            2 => &RX_ADDRESS_REPLY,
            3 => &RX_LIVE_DATA_1,
            4 => &RX_LIVE_DATA_2,
            _ => &[],
        };
        self.reads += 1;
        if self.reads > 4 {
            self.reads = 3;
        }
        self.logger.trace(&format!("SimRx:{}", hex_dump(reply)));
        Ok(reply.to_vec())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.logger.trace(&format!("SimTx:{}", hex_dump(bytes)));
        self.written.push(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "simulated".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode;

    #[test]
    fn captured_replies_have_valid_checksums() {
        for bytes in [
            &RX_BROADCAST_REPLY[..],
            &RX_ADDRESS_REPLY[..],
            &RX_LIVE_DATA_1[..],
            &RX_LIVE_DATA_2[..],
        ] {
            assert!(decode(bytes).is_ok());
        }
    }

    #[tokio::test]
    async fn read_cycle_repeats_live_data() {
        let mut t = SimulatedTransport::new();
        assert!(t.read_available().await.unwrap().is_empty());
        assert_eq!(t.read_available().await.unwrap(), RX_BROADCAST_REPLY);
        assert_eq!(t.read_available().await.unwrap(), RX_ADDRESS_REPLY);
        for _ in 0..3 {
            assert_eq!(t.read_available().await.unwrap(), RX_LIVE_DATA_1);
            assert_eq!(t.read_available().await.unwrap(), RX_LIVE_DATA_2);
        }
    }
}
