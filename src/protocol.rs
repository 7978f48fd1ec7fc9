//! SolaX X1 Mini RS485 wire protocol
//!
//! Frames on the bus look like
//! `AA 55 | src(2) | dst(2) | control | function | len | payload[len] | sum(2)`
//! where `sum` is the big-endian 16-bit additive checksum of everything before
//! it. The daemon only ever speaks three requests and expects three replies:
//!
//! | request              | control | function | reply function |
//! |----------------------|---------|----------|----------------|
//! | broadcast (discover) | `0x10`  | `0x00`   | `0x80`         |
//! | address assignment   | `0x10`  | `0x01`   | `0x81`         |
//! | live data query      | `0x11`  | `0x02`   | `0x82`         |

pub mod faults;
pub mod frame;
pub mod telemetry;

pub use faults::{FAULT_NAMES, active_faults};
pub use frame::{Frame, FrameError, checksum, decode, encode, hex_dump};
pub use telemetry::{LifetimeCounters, LiveSample, decode_live_data};

/// Control code for registration requests (broadcast and address assignment)
pub const CONTROL_REGISTER: u8 = 0x10;
/// Control code for read requests
pub const CONTROL_READ: u8 = 0x11;

pub const FUNCTION_BROADCAST: u8 = 0x00;
pub const FUNCTION_ASSIGN_ADDRESS: u8 = 0x01;
pub const FUNCTION_QUERY_LIVE_DATA: u8 = 0x02;

pub const FUNCTION_BROADCAST_REPLY: u8 = 0x80;
pub const FUNCTION_ADDRESS_REPLY: u8 = 0x81;
pub const FUNCTION_LIVE_DATA_REPLY: u8 = 0x82;

/// First payload byte of a positive address confirmation
pub const ACK: u8 = 0x06;

/// Length of the serial number carried by the broadcast reply
pub const SERIAL_LEN: usize = 14;

/// Source address used by the master for broadcast and read requests
const MASTER_ADDRESS: [u8; 2] = [0x01, 0x00];

/// Serial number of the inverter, as reported in the broadcast reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InverterSerial([u8; SERIAL_LEN]);

impl InverterSerial {
    pub fn new(bytes: [u8; SERIAL_LEN]) -> Self {
        Self(bytes)
    }

    /// Take the serial number from the start of a broadcast reply payload
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let bytes: [u8; SERIAL_LEN] = payload.get(..SERIAL_LEN)?.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SERIAL_LEN] {
        &self.0
    }
}

impl std::fmt::Display for InverterSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text: String = self
            .0
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| {
                if b.is_ascii_graphic() || *b == b' ' {
                    char::from(*b)
                } else {
                    '.'
                }
            })
            .collect();
        f.write_str(&text)
    }
}

/// Broadcast request asking any unregistered inverter to report its serial
pub fn broadcast_query() -> Result<Vec<u8>, FrameError> {
    encode(
        MASTER_ADDRESS,
        [0x00, 0x00],
        CONTROL_REGISTER,
        FUNCTION_BROADCAST,
        &[],
    )
}

/// Address assignment binding `serial` to bus `address`
pub fn address_assignment(serial: &InverterSerial, address: u8) -> Result<Vec<u8>, FrameError> {
    let mut payload = Vec::with_capacity(SERIAL_LEN + 1);
    payload.extend_from_slice(serial.as_bytes());
    payload.push(address);
    encode(
        [0x00, 0x00],
        [0x00, 0x00],
        CONTROL_REGISTER,
        FUNCTION_ASSIGN_ADDRESS,
        &payload,
    )
}

/// Live data request for the inverter registered at `address`
pub fn live_data_query(address: u8) -> Result<Vec<u8>, FrameError> {
    encode(
        MASTER_ADDRESS,
        [0x00, address],
        CONTROL_READ,
        FUNCTION_QUERY_LIVE_DATA,
        &[],
    )
}
