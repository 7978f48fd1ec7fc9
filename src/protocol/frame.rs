use thiserror::Error;

/// Start-of-frame marker
pub const MARKER: [u8; 2] = [0xAA, 0x55];

/// Marker, source, destination, control, function and length byte
pub const HEADER_LEN: usize = 9;
pub const CHECKSUM_LEN: usize = 2;
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_LEN;

/// Largest payload the inverter accepts (100-byte data area minus the checksum)
pub const MAX_PAYLOAD_LEN: usize = 98;

/// Why a received byte sequence is not a usable frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("no data received")]
    NoData,
    #[error("malformed frame: {reason}")]
    Malformed { reason: &'static str },
    #[error("checksum mismatch (expected {expected:#06x}, actual {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },
    #[error("payload of {len} bytes exceeds the maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// A decoded protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub source: [u8; 2],
    pub destination: [u8; 2],
    pub control_code: u8,
    pub function_code: u8,
    pub payload: Vec<u8>,
    pub checksum: u16,
}

impl Frame {
    /// Build a frame, computing its checksum.
    pub fn new(
        source: [u8; 2],
        destination: [u8; 2],
        control_code: u8,
        function_code: u8,
        payload: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let bytes = encode(source, destination, control_code, function_code, &payload)?;
        let checksum = trailing_checksum(&bytes, bytes.len() - CHECKSUM_LEN);
        Ok(Self {
            source,
            destination,
            control_code,
            function_code,
            payload,
            checksum,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        encode(
            self.source,
            self.destination,
            self.control_code,
            self.function_code,
            &self.payload,
        )
    }

    /// Number of bytes the frame occupies on the wire
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.payload.len() + CHECKSUM_LEN
    }

    pub fn is(&self, control_code: u8, function_code: u8) -> bool {
        self.control_code == control_code && self.function_code == function_code
    }
}

/// 16-bit wrapping sum of all bytes.
///
/// The vendor calls this a CRC; it is a plain additive checksum.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, byte| acc.wrapping_add(u16::from(*byte)))
}

fn trailing_checksum(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Serialize a frame to its wire representation.
pub fn encode(
    source: [u8; 2],
    destination: [u8; 2],
    control_code: u8,
    function_code: u8,
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    out.extend_from_slice(&MARKER);
    out.extend_from_slice(&source);
    out.extend_from_slice(&destination);
    out.push(control_code);
    out.push(function_code);
    // bounded by MAX_PAYLOAD_LEN above
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);

    let sum = checksum(&out);
    out.extend_from_slice(&sum.to_be_bytes());
    Ok(out)
}

/// Parse one frame from the start of `bytes`.
///
/// Bytes past the declared frame length are ignored; the serial driver may
/// hand over more than one read's worth of data.
pub fn decode(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::NoData);
    }

    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::Malformed {
            reason: "shorter than minimum frame length",
        });
    }

    if bytes[..2] != MARKER {
        return Err(FrameError::Malformed {
            reason: "start marker not found",
        });
    }

    let payload_len = usize::from(bytes[8]);
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(FrameError::Malformed {
            reason: "declared payload exceeds maximum",
        });
    }
    let body_len = HEADER_LEN + payload_len;
    if body_len + CHECKSUM_LEN > bytes.len() {
        return Err(FrameError::Malformed {
            reason: "declared length exceeds received data",
        });
    }

    let expected = checksum(&bytes[..body_len]);
    let actual = trailing_checksum(bytes, body_len);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    Ok(Frame {
        source: [bytes[2], bytes[3]],
        destination: [bytes[4], bytes[5]],
        control_code: bytes[6],
        function_code: bytes[7],
        payload: bytes[HEADER_LEN..body_len].to_vec(),
        checksum: actual,
    })
}

/// Render bytes as hex, with an extra space before every group of eight.
pub fn hex_dump(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return " No Data".to_string();
    }
    let mut out = String::with_capacity(bytes.len() * 3 + bytes.len() / 8 + 1);
    for (i, byte) in bytes.iter().enumerate() {
        if i % 8 == 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02X} ", byte));
    }
    out
}
