//! Fixed-point decoding of the live data reply (`0x11`/`0x82`)

use super::frame::FrameError;
use serde::{Deserialize, Serialize};

/// Bytes a live data payload must hold for every decoded field (offset 49 is the last)
pub const LIVE_DATA_MIN_LEN: usize = 50;

/// One telemetry reading.
///
/// An invalid sample has every field zeroed and stands for "no reading this tick".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    pub valid: bool,
    /// °C
    pub temperature: f32,
    /// kWh
    pub energy_today: f32,
    /// V
    pub dc1_voltage: f32,
    /// V
    pub dc2_voltage: f32,
    /// A
    pub dc1_current: f32,
    /// A
    pub dc2_current: f32,
    /// A
    pub ac_current: f32,
    /// V
    pub ac_voltage: f32,
    /// Hz
    pub frequency: f32,
    /// W
    pub power: f32,
    /// kWh, lifetime
    pub energy_total: f32,
    /// hours, lifetime
    pub runtime_total: f32,
    pub status: u8,
    pub error_bits: u32,
}

impl LiveSample {
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Last known nonzero lifetime counters.
///
/// The inverter occasionally reports zero for its lifetime totals (e.g. while
/// starting up at dawn); those readings must not reset the published values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LifetimeCounters {
    pub energy_total: f32,
    pub runtime_total: f32,
}

fn be_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

fn be_u32(payload: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}

fn scaled(raw: u16, factor: f32) -> f32 {
    f32::from(raw) * factor
}

/// Decode a live data payload.
///
/// Control/function codes and checksum must already have been checked by the
/// caller. The only thing refused here is a payload too short to index.
pub fn decode_live_data(
    payload: &[u8],
    lifetime: &mut LifetimeCounters,
) -> Result<LiveSample, FrameError> {
    if payload.len() < LIVE_DATA_MIN_LEN {
        return Err(FrameError::Malformed {
            reason: "live data payload too short",
        });
    }

    let energy_total_raw = be_u32(payload, 22);
    if energy_total_raw != 0 {
        lifetime.energy_total = energy_total_raw as f32 * 0.1;
    }

    let runtime_total_raw = be_u32(payload, 26);
    if runtime_total_raw != 0 {
        lifetime.runtime_total = runtime_total_raw as f32;
    }

    // bytes 20..22 and 32..46 are vendor fields this daemon does not publish

    Ok(LiveSample {
        valid: true,
        temperature: f32::from(be_u16(payload, 0)),
        energy_today: scaled(be_u16(payload, 2), 0.1),
        dc1_voltage: scaled(be_u16(payload, 4), 0.1),
        dc2_voltage: scaled(be_u16(payload, 6), 0.1),
        dc1_current: scaled(be_u16(payload, 8), 0.1),
        dc2_current: scaled(be_u16(payload, 10), 0.1),
        ac_current: scaled(be_u16(payload, 12), 0.1),
        ac_voltage: scaled(be_u16(payload, 14), 0.1),
        frequency: scaled(be_u16(payload, 16), 0.01),
        power: f32::from(be_u16(payload, 18)),
        energy_total: lifetime.energy_total,
        runtime_total: lifetime.runtime_total,
        status: payload[31],
        // the only little-endian field in the reply
        error_bits: u32::from_le_bytes([payload[46], payload[47], payload[48], payload[49]]),
    })
}
