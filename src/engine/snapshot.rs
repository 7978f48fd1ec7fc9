use super::state::QueryState;
use crate::protocol::{LiveSample, active_faults};
use serde::Serialize;

/// State published to readers after every tick
#[derive(Debug, Clone, Serialize)]
pub struct PublicSnapshot {
    pub timestamp: String,
    pub address: u8,
    pub online: bool,
    pub quality_of_service: f32,
    /// Windowed average of the most recent valid samples
    pub live_data: LiveSample,
    pub samples_averaged: usize,
    pub query_state: QueryState,
    pub error_count: u32,
    pub serial: Option<String>,
    pub total_ticks: u64,
}

fn round_to(value: f32, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (f64::from(value) * factor).round() / factor
}

impl PublicSnapshot {
    /// Snapshot served before the first tick completes
    pub fn initial(address: u8) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            address,
            online: false,
            quality_of_service: 0.0,
            live_data: LiveSample::invalid(),
            samples_averaged: 0,
            query_state: QueryState::AwaitingLiveData,
            error_count: 0,
            serial: None,
            total_ticks: 0,
        }
    }

    /// The public JSON document.
    ///
    /// Field names and rounding are fixed; consumers parse this directly.
    pub fn to_document(&self) -> serde_json::Value {
        let d = &self.live_data;
        serde_json::json!({
            "inverter": {
                "address": self.address,
                "online": u8::from(self.online),
                "quality_of_service": round_to(self.quality_of_service, 2),
                "live_data": {
                    "temperature": round_to(d.temperature, 0),
                    "dc1_voltage": round_to(d.dc1_voltage, 1),
                    "dc1_current": round_to(d.dc1_current, 1),
                    "dc2_voltage": round_to(d.dc2_voltage, 1),
                    "dc2_current": round_to(d.dc2_current, 1),
                    "ac_voltage": round_to(d.ac_voltage, 1),
                    "ac_current": round_to(d.ac_current, 1),
                    "frequency": round_to(d.frequency, 2),
                    "power": round_to(d.power, 0),
                    "energy_today": round_to(d.energy_today, 1),
                    "energy_total": round_to(d.energy_total, 1),
                    "runtime_total": round_to(d.runtime_total, 0),
                    "status": d.status,
                    "error_bits": d.error_bits,
                }
            }
        })
    }

    pub fn active_faults(&self) -> Vec<&'static str> {
        active_faults(self.live_data.error_bits)
    }

    /// Daemon-side view of the bus
    pub fn diagnostics(&self) -> serde_json::Value {
        serde_json::json!({
            "timestamp": self.timestamp,
            "address": self.address,
            "online": self.online,
            "query_state": self.query_state,
            "error_count": self.error_count,
            "serial": self.serial,
            "total_ticks": self.total_ticks,
            "samples_averaged": self.samples_averaged,
            "quality_of_service": self.quality_of_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_rounds_and_names_fields() {
        let mut snap = PublicSnapshot::initial(0x0A);
        snap.online = true;
        snap.quality_of_service = 0.456;
        snap.live_data = LiveSample {
            valid: true,
            temperature: 41.6,
            energy_today: 1.04,
            dc1_voltage: 175.73,
            frequency: 49.987,
            power: 486.6,
            runtime_total: 2575.4,
            status: 2,
            error_bits: 0x2000,
            ..LiveSample::default()
        };

        let doc = snap.to_document();
        let inv = &doc["inverter"];
        assert_eq!(inv["address"], 10);
        assert_eq!(inv["online"], 1);
        assert_eq!(inv["quality_of_service"], 0.46);
        let live = &inv["live_data"];
        assert_eq!(live["temperature"], 42.0);
        assert_eq!(live["energy_today"], 1.0);
        assert_eq!(live["dc1_voltage"], 175.7);
        assert_eq!(live["frequency"], 49.99);
        assert_eq!(live["power"], 487.0);
        assert_eq!(live["runtime_total"], 2575.0);
        assert_eq!(live["status"], 2);
        assert_eq!(live["error_bits"], 8192);
        assert_eq!(live.as_object().unwrap().len(), 14);
        assert_eq!(snap.active_faults(), vec!["Over Temperature Fault"]);
    }

    #[test]
    fn initial_document_is_offline_and_zeroed() {
        let doc = PublicSnapshot::initial(7).to_document();
        assert_eq!(doc["inverter"]["online"], 0);
        assert_eq!(doc["inverter"]["quality_of_service"], 0.0);
        assert_eq!(doc["inverter"]["live_data"]["power"], 0.0);
    }
}
