//! Discovery / query state machine
//!
//! The bus is half duplex: the reply read at the start of a tick answers the
//! request written at the end of the previous one, so every tick classifies
//! the received bytes against the state that sent the last request.

use crate::protocol::{
    self, ACK, CONTROL_READ, CONTROL_REGISTER, FUNCTION_ADDRESS_REPLY, FUNCTION_BROADCAST_REPLY,
    FUNCTION_LIVE_DATA_REPLY, FrameError, InverterSerial, LifetimeCounters, LiveSample,
};
use serde::Serialize;
use thiserror::Error;

/// Which reply the machine is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryState {
    AwaitingBroadcast,
    AwaitingAddressConfirm,
    AwaitingLiveData,
}

impl QueryState {
    /// Consecutive failures tolerated before falling back
    pub fn failure_threshold(self) -> u32 {
        match self {
            QueryState::AwaitingBroadcast => 10,
            QueryState::AwaitingAddressConfirm | QueryState::AwaitingLiveData => 3,
        }
    }

    /// State entered after `failure_threshold` failures.
    ///
    /// A silent bus during discovery goes back to polling live data rather
    /// than retrying the broadcast.
    pub fn fallback(self) -> QueryState {
        match self {
            QueryState::AwaitingBroadcast => QueryState::AwaitingLiveData,
            QueryState::AwaitingAddressConfirm | QueryState::AwaitingLiveData => {
                QueryState::AwaitingBroadcast
            }
        }
    }

    /// State entered after a valid reply
    pub fn advance(self) -> QueryState {
        match self {
            QueryState::AwaitingBroadcast => QueryState::AwaitingAddressConfirm,
            QueryState::AwaitingAddressConfirm | QueryState::AwaitingLiveData => {
                QueryState::AwaitingLiveData
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryState::AwaitingBroadcast => "awaiting_broadcast",
            QueryState::AwaitingAddressConfirm => "awaiting_address_confirm",
            QueryState::AwaitingLiveData => "awaiting_live_data",
        }
    }
}

impl std::fmt::Display for QueryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: QueryState,
    pub error_count: u32,
}

/// Pure state transition for one classified tick.
///
/// A live data success leaves the error count untouched, so failures while
/// polling need not be consecutive to trigger rediscovery.
pub fn transition(state: QueryState, error_count: u32, success: bool) -> Transition {
    if success {
        return match state {
            QueryState::AwaitingLiveData => Transition { state, error_count },
            _ => Transition {
                state: state.advance(),
                error_count: 0,
            },
        };
    }

    let error_count = error_count.saturating_add(1);
    if error_count >= state.failure_threshold() {
        Transition {
            state: state.fallback(),
            error_count: 0,
        }
    } else {
        Transition { state, error_count }
    }
}

/// Online/offline tracking driven by live data receptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnlineMonitor {
    online: bool,
    ticks_since_data: u32,
    timeout: u32,
}

impl OnlineMonitor {
    /// Starts offline with the timeout already expired.
    pub fn new(timeout: u32) -> Self {
        Self {
            online: false,
            ticks_since_data: timeout,
            timeout,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Advance one tick. Returns the new status when it changed.
    pub fn update(&mut self, live_data_received: bool) -> Option<bool> {
        if live_data_received {
            self.ticks_since_data = 0;
        }

        if self.online {
            self.ticks_since_data = self.ticks_since_data.saturating_add(1);
            if self.ticks_since_data >= self.timeout {
                self.online = false;
                return Some(false);
            }
        } else if self.ticks_since_data == 0 {
            self.online = true;
            return Some(true);
        }
        None
    }
}

/// A reply that satisfied the current state
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Serial(InverterSerial),
    AddressConfirmed,
    LiveData(LiveSample),
}

/// Why the current tick counts as a failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryFailure {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("unexpected reply (control {control:#04x}, function {function:#04x})")]
    UnexpectedReply { control: u8, function: u8 },
    #[error("address assignment not acknowledged")]
    NotAcknowledged,
}

/// Everything one tick of the machine produced
#[derive(Debug, Clone)]
pub struct Step {
    /// State the received bytes were classified against
    pub previous: QueryState,
    pub state: QueryState,
    pub outcome: Result<Reply, QueryFailure>,
    /// Decoded telemetry, or an invalid sample
    pub sample: LiveSample,
    pub online_change: Option<bool>,
    /// Request to put on the bus for the new state
    pub transmit: Vec<u8>,
}

/// Owns the protocol state of the single inverter on the bus
#[derive(Debug, Clone)]
pub struct QueryMachine {
    address: u8,
    state: QueryState,
    error_count: u32,
    serial: Option<InverterSerial>,
    lifetime: LifetimeCounters,
    online: OnlineMonitor,
}

impl QueryMachine {
    /// The first tick optimistically polls live data; discovery only starts
    /// after that fails.
    pub fn new(address: u8, online_timeout: u32) -> Self {
        Self {
            address,
            state: QueryState::AwaitingLiveData,
            error_count: 0,
            serial: None,
            lifetime: LifetimeCounters::default(),
            online: OnlineMonitor::new(online_timeout),
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn serial(&self) -> Option<&InverterSerial> {
        self.serial.as_ref()
    }

    pub fn is_online(&self) -> bool {
        self.online.is_online()
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Request frame for the current state
    pub fn request(&self) -> Result<Vec<u8>, FrameError> {
        match self.state {
            QueryState::AwaitingBroadcast => protocol::broadcast_query(),
            QueryState::AwaitingAddressConfirm => protocol::address_assignment(
                &self.serial.unwrap_or_default(),
                self.address,
            ),
            QueryState::AwaitingLiveData => protocol::live_data_query(self.address),
        }
    }

    /// Classify `received`, update state and online status, and produce the
    /// next request.
    pub fn step(&mut self, received: &[u8]) -> Result<Step, FrameError> {
        let previous = self.state;
        let outcome = self.classify(received);

        let mut sample = LiveSample::invalid();
        match &outcome {
            Ok(Reply::Serial(serial)) => self.serial = Some(*serial),
            Ok(Reply::LiveData(decoded)) => sample = *decoded,
            _ => {}
        }

        let next = transition(self.state, self.error_count, outcome.is_ok());
        self.state = next.state;
        self.error_count = next.error_count;

        let online_change = self.online.update(sample.valid);
        let transmit = self.request()?;

        Ok(Step {
            previous,
            state: self.state,
            outcome,
            sample,
            online_change,
            transmit,
        })
    }

    fn classify(&mut self, received: &[u8]) -> Result<Reply, QueryFailure> {
        let frame = protocol::decode(received)?;
        let unexpected = || QueryFailure::UnexpectedReply {
            control: frame.control_code,
            function: frame.function_code,
        };

        match self.state {
            QueryState::AwaitingBroadcast => {
                if !frame.is(CONTROL_REGISTER, FUNCTION_BROADCAST_REPLY) {
                    return Err(unexpected());
                }
                InverterSerial::from_payload(&frame.payload)
                    .map(Reply::Serial)
                    .ok_or(QueryFailure::Frame(FrameError::Malformed {
                        reason: "broadcast reply without serial number",
                    }))
            }
            QueryState::AwaitingAddressConfirm => {
                if !frame.is(CONTROL_REGISTER, FUNCTION_ADDRESS_REPLY) {
                    return Err(unexpected());
                }
                if frame.payload.first() != Some(&ACK) {
                    return Err(QueryFailure::NotAcknowledged);
                }
                Ok(Reply::AddressConfirmed)
            }
            QueryState::AwaitingLiveData => {
                if !frame.is(CONTROL_READ, FUNCTION_LIVE_DATA_REPLY) {
                    return Err(unexpected());
                }
                let sample = protocol::decode_live_data(&frame.payload, &mut self.lifetime)?;
                Ok(Reply::LiveData(sample))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode;

    fn run_failures(mut state: QueryState, mut count: u32, n: usize) -> (QueryState, u32) {
        for _ in 0..n {
            let t = transition(state, count, false);
            state = t.state;
            count = t.error_count;
        }
        (state, count)
    }

    #[test]
    fn live_data_falls_back_to_broadcast_after_three_failures() {
        assert_eq!(
            run_failures(QueryState::AwaitingLiveData, 0, 2),
            (QueryState::AwaitingLiveData, 2)
        );
        assert_eq!(
            run_failures(QueryState::AwaitingLiveData, 0, 3),
            (QueryState::AwaitingBroadcast, 0)
        );
    }

    #[test]
    fn broadcast_falls_back_to_live_data_after_ten_failures() {
        assert_eq!(
            run_failures(QueryState::AwaitingBroadcast, 0, 9),
            (QueryState::AwaitingBroadcast, 9)
        );
        assert_eq!(
            run_failures(QueryState::AwaitingBroadcast, 0, 10),
            (QueryState::AwaitingLiveData, 0)
        );
    }

    #[test]
    fn address_confirm_falls_back_to_broadcast() {
        assert_eq!(
            run_failures(QueryState::AwaitingAddressConfirm, 0, 3),
            (QueryState::AwaitingBroadcast, 0)
        );
    }

    #[test]
    fn successes_walk_through_discovery() {
        let t = transition(QueryState::AwaitingBroadcast, 4, true);
        assert_eq!(t.state, QueryState::AwaitingAddressConfirm);
        assert_eq!(t.error_count, 0);

        let t = transition(QueryState::AwaitingAddressConfirm, 2, true);
        assert_eq!(t.state, QueryState::AwaitingLiveData);
        assert_eq!(t.error_count, 0);
    }

    #[test]
    fn live_data_success_keeps_error_count() {
        let t = transition(QueryState::AwaitingLiveData, 2, true);
        assert_eq!(t.state, QueryState::AwaitingLiveData);
        assert_eq!(t.error_count, 2);
        assert_eq!(
            transition(t.state, t.error_count, false).state,
            QueryState::AwaitingBroadcast
        );
    }

    #[test]
    fn online_monitor_needs_live_data_to_come_online() {
        let mut m = OnlineMonitor::new(30);
        assert!(!m.is_online());
        for _ in 0..100 {
            assert_eq!(m.update(false), None);
        }
        assert_eq!(m.update(true), Some(true));
        assert!(m.is_online());
    }

    #[test]
    fn online_monitor_times_out_after_thirty_silent_ticks() {
        let mut m = OnlineMonitor::new(30);
        m.update(true);
        for _ in 0..29 {
            assert_eq!(m.update(false), None);
        }
        assert_eq!(m.update(false), Some(false));
        assert!(!m.is_online());
    }

    #[test]
    fn machine_starts_polling_live_data() {
        let m = QueryMachine::new(0x0A, 30);
        assert_eq!(m.state(), QueryState::AwaitingLiveData);
        assert_eq!(m.request().unwrap(), protocol::live_data_query(0x0A).unwrap());
    }

    #[test]
    fn wrong_function_code_is_a_failure() {
        let mut m = QueryMachine::new(0x0A, 30);
        let reply = encode([0, 0x0A], [1, 0], CONTROL_READ, 0x83, &[0u8; 50]).unwrap();
        let step = m.step(&reply).unwrap();
        assert_eq!(
            step.outcome,
            Err(QueryFailure::UnexpectedReply {
                control: CONTROL_READ,
                function: 0x83
            })
        );
        assert!(!step.sample.valid);
        assert_eq!(m.error_count(), 1);
    }

    #[test]
    fn missing_ack_byte_is_a_failure() {
        let mut m = QueryMachine::new(0x0A, 30);
        for _ in 0..3 {
            m.step(&[]).unwrap();
        }
        let serial = encode(
            [0, 0xFF],
            [1, 0],
            CONTROL_REGISTER,
            FUNCTION_BROADCAST_REPLY,
            b"SERIAL00000001",
        )
        .unwrap();
        m.step(&serial).unwrap();
        assert_eq!(m.state(), QueryState::AwaitingAddressConfirm);

        let nak = encode([0, 0x0A], [0, 0], CONTROL_REGISTER, FUNCTION_ADDRESS_REPLY, &[0x15])
            .unwrap();
        let step = m.step(&nak).unwrap();
        assert_eq!(step.outcome, Err(QueryFailure::NotAcknowledged));
        assert_eq!(m.error_count(), 1);
    }
}
