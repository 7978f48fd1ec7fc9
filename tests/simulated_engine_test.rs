use solaxd::config::InverterConfig;
use solaxd::engine::{InverterEngine, QueryState};
use solaxd::error::{Result, SolaxError};
use solaxd::transport::{SimulatedTransport, Transport};
use std::time::Duration;

fn inverter() -> InverterConfig {
    InverterConfig {
        address: 0x0A,
        average_samples: 10,
    }
}

#[tokio::test]
async fn simulated_bus_comes_online_after_discovery_timeout() {
    let mut engine = InverterEngine::new(&inverter(), Box::new(SimulatedTransport::new()));

    // three failed live data polls, then ten failed broadcasts
    for _ in 0..3 {
        engine.tick().await.unwrap();
    }
    assert_eq!(engine.query_state(), QueryState::AwaitingBroadcast);
    for _ in 0..10 {
        engine.tick().await.unwrap();
    }
    assert_eq!(engine.query_state(), QueryState::AwaitingLiveData);
    assert!(!engine.is_online());

    engine.tick().await.unwrap();
    assert!(engine.is_online());

    for _ in 0..20 {
        engine.tick().await.unwrap();
    }
    let snap = engine.current_snapshot();
    assert!(snap.online);
    assert_eq!(snap.total_ticks, 34);
    assert_eq!(snap.samples_averaged, 11);
    assert!((snap.quality_of_service - 0.21).abs() < 1e-6);
    // 487 W and 471 W alternate
    assert!(snap.live_data.power > 470.0 && snap.live_data.power < 488.0);
    assert_eq!(snap.to_document()["inverter"]["live_data"]["status"], 2);
}

/// Replies with nothing until `fail_after` reads, then fails
struct FlakyTransport {
    reads: usize,
    fail_after: usize,
}

#[async_trait::async_trait]
impl Transport for FlakyTransport {
    async fn read_available(&mut self) -> Result<Vec<u8>> {
        self.reads += 1;
        if self.reads > self.fail_after {
            return Err(SolaxError::io("read failed"));
        }
        Ok(Vec::new())
    }

    async fn write(&mut self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn run_stops_on_transport_failure() {
    let mut engine = InverterEngine::new(
        &inverter(),
        Box::new(FlakyTransport {
            reads: 0,
            fail_after: 5,
        }),
    );
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        engine.run(Duration::from_millis(1)),
    )
    .await
    .expect("run did not stop");

    let err = result.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(engine.total_ticks(), 5);
    assert_eq!(engine.current_snapshot().total_ticks, 5);
}
