//! Polling engine
//!
//! One tick reads whatever the inverter sent since the previous tick, feeds
//! it to the [`QueryMachine`], writes the next request, records the sample in
//! the [`History`] and publishes a fresh [`PublicSnapshot`].

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};

use crate::config::InverterConfig;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::protocol::{LiveSample, active_faults};
use crate::transport::Transport;

pub mod history;
pub mod snapshot;
pub mod state;

pub use history::{Aggregate, HISTORY_CAPACITY, History};
pub use snapshot::PublicSnapshot;
pub use state::{QueryFailure, QueryMachine, QueryState, Reply, Step};

/// Ticks without live data before the inverter is reported offline
pub const ONLINE_TIMEOUT_TICKS: u32 = 30;

/// Drives the bus and owns all inverter state
pub struct InverterEngine {
    machine: QueryMachine,
    history: History,
    transport: Box<dyn Transport>,
    snapshot_tx: watch::Sender<Arc<PublicSnapshot>>,
    logger: StructuredLogger,
    total_ticks: u64,
    last_error_bits: u32,
}

impl InverterEngine {
    pub fn new(config: &InverterConfig, transport: Box<dyn Transport>) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("engine")
                .with_inverter_address(config.address)
                .with_field("transport", transport.describe()),
        );
        let (snapshot_tx, _) = watch::channel(Arc::new(PublicSnapshot::initial(config.address)));

        Self {
            machine: QueryMachine::new(config.address, ONLINE_TIMEOUT_TICKS),
            history: History::new(config.average_samples),
            transport,
            snapshot_tx,
            logger,
            total_ticks: 0,
            last_error_bits: 0,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PublicSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Snapshot published by the last completed tick
    pub fn current_snapshot(&self) -> Arc<PublicSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn query_state(&self) -> QueryState {
        self.machine.state()
    }

    pub fn is_online(&self) -> bool {
        self.machine.is_online()
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Run one polling cycle.
    ///
    /// Protocol failures only count against the current state. An error is
    /// returned only when the transport itself fails.
    pub async fn tick(&mut self) -> Result<()> {
        let received = self.transport.read_available().await?;
        let step = self.machine.step(&received)?;
        self.log_step(&step);

        self.transport.write(&step.transmit).await?;

        let aggregate = self.history.record(step.sample);
        self.total_ticks = self.total_ticks.saturating_add(1);
        self.publish(&aggregate);
        Ok(())
    }

    /// Tick every `period` until the transport fails or Ctrl-C is received.
    pub async fn run(&mut self, period: Duration) -> Result<()> {
        self.logger.info(&format!(
            "Polling every {} ms, averaging {} samples",
            period.as_millis(),
            self.history.window()
        ));

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.run_until(&mut ticker, tokio::signal::ctrl_c()).await
    }

    /// Tick on `ticker` until the transport fails or `shutdown` resolves.
    ///
    /// `shutdown` lives across iterations, so a signal raised while a tick is
    /// in flight is seen at the next `select!`.
    pub async fn run_until<F, T>(&mut self, ticker: &mut Interval, shutdown: F) -> Result<()>
    where
        F: Future<Output = T>,
    {
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        self.logger.error(&format!("Transport failure: {}", e));
                        return Err(e);
                    }
                }
                _ = &mut shutdown => {
                    self.logger.info("Shutdown signal received");
                    return Ok(());
                }
            }
        }
    }

    fn log_step(&mut self, step: &Step) {
        match &step.outcome {
            Ok(Reply::Serial(serial)) => {
                self.logger.info(&format!("Inverter found, serial {}", serial));
            }
            Ok(Reply::AddressConfirmed) => {
                self.logger.info(&format!(
                    "Address {:#04x} confirmed",
                    self.machine.address()
                ));
            }
            Ok(Reply::LiveData(sample)) => {
                self.log_sample(sample);
                self.log_new_faults(sample.error_bits);
            }
            Err(failure) => {
                self.logger.debug(&format!(
                    "{}: {} (errors {})",
                    step.previous,
                    failure,
                    self.machine.error_count()
                ));
            }
        }

        if step.state != step.previous {
            self.logger
                .info(&format!("State {} -> {}", step.previous, step.state));
        }

        match step.online_change {
            Some(true) => self.logger.info("Inverter online"),
            Some(false) => self.logger.warn("Inverter offline"),
            None => {}
        }
    }

    fn log_sample(&self, s: &LiveSample) {
        self.logger.debug(&format!(
            "Temp {:.0} C, PV1 {:.1} V {:.1} A, PV2 {:.1} V {:.1} A, AC {:.1} V {:.1} A {:.2} Hz {:.0} W, \
             today {:.1} kWh, total {:.1} kWh, runtime {:.0} h, status {}, errors {:#010x}",
            s.temperature,
            s.dc1_voltage,
            s.dc1_current,
            s.dc2_voltage,
            s.dc2_current,
            s.ac_voltage,
            s.ac_current,
            s.frequency,
            s.power,
            s.energy_today,
            s.energy_total,
            s.runtime_total,
            s.status,
            s.error_bits,
        ));
    }

    fn log_new_faults(&mut self, error_bits: u32) {
        let new_bits = error_bits & !self.last_error_bits;
        for name in active_faults(new_bits) {
            self.logger.warn(&format!("Inverter fault: {}", name));
        }
        self.last_error_bits = error_bits;
    }

    fn publish(&self, aggregate: &Aggregate) {
        let snapshot = PublicSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            address: self.machine.address(),
            online: self.machine.is_online(),
            quality_of_service: aggregate.quality_of_service,
            live_data: aggregate.average,
            samples_averaged: aggregate.samples_averaged,
            query_state: self.machine.state(),
            error_count: self.machine.error_count(),
            serial: self.machine.serial().map(|s| s.to_string()),
            total_ticks: self.total_ticks,
        };
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }
}
