//! # SolaXd - RS485 monitoring daemon for SolaX X1 Mini inverters
//!
//! Polls a single inverter over an RS485 serial link once per tick, keeps a
//! short history of telemetry samples and publishes an averaged snapshot as
//! JSON over HTTP.
//!
//! ## Architecture
//!
//! - `protocol`: frame codec, request builders and live data decoding
//! - `engine`: discovery state machine, sample history and snapshot publication
//! - `transport`: serial port and simulated byte transports
//! - `web`: HTTP server and server-sent events
//! - `config`: YAML configuration and validation
//! - `cli`: command line overrides
//! - `logging`: structured logging and tracing

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod transport;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use engine::{InverterEngine, PublicSnapshot};
pub use error::{Result, SolaxError};
