//! # flowmon
//!
//! Core library for the `flowmon` application: acquisition of a scalar flow
//! measurement stream from a serial device, with automatic fallback to a
//! simulated source when no device is available, live statistics over the
//! buffered stream, and one-shot export of a session report.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: The per-session state machine. One periodic task pulls
//!   a sample per tick from the transport (or the simulator), appends it to
//!   the buffer, and reacts to operator signals (pause/resume/stop/mode
//!   switch) sent over a control channel.
//! - **`buffer`**: The append-only, time-ordered sample history for one
//!   session. Single writer, snapshot readers.
//! - **`config`**: Strongly-typed settings loaded from TOML and `FLOWMON_`
//!   environment variables.
//! - **`error`**: The `FlowError` enum for centralized error handling.
//! - **`export`**: Renders a buffer snapshot plus statistics into a single
//!   self-contained report artifact with an embedded chart.
//! - **`parser`**: Turns raw serial lines into numeric samples, tolerating
//!   decorated formats such as `"Flow rate: 12.5 L/h"`.
//! - **`sample`**: The timestamped scalar measurement type.
//! - **`sample_log`**: Optional append-only `timestamp,value` log of every
//!   accepted sample.
//! - **`simulator`**: Synthetic sample source used when no device is present.
//! - **`stats`**: Mean/min/max/peak over a buffer snapshot.
//! - **`telemetry`**: Tracing subscriber setup.
//! - **`transport`**: The serial connection abstraction (open, line reads
//!   with timeout, idempotent close) and endpoint discovery.

pub mod acquisition;
pub mod buffer;
pub mod config;
pub mod error;
pub mod export;
pub mod parser;
pub mod sample;
pub mod sample_log;
pub mod simulator;
pub mod stats;
pub mod telemetry;
pub mod transport;

pub use error::{AppResult, FlowError};
pub use sample::Sample;
