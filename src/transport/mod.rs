//! The physical-connection abstraction.
//!
//! The acquisition loop is generic over [`Transport`] so a session can be
//! driven by the real serial implementation or by a scripted double in
//! tests. The contract is deliberately small:
//!
//! - `read_line` blocks up to the configured read timeout and reports a
//!   timeout as [`ReadOutcome::Idle`], not an error: "no data this tick".
//! - `close` is idempotent and infallible; every successful open is matched
//!   by exactly one effective close on session end, including error paths.

use async_trait::async_trait;

use crate::error::FlowError;

#[cfg(feature = "instrument_serial")]
pub mod serial;

/// One read attempt's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, terminator stripped.
    Line(String),
    /// Nothing arrived within the read timeout.
    Idle,
}

/// A line-oriented connection to a measurement device.
#[async_trait]
pub trait Transport: Send {
    /// The endpoint this transport was opened on, for diagnostics.
    fn endpoint(&self) -> &str;

    /// Whether the underlying device is still claimed.
    fn is_open(&self) -> bool;

    /// Read the next newline-delimited line, waiting at most the read
    /// timeout. Errors indicate a transport-level fault (device lost,
    /// stream closed); the acquisition loop reacts by switching to
    /// simulated mode rather than halting.
    async fn read_line(&mut self) -> Result<ReadOutcome, FlowError>;

    /// Release the device. Closing an already-closed transport is a no-op.
    async fn close(&mut self);
}
