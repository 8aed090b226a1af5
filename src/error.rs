//! Custom error types for the application.
//!
//! This module defines the primary error type, `FlowError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the error taxonomy of the acquisition core:
//!
//! - **`TransportOpen`**: the device could not be claimed. Recoverable; the
//!   acquisition loop falls back to simulated mode.
//! - **`Transport`**: a fault on an already-open connection. Recoverable;
//!   the loop switches to simulated mode for subsequent ticks.
//! - **`Parse`**: a raw line carried no usable number. Recoverable; the
//!   sample is dropped and counted, the tick produces nothing.
//! - **`Export`**: report generation failed. Surfaced to the operator; no
//!   partial artifact is written.
//! - **`Config`/`Configuration`**: file/format errors vs. semantic errors
//!   caught by validation after a successful parse.
//!
//! A read timeout is deliberately *not* an error: the transport reports it
//! as `ReadOutcome::Idle` ("no data this tick").

use std::fmt;

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, FlowError>;

/// Why a transport `open` was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailure {
    /// Another process holds the port.
    PortBusy,
    /// The endpoint does not exist on this host.
    PortMissing,
    /// The port exists but the process may not claim it.
    PermissionDenied,
    /// Anything the platform does not classify further.
    Unknown,
}

impl fmt::Display for OpenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpenFailure::PortBusy => "port busy",
            OpenFailure::PortMissing => "port missing",
            OpenFailure::PermissionDenied => "permission denied",
            OpenFailure::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("failed to open {endpoint}: {reason} ({detail})")]
    TransportOpen {
        endpoint: String,
        reason: OpenFailure,
        detail: String,
    },

    #[error("transport fault: {0}")]
    Transport(String),

    #[error("transport is not open")]
    TransportClosed,

    #[error("unparseable sample line: {raw:?}")]
    Parse { raw: String },

    #[error("export failed: {0}")]
    Export(String),

    #[error("sample log error: {0}")]
    SampleLog(String),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(&'static str),
}

impl FlowError {
    /// Whether the acquisition loop can absorb this error and keep running.
    ///
    /// Only export and configuration failures are surfaced to the operator;
    /// everything transport- or parse-level degrades the run instead.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FlowError::TransportOpen { .. }
                | FlowError::Transport(_)
                | FlowError::TransportClosed
                | FlowError::Parse { .. }
                | FlowError::SampleLog(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failure_display() {
        let err = FlowError::TransportOpen {
            endpoint: "/dev/ttyUSB0".into(),
            reason: OpenFailure::PortBusy,
            detail: "EBUSY".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyUSB0"));
        assert!(msg.contains("port busy"));
    }

    #[test]
    fn transport_and_parse_are_recoverable() {
        assert!(FlowError::Transport("reset".into()).is_recoverable());
        assert!(FlowError::Parse { raw: "abc".into() }.is_recoverable());
        assert!(!FlowError::Export("empty buffer".into()).is_recoverable());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FlowError = io.into();
        assert!(matches!(err, FlowError::Io(_)));
    }
}
