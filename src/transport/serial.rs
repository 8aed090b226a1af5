//! Serial port transport backed by the `serialport` crate.
//!
//! The port itself is a blocking handle, so reads run on the blocking pool
//! behind an `Arc<Mutex<_>>`, keeping the async acquisition loop responsive.
//! Partial lines are buffered across read calls; a tick that sees no
//! complete line within the timeout reports `Idle`.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serialport::SerialPort;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::error::{FlowError, OpenFailure};
use crate::transport::{ReadOutcome, Transport};

/// A discovered serial endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Platform port name, e.g. "/dev/ttyUSB0" or "COM3".
    pub name: String,
    /// Human-readable description when the platform provides one.
    pub description: String,
}

/// Enumerate serial endpoints visible to the host.
///
/// Name/list only; selecting one and handing `{endpoint, baud}` to the
/// acquisition session is the operator's concern.
pub fn available_endpoints() -> Result<Vec<EndpointInfo>, FlowError> {
    let ports = serialport::available_ports()
        .map_err(|e| FlowError::Transport(format!("port enumeration failed: {e}")))?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => {
                    let mut parts = Vec::new();
                    if let Some(m) = usb.manufacturer {
                        parts.push(m);
                    }
                    if let Some(prod) = usb.product {
                        parts.push(prod);
                    }
                    parts.join(" ")
                }
                serialport::SerialPortType::BluetoothPort => "bluetooth".into(),
                serialport::SerialPortType::PciPort => "pci".into(),
                serialport::SerialPortType::Unknown => String::new(),
            };
            EndpointInfo {
                name: p.port_name,
                description,
            }
        })
        .collect())
}

struct LineReader {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
    timeout: Duration,
}

impl LineReader {
    /// Pull bytes until a complete line is buffered or the timeout budget
    /// for this call is spent.
    fn read_line(&mut self) -> Result<ReadOutcome, FlowError> {
        if let Some(line) = take_line(&mut self.pending) {
            return Ok(ReadOutcome::Line(line));
        }

        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; 256];
        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => return Err(FlowError::Transport("serial stream closed".into())),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if let Some(line) = take_line(&mut self.pending) {
                        return Ok(ReadOutcome::Line(line));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Ok(ReadOutcome::Idle)
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(FlowError::Transport(e.to_string())),
            }
            // Bound the worst case even when bytes trickle in with no
            // terminator: the tick's latency budget is one timeout.
            if Instant::now() >= deadline {
                return Ok(ReadOutcome::Idle);
            }
        }
    }
}

/// Split the first complete line off the pending buffer.
fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let pos = pending.iter().position(|&b| b == b'\n')?;
    let mut line: Vec<u8> = pending.drain(..=pos).collect();
    while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
        line.pop();
    }
    Some(String::from_utf8_lossy(&line).into_owned())
}

/// An open serial connection with exclusive ownership of the device.
pub struct SerialTransport {
    endpoint: String,
    inner: Option<Arc<Mutex<LineReader>>>,
}

impl SerialTransport {
    /// Claim the device. Failure reports *why* (busy/missing/permission)
    /// so the caller can fall back to simulation instead of crashing.
    pub fn open(endpoint: &str, baud: u32, read_timeout: Duration) -> Result<Self, FlowError> {
        debug!(endpoint, baud, ?read_timeout, "opening serial transport");

        let port = serialport::new(endpoint, baud)
            .timeout(read_timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| FlowError::TransportOpen {
                endpoint: endpoint.to_string(),
                reason: classify_open_error(&e),
                detail: e.to_string(),
            })?;

        info!(endpoint, baud, "serial transport open");
        Ok(Self {
            endpoint: endpoint.to_string(),
            inner: Some(Arc::new(Mutex::new(LineReader {
                port,
                pending: Vec::with_capacity(256),
                timeout: read_timeout,
            }))),
        })
    }
}

fn classify_open_error(err: &serialport::Error) -> OpenFailure {
    match &err.kind {
        serialport::ErrorKind::NoDevice => OpenFailure::PortMissing,
        serialport::ErrorKind::Io(kind) => match kind {
            std::io::ErrorKind::NotFound => OpenFailure::PortMissing,
            std::io::ErrorKind::PermissionDenied => OpenFailure::PermissionDenied,
            // Linux reports a claimed port as EBUSY, which serialport
            // forwards as an unclassified I/O error
            _ if err.description.to_lowercase().contains("busy") => OpenFailure::PortBusy,
            _ => OpenFailure::Unknown,
        },
        _ if err.description.to_lowercase().contains("busy") => OpenFailure::PortBusy,
        _ => OpenFailure::Unknown,
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    async fn read_line(&mut self) -> Result<ReadOutcome, FlowError> {
        let Some(reader) = self.inner.clone() else {
            return Err(FlowError::TransportClosed);
        };

        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = reader.blocking_lock();
            guard.read_line()
        })
        .await
        .map_err(|e| FlowError::Transport(format!("serial reader task failed: {e}")))??;

        if let ReadOutcome::Line(line) = &outcome {
            trace!(endpoint = %self.endpoint, raw = %line.escape_default(), "line received");
        }
        Ok(outcome)
    }

    async fn close(&mut self) {
        if let Some(reader) = self.inner.take() {
            // Dropping the handle releases the device
            drop(reader);
            info!(endpoint = %self.endpoint, "serial transport closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_strips_terminators() {
        let mut pending = b"12.5\r\nrest".to_vec();
        assert_eq!(take_line(&mut pending).as_deref(), Some("12.5"));
        assert_eq!(pending, b"rest");
    }

    #[test]
    fn take_line_waits_for_terminator() {
        let mut pending = b"12.".to_vec();
        assert_eq!(take_line(&mut pending), None);
        pending.extend_from_slice(b"5\n");
        assert_eq!(take_line(&mut pending).as_deref(), Some("12.5"));
        assert!(pending.is_empty());
    }

    #[test]
    fn take_line_handles_bare_newline() {
        let mut pending = b"\n".to_vec();
        assert_eq!(take_line(&mut pending).as_deref(), Some(""));
    }

    #[test]
    fn take_line_splits_back_to_back_lines() {
        let mut pending = b"1.0\n2.0\n".to_vec();
        assert_eq!(take_line(&mut pending).as_deref(), Some("1.0"));
        assert_eq!(take_line(&mut pending).as_deref(), Some("2.0"));
        assert_eq!(take_line(&mut pending), None);
    }

    #[test]
    fn open_failure_on_missing_port() {
        let result = SerialTransport::open(
            "/dev/flowmon-test-no-such-port",
            9600,
            Duration::from_millis(50),
        );
        match result {
            Err(FlowError::TransportOpen { reason, .. }) => {
                assert!(matches!(
                    reason,
                    OpenFailure::PortMissing | OpenFailure::Unknown
                ));
            }
            other => panic!("expected open failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn close_is_idempotent() {
        tokio_test::block_on(async {
            // Never-opened handle shape: inner is None
            let mut transport = SerialTransport {
                endpoint: "test".into(),
                inner: None,
            };
            assert!(!transport.is_open());
            transport.close().await;
            transport.close().await;
            assert!(!transport.is_open());
            assert!(matches!(
                transport.read_line().await,
                Err(FlowError::TransportClosed)
            ));
        });
    }
}
