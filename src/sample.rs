//! The timestamped scalar measurement type.

use serde::{Deserialize, Serialize};

/// A single measurement captured during one acquisition session.
///
/// Timestamps are monotonic seconds since the session started, so a buffer
/// of samples is ordered by construction. Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since session start.
    pub elapsed_secs: f64,
    /// Measured value, in the sensor's native unit.
    pub value: f64,
}

impl Sample {
    pub fn new(elapsed_secs: f64, value: f64) -> Self {
        Self {
            elapsed_secs,
            value,
        }
    }
}
