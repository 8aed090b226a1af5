//! Turns raw serial lines into numeric samples.
//!
//! Devices in the field emit anything from a bare `"12.5"` to decorated
//! lines like `"Flow rate: 12.5 L/h"`. The parser trims the line, tries it
//! whole as a float literal, and otherwise extracts the first numeric
//! substring framed by the surrounding literal text.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::error::FlowError;

const FLOAT: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

// Patterns are compile-time constants, so the unwraps cannot fire.
#[allow(clippy::unwrap_used)]
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(FLOAT).unwrap());

// "Label: 12.5" / "flow = 12.5" -- the field after the separator wins even
// when the label itself contains digits ("CH1: 12.5").
#[allow(clippy::unwrap_used)]
static LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"[:=]\s*({FLOAT})")).unwrap());

/// Parse one raw line into a measurement value.
///
/// Fails with [`FlowError::Parse`] when no finite numeric substring can be
/// extracted. A parse failure never terminates the acquisition loop; the
/// caller drops the tick and counts it.
pub fn parse(raw: &str) -> Result<f64, FlowError> {
    let trimmed = raw.trim();
    trace!(raw, trimmed, "parsing sample line");

    let parsed = trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| {
            LABELED
                .captures(trimmed)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .or_else(|| NUMBER.find(trimmed).and_then(|m| m.as_str().parse().ok()));

    match parsed {
        Some(value) if value.is_finite() => Ok(value),
        _ => Err(FlowError::Parse { raw: raw.into() }),
    }
}
