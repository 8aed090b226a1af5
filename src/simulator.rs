//! Synthetic sample source.
//!
//! Emulates a physical flow sensor with a smooth periodic signal plus a
//! small uniform perturbation. Used whenever no real device is available
//! (transport open failed, a fault occurred mid-run, or the operator
//! switched modes explicitly) and guarantees a value on every call.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulatorSettings;

/// Sinusoidal signal generator with bounded random jitter.
pub struct Simulator {
    offset: f64,
    amplitude: f64,
    period_secs: f64,
    jitter: f64,
    rng: StdRng,
}

impl Simulator {
    pub fn new(settings: &SimulatorSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Deterministic variant for tests.
    pub fn seeded(settings: &SimulatorSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: &SimulatorSettings, rng: StdRng) -> Self {
        Self {
            offset: settings.offset,
            amplitude: settings.amplitude,
            period_secs: settings.period.as_secs_f64().max(f64::MIN_POSITIVE),
            jitter: settings.jitter,
            rng,
        }
    }

    /// Produce the next value for the given elapsed session time.
    ///
    /// Infallible by contract: the acquisition loop leans on this as the
    /// fallback source that can never leave a tick empty.
    pub fn next(&mut self, elapsed_secs: f64) -> f64 {
        let phase = std::f64::consts::TAU * elapsed_secs / self.period_secs;
        let base = self.offset + self.amplitude * phase.sin();
        if self.jitter > 0.0 {
            base + self.rng.gen_range(-self.jitter..=self.jitter)
        } else {
            base
        }
    }
}
