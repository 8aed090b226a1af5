//! Configuration loading for flowmon.
//!
//! Settings are loaded from a TOML file merged with environment variables
//! (prefixed with `FLOWMON_`), then validated. Durations use humantime
//! syntax (`"1s"`, `"500ms"`).
//!
//! # Example
//! ```no_run
//! use flowmon::config::Settings;
//!
//! let settings = Settings::load_from("config/default.toml")?;
//! settings.validate()?;
//! # Ok::<(), flowmon::FlowError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, FlowError};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub acquisition: AcquisitionSettings,
    pub transport: TransportSettings,
    pub simulator: SimulatorSettings,
    pub sample_log: SampleLogSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Application name, used in log output and report titles.
    pub name: String,
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Cadence and capacity of the acquisition loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    /// One sample is pulled per tick.
    #[serde(with = "humantime_serde", default = "default_tick")]
    pub tick: Duration,
    /// Oldest samples are evicted past this count.
    #[serde(default = "default_buffer_cap")]
    pub buffer_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Serial endpoint, e.g. "/dev/ttyUSB0" or "COM3". None means no device
    /// is configured and the session runs simulated.
    pub endpoint: Option<String>,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Upper bound on a single blocking line read.
    #[serde(with = "humantime_serde", default = "default_read_timeout")]
    pub read_timeout: Duration,
}

/// Shape of the synthetic signal: `offset + amplitude * sin(2πt/period)`
/// plus uniform jitter in `[-jitter, jitter]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorSettings {
    pub offset: f64,
    pub amplitude: f64,
    #[serde(with = "humantime_serde", default = "default_period")]
    pub period: Duration,
    pub jitter: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleLogSettings {
    /// When enabled, every accepted sample is appended to `path`.
    #[serde(default)]
    pub enabled: bool,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub title: String,
    pub output_dir: PathBuf,
}

fn default_tick() -> Duration {
    Duration::from_secs(1)
}

fn default_buffer_cap() -> usize {
    86_400
}

fn default_baud() -> u32 {
    9600
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(500)
}

fn default_period() -> Duration {
    Duration::from_secs(30)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application: ApplicationSettings {
                name: "flowmon".into(),
                log_level: "info".into(),
            },
            acquisition: AcquisitionSettings {
                tick: default_tick(),
                buffer_cap: default_buffer_cap(),
            },
            transport: TransportSettings {
                endpoint: None,
                baud: default_baud(),
                read_timeout: default_read_timeout(),
            },
            simulator: SimulatorSettings {
                offset: 12.0,
                amplitude: 4.0,
                period: default_period(),
                jitter: 0.25,
            },
            sample_log: SampleLogSettings {
                enabled: false,
                path: PathBuf::from("data/samples.csv"),
            },
            export: ExportSettings {
                title: "Flow rate session report".into(),
                output_dir: PathBuf::from("reports"),
            },
        }
    }
}

impl Settings {
    /// Load configuration from the default location plus environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from("config/default.toml")
    }

    /// Load configuration from a specific file path, merged over built-in
    /// defaults and under `FLOWMON_`-prefixed environment variables.
    ///
    /// A missing file is not an error; defaults and environment apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FLOWMON_").split("_"))
            .extract()?;
        Ok(settings)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(FlowError::Configuration(format!(
                "invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.acquisition.tick < Duration::from_millis(10) {
            return Err(FlowError::Configuration(format!(
                "tick of {:?} is below the 10ms floor",
                self.acquisition.tick
            )));
        }

        if self.acquisition.buffer_cap == 0 {
            return Err(FlowError::Configuration(
                "buffer_cap must be at least 1".into(),
            ));
        }

        if self.transport.baud == 0 {
            return Err(FlowError::Configuration("baud must be non-zero".into()));
        }

        if self.transport.read_timeout.is_zero() {
            return Err(FlowError::Configuration(
                "read_timeout must be non-zero".into(),
            ));
        }

        if self.simulator.jitter < 0.0 || !self.simulator.jitter.is_finite() {
            return Err(FlowError::Configuration(format!(
                "jitter of {} is not a non-negative finite number",
                self.simulator.jitter
            )));
        }

        if self.simulator.period.is_zero() {
            return Err(FlowError::Configuration("period must be non-zero".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.acquisition.tick, Duration::from_secs(1));
        assert!(settings.transport.endpoint.is_none());
    }

    #[test]
    fn invalid_log_level_rejected() {
        let mut settings = Settings::default();
        settings.application.log_level = "chatty".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_baud_rejected() {
        let mut settings = Settings::default();
        settings.transport.baud = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn sub_floor_tick_rejected() {
        let mut settings = Settings::default();
        settings.acquisition.tick = Duration::from_millis(1);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn negative_jitter_rejected() {
        let mut settings = Settings::default();
        settings.simulator.jitter = -0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [application]
            name = "bench rig"
            log_level = "debug"

            [transport]
            endpoint = "/dev/ttyACM1"
            baud = 115200
            read_timeout = "250ms"

            [acquisition]
            tick = "100ms"
            "#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.application.log_level, "debug");
        assert_eq!(settings.transport.endpoint.as_deref(), Some("/dev/ttyACM1"));
        assert_eq!(settings.transport.baud, 115_200);
        assert_eq!(settings.acquisition.tick, Duration::from_millis(100));
        // Untouched sections keep their defaults
        assert_eq!(settings.acquisition.buffer_cap, 86_400);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("config/does_not_exist.toml").unwrap();
        assert_eq!(settings.transport.baud, 9600);
    }
}
