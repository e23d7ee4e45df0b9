use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClinicQueueError, Result};
use crate::patient::AppointmentType;
use crate::queue::DurationTable;

/// Queue engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueEngineConfig {
    /// Waiting line settings
    pub queue: QueueConfig,

    /// Scheduling oracle settings
    pub oracle: OracleConfig,

    /// Appointment durations used for wait estimation
    pub durations: DurationConfig,

    /// Log output settings
    pub logging: LoggingSettings,
}

/// Waiting line configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of waiting bookings
    pub max_queue_size: usize,

    /// Delay added to everyone behind an emergency promotion (minutes)
    pub emergency_delay_minutes: u32,

    /// Score at or above which a ticket counts as high priority in summaries
    pub high_priority_threshold: f64,
}

/// Scheduling oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Consult the oracle at all
    pub enabled: bool,

    /// Hard per-call timeout (milliseconds)
    pub timeout_ms: u64,

    /// Number of top-scored candidates sent to the oracle per read
    pub max_candidates: usize,
}

/// Appointment duration configuration
///
/// Keys are appointment type names; legacy spellings such as
/// `general_checkup` are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationConfig {
    /// Duration for types missing from `minutes`
    pub default_minutes: u32,

    /// Per-type durations
    pub minutes: BTreeMap<String, u32>,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level directive, e.g. "info" or "debug"
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Include file and line information
    pub file_info: bool,
}

impl QueueEngineConfig {
    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        if self.queue.max_queue_size == 0 {
            return Err(ClinicQueueError::config("max_queue_size must be greater than 0"));
        }

        if !self.queue.high_priority_threshold.is_finite() {
            return Err(ClinicQueueError::config("high_priority_threshold must be finite"));
        }

        if self.oracle.timeout_ms == 0 {
            return Err(ClinicQueueError::config("oracle timeout_ms must be greater than 0"));
        }

        if self.oracle.timeout_ms > 5000 {
            return Err(ClinicQueueError::config("oracle timeout_ms cannot exceed 5000ms (5 seconds)"));
        }

        if self.oracle.max_candidates == 0 {
            return Err(ClinicQueueError::config("oracle max_candidates must be greater than 0"));
        }

        if self.durations.default_minutes == 0 {
            return Err(ClinicQueueError::config("default appointment duration must be greater than 0"));
        }

        // Surfaces unknown appointment type keys.
        self.durations.to_table()?;

        Ok(())
    }
}

impl OracleConfig {
    /// Per-call timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DurationConfig {
    /// Build the lookup table used by the wait estimator
    pub fn to_table(&self) -> Result<DurationTable> {
        let mut table = DurationTable::new(self.default_minutes);
        for (name, minutes) in &self.minutes {
            let appointment_type: AppointmentType = name
                .parse()
                .map_err(|_| ClinicQueueError::config(format!("unknown appointment type in durations: {}", name)))?;
            table.set(appointment_type, *minutes);
        }
        Ok(table)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 500,
            emergency_delay_minutes: 15,
            high_priority_threshold: 70.0,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 200,
            max_candidates: 10,
        }
    }
}

impl Default for DurationConfig {
    fn default() -> Self {
        let minutes = [
            (AppointmentType::Emergency, 60),
            (AppointmentType::Urgent, 40),
            (AppointmentType::Diagnostics, 30),
            (AppointmentType::Consultation, 25),
            (AppointmentType::Checkup, 15),
            (AppointmentType::Followup, 12),
        ]
        .into_iter()
        .map(|(appointment_type, minutes)| (appointment_type.as_str().to_string(), minutes))
        .collect();

        Self {
            default_minutes: 15,
            minutes,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
        }
    }
}
