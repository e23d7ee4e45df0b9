//! Patient attributes and the raw booking feed
//!
//! Everything in here is input to the queue core: the patient attribute
//! lookup consumed from the surrounding application ([`PatientDirectory`])
//! and the raw bookings appended to the store. None of these types carry
//! derived scheduling data; that lives on
//! [`PatientTicket`](crate::queue::PatientTicket).

pub mod directory;

pub use directory::{InMemoryPatientDirectory, PatientDirectory};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{ClinicQueueError, Result};

/// No-show probability assumed when the directory has no history for a patient
pub const DEFAULT_NO_SHOW_PROBABILITY: f64 = 0.15;

/// Opaque patient identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    /// Create a new patient id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PatientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Clinical risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl FromStr for RiskLevel {
    type Err = ClinicQueueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(ClinicQueueError::invalid_input(format!("Unknown risk level: {}", other))),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(label)
    }
}

/// Kind of visit a booking is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Emergency,
    #[serde(alias = "consultation_urgent")]
    Urgent,
    #[serde(alias = "follow_up")]
    Followup,
    #[serde(alias = "consultation_routine")]
    Consultation,
    #[serde(alias = "general_checkup")]
    Checkup,
    Diagnostics,
    Specialist,
}

impl AppointmentType {
    /// Every appointment type, in declaration order
    pub const ALL: [AppointmentType; 7] = [
        AppointmentType::Emergency,
        AppointmentType::Urgent,
        AppointmentType::Followup,
        AppointmentType::Consultation,
        AppointmentType::Checkup,
        AppointmentType::Diagnostics,
        AppointmentType::Specialist,
    ];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::Emergency => "emergency",
            AppointmentType::Urgent => "urgent",
            AppointmentType::Followup => "followup",
            AppointmentType::Consultation => "consultation",
            AppointmentType::Checkup => "checkup",
            AppointmentType::Diagnostics => "diagnostics",
            AppointmentType::Specialist => "specialist",
        }
    }
}

impl FromStr for AppointmentType {
    type Err = ClinicQueueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergency" => Ok(AppointmentType::Emergency),
            "urgent" | "consultation_urgent" => Ok(AppointmentType::Urgent),
            "followup" | "follow_up" => Ok(AppointmentType::Followup),
            "consultation" | "consultation_routine" => Ok(AppointmentType::Consultation),
            "checkup" | "general_checkup" => Ok(AppointmentType::Checkup),
            "diagnostics" => Ok(AppointmentType::Diagnostics),
            "specialist" => Ok(AppointmentType::Specialist),
            other => Err(ClinicQueueError::invalid_input(format!("Unknown appointment type: {}", other))),
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static patient attributes as provided by the patient directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: PatientId,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Free-text conditions, e.g. "type 2 diabetes, asthma"
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub no_show_probability: Option<f64>,
}

impl PatientRecord {
    /// Create a validated patient record
    pub fn new(id: impl Into<PatientId>, name: impl Into<String>, age: u32, risk_level: RiskLevel) -> Result<Self> {
        let record = Self {
            id: id.into(),
            name: name.into(),
            age,
            risk_level,
            conditions: None,
            no_show_probability: None,
        };
        record.validate()?;
        Ok(record)
    }

    /// Set the free-text conditions
    pub fn with_conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    /// Set the historical no-show probability
    pub fn with_no_show_probability(mut self, probability: f64) -> Result<Self> {
        self.no_show_probability = Some(probability);
        self.validate()?;
        Ok(self)
    }

    /// Profile used when a booking references a patient the directory does not know
    pub fn placeholder(id: PatientId) -> Self {
        Self {
            name: format!("Patient {}", id),
            id,
            age: 30,
            risk_level: RiskLevel::Low,
            conditions: None,
            no_show_probability: None,
        }
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(ClinicQueueError::invalid_input("patient id cannot be empty"));
        }
        if self.age > 150 {
            return Err(ClinicQueueError::invalid_input(format!(
                "age {} out of range for patient {}",
                self.age, self.id
            )));
        }
        if let Some(p) = self.no_show_probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(ClinicQueueError::invalid_input(format!(
                    "no-show probability {} out of range for patient {}",
                    p, self.id
                )));
            }
        }
        Ok(())
    }

    /// No-show probability, falling back to the population default
    pub fn effective_no_show_probability(&self) -> f64 {
        self.no_show_probability.unwrap_or(DEFAULT_NO_SHOW_PROBABILITY)
    }
}

/// A booking as received from the intake feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBooking {
    pub patient_id: PatientId,
    #[serde(default, deserialize_with = "lenient_appointment_type")]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default)]
    pub is_emergency: Option<bool>,
    pub booking_timestamp: DateTime<Utc>,
    /// Append order, assigned by the store
    #[serde(default)]
    pub sequence: u64,
}

impl RawBooking {
    /// Create a complete booking
    pub fn new(
        patient_id: impl Into<PatientId>,
        appointment_type: AppointmentType,
        is_emergency: bool,
        booking_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            appointment_type: Some(appointment_type),
            is_emergency: Some(is_emergency),
            booking_timestamp,
            sequence: 0,
        }
    }

    /// Appointment type, defaulting to consultation for incomplete entries
    pub fn resolved_type(&self) -> AppointmentType {
        self.appointment_type.unwrap_or(AppointmentType::Consultation)
    }

    /// Emergency flag; an emergency appointment type implies an emergency
    pub fn resolved_emergency(&self) -> bool {
        self.is_emergency.unwrap_or(false) || self.appointment_type == Some(AppointmentType::Emergency)
    }
}

// An unrecognized type leaves the booking untyped instead of rejecting the feed.
fn lenient_appointment_type<'de, D>(deserializer: D) -> std::result::Result<Option<AppointmentType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|name| match name.parse::<AppointmentType>() {
        Ok(appointment_type) => Some(appointment_type),
        Err(e) => {
            warn!("Ignoring appointment type on booking: {}", e);
            None
        }
    }))
}
