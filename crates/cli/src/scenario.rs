//! Replay scenario files
//!
//! A scenario is a JSON document with the patients known to the clinic, the
//! bookings to feed in (in order) and the actions to apply afterwards:
//!
//! ```json
//! {
//!   "patients": [{ "id": "p1", "name": "Ada", "age": 72, "risk_level": "high" }],
//!   "bookings": [{ "patient_id": "p1", "appointment_type": "urgent",
//!                  "is_emergency": false, "booking_timestamp": "2024-03-04T08:00:00Z" }],
//!   "oracle": [{ "patient_id": "p1", "urgency_boost": 5.0 }],
//!   "actions": ["order", "assign_next", "emergency p1", "override p1 80"]
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clinicq_engine::prelude::*;
use serde::{Deserialize, Serialize};

/// A full replay input
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub patients: Vec<PatientRecord>,
    #[serde(default)]
    pub bookings: Vec<RawBooking>,
    /// Recorded oracle output, replayed through a fixed-boost oracle
    #[serde(default)]
    pub oracle: Vec<OracleBoost>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleBoost {
    pub patient_id: PatientId,
    pub urgency_boost: f64,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

/// One replay step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    Order,
    AssignNext,
    Emergency(PatientId),
    Override(PatientId, f64),
    Summary,
    Completed,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            ["order"] => Ok(Action::Order),
            ["assign_next"] => Ok(Action::AssignNext),
            ["summary"] => Ok(Action::Summary),
            ["completed"] => Ok(Action::Completed),
            ["emergency", id] => Ok(Action::Emergency(PatientId::new(*id))),
            ["override", id, score] => {
                let score: f64 = score
                    .parse()
                    .with_context(|| format!("invalid override score '{}'", score))?;
                Ok(Action::Override(PatientId::new(*id), score))
            }
            _ => bail!("unknown action '{}'", s),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Order => write!(f, "order"),
            Action::AssignNext => write!(f, "assign_next"),
            Action::Summary => write!(f, "summary"),
            Action::Completed => write!(f, "completed"),
            Action::Emergency(id) => write!(f, "emergency {}", id),
            Action::Override(id, score) => write!(f, "override {} {}", id, score),
        }
    }
}

impl Scenario {
    /// Read and parse a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&source).with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Directory holding every patient in the scenario
    pub fn directory(&self) -> Result<InMemoryPatientDirectory> {
        Ok(InMemoryPatientDirectory::from_records(self.patients.iter().cloned())?)
    }

    /// Oracle replaying the recorded boosts, if the scenario has any
    pub fn oracle(&self) -> Option<Arc<dyn SchedulingOracle>> {
        if self.oracle.is_empty() {
            return None;
        }

        let oracle = self.oracle.iter().fold(FixedBoostOracle::new(), |oracle, boost| {
            oracle.with_boost(boost.patient_id.clone(), boost.urgency_boost, boost.confidence)
        });
        Some(Arc::new(oracle))
    }

    /// Actions to run; a bare scenario just prints the ordering
    pub fn actions(&self) -> Vec<Action> {
        if self.actions.is_empty() {
            vec![Action::Order]
        } else {
            self.actions.clone()
        }
    }
}
