#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use clinicq_engine::prelude::*;

/// Fixed morning clock so booking order is explicit
pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap() + Duration::minutes(minute)
}

/// Adult, low risk, no conditions: checkup 13, consultation 15, urgent 22
pub fn adult(id: &str) -> PatientRecord {
    PatientRecord::new(id, format!("Patient {}", id.to_uppercase()), 40, RiskLevel::Low).unwrap()
}

pub fn directory(ids: &[&str]) -> Arc<InMemoryPatientDirectory> {
    Arc::new(InMemoryPatientDirectory::from_records(ids.iter().map(|id| adult(id))).unwrap())
}

pub fn base_engine(ids: &[&str]) -> QueueEngine {
    QueueEngine::without_oracle(QueueEngineConfig::default(), directory(ids)).unwrap()
}

pub fn oracle_engine(ids: &[&str], oracle: Arc<dyn SchedulingOracle>, timeout_ms: u64) -> QueueEngine {
    let mut config = QueueEngineConfig::default();
    config.oracle.timeout_ms = timeout_ms;
    QueueEngine::new(config, directory(ids), oracle).unwrap()
}

pub fn order_of(snapshot: &QueueSnapshot) -> Vec<String> {
    snapshot.iter().map(|t| t.id.as_str().to_string()).collect()
}
