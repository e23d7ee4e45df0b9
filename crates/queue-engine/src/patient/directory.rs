use dashmap::DashMap;
use tracing::debug;

use super::{PatientId, PatientRecord};
use crate::error::Result;

/// Read-only patient attribute lookup
///
/// Implemented by whatever owns patient data in the host application. The
/// queue core only ever reads through this trait and never caches records
/// across orderings.
pub trait PatientDirectory: Send + Sync {
    /// Look up a patient by id
    fn patient(&self, id: &PatientId) -> Option<PatientRecord>;
}

/// Patient directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryPatientDirectory {
    records: DashMap<PatientId, PatientRecord>,
}

impl InMemoryPatientDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a list of records, validating each
    pub fn from_records(records: impl IntoIterator<Item = PatientRecord>) -> Result<Self> {
        let directory = Self::new();
        for record in records {
            directory.upsert(record)?;
        }
        Ok(directory)
    }

    /// Insert or replace a record
    pub fn upsert(&self, record: PatientRecord) -> Result<()> {
        record.validate()?;
        debug!("Upserting patient record {}", record.id);
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Remove a record
    pub fn remove(&self, id: &PatientId) -> Option<PatientRecord> {
        self.records.remove(id).map(|(_, record)| record)
    }

    /// Number of known patients
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PatientDirectory for InMemoryPatientDirectory {
    fn patient(&self, id: &PatientId) -> Option<PatientRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }
}
