use thiserror::Error;

use crate::patient::PatientId;

/// Queue engine errors
#[derive(Error, Debug)]
pub enum ClinicQueueError {
    /// The referenced patient has no waiting booking
    #[error("Invalid patient reference: {0}")]
    InvalidPatientReference(PatientId),

    /// The patient already holds a waiting booking
    #[error("Patient {0} is already queued")]
    AlreadyQueued(PatientId),

    /// The waiting line reached its configured capacity
    #[error("Queue is full ({max_size} patients)")]
    QueueFull { max_size: usize },

    /// The scheduling oracle could not produce a usable answer
    #[error("Scheduling oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Writers are serialized by the store lock, so this is never produced
    /// by a correctly locked store. It stays in the taxonomy for callers that
    /// wrap the store in their own transactions.
    #[error("Concurrent mutation conflict: {0}")]
    ConcurrentMutationConflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (configuration and scenario files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ClinicQueueError {
    /// Create a new InvalidInput error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OracleUnavailable error
    pub fn oracle_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::OracleUnavailable(msg.into())
    }
}

impl From<serde_json::Error> for ClinicQueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ClinicQueueError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClinicQueueError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for queue engine operations
pub type Result<T> = std::result::Result<T, ClinicQueueError>;
