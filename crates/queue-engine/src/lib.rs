//! # Clinic Queue Engine
//!
//! This crate orders the waiting room of a clinic. It scores every waiting
//! booking from the patient's record, optionally lets an external scheduling
//! oracle nudge the top candidates, estimates wait times, and admits patients
//! one at a time.
//!
//! ## Features
//!
//! - **Deterministic scoring**: Emergency, risk, age, conditions, appointment type and no-show likelihood
//! - **Pinned head**: The patient at position 1 never moves because of re-scoring
//! - **Emergency preemption**: Promote a waiting patient and delay everyone else
//! - **Guarded oracle**: Timeouts, panics and malformed answers fall back to base scores
//! - **Atomic admission**: Concurrent callers never admit the same patient twice
//!
//! ## Architecture
//!
//! - [`patient`]: Patient records, bookings and the patient directory
//! - [`scoring`]: Base priority scoring
//! - [`oracle`]: Scheduling oracle trait and its guard
//! - [`queue`]: Store, orderer, wait-time estimation and emergency reorder
//! - [`engine`]: The [`QueueEngine`] facade tying it all together
//! - [`config`] and [`logging`]: TOML configuration and tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clinicq_engine::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let directory = InMemoryPatientDirectory::new();
//!     directory.upsert(PatientRecord::new("p-1", "Ada", 72, RiskLevel::High)?)?;
//!
//!     let engine = QueueEngine::without_oracle(QueueEngineConfig::default(), Arc::new(directory))?;
//!     engine
//!         .book(RawBooking::new("p-1", AppointmentType::Urgent, false, chrono::Utc::now()))
//!         .await?;
//!
//!     let queue = engine.get_ordered_queue().await;
//!     println!("{} waiting", queue.len());
//!
//!     if let Admission::Admitted { ticket, .. } = engine.assign_next() {
//!         println!("now seeing {}", ticket.name);
//!     }
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Queue functionality modules
pub mod engine;
pub mod oracle;
pub mod patient;
pub mod queue;
pub mod scoring;

pub use config::QueueEngineConfig;
pub use engine::QueueEngine;
pub use error::{ClinicQueueError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::{ClinicQueueError, QueueEngine, QueueEngineConfig, Result};

    pub use crate::config::{DurationConfig, LoggingSettings, OracleConfig, QueueConfig};
    pub use crate::logging::{setup_logging, LoggingConfig};

    pub use crate::patient::{
        AppointmentType, InMemoryPatientDirectory, PatientDirectory, PatientId, PatientRecord, RawBooking, RiskLevel,
    };

    pub use crate::oracle::{
        FixedBoostOracle, GuardedOracle, NoOracle, OracleContext, OracleRecommendation, OracleResponse,
        SchedulingOracle,
    };

    pub use crate::queue::{
        Admission, BookingReceipt, CompletedRecord, PatientTicket, QueueSnapshot, QueueSummary, TicketStatus,
    };

    pub use crate::scoring::{PatientScorer, ScoreBreakdown, MAX_SCORE, MIN_SCORE};

    pub use async_trait::async_trait;
}
