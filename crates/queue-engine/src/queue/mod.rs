//! Patient queue ordering, emergency preemption and admission
//!
//! ```text
//!  booking ──▶ QueueStore ──(state copy)──▶ QueueOrderer ──▶ QueueSnapshot
//!                 ▲                          │  scoring, oracle, waits
//!                 │                          ▼
//!                 └──── admit head ◀── AssignNext / EmergencyReorder
//! ```
//!
//! The store is the only writer. Snapshots are derived on every read and
//! never written back.

pub mod emergency;
pub mod orderer;
pub mod store;
pub mod types;
pub mod wait_time;

pub use emergency::{EmergencyReorder, DEFAULT_EMERGENCY_DELAY_MINUTES};
pub use orderer::{QueueOrderer, DEFAULT_ORACLE_CANDIDATES};
pub use store::{Promotion, QueueStore};
pub use types::{
    Admission, BookingReceipt, CompletedRecord, PatientTicket, QueueSnapshot, QueueState, QueueSummary, TicketStatus,
};
pub use wait_time::{DurationTable, WaitTimeEstimator};
