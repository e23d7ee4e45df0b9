use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patient::{AppointmentType, PatientId, RawBooking, RiskLevel};

/// Lifecycle status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Waiting,
    Emergency,
    BeingSeen,
    Completed,
}

/// A patient's queue entry with derived scheduling data
///
/// Score, position and wait are recomputed on every read and never written
/// back to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientTicket {
    pub id: PatientId,
    pub name: String,
    pub age: u32,
    pub risk_level: RiskLevel,
    pub conditions: Option<String>,
    pub appointment_type: AppointmentType,
    pub is_emergency: bool,
    pub booking_timestamp: DateTime<Utc>,
    pub score: f64,
    pub position: usize,
    pub estimated_wait_minutes: u32,
    pub appointment_duration_minutes: u32,
    pub priority_reason: String,
    pub oracle_optimized: bool,
    pub status: TicketStatus,
}

/// Ordered, positioned view of the waiting line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueSnapshot {
    tickets: Vec<PatientTicket>,
}

impl QueueSnapshot {
    pub fn new(tickets: Vec<PatientTicket>) -> Self {
        Self { tickets }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tickets(&self) -> &[PatientTicket] {
        &self.tickets
    }

    pub fn into_tickets(self) -> Vec<PatientTicket> {
        self.tickets
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Ticket at position 1
    pub fn head(&self) -> Option<&PatientTicket> {
        self.tickets.first()
    }

    pub fn get(&self, id: &PatientId) -> Option<&PatientTicket> {
        self.tickets.iter().find(|ticket| &ticket.id == id)
    }

    pub fn position_of(&self, id: &PatientId) -> Option<usize> {
        self.get(id).map(|ticket| ticket.position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatientTicket> {
        self.tickets.iter()
    }
}

impl<'a> IntoIterator for &'a QueueSnapshot {
    type Item = &'a PatientTicket;
    type IntoIter = std::slice::Iter<'a, PatientTicket>;

    fn into_iter(self) -> Self::IntoIter {
        self.tickets.iter()
    }
}

/// Append-only history entry for an admitted patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRecord {
    pub ticket: PatientTicket,
    pub completed_at: DateTime<Utc>,
    /// 1-based admission order since the last clear
    pub completion_order: usize,
}

/// Result of an AssignNext call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Admission {
    Admitted { ticket: PatientTicket, remaining: usize },
    EmptyQueue,
}

impl Admission {
    /// The admitted ticket, if any
    pub fn ticket(&self) -> Option<&PatientTicket> {
        match self {
            Admission::Admitted { ticket, .. } => Some(ticket),
            Admission::EmptyQueue => None,
        }
    }

    /// Waiting bookings left after this call
    pub fn remaining(&self) -> usize {
        match self {
            Admission::Admitted { remaining, .. } => *remaining,
            Admission::EmptyQueue => 0,
        }
    }
}

/// What booking intake reports back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub patient_id: PatientId,
    pub position: usize,
    pub estimated_wait_minutes: u32,
    pub queue_size: usize,
}

/// Queue status counters derived from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub waiting: usize,
    pub completed: usize,
    pub emergency_cases: usize,
    pub high_priority: usize,
    pub oracle_optimized: usize,
    pub current_patient: Option<PatientTicket>,
    /// Wait of the ticket at position 2, or 0
    pub next_patient_wait_minutes: u32,
}

impl QueueSummary {
    /// Summarize a snapshot
    pub fn from_snapshot(snapshot: &QueueSnapshot, completed: usize, high_priority_threshold: f64) -> Self {
        Self {
            waiting: snapshot.len(),
            completed,
            emergency_cases: snapshot.iter().filter(|t| t.is_emergency).count(),
            high_priority: snapshot.iter().filter(|t| t.score >= high_priority_threshold).count(),
            oracle_optimized: snapshot.iter().filter(|t| t.oracle_optimized).count(),
            current_patient: snapshot.head().cloned(),
            next_patient_wait_minutes: snapshot.tickets().get(1).map_or(0, |t| t.estimated_wait_minutes),
        }
    }
}

/// Consistent copy of the store's waiting side, handed to the orderer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueState {
    /// Waiting bookings in append order
    pub bookings: Vec<RawBooking>,
    /// Patient promoted to the head by an emergency reorder
    pub promoted_head: Option<PatientId>,
    /// Manually pinned scores
    pub score_overrides: HashMap<PatientId, f64>,
}

impl QueueState {
    pub fn contains(&self, id: &PatientId) -> bool {
        self.bookings.iter().any(|booking| &booking.patient_id == id)
    }

    pub fn booking(&self, id: &PatientId) -> Option<&RawBooking> {
        self.bookings.iter().find(|booking| &booking.patient_id == id)
    }
}
