use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ClinicQueueError, Result};
use crate::patient::{AppointmentType, PatientId, RawBooking};
use crate::scoring::clamp_score;

use super::types::{Admission, CompletedRecord, QueueSnapshot, QueueState, TicketStatus};

/// Outcome of an emergency promotion attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Promotion {
    /// The patient was waiting and is now the pinned head; carries the
    /// ordering as it was just before the promotion
    Promoted(QueueSnapshot),
    /// The patient has no waiting booking; carries the unchanged ordering
    NotWaiting(QueueSnapshot),
}

#[derive(Debug, Default)]
struct StoreInner {
    state: QueueState,
    completed: Vec<CompletedRecord>,
    next_sequence: u64,
}

/// Shared holder of waiting bookings and admission history
///
/// Every mutation takes the write lock, so the pinned head and the position
/// numbering are never observed half-updated. Ordering closures passed to
/// the mutating methods run under that lock and must not block.
#[derive(Debug)]
pub struct QueueStore {
    inner: RwLock<StoreInner>,
    max_size: usize,
}

impl QueueStore {
    /// Create an empty store holding at most `max_size` waiting bookings
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            max_size,
        }
    }

    /// Append a booking; returns the number of waiting bookings
    pub fn append(&self, mut booking: RawBooking) -> Result<usize> {
        let mut inner = self.inner.write();

        if inner.state.contains(&booking.patient_id) {
            warn!("📞 Patient {} already in queue, not re-queuing", booking.patient_id);
            return Err(ClinicQueueError::AlreadyQueued(booking.patient_id));
        }

        if inner.state.bookings.len() >= self.max_size {
            return Err(ClinicQueueError::QueueFull { max_size: self.max_size });
        }

        inner.next_sequence += 1;
        booking.sequence = inner.next_sequence;

        debug!(
            "📥 Queued {} (sequence: {}, emergency: {})",
            booking.patient_id,
            booking.sequence,
            booking.resolved_emergency()
        );
        inner.state.bookings.push(booking);

        let waiting = inner.state.bookings.len();
        debug!("📊 Queue size: {} patients", waiting);
        Ok(waiting)
    }

    /// Copy of the waiting side, taken under the read lock
    pub fn state(&self) -> QueueState {
        self.inner.read().state.clone()
    }

    /// Admit the head of the ordering produced by `order`
    pub fn admit_head<F>(&self, order: F) -> Admission
    where
        F: FnOnce(&QueueState) -> QueueSnapshot,
    {
        let mut inner = self.inner.write();
        let snapshot = order(&inner.state);

        let Some(head) = snapshot.head().cloned() else {
            debug!("Admission requested on an empty queue");
            return Admission::EmptyQueue;
        };

        inner.state.bookings.retain(|booking| booking.patient_id != head.id);
        inner.state.score_overrides.remove(&head.id);
        if inner.state.promoted_head.as_ref() == Some(&head.id) {
            inner.state.promoted_head = None;
        }

        let completion_order = inner.completed.len() + 1;
        let mut record_ticket = head.clone();
        record_ticket.status = TicketStatus::Completed;
        inner.completed.push(CompletedRecord {
            ticket: record_ticket,
            completed_at: Utc::now(),
            completion_order,
        });

        let remaining = inner.state.bookings.len();

        let mut ticket = head;
        ticket.status = TicketStatus::BeingSeen;
        Admission::Admitted { ticket, remaining }
    }

    /// Make a waiting patient the pinned emergency head
    pub fn promote_emergency<F>(&self, patient_id: &PatientId, order: F) -> Promotion
    where
        F: FnOnce(&QueueState) -> QueueSnapshot,
    {
        let mut inner = self.inner.write();
        let snapshot = order(&inner.state);

        let Some(booking) = inner.state.bookings.iter_mut().find(|b| &b.patient_id == patient_id) else {
            return Promotion::NotWaiting(snapshot);
        };

        booking.is_emergency = Some(true);
        booking.appointment_type = Some(AppointmentType::Emergency);
        inner.state.promoted_head = Some(patient_id.clone());
        inner.state.score_overrides.remove(patient_id);

        Promotion::Promoted(snapshot)
    }

    /// Pin a waiting patient's score; returns the clamped score
    pub fn set_score_override(&self, patient_id: &PatientId, score: f64) -> Result<f64> {
        if !score.is_finite() {
            return Err(ClinicQueueError::invalid_input(format!("score {} is not a finite number", score)));
        }

        let mut inner = self.inner.write();
        if !inner.state.contains(patient_id) {
            return Err(ClinicQueueError::InvalidPatientReference(patient_id.clone()));
        }

        let pinned = clamp_score(score);
        inner.state.score_overrides.insert(patient_id.clone(), pinned);
        info!("✏️ Priority for {} manually set to {:.2}", patient_id, pinned);
        Ok(pinned)
    }

    /// Admission history, oldest first
    pub fn completed(&self) -> Vec<CompletedRecord> {
        self.inner.read().completed.clone()
    }

    /// Waiting and completed counts, read together
    pub fn counts(&self) -> (usize, usize) {
        let inner = self.inner.read();
        (inner.state.bookings.len(), inner.completed.len())
    }

    pub fn waiting_len(&self) -> usize {
        self.inner.read().state.bookings.len()
    }

    pub fn is_waiting(&self, patient_id: &PatientId) -> bool {
        self.inner.read().state.contains(patient_id)
    }

    /// Discard waiting bookings and history
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let (waiting, completed) = (inner.state.bookings.len(), inner.completed.len());
        inner.state = QueueState::default();
        inner.completed.clear();
        info!("🧹 Cleared queue ({} waiting, {} completed discarded)", waiting, completed);
    }
}
