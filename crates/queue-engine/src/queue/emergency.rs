use tracing::{info, warn};

use crate::patient::{AppointmentType, PatientId, RiskLevel};
use crate::scoring::MAX_SCORE;

use super::types::{QueueSnapshot, TicketStatus};
use super::wait_time::DurationTable;

/// Default delay added to everyone displaced by an emergency (minutes)
pub const DEFAULT_EMERGENCY_DELAY_MINUTES: u32 = 15;

/// Forces an emergency patient to the head of a snapshot
#[derive(Debug, Clone)]
pub struct EmergencyReorder {
    delay_minutes: u32,
    durations: DurationTable,
}

impl EmergencyReorder {
    pub fn new(delay_minutes: u32, durations: DurationTable) -> Self {
        Self {
            delay_minutes,
            durations,
        }
    }

    pub fn delay_minutes(&self) -> u32 {
        self.delay_minutes
    }

    /// Put `patient_id` at position 1 and push everyone else back
    ///
    /// A patient that is not in the snapshot leaves it untouched. Every other
    /// ticket moves down exactly one position and waits `delay_minutes`
    /// longer; their relative order is preserved.
    pub fn reorder(&self, snapshot: &QueueSnapshot, patient_id: &PatientId) -> QueueSnapshot {
        let Some(target) = snapshot.get(patient_id) else {
            warn!("Emergency reorder ignored: patient {} is not waiting", patient_id);
            return snapshot.clone();
        };

        let mut promoted = target.clone();
        promoted.score = MAX_SCORE;
        promoted.status = TicketStatus::Emergency;
        promoted.is_emergency = true;
        promoted.appointment_type = AppointmentType::Emergency;
        promoted.risk_level = RiskLevel::High;
        promoted.appointment_duration_minutes = self.durations.minutes_for(AppointmentType::Emergency);
        promoted.estimated_wait_minutes = 0;
        promoted.position = 1;
        promoted.priority_reason = "Emergency case - immediate attention required".to_string();
        promoted.oracle_optimized = false;

        let mut tickets = Vec::with_capacity(snapshot.len());
        tickets.push(promoted);
        for ticket in snapshot.iter().filter(|t| &t.id != patient_id) {
            let mut displaced = ticket.clone();
            displaced.position += 1;
            displaced.estimated_wait_minutes = displaced.estimated_wait_minutes.saturating_add(self.delay_minutes);
            tickets.push(displaced);
        }

        info!(
            "🚨 Emergency reorder: {} moved to position 1, {} patients delayed {} minutes",
            patient_id,
            tickets.len() - 1,
            self.delay_minutes
        );
        QueueSnapshot::new(tickets)
    }
}

impl Default for EmergencyReorder {
    fn default() -> Self {
        Self::new(DEFAULT_EMERGENCY_DELAY_MINUTES, DurationTable::default())
    }
}
