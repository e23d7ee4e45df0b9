use std::collections::HashMap;

use crate::patient::AppointmentType;

use super::types::PatientTicket;

/// Appointment type to duration lookup with a default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationTable {
    default_minutes: u32,
    minutes: HashMap<AppointmentType, u32>,
}

impl DurationTable {
    /// Empty table; every type resolves to `default_minutes`
    pub fn new(default_minutes: u32) -> Self {
        Self {
            default_minutes,
            minutes: HashMap::new(),
        }
    }

    pub fn set(&mut self, appointment_type: AppointmentType, minutes: u32) {
        self.minutes.insert(appointment_type, minutes);
    }

    pub fn with(mut self, appointment_type: AppointmentType, minutes: u32) -> Self {
        self.set(appointment_type, minutes);
        self
    }

    pub fn minutes_for(&self, appointment_type: AppointmentType) -> u32 {
        self.minutes.get(&appointment_type).copied().unwrap_or(self.default_minutes)
    }

    pub fn default_minutes(&self) -> u32 {
        self.default_minutes
    }
}

impl Default for DurationTable {
    fn default() -> Self {
        Self::new(15)
            .with(AppointmentType::Emergency, 60)
            .with(AppointmentType::Urgent, 40)
            .with(AppointmentType::Diagnostics, 30)
            .with(AppointmentType::Consultation, 25)
            .with(AppointmentType::Checkup, 15)
            .with(AppointmentType::Followup, 12)
    }
}

/// Fills in durations and cumulative waits over an ordered ticket list
///
/// Position 1 waits for its own appointment when anyone follows it and 0
/// otherwise. Every later position waits for the sum of the durations of all
/// tickets ahead of it, so the last ticket's wait is the total of everyone
/// else's.
#[derive(Debug, Clone, Default)]
pub struct WaitTimeEstimator {
    durations: DurationTable,
}

impl WaitTimeEstimator {
    pub fn new(durations: DurationTable) -> Self {
        Self { durations }
    }

    pub fn durations(&self) -> &DurationTable {
        &self.durations
    }

    /// Annotate tickets in place; `tickets` must already be in final order
    pub fn estimate(&self, tickets: &mut [PatientTicket]) {
        let count = tickets.len();
        let mut elapsed: u32 = 0;

        for (index, ticket) in tickets.iter_mut().enumerate() {
            let duration = self.durations.minutes_for(ticket.appointment_type);
            ticket.appointment_duration_minutes = duration;

            ticket.estimated_wait_minutes = if index == 0 {
                if count > 1 {
                    duration
                } else {
                    0
                }
            } else {
                elapsed
            };

            elapsed = elapsed.saturating_add(duration);
        }
    }
}
