use std::cmp::Ordering;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::oracle::{GuardedOracle, OracleContext, OracleResponse};
use crate::patient::{AppointmentType, PatientDirectory, PatientRecord, RawBooking};
use crate::scoring::{clamp_score, AgeBand, ConditionSeverity, PatientScorer, ScoreBreakdown, MAX_SCORE};

use super::types::{PatientTicket, QueueSnapshot, QueueState, TicketStatus};
use super::wait_time::WaitTimeEstimator;

/// Default number of candidates sent to the oracle per read
pub const DEFAULT_ORACLE_CANDIDATES: usize = 10;

const HEAD_REASON: &str = "First appointment - no reordering";
const PROMOTED_HEAD_REASON: &str = "Emergency case - immediate attention required";
const MANUAL_SUFFIX: &str = " - Manually adjusted";

/// Turns raw queue state into an ordered snapshot
///
/// The head booking is pinned to position 1 and never takes part in scoring
/// order. Everyone else is scored, optionally boosted by the oracle, and
/// stable-sorted by descending score, then booking time, then append order.
#[derive(Debug, Clone)]
pub struct QueueOrderer {
    estimator: WaitTimeEstimator,
    max_oracle_candidates: usize,
}

/// One booking resolved against the directory and scored
#[derive(Debug, Clone)]
struct Candidate {
    booking: RawBooking,
    record: PatientRecord,
    appointment_type: AppointmentType,
    is_emergency: bool,
    breakdown: ScoreBreakdown,
    score: f64,
    manual: bool,
    oracle_optimized: bool,
}

impl Candidate {
    fn oracle_eligible(&self) -> bool {
        !self.is_emergency && !self.manual
    }
}

impl QueueOrderer {
    pub fn new(estimator: WaitTimeEstimator, max_oracle_candidates: usize) -> Self {
        Self {
            estimator,
            max_oracle_candidates,
        }
    }

    pub fn estimator(&self) -> &WaitTimeEstimator {
        &self.estimator
    }

    /// Order with oracle input
    ///
    /// Oracle calls for the top candidates run concurrently, each bounded by
    /// the guard's timeout. Candidates whose call fails keep their base score.
    pub async fn order(&self, state: &QueueState, directory: &dyn PatientDirectory, oracle: &GuardedOracle) -> QueueSnapshot {
        let (head, mut rest) = self.prepare(state, directory);

        if oracle.is_enabled() && !rest.is_empty() {
            sort_candidates(&mut rest);
            let queue_length = state.bookings.len();

            let selected: Vec<usize> = rest
                .iter()
                .enumerate()
                .filter(|(_, candidate)| candidate.oracle_eligible())
                .map(|(index, _)| index)
                .take(self.max_oracle_candidates)
                .collect();

            let contexts: Vec<OracleContext> = selected
                .iter()
                .enumerate()
                .map(|(rank, &index)| {
                    let candidate = &rest[index];
                    OracleContext {
                        patient_id: candidate.booking.patient_id.clone(),
                        appointment_type: candidate.appointment_type,
                        risk_level: candidate.record.risk_level,
                        age: candidate.record.age,
                        base_score: candidate.score,
                        candidate_rank: rank + 1,
                        queue_length,
                    }
                })
                .collect();

            let responses = join_all(contexts.iter().map(|context| oracle.consult(context))).await;

            let mut boosted = 0;
            for (index, response) in selected.into_iter().zip(responses) {
                if let OracleResponse::Recommendation(rec) = response {
                    let candidate = &mut rest[index];
                    candidate.score = clamp_score(candidate.score + rec.urgency_boost);
                    candidate.oracle_optimized = true;
                    boosted += 1;
                }
            }
            debug!("Oracle boosted {}/{} candidates", boosted, contexts.len());
        }

        self.assemble(head, rest)
    }

    /// Order from base scores and manual overrides only
    pub fn order_base(&self, state: &QueueState, directory: &dyn PatientDirectory) -> QueueSnapshot {
        let (head, rest) = self.prepare(state, directory);
        self.assemble(head, rest)
    }

    fn prepare(&self, state: &QueueState, directory: &dyn PatientDirectory) -> (Option<Candidate>, Vec<Candidate>) {
        let head_index = pinned_head_index(state);

        let mut head = None;
        let mut rest = Vec::with_capacity(state.bookings.len());

        for (index, booking) in state.bookings.iter().enumerate() {
            let candidate = self.score_booking(booking, state, directory);
            if Some(index) == head_index {
                head = Some(candidate);
            } else {
                rest.push(candidate);
            }
        }

        (head, rest)
    }

    fn score_booking(&self, booking: &RawBooking, state: &QueueState, directory: &dyn PatientDirectory) -> Candidate {
        let record = match directory.patient(&booking.patient_id) {
            Some(record) => match record.validate() {
                Ok(()) => record,
                Err(e) => {
                    warn!("Ignoring invalid record for {}: {}", booking.patient_id, e);
                    PatientRecord::placeholder(booking.patient_id.clone())
                }
            },
            None => {
                warn!("No patient record for {}, scoring from default profile", booking.patient_id);
                PatientRecord::placeholder(booking.patient_id.clone())
            }
        };

        let appointment_type = booking.resolved_type();
        let is_emergency = booking.resolved_emergency();
        let breakdown = PatientScorer::breakdown(&record, appointment_type, is_emergency);

        let (score, manual) = match state.score_overrides.get(&booking.patient_id) {
            Some(_) if is_emergency => (MAX_SCORE, false),
            Some(&pinned) => (clamp_score(pinned), true),
            None => (breakdown.total, false),
        };

        Candidate {
            booking: booking.clone(),
            record,
            appointment_type,
            is_emergency,
            breakdown,
            score,
            manual,
            oracle_optimized: false,
        }
    }

    fn assemble(&self, head: Option<Candidate>, mut rest: Vec<Candidate>) -> QueueSnapshot {
        sort_candidates(&mut rest);

        let mut tickets = Vec::with_capacity(rest.len() + 1);

        if let Some(candidate) = head {
            let promoted = candidate.is_emergency;
            let mut reason = if promoted {
                PROMOTED_HEAD_REASON.to_string()
            } else {
                HEAD_REASON.to_string()
            };
            if candidate.manual {
                reason.push_str(MANUAL_SUFFIX);
            }
            let mut ticket = to_ticket(candidate, reason, false);
            if promoted {
                ticket.status = TicketStatus::Emergency;
            }
            tickets.push(ticket);
        }

        for candidate in rest {
            let reason = priority_reason(&candidate);
            let oracle_optimized = candidate.oracle_optimized;
            tickets.push(to_ticket(candidate, reason, oracle_optimized));
        }

        for (index, ticket) in tickets.iter_mut().enumerate() {
            ticket.position = index + 1;
        }
        self.estimator.estimate(&mut tickets);

        debug!("Ordered {} tickets", tickets.len());
        QueueSnapshot::new(tickets)
    }
}

impl Default for QueueOrderer {
    fn default() -> Self {
        Self::new(WaitTimeEstimator::default(), DEFAULT_ORACLE_CANDIDATES)
    }
}

/// Index of the pinned head booking
///
/// A promoted emergency takes precedence; otherwise the first booking still
/// waiting, by append order. Booking timestamps play no part, so a late
/// arrival carrying an earlier timestamp never takes position 1.
fn pinned_head_index(state: &QueueState) -> Option<usize> {
    if let Some(promoted) = &state.promoted_head {
        if let Some(index) = state.bookings.iter().position(|b| &b.patient_id == promoted) {
            return Some(index);
        }
    }

    state
        .bookings
        .iter()
        .enumerate()
        .min_by_key(|(_, booking)| booking.sequence)
        .map(|(index, _)| index)
}

fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(compare_candidates);
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.booking.booking_timestamp.cmp(&b.booking.booking_timestamp))
        .then(a.booking.sequence.cmp(&b.booking.sequence))
}

fn to_ticket(candidate: Candidate, priority_reason: String, oracle_optimized: bool) -> PatientTicket {
    PatientTicket {
        id: candidate.booking.patient_id,
        name: candidate.record.name,
        age: candidate.record.age,
        risk_level: candidate.record.risk_level,
        conditions: candidate.record.conditions,
        appointment_type: candidate.appointment_type,
        is_emergency: candidate.is_emergency,
        booking_timestamp: candidate.booking.booking_timestamp,
        score: candidate.score,
        position: 0,
        estimated_wait_minutes: 0,
        appointment_duration_minutes: 0,
        priority_reason,
        oracle_optimized,
        status: TicketStatus::Waiting,
    }
}

// Observability only; never consulted for ordering.
fn priority_reason(candidate: &Candidate) -> String {
    let mut reasons: Vec<&str> = Vec::new();

    reasons.push(if candidate.score >= 80.0 {
        "High priority"
    } else if candidate.score >= 60.0 {
        "Medium priority"
    } else {
        "Standard priority"
    });

    if candidate.is_emergency {
        reasons.push("emergency booking");
    }

    match candidate.breakdown.age_band {
        AgeBand::Senior => reasons.push("senior citizen"),
        AgeBand::YoungChild => reasons.push("young child"),
        AgeBand::Minor | AgeBand::Adult => {}
    }

    if candidate.breakdown.risk_level == crate::patient::RiskLevel::High {
        reasons.push("high risk condition");
    }

    match candidate.breakdown.condition_severity {
        ConditionSeverity::Chronic => reasons.push("chronic condition"),
        ConditionSeverity::Reported => reasons.push("reported condition"),
        ConditionSeverity::None => {}
    }

    if candidate.oracle_optimized {
        reasons.push("oracle optimized");
    }

    let mut reason = reasons.join(" - ");
    if candidate.manual {
        reason.push_str(MANUAL_SUFFIX);
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{InMemoryPatientDirectory, PatientId, RiskLevel};
    use chrono::{Duration, TimeZone, Utc};

    fn at(minute: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn booking(id: &str, appointment_type: AppointmentType, minute: i64, sequence: u64) -> RawBooking {
        let mut booking = RawBooking::new(id, appointment_type, false, at(minute));
        booking.sequence = sequence;
        booking
    }

    fn directory(ids: &[&str]) -> InMemoryPatientDirectory {
        InMemoryPatientDirectory::from_records(
            ids.iter()
                .map(|id| PatientRecord::new(*id, id.to_uppercase(), 40, RiskLevel::Low).unwrap()),
        )
        .unwrap()
    }

    fn ids(snapshot: &QueueSnapshot) -> Vec<&str> {
        snapshot.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_empty_state() {
        let snapshot = QueueOrderer::default().order_base(&QueueState::default(), &directory(&[]));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_head_pinned_regardless_of_score() {
        let state = QueueState {
            bookings: vec![
                booking("a", AppointmentType::Checkup, 0, 1),
                booking("b", AppointmentType::Urgent, 1, 2),
                booking("c", AppointmentType::Emergency, 2, 3),
            ],
            ..Default::default()
        };
        let snapshot = QueueOrderer::default().order_base(&state, &directory(&["a", "b", "c"]));

        assert_eq!(ids(&snapshot), vec!["a", "c", "b"]);
        assert_eq!(snapshot.head().unwrap().priority_reason, HEAD_REASON);
        assert_eq!(snapshot.get(&PatientId::new("c")).unwrap().score, MAX_SCORE);
    }

    #[test]
    fn test_ties_break_by_booking_time_then_sequence() {
        let state = QueueState {
            bookings: vec![
                booking("head", AppointmentType::Checkup, 0, 1),
                booking("late", AppointmentType::Checkup, 9, 2),
                booking("early", AppointmentType::Checkup, 3, 3),
                booking("same-a", AppointmentType::Checkup, 5, 4),
                booking("same-b", AppointmentType::Checkup, 5, 5),
            ],
            ..Default::default()
        };
        let dir = directory(&["head", "late", "early", "same-a", "same-b"]);
        let snapshot = QueueOrderer::default().order_base(&state, &dir);
        assert_eq!(ids(&snapshot), vec!["head", "early", "same-a", "same-b", "late"]);
    }

    #[test]
    fn test_head_follows_append_order_not_timestamp() {
        let state = QueueState {
            bookings: vec![
                booking("late-stamp", AppointmentType::Checkup, 10, 1),
                booking("early-stamp", AppointmentType::Urgent, 0, 2),
            ],
            ..Default::default()
        };
        let snapshot = QueueOrderer::default().order_base(&state, &directory(&["late-stamp", "early-stamp"]));
        assert_eq!(ids(&snapshot), vec!["late-stamp", "early-stamp"]);
        assert_eq!(snapshot.head().unwrap().priority_reason, HEAD_REASON);
    }

    #[test]
    fn test_promoted_head_overrides_first_booking() {
        let mut promoted = booking("z", AppointmentType::Emergency, 5, 2);
        promoted.is_emergency = Some(true);
        let state = QueueState {
            bookings: vec![booking("a", AppointmentType::Checkup, 0, 1), promoted],
            promoted_head: Some(PatientId::new("z")),
            ..Default::default()
        };
        let snapshot = QueueOrderer::default().order_base(&state, &directory(&["a", "z"]));
        assert_eq!(ids(&snapshot), vec!["z", "a"]);
        assert_eq!(snapshot.head().unwrap().priority_reason, PROMOTED_HEAD_REASON);
        assert_eq!(snapshot.head().unwrap().status, TicketStatus::Emergency);
    }

    #[test]
    fn test_manual_override_reorders_tail() {
        let mut state = QueueState {
            bookings: vec![
                booking("a", AppointmentType::Checkup, 0, 1),
                booking("b", AppointmentType::Urgent, 1, 2),
                booking("c", AppointmentType::Checkup, 2, 3),
            ],
            ..Default::default()
        };
        state.score_overrides.insert(PatientId::new("c"), 99.0);
        let snapshot = QueueOrderer::default().order_base(&state, &directory(&["a", "b", "c"]));

        assert_eq!(ids(&snapshot), vec!["a", "c", "b"]);
        let c = snapshot.get(&PatientId::new("c")).unwrap();
        assert_eq!(c.score, 99.0);
        assert!(c.priority_reason.ends_with(MANUAL_SUFFIX));
        assert!(!c.oracle_optimized);
    }

    #[test]
    fn test_missing_record_uses_placeholder() {
        let state = QueueState {
            bookings: vec![booking("ghost", AppointmentType::Checkup, 0, 1)],
            ..Default::default()
        };
        let snapshot = QueueOrderer::default().order_base(&state, &directory(&[]));
        let ticket = snapshot.head().unwrap();
        assert_eq!(ticket.name, "Patient ghost");
        assert_eq!(ticket.estimated_wait_minutes, 0);
    }

    #[test]
    fn test_priority_reason_mentions_factors() {
        let dir = InMemoryPatientDirectory::new();
        dir.upsert(PatientRecord::new("head", "Head", 40, RiskLevel::Low).unwrap()).unwrap();
        dir.upsert(
            PatientRecord::new("s", "Senior", 80, RiskLevel::High)
                .unwrap()
                .with_conditions("heart disease"),
        )
        .unwrap();
        let state = QueueState {
            bookings: vec![
                booking("head", AppointmentType::Checkup, 0, 1),
                booking("s", AppointmentType::Urgent, 1, 2),
            ],
            ..Default::default()
        };
        let snapshot = QueueOrderer::default().order_base(&state, &dir);
        // 30 + 20 + 25 + 12 + 0
        let senior = snapshot.get(&PatientId::new("s")).unwrap();
        assert_eq!(senior.score, 87.0);
        assert_eq!(
            senior.priority_reason,
            "High priority - senior citizen - high risk condition - chronic condition"
        );
    }
}
