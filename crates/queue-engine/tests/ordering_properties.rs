//! Ordering invariants over generated queues

mod common;

use clinicq_engine::prelude::*;
use clinicq_engine::queue::{EmergencyReorder, QueueOrderer, QueueState};
use common::at;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct GeneratedBooking {
    appointment_type: AppointmentType,
    emergency: bool,
    minute: i64,
    age: u32,
    risk: RiskLevel,
    conditions: Option<&'static str>,
}

fn appointment_type() -> impl Strategy<Value = AppointmentType> {
    prop::sample::select(AppointmentType::ALL.to_vec())
}

fn risk_level() -> impl Strategy<Value = RiskLevel> {
    prop::sample::select(vec![RiskLevel::Low, RiskLevel::Medium, RiskLevel::High])
}

fn generated_booking() -> impl Strategy<Value = GeneratedBooking> {
    (
        appointment_type(),
        prop::bool::weighted(0.15),
        0i64..30,
        0u32..100,
        risk_level(),
        prop::option::of(prop::sample::select(vec!["asthma", "kidney disease", "none"])),
    )
        .prop_map(|(appointment_type, emergency, minute, age, risk, conditions)| GeneratedBooking {
            appointment_type,
            emergency,
            minute,
            age,
            risk,
            conditions,
        })
}

fn build(generated: &[GeneratedBooking]) -> (QueueState, InMemoryPatientDirectory) {
    let directory = InMemoryPatientDirectory::new();
    let mut state = QueueState::default();

    for (index, g) in generated.iter().enumerate() {
        let id = format!("p{}", index);
        let mut record = PatientRecord::new(id.as_str(), id.as_str(), g.age, g.risk).unwrap();
        if let Some(conditions) = g.conditions {
            record = record.with_conditions(conditions);
        }
        directory.upsert(record).unwrap();

        let mut booking = RawBooking::new(id.as_str(), g.appointment_type, g.emergency, at(g.minute));
        booking.sequence = index as u64 + 1;
        state.bookings.push(booking);
    }

    (state, directory)
}

proptest! {
    #[test]
    fn prop_positions_are_contiguous_and_scores_bounded(generated in prop::collection::vec(generated_booking(), 0..25)) {
        let (state, directory) = build(&generated);
        let snapshot = QueueOrderer::default().order_base(&state, &directory);

        prop_assert_eq!(snapshot.len(), generated.len());
        for (index, ticket) in snapshot.iter().enumerate() {
            prop_assert_eq!(ticket.position, index + 1);
            prop_assert!(ticket.score >= MIN_SCORE && ticket.score <= MAX_SCORE);
            if ticket.is_emergency {
                prop_assert_eq!(ticket.score, MAX_SCORE);
            }
        }
    }

    #[test]
    fn prop_head_is_first_appended(generated in prop::collection::vec(generated_booking(), 1..25)) {
        let (state, directory) = build(&generated);
        let snapshot = QueueOrderer::default().order_base(&state, &directory);

        // Timestamps are random, so this only holds if they are ignored
        prop_assert_eq!(&snapshot.head().unwrap().id, &state.bookings[0].patient_id);
    }

    #[test]
    fn prop_appending_never_moves_head(
        generated in prop::collection::vec(generated_booking(), 2..25),
    ) {
        let (state, directory) = build(&generated);
        let orderer = QueueOrderer::default();

        let mut partial = QueueState::default();
        for booking in &state.bookings {
            partial.bookings.push(booking.clone());
            let snapshot = orderer.order_base(&partial, &directory);
            prop_assert_eq!(&snapshot.head().unwrap().id, &state.bookings[0].patient_id);
        }
    }

    #[test]
    fn prop_tail_sorted_by_score(generated in prop::collection::vec(generated_booking(), 2..25)) {
        let (state, directory) = build(&generated);
        let snapshot = QueueOrderer::default().order_base(&state, &directory);

        let tail = &snapshot.tickets()[1..];
        for pair in tail.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].booking_timestamp <= pair[1].booking_timestamp);
            }
        }
    }

    #[test]
    fn prop_waits_accumulate_after_head(generated in prop::collection::vec(generated_booking(), 2..25)) {
        let (state, directory) = build(&generated);
        let snapshot = QueueOrderer::default().order_base(&state, &directory);
        let tickets = snapshot.tickets();

        prop_assert_eq!(tickets[0].estimated_wait_minutes, tickets[0].appointment_duration_minutes);
        prop_assert_eq!(tickets[1].estimated_wait_minutes, tickets[0].appointment_duration_minutes);
        for i in 1..tickets.len() - 1 {
            prop_assert_eq!(
                tickets[i + 1].estimated_wait_minutes,
                tickets[i].estimated_wait_minutes + tickets[i].appointment_duration_minutes
            );
        }
    }

    #[test]
    fn prop_ordering_is_idempotent(generated in prop::collection::vec(generated_booking(), 0..25)) {
        let (state, directory) = build(&generated);
        let orderer = QueueOrderer::default();
        prop_assert_eq!(orderer.order_base(&state, &directory), orderer.order_base(&state, &directory));
    }

    #[test]
    fn prop_emergency_reorder_shifts_by_one(
        generated in prop::collection::vec(generated_booking(), 1..25),
        pick in any::<prop::sample::Index>(),
    ) {
        let (state, directory) = build(&generated);
        let before = QueueOrderer::default().order_base(&state, &directory);
        let target = before.tickets()[pick.index(before.len())].id.clone();

        let reorder = EmergencyReorder::default();
        let after = reorder.reorder(&before, &target);

        prop_assert_eq!(after.len(), before.len());
        let head = after.head().unwrap();
        prop_assert_eq!(&head.id, &target);
        prop_assert_eq!(head.estimated_wait_minutes, 0);

        for ticket in after.iter().skip(1) {
            let old = before.get(&ticket.id).unwrap();
            prop_assert_eq!(ticket.position, old.position + 1);
            prop_assert_eq!(
                ticket.estimated_wait_minutes,
                old.estimated_wait_minutes + reorder.delay_minutes()
            );
        }
    }
}
