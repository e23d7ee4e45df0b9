use std::sync::Arc;

use tracing::{debug, info};

use crate::config::QueueEngineConfig;
use crate::error::Result;
use crate::oracle::{GuardedOracle, SchedulingOracle};
use crate::patient::{PatientDirectory, PatientId, RawBooking};
use crate::queue::{
    Admission, BookingReceipt, CompletedRecord, EmergencyReorder, Promotion, QueueOrderer, QueueSnapshot, QueueStore,
    QueueSummary, WaitTimeEstimator,
};

/// Main queue engine
///
/// Owns the shared [`QueueStore`] and wires the orderer, emergency reorder and
/// guarded oracle around it. Construct one per process and share it behind an
/// `Arc`; every method takes `&self`.
pub struct QueueEngine {
    config: QueueEngineConfig,
    store: Arc<QueueStore>,
    directory: Arc<dyn PatientDirectory>,
    oracle: GuardedOracle,
    orderer: QueueOrderer,
    emergency: EmergencyReorder,
}

impl QueueEngine {
    /// Create an engine consulting `oracle` on reads
    pub fn new(
        config: QueueEngineConfig,
        directory: Arc<dyn PatientDirectory>,
        oracle: Arc<dyn SchedulingOracle>,
    ) -> Result<Self> {
        Self::build(config, directory, Some(oracle))
    }

    /// Create an engine that orders from base scores only
    pub fn without_oracle(config: QueueEngineConfig, directory: Arc<dyn PatientDirectory>) -> Result<Self> {
        Self::build(config, directory, None)
    }

    fn build(
        config: QueueEngineConfig,
        directory: Arc<dyn PatientDirectory>,
        oracle: Option<Arc<dyn SchedulingOracle>>,
    ) -> Result<Self> {
        config.validate()?;

        let durations = config.durations.to_table()?;
        let orderer = QueueOrderer::new(WaitTimeEstimator::new(durations.clone()), config.oracle.max_candidates);
        let emergency = EmergencyReorder::new(config.queue.emergency_delay_minutes, durations);
        let oracle = match oracle {
            Some(oracle) if config.oracle.enabled => GuardedOracle::new(oracle, config.oracle.timeout()),
            _ => GuardedOracle::disabled(),
        };
        let store = Arc::new(QueueStore::new(config.queue.max_queue_size));

        info!(
            "🎯 Queue engine ready (max size: {}, oracle: {}, timeout: {}ms, candidates: {})",
            config.queue.max_queue_size,
            if oracle.is_enabled() { "on" } else { "off" },
            config.oracle.timeout_ms,
            config.oracle.max_candidates
        );

        Ok(Self {
            config,
            store,
            directory,
            oracle,
            orderer,
            emergency,
        })
    }

    pub fn config(&self) -> &QueueEngineConfig {
        &self.config
    }

    /// Handle to the underlying store
    pub fn store(&self) -> Arc<QueueStore> {
        Arc::clone(&self.store)
    }

    /// Booking intake
    ///
    /// The receipt comes from the base ordering right after the append, so
    /// booking never waits on the oracle; a later read may still move the
    /// patient within the tail. A concurrent admission of the same patient in
    /// between yields position 0.
    pub async fn book(&self, booking: RawBooking) -> Result<BookingReceipt> {
        let patient_id = booking.patient_id.clone();
        let appointment_type = booking.resolved_type();
        let queue_size = self.store.append(booking)?;

        let snapshot = self.orderer.order_base(&self.store.state(), self.directory.as_ref());
        let (position, estimated_wait_minutes) = snapshot
            .get(&patient_id)
            .map_or((0, 0), |ticket| (ticket.position, ticket.estimated_wait_minutes));

        info!(
            "📋 Booked {} for {} at position {} (estimated wait {} minutes)",
            patient_id, appointment_type, position, estimated_wait_minutes
        );

        Ok(BookingReceipt {
            patient_id,
            position,
            estimated_wait_minutes,
            queue_size,
        })
    }

    /// Current ordering, recomputed from scratch
    ///
    /// Raw state is copied under the read lock; scoring and oracle calls run
    /// after the lock is released.
    pub async fn get_ordered_queue(&self) -> QueueSnapshot {
        let state = self.store.state();
        self.orderer.order(&state, self.directory.as_ref(), &self.oracle).await
    }

    /// Atomically admit the patient at position 1
    ///
    /// Position 1 is the pinned head, which oracle input never moves, so the
    /// ordering used here is the base ordering computed under the write lock.
    pub fn assign_next(&self) -> Admission {
        let directory = self.directory.as_ref();
        let admission = self.store.admit_head(|state| self.orderer.order_base(state, directory));
        if let Admission::Admitted { ticket, remaining } = &admission {
            info!("👩‍⚕️ {} is now being seen ({} still waiting)", ticket.id, remaining);
        }
        admission
    }

    /// Promote a waiting patient to the head as an emergency
    ///
    /// Returns the disrupted ordering: the patient at position 1 with no wait,
    /// everyone else one position later and delayed by the configured
    /// interruption. A patient with no waiting booking leaves the queue as it
    /// is and only produces a warning.
    pub fn reorder_for_emergency(&self, patient_id: &PatientId) -> QueueSnapshot {
        let directory = self.directory.as_ref();
        let promotion = self
            .store
            .promote_emergency(patient_id, |state| self.orderer.order_base(state, directory));

        match promotion {
            Promotion::Promoted(before) | Promotion::NotWaiting(before) => self.emergency.reorder(&before, patient_id),
        }
    }

    /// Pin a waiting patient's score until they are admitted
    pub async fn apply_manual_priority_override(&self, patient_id: &PatientId, score: f64) -> Result<QueueSnapshot> {
        let pinned = self.store.set_score_override(patient_id, score)?;
        debug!("Override for {} stored as {:.2}", patient_id, pinned);
        Ok(self.get_ordered_queue().await)
    }

    /// Admission history, oldest first
    pub fn completed(&self) -> Vec<CompletedRecord> {
        self.store.completed()
    }

    /// Status counters over a fresh ordering
    pub async fn summary(&self) -> QueueSummary {
        let snapshot = self.get_ordered_queue().await;
        let (_, completed) = self.store.counts();
        QueueSummary::from_snapshot(&snapshot, completed, self.config.queue.high_priority_threshold)
    }

    /// Drop every waiting booking and the admission history
    pub fn clear(&self) {
        self.store.clear();
    }
}
