//! # Scheduling Oracle
//!
//! The oracle is an optional, best-effort advisor that may add an urgency
//! boost to a candidate's score. It stands in for a learned prioritization
//! policy whose training happens entirely outside this crate.
//!
//! ```text
//!   QueueOrderer ──(top K candidates)──▶ GuardedOracle ──▶ dyn SchedulingOracle
//!        ▲                                   │
//!        └──── boost | Unavailable ◀─────────┘  timeout, panic, malformed => Unavailable
//! ```
//!
//! Callers never talk to a [`SchedulingOracle`] directly; the orderer goes
//! through [`GuardedOracle`], which enforces the per-call timeout, isolates
//! panics and validates responses. Failure is a value
//! ([`OracleResponse::Unavailable`]), never an error on the ordering path.
//!
//! Each call runs on tokio's blocking pool, so an oracle doing synchronous
//! inference inside `recommend` still cannot hold up the caller past the
//! timeout. A call that overruns is abandoned: async work is cancelled at
//! its next await point, blocking work finishes on its own thread and the
//! result is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ClinicQueueError, Result};
use crate::patient::{AppointmentType, PatientId, RiskLevel};

/// Largest boost magnitude accepted from an oracle
pub const MAX_BOOST_MAGNITUDE: f64 = 100.0;

/// What the oracle sees about one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleContext {
    pub patient_id: PatientId,
    pub appointment_type: AppointmentType,
    pub risk_level: RiskLevel,
    pub age: u32,
    pub base_score: f64,
    /// Rank among the candidates sent this round, starting at 1
    pub candidate_rank: usize,
    /// Waiting bookings at the time of the read
    pub queue_length: usize,
}

/// An advisory answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OracleRecommendation {
    /// Added to the candidate's score
    pub urgency_boost: f64,
    /// Oracle's own confidence in `[0, 1]`
    pub confidence: f64,
}

/// Tagged oracle result
#[derive(Debug, Clone, PartialEq)]
pub enum OracleResponse {
    Recommendation(OracleRecommendation),
    Unavailable { reason: String },
}

impl OracleResponse {
    /// Shorthand for an unavailable response
    pub fn unavailable(reason: impl Into<String>) -> Self {
        OracleResponse::Unavailable { reason: reason.into() }
    }

    /// The boost, if one was produced
    pub fn boost(&self) -> Option<f64> {
        match self {
            OracleResponse::Recommendation(rec) => Some(rec.urgency_boost),
            OracleResponse::Unavailable { .. } => None,
        }
    }
}

/// External advisory scorer
///
/// Implementations may block inside `recommend`; the guard never runs it on
/// an async worker thread.
#[async_trait]
pub trait SchedulingOracle: Send + Sync {
    /// Recommend an urgency boost for one candidate
    async fn recommend(&self, context: &OracleContext) -> OracleResponse;
}

/// Oracle that never answers; ordering falls back to base scores
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

#[async_trait]
impl SchedulingOracle for NoOracle {
    async fn recommend(&self, _context: &OracleContext) -> OracleResponse {
        OracleResponse::unavailable("no oracle configured")
    }
}

/// Oracle answering from a fixed per-patient table
///
/// Used for replaying recorded policy output and in tests. Patients missing
/// from the table are unavailable.
#[derive(Debug, Clone, Default)]
pub struct FixedBoostOracle {
    boosts: HashMap<PatientId, OracleRecommendation>,
}

impl FixedBoostOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a boost for a patient
    pub fn with_boost(mut self, patient_id: impl Into<PatientId>, urgency_boost: f64, confidence: f64) -> Self {
        self.boosts.insert(
            patient_id.into(),
            OracleRecommendation {
                urgency_boost,
                confidence,
            },
        );
        self
    }
}

#[async_trait]
impl SchedulingOracle for FixedBoostOracle {
    async fn recommend(&self, context: &OracleContext) -> OracleResponse {
        match self.boosts.get(&context.patient_id) {
            Some(rec) => OracleResponse::Recommendation(*rec),
            None => OracleResponse::unavailable(format!("no recommendation for {}", context.patient_id)),
        }
    }
}

/// Timeout, panic and validation guard around an oracle
#[derive(Clone)]
pub struct GuardedOracle {
    inner: Arc<dyn SchedulingOracle>,
    timeout: Duration,
    enabled: bool,
}

impl std::fmt::Debug for GuardedOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedOracle")
            .field("timeout", &self.timeout)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl GuardedOracle {
    /// Guard an oracle with a per-call timeout
    pub fn new(inner: Arc<dyn SchedulingOracle>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            enabled: true,
        }
    }

    /// A guard that never calls out
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(NoOracle),
            timeout: Duration::from_millis(1),
            enabled: false,
        }
    }

    /// Whether any call will be made
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Consult the oracle; every failure mode collapses to `Unavailable`
    pub async fn consult(&self, context: &OracleContext) -> OracleResponse {
        if !self.enabled {
            return OracleResponse::unavailable("oracle disabled");
        }

        let response = match Handle::try_current() {
            Err(e) => Err(ClinicQueueError::oracle_unavailable(e.to_string())),
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                let call_context = context.clone();
                // Dropped when this call returns, which cancels an overrunning async oracle
                let (_cancel, cancelled) = oneshot::channel::<()>();

                let call = tokio::task::spawn_blocking(move || {
                    handle.block_on(async move {
                        tokio::select! {
                            response = inner.recommend(&call_context) => Some(response),
                            _ = cancelled => None,
                        }
                    })
                });

                match tokio::time::timeout(self.timeout, call).await {
                    Err(_) => Err(ClinicQueueError::oracle_unavailable(format!(
                        "timed out after {}ms",
                        self.timeout.as_millis()
                    ))),
                    Ok(Err(e)) if e.is_panic() => Err(ClinicQueueError::oracle_unavailable("oracle panicked")),
                    Ok(Err(e)) => Err(ClinicQueueError::oracle_unavailable(e.to_string())),
                    Ok(Ok(None)) => Err(ClinicQueueError::oracle_unavailable("call cancelled")),
                    Ok(Ok(Some(OracleResponse::Recommendation(rec)))) => validate(rec),
                    Ok(Ok(Some(OracleResponse::Unavailable { reason }))) => {
                        Err(ClinicQueueError::oracle_unavailable(reason))
                    }
                }
            }
        };

        match response {
            Ok(rec) => {
                debug!(
                    "Oracle boost {:+.2} (confidence {:.2}) for {}",
                    rec.urgency_boost, rec.confidence, context.patient_id
                );
                OracleResponse::Recommendation(rec)
            }
            Err(e) => {
                warn!("Falling back to base score for {}: {}", context.patient_id, e);
                OracleResponse::unavailable(e.to_string())
            }
        }
    }
}

fn validate(rec: OracleRecommendation) -> Result<OracleRecommendation> {
    if !rec.urgency_boost.is_finite() || rec.urgency_boost.abs() > MAX_BOOST_MAGNITUDE {
        return Err(ClinicQueueError::oracle_unavailable(format!(
            "malformed urgency boost {}",
            rec.urgency_boost
        )));
    }
    if !rec.confidence.is_finite() || !(0.0..=1.0).contains(&rec.confidence) {
        return Err(ClinicQueueError::oracle_unavailable(format!(
            "malformed confidence {}",
            rec.confidence
        )));
    }
    Ok(rec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(id: &str) -> OracleContext {
        OracleContext {
            patient_id: PatientId::new(id),
            appointment_type: AppointmentType::Checkup,
            risk_level: RiskLevel::Low,
            age: 40,
            base_score: 13.0,
            candidate_rank: 1,
            queue_length: 3,
        }
    }

    struct PanickingOracle;

    #[async_trait]
    impl SchedulingOracle for PanickingOracle {
        async fn recommend(&self, _context: &OracleContext) -> OracleResponse {
            panic!("model file missing");
        }
    }

    struct SleepyOracle;

    #[async_trait]
    impl SchedulingOracle for SleepyOracle {
        async fn recommend(&self, _context: &OracleContext) -> OracleResponse {
            tokio::time::sleep(Duration::from_secs(5)).await;
            OracleResponse::Recommendation(OracleRecommendation {
                urgency_boost: 10.0,
                confidence: 1.0,
            })
        }
    }

    #[tokio::test]
    async fn test_fixed_boost_passes_validation() {
        let oracle = GuardedOracle::new(
            Arc::new(FixedBoostOracle::new().with_boost("p1", 7.5, 0.9)),
            Duration::from_millis(100),
        );
        assert_eq!(oracle.consult(&context("p1")).await.boost(), Some(7.5));
        assert_eq!(oracle.consult(&context("p2")).await.boost(), None);
    }

    #[tokio::test]
    async fn test_malformed_response_is_unavailable() {
        let oracle = GuardedOracle::new(
            Arc::new(
                FixedBoostOracle::new()
                    .with_boost("nan", f64::NAN, 0.5)
                    .with_boost("huge", 500.0, 0.5)
                    .with_boost("unsure", 5.0, 1.5),
            ),
            Duration::from_millis(100),
        );
        for id in ["nan", "huge", "unsure"] {
            assert!(matches!(oracle.consult(&context(id)).await, OracleResponse::Unavailable { .. }));
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let oracle = GuardedOracle::new(Arc::new(PanickingOracle), Duration::from_millis(100));
        let response = oracle.consult(&context("p1")).await;
        assert_eq!(response, OracleResponse::unavailable("Scheduling oracle unavailable: oracle panicked"));
    }

    struct BlockingOracle;

    #[async_trait]
    impl SchedulingOracle for BlockingOracle {
        async fn recommend(&self, _context: &OracleContext) -> OracleResponse {
            // Synchronous inference, never yields
            std::thread::sleep(Duration::from_millis(300));
            OracleResponse::Recommendation(OracleRecommendation {
                urgency_boost: 10.0,
                confidence: 1.0,
            })
        }
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let oracle = GuardedOracle::new(Arc::new(SleepyOracle), Duration::from_millis(20));
        let started = std::time::Instant::now();
        assert!(oracle.consult(&context("p1")).await.boost().is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_timeout_is_enforced_for_blocking_oracle() {
        let oracle = GuardedOracle::new(Arc::new(BlockingOracle), Duration::from_millis(20));
        let started = std::time::Instant::now();
        let response = oracle.consult(&context("p1")).await;
        assert_eq!(
            response,
            OracleResponse::unavailable("Scheduling oracle unavailable: timed out after 20ms")
        );
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_blocking_oracle_within_timeout_is_used() {
        let oracle = GuardedOracle::new(Arc::new(BlockingOracle), Duration::from_secs(5));
        assert_eq!(oracle.consult(&context("p1")).await.boost(), Some(10.0));
    }

    #[test]
    fn test_disabled_guard_never_calls_out() {
        let oracle = GuardedOracle::disabled();
        assert!(!oracle.is_enabled());
        let response = tokio_test::block_on(oracle.consult(&context("p1")));
        assert!(response.boost().is_none());
    }
}
