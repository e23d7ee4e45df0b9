//! Replay command - feed a scenario through a fresh engine

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clinicq_engine::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::output::{self, OutputFormat};
use crate::scenario::{Action, Scenario};

/// Everything a replay produced, in order
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub receipts: Vec<BookingReceipt>,
    pub rejected_bookings: Vec<String>,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: Action,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Snapshot { queue: QueueSnapshot },
    Admission { admission: Admission },
    Summary { summary: QueueSummary },
    Completed { records: Vec<CompletedRecord> },
    Rejected { error: String },
}

/// Execute replay command
pub async fn execute(scenario_path: &Path, config: QueueEngineConfig, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(scenario_path)?;
    info!(
        "▶️ Replaying {} ({} patients, {} bookings, {} actions)",
        scenario_path.display(),
        scenario.patients.len(),
        scenario.bookings.len(),
        scenario.actions().len()
    );

    let report = run(&scenario, config).await?;
    println!("{}", output::render(&report, format)?);
    Ok(())
}

/// Run a scenario against a fresh engine
pub async fn run(scenario: &Scenario, config: QueueEngineConfig) -> Result<ReplayReport> {
    let directory = Arc::new(scenario.directory().context("invalid patient list")?);
    let engine = match scenario.oracle() {
        Some(oracle) => QueueEngine::new(config, directory, oracle)?,
        None => QueueEngine::without_oracle(config, directory)?,
    };

    let mut receipts = Vec::with_capacity(scenario.bookings.len());
    let mut rejected_bookings = Vec::new();
    for booking in &scenario.bookings {
        let patient_id = booking.patient_id.clone();
        match engine.book(booking.clone()).await {
            Ok(receipt) => receipts.push(receipt),
            Err(e) => {
                warn!("Booking for {} rejected: {}", patient_id, e);
                rejected_bookings.push(format!("{}: {}", patient_id, e));
            }
        }
    }

    let mut steps = Vec::new();
    for (index, action) in scenario.actions().into_iter().enumerate() {
        let outcome = apply(&engine, &action).await;
        steps.push(StepReport {
            step: index + 1,
            action,
            outcome,
        });
    }

    Ok(ReplayReport {
        receipts,
        rejected_bookings,
        steps,
    })
}

async fn apply(engine: &QueueEngine, action: &Action) -> StepOutcome {
    match action {
        Action::Order => StepOutcome::Snapshot {
            queue: engine.get_ordered_queue().await,
        },
        Action::AssignNext => StepOutcome::Admission {
            admission: engine.assign_next(),
        },
        Action::Emergency(patient_id) => StepOutcome::Snapshot {
            queue: engine.reorder_for_emergency(patient_id),
        },
        Action::Override(patient_id, score) => match engine.apply_manual_priority_override(patient_id, *score).await {
            Ok(queue) => StepOutcome::Snapshot { queue },
            Err(e) => StepOutcome::Rejected { error: e.to_string() },
        },
        Action::Summary => StepOutcome::Summary {
            summary: engine.summary().await,
        },
        Action::Completed => StepOutcome::Completed {
            records: engine.completed(),
        },
    }
}
