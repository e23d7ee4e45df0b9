//! Rendering of replay results

use clap::ValueEnum;
use clinicq_engine::prelude::*;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::commands::replay::{ReplayReport, StepOutcome};

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Human-readable tables
    Table,
}

#[derive(Tabled)]
struct TicketRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Patient")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    appointment_type: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Wait (min)")]
    wait: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&PatientTicket> for TicketRow {
    fn from(ticket: &PatientTicket) -> Self {
        Self {
            position: ticket.position,
            id: ticket.id.to_string(),
            name: ticket.name.clone(),
            appointment_type: ticket.appointment_type.to_string(),
            score: format!("{:.1}", ticket.score),
            wait: ticket.estimated_wait_minutes,
            status: format!("{:?}", ticket.status),
            reason: ticket.priority_reason.clone(),
        }
    }
}

/// Serialize anything as pretty JSON
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Render a snapshot as a table
pub fn snapshot_table(snapshot: &QueueSnapshot) -> String {
    if snapshot.is_empty() {
        return "(queue is empty)".dimmed().to_string();
    }
    Table::new(snapshot.iter().map(TicketRow::from)).to_string()
}

/// Render a whole replay in the requested format
pub fn render(report: &ReplayReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Table => Ok(render_table(report)),
    }
}

fn render_table(report: &ReplayReport) -> String {
    let mut out = Vec::new();

    out.push(format!("{}", "═══ Bookings ═══".bold()));
    for receipt in &report.receipts {
        out.push(format!(
            "📋 {} at position {} (wait {} min)",
            receipt.patient_id, receipt.position, receipt.estimated_wait_minutes
        ));
    }
    for rejected in &report.rejected_bookings {
        out.push(format!("{} {}", "✗".red(), rejected));
    }

    for step in &report.steps {
        out.push(String::new());
        out.push(format!("{}", format!("═══ Step {}: {} ═══", step.step, step.action).bold()));

        match &step.outcome {
            StepOutcome::Snapshot { queue } => out.push(snapshot_table(queue)),
            StepOutcome::Admission { admission } => match admission {
                Admission::Admitted { ticket, remaining } => out.push(format!(
                    "👩‍⚕️ {} ({}) is now being seen, {} still waiting",
                    ticket.name.green(),
                    ticket.id,
                    remaining
                )),
                Admission::EmptyQueue => out.push("Queue is empty, nobody to admit".yellow().to_string()),
            },
            StepOutcome::Summary { summary } => {
                out.push(format!("⏳ Waiting: {}", summary.waiting));
                out.push(format!("✅ Completed: {}", summary.completed));
                out.push(format!("🚨 Emergencies: {}", summary.emergency_cases));
                out.push(format!("⬆️  High priority: {}", summary.high_priority));
                out.push(format!("🤖 Oracle optimized: {}", summary.oracle_optimized));
                if let Some(current) = &summary.current_patient {
                    out.push(format!("👤 Next up: {} ({})", current.name, current.id));
                }
                out.push(format!("⌛ Next patient wait: {} min", summary.next_patient_wait_minutes));
            }
            StepOutcome::Completed { records } => {
                for record in records {
                    out.push(format!(
                        "{}. {} ({}) at {}",
                        record.completion_order,
                        record.ticket.name,
                        record.ticket.id,
                        record.completed_at.format("%H:%M:%S")
                    ));
                }
            }
            StepOutcome::Rejected { error } => out.push(format!("{} {}", "✗".red(), error)),
        }
    }

    out.join("\n")
}
