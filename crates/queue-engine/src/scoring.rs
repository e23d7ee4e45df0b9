//! Static priority scoring
//!
//! Scores are additive over a handful of patient factors and always fall in
//! `[MIN_SCORE, MAX_SCORE]`. Emergencies short-circuit to `MAX_SCORE`.

use serde::{Deserialize, Serialize};

use crate::patient::{AppointmentType, PatientRecord, RiskLevel};

/// Lowest score any ticket can carry
pub const MIN_SCORE: f64 = 1.0;

/// Score of every emergency ticket
pub const MAX_SCORE: f64 = 100.0;

/// Condition keywords that count as chronic
pub const CHRONIC_KEYWORDS: [&str; 6] = ["diabetes", "hypertension", "heart", "cancer", "kidney", "liver"];

/// How the conditions text contributed to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSeverity {
    None,
    Reported,
    Chronic,
}

/// Which age band, if any, earned a bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    Senior,
    YoungChild,
    Minor,
    Adult,
}

/// Per-factor contributions to a patient's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub emergency: bool,
    pub risk_level: RiskLevel,
    pub risk_points: f64,
    pub age_band: AgeBand,
    pub age_points: f64,
    pub condition_severity: ConditionSeverity,
    pub condition_points: f64,
    pub appointment_points: f64,
    pub no_show_points: f64,
    /// Final clamped score
    pub total: f64,
}

/// Computes patient priority scores
#[derive(Debug, Clone, Copy, Default)]
pub struct PatientScorer;

impl PatientScorer {
    /// Priority score in `[1, 100]`; higher is more urgent
    pub fn score(patient: &PatientRecord, appointment_type: AppointmentType, is_emergency: bool) -> f64 {
        Self::breakdown(patient, appointment_type, is_emergency).total
    }

    /// Score with every contributing factor itemized
    pub fn breakdown(patient: &PatientRecord, appointment_type: AppointmentType, is_emergency: bool) -> ScoreBreakdown {
        let (age_band, age_points) = age_bonus(patient.age);
        let (condition_severity, condition_points) = condition_severity(patient.conditions.as_deref());

        if is_emergency {
            return ScoreBreakdown {
                emergency: true,
                risk_level: patient.risk_level,
                risk_points: 0.0,
                age_band,
                age_points: 0.0,
                condition_severity,
                condition_points: 0.0,
                appointment_points: 0.0,
                no_show_points: 0.0,
                total: MAX_SCORE,
            };
        }

        let risk_points = risk_weight(patient.risk_level);
        let appointment_points = appointment_weight(appointment_type);
        let no_show_points = no_show_adjustment(patient.effective_no_show_probability());

        let raw = risk_points + age_points + condition_points + appointment_points + no_show_points;

        ScoreBreakdown {
            emergency: false,
            risk_level: patient.risk_level,
            risk_points,
            age_band,
            age_points,
            condition_severity,
            condition_points,
            appointment_points,
            no_show_points,
            total: clamp_score(raw),
        }
    }
}

/// Clamp any score into the valid range; NaN collapses to the minimum
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

fn risk_weight(risk: RiskLevel) -> f64 {
    match risk {
        RiskLevel::High => 30.0,
        RiskLevel::Medium => 20.0,
        RiskLevel::Low => 10.0,
    }
}

// First matching band wins.
fn age_bonus(age: u32) -> (AgeBand, f64) {
    if age >= 65 {
        (AgeBand::Senior, 20.0)
    } else if age <= 5 {
        (AgeBand::YoungChild, 15.0)
    } else if age <= 18 {
        (AgeBand::Minor, 10.0)
    } else {
        (AgeBand::Adult, 0.0)
    }
}

fn condition_severity(conditions: Option<&str>) -> (ConditionSeverity, f64) {
    // Any text other than an empty string or "none" counts, whitespace included
    let text = match conditions {
        Some(text) if !text.is_empty() && !text.eq_ignore_ascii_case("none") => text.to_ascii_lowercase(),
        _ => return (ConditionSeverity::None, 0.0),
    };

    if CHRONIC_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        (ConditionSeverity::Chronic, 25.0)
    } else {
        (ConditionSeverity::Reported, 15.0)
    }
}

fn appointment_weight(appointment_type: AppointmentType) -> f64 {
    match appointment_type {
        AppointmentType::Emergency => 15.0,
        AppointmentType::Urgent => 12.0,
        AppointmentType::Followup => 8.0,
        AppointmentType::Consultation => 5.0,
        AppointmentType::Checkup => 3.0,
        AppointmentType::Diagnostics | AppointmentType::Specialist => 5.0,
    }
}

fn no_show_adjustment(probability: f64) -> f64 {
    if probability > 0.3 {
        -10.0
    } else if probability < 0.1 {
        5.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn patient(age: u32, risk: RiskLevel, conditions: Option<&str>, no_show: Option<f64>) -> PatientRecord {
        let mut record = PatientRecord::new("p", "Test", age, risk).unwrap();
        record.conditions = conditions.map(str::to_string);
        record.no_show_probability = no_show;
        record
    }

    #[test]
    fn test_emergency_short_circuits() {
        let record = patient(30, RiskLevel::Low, None, Some(0.9));
        assert_eq!(PatientScorer::score(&record, AppointmentType::Checkup, true), MAX_SCORE);
    }

    #[test]
    fn test_senior_with_chronic_condition() {
        // high 30 + senior 20 + chronic 25 + urgent 12 + reliable 5
        let record = patient(70, RiskLevel::High, Some("Type 2 Diabetes"), Some(0.05));
        let breakdown = PatientScorer::breakdown(&record, AppointmentType::Urgent, false);
        assert_eq!(breakdown.total, 92.0);
        assert_eq!(breakdown.age_band, AgeBand::Senior);
        assert_eq!(breakdown.condition_severity, ConditionSeverity::Chronic);
    }

    #[test]
    fn test_age_bands_are_exclusive() {
        let toddler = patient(3, RiskLevel::Low, None, None);
        let teen = patient(16, RiskLevel::Low, None, None);
        let adult = patient(40, RiskLevel::Low, None, None);
        // low 10 + checkup 3 + default no-show 0
        assert_eq!(PatientScorer::score(&toddler, AppointmentType::Checkup, false), 28.0);
        assert_eq!(PatientScorer::score(&teen, AppointmentType::Checkup, false), 23.0);
        assert_eq!(PatientScorer::score(&adult, AppointmentType::Checkup, false), 13.0);
    }

    #[test]
    fn test_condition_text_handling() {
        let none_text = patient(40, RiskLevel::Low, Some("None"), None);
        let other = patient(40, RiskLevel::Low, Some("asthma"), None);
        let empty = patient(40, RiskLevel::Low, Some(""), None);
        let blank = patient(40, RiskLevel::Low, Some("   "), None);
        let padded_none = patient(40, RiskLevel::Low, Some(" none "), None);
        assert_eq!(PatientScorer::breakdown(&none_text, AppointmentType::Consultation, false).condition_points, 0.0);
        assert_eq!(PatientScorer::breakdown(&other, AppointmentType::Consultation, false).condition_points, 15.0);
        assert_eq!(PatientScorer::breakdown(&empty, AppointmentType::Consultation, false).condition_points, 0.0);
        assert_eq!(PatientScorer::breakdown(&blank, AppointmentType::Consultation, false).condition_points, 15.0);
        assert_eq!(
            PatientScorer::breakdown(&padded_none, AppointmentType::Consultation, false).condition_severity,
            ConditionSeverity::Reported
        );
    }

    #[test]
    fn test_no_show_penalty_and_floor() {
        // low 10 + checkup 3 - 10 = 3
        let unreliable = patient(40, RiskLevel::Low, None, Some(0.5));
        assert_eq!(PatientScorer::score(&unreliable, AppointmentType::Checkup, false), 3.0);
        assert_eq!(clamp_score(-20.0), MIN_SCORE);
        assert_eq!(clamp_score(f64::NAN), MIN_SCORE);
        assert_eq!(clamp_score(180.0), MAX_SCORE);
    }

    fn any_type() -> impl Strategy<Value = AppointmentType> {
        prop::sample::select(AppointmentType::ALL.to_vec())
    }

    fn any_risk() -> impl Strategy<Value = RiskLevel> {
        prop::sample::select(vec![RiskLevel::Low, RiskLevel::Medium, RiskLevel::High])
    }

    proptest! {
        #[test]
        fn prop_score_within_bounds(
            age in 0u32..=120,
            risk in any_risk(),
            appointment in any_type(),
            no_show in proptest::option::of(0.0f64..=1.0),
            conditions in proptest::option::of("[a-z ]{0,24}"),
            emergency in any::<bool>(),
        ) {
            let record = patient(age, risk, conditions.as_deref(), no_show);
            let score = PatientScorer::score(&record, appointment, emergency);
            prop_assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
            if emergency {
                prop_assert_eq!(score, MAX_SCORE);
            }
            prop_assert_eq!(score, PatientScorer::score(&record, appointment, emergency));
        }
    }
}
