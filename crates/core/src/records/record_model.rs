//! Record domain model and best-record policy.

use serde::{Deserialize, Serialize};

/// A personal-best slot: at most one record exists per
/// (clientId, exerciseId) pair. Weight/reps are replaced in place when a
/// better lift comes in; this is not a history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub client_id: String,
    pub exercise_id: String,
    pub weight: f64,
    pub reps: u32,
    pub volume: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Result of a `save_record` attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The candidate beat the existing best (or filled an empty slot).
    Saved {
        record: Record,
        was_gold: bool,
        is_gold: bool,
    },
    /// The candidate did not beat the pair's current best; nothing was
    /// mutated. Carries the current best so the caller can surface it.
    NotAnImprovement { existing: Record },
    /// The client id did not resolve; nothing was saved.
    UnknownClient,
}

impl SaveOutcome {
    pub fn saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// Derived intensity metric: weight times reps, rounded to the nearest
/// whole unit.
pub fn compute_volume(weight: f64, reps: u32) -> i64 {
    (weight * f64::from(reps)).round() as i64
}

/// Whether a candidate lift beats the existing best for its slot.
///
/// Rule: an empty slot always loses; otherwise higher weight wins, and on
/// equal weight higher reps wins. Equal-or-worse candidates are rejected.
pub fn is_improvement(existing: Option<&Record>, weight: f64, reps: u32) -> bool {
    match existing {
        None => true,
        Some(record) => {
            weight > record.weight || (weight == record.weight && reps > record.reps)
        }
    }
}
