use common::{IpoStatus, StoredIpoState};

use crate::policy::DecisionRule;

/// The figure compared against the threshold, `None` when the history holds
/// no usable reading.
pub fn score(rule: DecisionRule, row: &StoredIpoState) -> Option<f64> {
    match rule {
        DecisionRule::LatestReading => row.gmp_history.iter().rev().copied().find(|v| v.is_finite()),
        DecisionRule::HistoryAverage => row.average_gmp(),
    }
}

/// Classify a row at its decision point. The comparison is strict: a score
/// equal to the threshold is a Skip. No usable reading leaves it Pending.
pub fn decide(rule: DecisionRule, threshold: f64, row: &StoredIpoState) -> IpoStatus {
    match score(rule, row) {
        Some(value) if value > threshold => IpoStatus::Proceed,
        Some(_) => IpoStatus::Skip,
        None => IpoStatus::Pending,
    }
}
