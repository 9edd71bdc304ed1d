use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use common::{Alert, IpoRecord, IpoStatus, RunSummary, StoredIpoState};

use crate::policy::PolicyConfig;
use crate::window::{self, WindowPhase, WindowState};
use crate::{alert, history, rule};

/// Result of folding one run's records into the stored snapshot.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// The complete table to persist, ordered by name.
    pub rows: Vec<StoredIpoState>,
    /// Alerts for rows that moved to Proceed during this run.
    pub alerts: Vec<Alert>,
    pub summary: RunSummary,
}

/// Pure decision core. Holds no state between runs: everything it remembers
/// comes in through the snapshot and goes out through `RunOutcome::rows`.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    policy: PolicyConfig,
}

impl DecisionEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Process one run: classify every record, fold in-window readings,
    /// decide rows at their decision point, then prune expired rows.
    pub fn evaluate(
        &self,
        today: NaiveDate,
        records: &[IpoRecord],
        snapshot: Vec<StoredIpoState>,
    ) -> RunOutcome {
        let mut summary = RunSummary {
            extracted: records.len(),
            ..RunSummary::default()
        };
        let mut rows: BTreeMap<String, StoredIpoState> = BTreeMap::new();
        for row in snapshot {
            if rows.insert(row.name.clone(), row).is_some() {
                warn!("Store returned duplicate rows for one IPO; keeping the last");
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut alerts = Vec::new();

        for record in records {
            if !seen.insert(record.name.as_str()) {
                warn!(name = %record.name, "Duplicate IPO in extraction; keeping the first row");
                summary.duplicate_rows += 1;
                continue;
            }

            let state = window::classify(&self.policy.window, today, record.end_date, record.start_date);
            debug!(name = %record.name, ?state, end = ?record.end_date, "Window classified");

            let phase = match state {
                WindowState::InWindow(phase) => phase,
                WindowState::Invalid => {
                    warn!(
                        name = %record.name,
                        start = ?record.start_date,
                        end = ?record.end_date,
                        "Dropping IPO with unusable dates"
                    );
                    summary.invalid_rows += 1;
                    continue;
                }
                WindowState::BeforeWindow => {
                    summary.before_window += 1;
                    continue;
                }
                WindowState::Expired => {
                    summary.expired += 1;
                    continue;
                }
            };
            let Some(end_date) = record.end_date else {
                continue;
            };
            summary.in_window += 1;

            let existing = match rows.remove(&record.name) {
                // A closed row sharing the name is an unrelated earlier issue.
                Some(old) if old.end_date < today => {
                    info!(name = %old.name, end = %old.end_date, "Replacing expired row with a new issue");
                    summary.pruned += 1;
                    None
                }
                Some(old) if old.last_processed == Some(today) => {
                    debug!(name = %old.name, "Already processed today; leaving row untouched");
                    summary.already_processed += 1;
                    rows.insert(old.name.clone(), old);
                    continue;
                }
                other => other,
            };

            let mut row = history::fold(existing, record, end_date, today);

            if let WindowPhase::Decide(day) = phase {
                if row.status.is_decided() {
                    debug!(name = %row.name, status = %row.status, "Decision already made");
                } else {
                    let status = rule::decide(self.policy.decision, self.policy.threshold, &row);
                    let score = rule::score(self.policy.decision, &row);
                    match status {
                        IpoStatus::Pending => {
                            warn!(name = %row.name, "No usable GMP reading at decision point; leaving Pending");
                            summary.undecided += 1;
                        }
                        IpoStatus::Proceed => {
                            info!(
                                name = %row.name,
                                score = ?score,
                                threshold = self.policy.threshold,
                                day = day.label(),
                                "GMP passed: Proceed"
                            );
                            row.status = IpoStatus::Proceed;
                            summary.proceeded += 1;
                            alerts.push(alert::compose(&row, day, &self.policy));
                        }
                        IpoStatus::Skip => {
                            info!(
                                name = %row.name,
                                score = ?score,
                                threshold = self.policy.threshold,
                                "GMP below threshold: Skip"
                            );
                            row.status = IpoStatus::Skip;
                            summary.skipped += 1;
                        }
                    }
                }
            }

            rows.insert(row.name.clone(), row);
        }

        summary.pruned += prune(&mut rows, today);
        summary.stored_rows = rows.len();

        RunOutcome {
            rows: rows.into_values().collect(),
            alerts,
            summary,
        }
    }
}

/// Drop every row whose close date is before `today`. Returns how many went.
pub fn prune(rows: &mut BTreeMap<String, StoredIpoState>, today: NaiveDate) -> usize {
    let before = rows.len();
    rows.retain(|name, row| {
        let keep = row.end_date >= today;
        if !keep {
            info!(name = %name, end = %row.end_date, "Pruning expired IPO");
        }
        keep
    });
    before - rows.len()
}
