use std::str::FromStr;

use chrono::NaiveDate;
use crate::Error;

/// One row of the GMP report as observed on a single run.
///
/// Dates are `None` when the source cell carried no date at all; rows whose
/// dates were present but unparseable never make it this far.
#[derive(Debug, Clone, PartialEq)]
pub struct IpoRecord {
    pub name: String,
    /// Grey market premium in percent.
    pub gmp: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Subscription level exactly as displayed, e.g. `"12.4x"`.
    pub subscription: String,
}

/// Recommendation attached to a stored IPO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpoStatus {
    #[default]
    Pending,
    Proceed,
    Skip,
}

impl IpoStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, IpoStatus::Pending)
    }
}

impl std::fmt::Display for IpoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpoStatus::Pending => write!(f, "Pending"),
            IpoStatus::Proceed => write!(f, "Proceed"),
            IpoStatus::Skip => write!(f, "Skip"),
        }
    }
}

impl FromStr for IpoStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "pending" => Ok(IpoStatus::Pending),
            "proceed" => Ok(IpoStatus::Proceed),
            "skip" => Ok(IpoStatus::Skip),
            other => Err(Error::Parse(format!("unknown IPO status '{other}'"))),
        }
    }
}

/// Accumulated state for one IPO, keyed by `name`. All memory that must
/// survive between runs lives here.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIpoState {
    pub name: String,
    /// GMP readings in run order, oldest first.
    pub gmp_history: Vec<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: NaiveDate,
    /// Latest observed subscription text.
    pub subscription: String,
    pub status: IpoStatus,
    /// Run date that last folded a reading into this row. Guards against
    /// double appends when the job runs twice on the same day.
    pub last_processed: Option<NaiveDate>,
}

impl StoredIpoState {
    pub fn latest_gmp(&self) -> Option<f64> {
        self.gmp_history.last().copied()
    }

    /// Mean of the finite readings, `None` if there are none.
    pub fn average_gmp(&self) -> Option<f64> {
        let finite: Vec<f64> = self
            .gmp_history
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if finite.is_empty() {
            return None;
        }
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

/// Output of one extractor pass.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<IpoRecord>,
    /// Rows discarded because a field could not be parsed.
    pub dropped: usize,
}

/// An outbound notification produced by a `Pending -> Proceed` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub name: String,
    pub message: String,
}

/// Counters reported at the end of every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub extracted: usize,
    pub dropped_rows: usize,
    pub invalid_rows: usize,
    pub duplicate_rows: usize,
    pub before_window: usize,
    pub in_window: usize,
    pub expired: usize,
    pub already_processed: usize,
    pub proceeded: usize,
    pub skipped: usize,
    pub undecided: usize,
    pub pruned: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub stored_rows: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "extracted={} dropped={} invalid={} duplicate={} before_window={} in_window={} \
             expired={} already_processed={} proceed={} skip={} undecided={} pruned={} \
             alerts_sent={} alerts_failed={} stored={}",
            self.extracted,
            self.dropped_rows,
            self.invalid_rows,
            self.duplicate_rows,
            self.before_window,
            self.in_window,
            self.expired,
            self.already_processed,
            self.proceeded,
            self.skipped,
            self.undecided,
            self.pruned,
            self.alerts_sent,
            self.alerts_failed,
            self.stored_rows,
        )
    }
}
