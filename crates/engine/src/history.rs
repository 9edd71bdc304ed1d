use chrono::NaiveDate;
use tracing::{debug, warn};

use common::{IpoRecord, IpoStatus, StoredIpoState};

/// Fold one in-window reading into the IPO's stored state.
///
/// A missing row starts a fresh history. An existing row gets the reading
/// appended and its metadata refreshed from the latest observation. Status
/// is left for the decision rule.
pub fn fold(
    existing: Option<StoredIpoState>,
    record: &IpoRecord,
    end_date: NaiveDate,
    today: NaiveDate,
) -> StoredIpoState {
    match existing {
        None => {
            debug!(name = %record.name, gmp = record.gmp, "Starting GMP history");
            StoredIpoState {
                name: record.name.clone(),
                gmp_history: finite_reading(record).into_iter().collect(),
                start_date: record.start_date,
                end_date,
                subscription: record.subscription.clone(),
                status: IpoStatus::Pending,
                last_processed: Some(today),
            }
        }
        Some(mut row) => {
            if let Some(gmp) = finite_reading(record) {
                row.gmp_history.push(gmp);
            }
            debug!(
                name = %row.name,
                gmp = record.gmp,
                readings = row.gmp_history.len(),
                "Appended GMP reading"
            );
            if record.start_date.is_some() {
                row.start_date = record.start_date;
            }
            row.end_date = end_date;
            row.subscription = record.subscription.clone();
            row.last_processed = Some(today);
            row
        }
    }
}

fn finite_reading(record: &IpoRecord) -> Option<f64> {
    if record.gmp.is_finite() {
        Some(record.gmp)
    } else {
        warn!(name = %record.name, "Ignoring non-numeric GMP reading");
        None
    }
}
