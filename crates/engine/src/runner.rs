use chrono::NaiveDate;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use common::{Extractor, Notifier, RecordStore, Result, RunSummary};

use crate::decision::DecisionEngine;

/// One complete invocation: extract, decide, persist, then notify.
///
/// The store is read once and written once. It is written before any alert
/// goes out, so a crash after the write can lose an alert but never repeat
/// one. Extraction and store failures abort the run before anything is
/// written or sent; notifier failures are counted and the run carries on.
pub async fn run_once(
    engine: &DecisionEngine,
    extractor: &dyn Extractor,
    store: &dyn RecordStore,
    notifier: &dyn Notifier,
    today: NaiveDate,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id, run_date = %today);

    async move {
        info!(
            window = ?engine.policy().window,
            decision = %engine.policy().decision,
            threshold = engine.policy().threshold,
            "Run started"
        );

        let extraction = extractor.extract(today).await.map_err(|e| {
            error!(error = %e, "Extraction failed; aborting run");
            e
        })?;
        info!(
            records = extraction.records.len(),
            dropped = extraction.dropped,
            "Extraction complete"
        );

        let snapshot = store.get_all().await.map_err(|e| {
            error!(error = %e, "Failed to load stored IPO state");
            e
        })?;

        let outcome = engine.evaluate(today, &extraction.records, snapshot);
        let mut summary = outcome.summary;
        summary.dropped_rows = extraction.dropped;

        store.replace_all(&outcome.rows).await.map_err(|e| {
            error!(error = %e, "Failed to persist IPO state; no alerts sent");
            e
        })?;

        for alert in &outcome.alerts {
            match notifier.send(&alert.message).await {
                Ok(()) => {
                    info!(name = %alert.name, "Alert sent");
                    summary.alerts_sent += 1;
                }
                Err(e) => {
                    warn!(name = %alert.name, error = %e, "Alert delivery failed; status kept");
                    summary.alerts_failed += 1;
                }
            }
        }

        info!(%summary, "Run complete");
        Ok(summary)
    }
    .instrument(span)
    .await
}
