use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use common::{
    Error, Extraction, Extractor, IpoRecord, IpoStatus, Notifier, RecordStore, Result,
    StoredIpoState,
};
use engine::{run_once, DecisionEngine, PolicyConfig};
use store::MemoryStore;

// ─── Fakes ────────────────────────────────────────────────────────────────────

struct CannedExtractor(Result<Vec<IpoRecord>, String>);

#[async_trait]
impl Extractor for CannedExtractor {
    async fn extract(&self, _today: NaiveDate) -> Result<Extraction> {
        match &self.0 {
            Ok(records) => Ok(Extraction { records: records.clone(), dropped: 0 }),
            Err(msg) => Err(Error::Extraction(msg.clone())),
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.sent.lock().unwrap().push(message.to_string());
        if self.fail {
            Err(Error::Notification("chat unreachable".into()))
        } else {
            Ok(())
        }
    }
}

/// Store whose writes always fail.
struct ReadOnlyStore(MemoryStore);

#[async_trait]
impl RecordStore for ReadOnlyStore {
    async fn get_all(&self) -> Result<Vec<StoredIpoState>> {
        self.0.get_all().await
    }
    async fn get(&self, name: &str) -> Result<Option<StoredIpoState>> {
        self.0.get(name).await
    }
    async fn upsert(&self, _row: &StoredIpoState) -> Result<()> {
        Err(Error::Store("read-only".into()))
    }
    async fn delete(&self, _name: &str) -> Result<()> {
        Err(Error::Store("read-only".into()))
    }
    async fn replace_all(&self, _rows: &[StoredIpoState]) -> Result<()> {
        Err(Error::Store("read-only".into()))
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn ipo(name: &str, gmp: f64, end: NaiveDate) -> IpoRecord {
    IpoRecord {
        name: name.into(),
        gmp,
        start_date: Some(end - Duration::days(4)),
        end_date: Some(end),
        subscription: "8.5x".into(),
    }
}

fn stored(name: &str, history: &[f64], end: NaiveDate) -> StoredIpoState {
    StoredIpoState {
        name: name.into(),
        gmp_history: history.to_vec(),
        start_date: Some(end - Duration::days(4)),
        end_date: end,
        subscription: "1.0x".into(),
        status: IpoStatus::Pending,
        last_processed: None,
    }
}

fn engine(preset: &str, threshold: f64) -> DecisionEngine {
    let mut policy = PolicyConfig::preset(preset).unwrap();
    policy.threshold = threshold;
    DecisionEngine::new(policy)
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_single_reading_above_threshold_alerts_once() {
    let store = MemoryStore::new();
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 35.0, d(3, 11))]));

    let summary = run_once(&engine("closing-tomorrow", 30.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    let row = store.get("Alpha").await.unwrap().unwrap();
    assert_eq!(row.status, IpoStatus::Proceed);
    assert_eq!(summary.alerts_sent, 1);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Alpha"));
    assert!(sent[0].contains("Closing Tomorrow"));
}

#[tokio::test]
async fn scenario_b_single_reading_below_threshold_skips() {
    let store = MemoryStore::new();
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 20.0, d(3, 11))]));

    run_once(&engine("closing-tomorrow", 30.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    assert_eq!(store.get("Alpha").await.unwrap().unwrap().status, IpoStatus::Skip);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn scenario_c_average_above_threshold_proceeds() {
    // Two earlier readings on file; today's 14 completes [8, 9, 14].
    let mut prior = stored("Alpha", &[8.0, 9.0], d(3, 11));
    prior.last_processed = Some(d(3, 6));
    let store = MemoryStore::with_rows([prior]);
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 14.0, d(3, 11))]));

    run_once(&engine("average", 10.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    let row = store.get("Alpha").await.unwrap().unwrap();
    assert_eq!(row.gmp_history, vec![8.0, 9.0, 14.0]);
    assert_eq!(row.status, IpoStatus::Proceed);
    assert_eq!(notifier.sent().len(), 1);
    assert!(notifier.sent()[0].contains("Average GMP: 10.33"));
}

#[tokio::test]
async fn scenario_d_average_below_threshold_skips() {
    let store = MemoryStore::with_rows([stored("Alpha", &[8.0, 9.0], d(3, 11))]);
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 9.0, d(3, 11))]));

    run_once(&engine("average", 10.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    let row = store.get("Alpha").await.unwrap().unwrap();
    assert_eq!(row.gmp_history, vec![8.0, 9.0, 9.0]);
    assert_eq!(row.status, IpoStatus::Skip);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn scenario_e_expired_row_is_pruned_without_decision() {
    let store = MemoryStore::with_rows([stored("Old", &[50.0], d(3, 9))]);
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![ipo("Old", 50.0, d(3, 9))]));

    let summary = run_once(&engine("closing-window", 5.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    assert!(store.get("Old").await.unwrap().is_none());
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.proceeded + summary.skipped, 0);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn scenario_f_empty_extraction_only_prunes() {
    let store = MemoryStore::with_rows([
        stored("Old", &[1.0], d(3, 9)),
        stored("Live", &[12.0], d(3, 20)),
    ]);
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![]));

    let summary = run_once(&engine("average", 10.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    let names: Vec<String> = store.get_all().await.unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Live".to_string()]);
    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.alerts_sent, 0);
}

// ─── Failure handling & idempotency ───────────────────────────────────────────

#[tokio::test]
async fn extraction_failure_aborts_without_touching_store() {
    let store = MemoryStore::with_rows([stored("Old", &[1.0], d(3, 9))]);
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Err("page timed out".into()));

    let err = run_once(&engine("average", 10.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Extraction(_)));
    assert!(err.is_fatal());
    assert!(store.get("Old").await.unwrap().is_some(), "no pruning on aborted run");
}

#[tokio::test]
async fn notifier_failure_keeps_proceed_status() {
    let store = MemoryStore::new();
    let notifier = RecordingNotifier::failing();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 35.0, d(3, 11))]));

    let summary = run_once(&engine("closing-tomorrow", 30.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    assert_eq!(summary.alerts_failed, 1);
    assert_eq!(summary.alerts_sent, 0);
    assert_eq!(store.get("Alpha").await.unwrap().unwrap().status, IpoStatus::Proceed);
}

#[tokio::test]
async fn store_failure_aborts_before_any_alert() {
    let store = ReadOnlyStore(MemoryStore::new());
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 35.0, d(3, 11))]));

    let err = run_once(&engine("closing-tomorrow", 30.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store(_)));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn second_run_same_day_neither_appends_nor_realerts() {
    let store = MemoryStore::new();
    let notifier = RecordingNotifier::default();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 35.0, d(3, 11))]));
    let engine = engine("closing-window", 5.0);

    run_once(&engine, &extractor, &store, &notifier, d(3, 10)).await.unwrap();
    let summary = run_once(&engine, &extractor, &store, &notifier, d(3, 10)).await.unwrap();

    assert_eq!(summary.already_processed, 1);
    assert_eq!(store.get("Alpha").await.unwrap().unwrap().gmp_history, vec![35.0]);
    assert_eq!(notifier.sent().len(), 1);

    // Close day: reading appended, decision stands, no second alert.
    run_once(&engine, &extractor, &store, &notifier, d(3, 11)).await.unwrap();
    let row = store.get("Alpha").await.unwrap().unwrap();
    assert_eq!(row.gmp_history, vec![35.0, 35.0]);
    assert_eq!(row.status, IpoStatus::Proceed);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn accumulation_collects_readings_over_several_runs() {
    let store = MemoryStore::new();
    let notifier = RecordingNotifier::default();
    let engine = engine("average", 10.0);
    let close = d(3, 15); // Friday

    // Mon..Wed accumulate; Thu is the day before close and decides.
    for (day, gmp) in [(11, 8.0), (12, 9.0), (13, 11.0), (14, 14.0)] {
        let extractor = CannedExtractor(Ok(vec![ipo("Alpha", gmp, close)]));
        run_once(&engine, &extractor, &store, &notifier, d(3, day)).await.unwrap();
    }

    let row = store.get("Alpha").await.unwrap().unwrap();
    assert_eq!(row.gmp_history, vec![8.0, 9.0, 11.0, 14.0]);
    assert_eq!(row.status, IpoStatus::Proceed);
    assert_eq!(notifier.sent().len(), 1);
    assert!(notifier.sent()[0].contains("Closing Tomorrow"));
}

#[tokio::test]
async fn dry_run_on_scratch_copy_leaves_alert_for_real_run() {
    let real = MemoryStore::new();
    let extractor = CannedExtractor(Ok(vec![ipo("Alpha", 35.0, d(3, 11))]));
    let engine = engine("closing-tomorrow", 30.0);

    let dry_notifier = RecordingNotifier::default();
    let scratch = MemoryStore::snapshot_of(&real).await.unwrap();
    run_once(&engine, &extractor, &scratch, &dry_notifier, d(3, 10)).await.unwrap();
    assert_eq!(dry_notifier.sent().len(), 1);
    assert!(real.get("Alpha").await.unwrap().is_none());

    let live_notifier = RecordingNotifier::default();
    let summary = run_once(&engine, &extractor, &real, &live_notifier, d(3, 10)).await.unwrap();
    assert_eq!(summary.already_processed, 0);
    assert_eq!(live_notifier.sent().len(), 1);
    assert_eq!(real.get("Alpha").await.unwrap().unwrap().status, IpoStatus::Proceed);
}

#[tokio::test]
async fn record_without_close_date_is_dropped_and_store_untouched() {
    let live = stored("Live", &[12.0], d(3, 20));
    let store = MemoryStore::with_rows([live.clone()]);
    let notifier = RecordingNotifier::default();
    let mut undated = ipo("Undated", 50.0, d(3, 11));
    undated.end_date = None;
    let extractor = CannedExtractor(Ok(vec![undated]));

    let summary = run_once(&engine("closing-window", 5.0), &extractor, &store, &notifier, d(3, 10))
        .await
        .unwrap();

    assert_eq!(summary.invalid_rows, 1);
    assert_eq!(summary.in_window, 0);
    assert_eq!(store.get_all().await.unwrap(), vec![live]);
    assert!(notifier.sent().is_empty());
}
