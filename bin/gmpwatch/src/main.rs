use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{Config, Notifier, RecordStore, Result, RunSummary};
use engine::{DecisionEngine, PolicyConfig};
use extractor::HttpExtractor;
use store::{MemoryStore, SqliteStore};
use telegram_notify::{DryRunNotifier, TelegramNotifier};

#[tokio::main]
async fn main() -> ExitCode {
    // ── Logging ──────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run().await {
        Ok(summary) => {
            info!(
                alerts_sent = summary.alerts_sent,
                stored = summary.stored_rows,
                "gmpwatch finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "gmpwatch aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunSummary> {
    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    let policy = PolicyConfig::resolve(&cfg)?;
    let today = cfg.run_date.unwrap_or_else(|| Local::now().date_naive());
    info!(
        %today,
        preset = %cfg.policy_preset,
        policy_file = ?cfg.policy_config_path,
        dry_run = cfg.dry_run,
        "gmpwatch starting"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqliteStore::connect(&cfg.database_url).await?;
    // Dry runs work on a scratch copy so real runs still see the transitions.
    let store: Box<dyn RecordStore> = if cfg.dry_run {
        info!("Dry-run mode; stored IPO state will not be modified");
        Box::new(MemoryStore::snapshot_of(&db).await?)
    } else {
        Box::new(db)
    };

    // ── Collaborators ─────────────────────────────────────────────────────────
    let extractor = HttpExtractor::new(cfg.source_url.clone(), cfg.fetch_timeout)?;
    let notifier: Arc<dyn Notifier> = match (&cfg.telegram_token, &cfg.telegram_chat_id) {
        (Some(token), Some(chat_id)) if !cfg.dry_run => {
            Arc::new(TelegramNotifier::new(token.clone(), chat_id, cfg.notify_timeout)?)
        }
        _ => {
            info!("Dry-run mode; alerts will only be logged");
            Arc::new(DryRunNotifier::new())
        }
    };

    // ── Single pass ───────────────────────────────────────────────────────────
    let engine = DecisionEngine::new(policy);
    engine::run_once(&engine, &extractor, store.as_ref(), notifier.as_ref(), today).await
}
