use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{Extraction, Result};

/// Supplier of the raw GMP rows for a run.
///
/// `HttpExtractor` implements this against the live report page. Tests feed
/// canned rows through their own implementations.
///
/// An `Err` means the source could not be read at all and the run must abort.
/// An empty `Extraction` is a legitimate outcome (no IPOs listed).
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch and parse the report. `today` anchors year-less dates.
    async fn extract(&self, today: NaiveDate) -> Result<Extraction>;
}
