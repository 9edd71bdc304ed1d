use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use common::{Error, Extraction, Extractor, Result};

use crate::report::parse_report;

const USER_AGENT: &str = concat!("gmpwatch/", env!("CARGO_PKG_VERSION"));

/// Fetches the live GMP report over HTTPS and parses its table.
pub struct HttpExtractor {
    url: Url,
    http: Client,
}

impl HttpExtractor {
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { url, http })
    }

    async fn fetch(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching GMP report");
        let resp = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("request to {} failed: {e}", self.url)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Extraction(format!("reading body from {} failed: {e}", self.url)))?;

        if !status.is_success() {
            return Err(Error::Extraction(format!("HTTP {status} from {}", self.url)));
        }
        Ok(body)
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, today: NaiveDate) -> Result<Extraction> {
        info!(url = %self.url, "Starting IPO data extraction");
        let body = self.fetch().await?;
        parse_report(&body, today)
    }
}
