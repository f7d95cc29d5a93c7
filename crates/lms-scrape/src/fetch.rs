//! Page retrieval through an authenticated session.

use std::time::Duration;

use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::session::{HttpResponse, HttpSession};

/// Fetches HTML pages with a bounded timeout. No retries.
#[derive(Debug, Clone, Copy)]
pub struct PageFetcher {
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Fetch `url` and return its body.
    ///
    /// `Unreachable` on transport failure or timeout, `HttpError` on a
    /// non-2xx status.
    pub async fn fetch(&self, session: &dyn HttpSession, url: &str) -> Result<String> {
        Ok(self.fetch_response(session, url).await?.body)
    }

    /// Like [`fetch`](Self::fetch) but keeps the final URL and headers.
    pub async fn fetch_response(
        &self,
        session: &dyn HttpSession,
        url: &str,
    ) -> Result<HttpResponse> {
        let resp = tokio::time::timeout(self.timeout, session.get(url))
            .await
            .map_err(|_| {
                ScrapeError::unreachable(url, format!("timed out after {:?}", self.timeout))
            })??;

        if !resp.is_success() {
            return Err(ScrapeError::HttpError {
                url: url.to_string(),
                status: resp.status,
            });
        }

        debug!("fetched {url} ({} bytes)", resp.body.len());
        Ok(resp)
    }
}
