//! Opt-in caller-side retry for extraction.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use rfp_intake_core::error::ExtractionError;
use rfp_intake_core::extraction::Extractor;
use rfp_intake_core::models::Proposal;

/// [`Extractor`] decorator that retries engine-unavailable failures
/// (network errors, 429, 5xx).
///
/// Contract failures and rejected requests are returned immediately:
/// asking the engine again is a new extraction, not a retry.
pub struct RetryingExtractor {
    inner: Arc<dyn Extractor>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingExtractor {
    pub fn new(inner: Arc<dyn Extractor>, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn delay(&self, attempt: u32) -> Duration {
        // 1x, 2x, 4x, ... capped at 2^5
        self.base_delay * (1u32 << (attempt - 1).min(5))
    }
}

#[async_trait]
impl Extractor for RetryingExtractor {
    async fn extract(&self, email_text: &str) -> Result<Proposal, ExtractionError> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(self.delay(attempt)).await;
            }

            match self.inner.extract(email_text).await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "reasoning engine unavailable, retrying"
                    );
                }
                outcome => return outcome,
            }
        }
    }
}
