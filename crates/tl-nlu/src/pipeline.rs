//! Two-stage extraction pipeline with graceful degradation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tl_core::classify::AreaClassifier;
use tl_core::event::LifeArea;
use tl_core::extract::{DraftEvent, ExtractedFields, fallback_extract, resolve_draft};

use crate::client::{Client, NluError};

/// Extraction pipeline settings.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// How long to wait for the primary analysis before degrading.
    pub analysis_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            analysis_timeout: Duration::from_secs(5),
        }
    }
}

/// The primary language-model analysis seam.
///
/// Implemented by [`crate::Client`] in production and by test doubles in
/// pipeline tests.
pub trait TextAnalyzer {
    fn analyze(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<ExtractedFields>, NluError>> + Send;
}

/// Binds a [`Client`] to a model name so it can serve as the pipeline's
/// analyzer.
#[derive(Debug, Clone)]
pub struct ModelAnalyzer {
    client: Client,
    model: String,
}

impl ModelAnalyzer {
    pub fn new(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl TextAnalyzer for ModelAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Vec<ExtractedFields>, NluError> {
        self.client.extract_fields(&self.model, text).await
    }
}

/// Extract draft events from free text.
///
/// Runs the primary analyzer under the configured timeout. On timeout,
/// error, or an empty analysis, logs a degraded-mode warning and falls
/// through to the regex fallback; there are no retries. Candidates that
/// cannot be resolved to a valid draft are dropped silently.
pub async fn extract_events<A: TextAnalyzer>(
    analyzer: &A,
    text: &str,
    now: DateTime<Utc>,
    classifier: &AreaClassifier,
    areas: &[LifeArea],
    config: &ExtractorConfig,
) -> Vec<DraftEvent> {
    let primary = tokio::time::timeout(config.analysis_timeout, analyzer.analyze(text)).await;

    let candidates = match primary {
        Ok(Ok(fields)) if !fields.is_empty() => {
            tracing::debug!(candidates = fields.len(), "primary extraction succeeded");
            fields
        }
        Ok(Ok(_)) => {
            tracing::warn!("primary extraction returned nothing, using fallback");
            fallback_extract(text)
        }
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "primary extraction failed, using fallback");
            fallback_extract(text)
        }
        Err(_) => {
            let err = NluError::Timeout(config.analysis_timeout);
            tracing::warn!(error = %err, "primary extraction timed out, using fallback");
            fallback_extract(text)
        }
    };

    let today = now.date_naive();
    candidates
        .iter()
        .filter_map(|fields| resolve_draft(fields, today, classifier, areas))
        .collect()
}
