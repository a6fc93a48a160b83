//! Recommendation sink - optional remote difficulty advisor
//!
//! `POST /recommend` returns a suggested difficulty for an attempt summary;
//! `POST /train` feeds the difficulty the session actually settled on. The
//! service is advisory only: callers treat every error as "no
//! recommendation" and never surface it to the user.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::RecommenderConfig;
use crate::error::AlarmError;
use crate::escalation::AttemptSummary;

/// Body of a `/train` request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingSample {
    #[serde(flatten)]
    pub summary: AttemptSummary,
    pub target_difficulty: u8,
}

/// Remote collaborator that suggests difficulties and learns from outcomes.
pub trait RecommendationSink: Send + Sync {
    /// Ask for a difficulty. `Ok(None)` means the service answered without
    /// a usable difficulty.
    fn recommend(&self, summary: AttemptSummary) -> BoxFuture<'_, Result<Option<i64>, AlarmError>>;

    /// Report a training sample. The response body is ignored.
    fn train(&self, sample: TrainingSample) -> BoxFuture<'_, Result<(), AlarmError>>;
}

/// Sink used when the recommender is disabled: never recommends.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

impl RecommendationSink for DisabledSink {
    fn recommend(&self, _summary: AttemptSummary) -> BoxFuture<'_, Result<Option<i64>, AlarmError>> {
        futures::future::ready(Ok(None)).boxed()
    }

    fn train(&self, _sample: TrainingSample) -> BoxFuture<'_, Result<(), AlarmError>> {
        futures::future::ready(Ok(())).boxed()
    }
}

/// HTTP client for the recommendation service.
#[derive(Debug, Clone)]
pub struct HttpRecommendationSink {
    client: Client,
    base_url: String,
}

impl HttpRecommendationSink {
    /// # Errors
    /// `AlarmError::RemoteUnavailable` if the HTTP client cannot be built.
    pub fn new(config: &RecommenderConfig) -> Result<Self, AlarmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()
            .map_err(|e| AlarmError::RemoteUnavailable {
                endpoint: base_url.clone(),
                reason: format!("client setup failed: {}", e),
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<String, AlarmError> {
        let endpoint = format!("{}{}", self.base_url, path);
        let unavailable = |reason: String| AlarmError::RemoteUnavailable {
            endpoint: endpoint.clone(),
            reason,
        };

        let response = self
            .client
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| unavailable(e.to_string()))
    }
}

impl RecommendationSink for HttpRecommendationSink {
    fn recommend(&self, summary: AttemptSummary) -> BoxFuture<'_, Result<Option<i64>, AlarmError>> {
        async move {
            let body = self.post("/recommend", &summary).await?;
            let difficulty = scan_difficulty(&body);
            log::debug!("[Recommender] /recommend -> {:?}", difficulty);
            Ok(difficulty)
        }
        .boxed()
    }

    fn train(&self, sample: TrainingSample) -> BoxFuture<'_, Result<(), AlarmError>> {
        async move {
            self.post("/train", &sample).await?;
            log::debug!(
                "[Recommender] /train accepted target_difficulty={}",
                sample.target_difficulty
            );
            Ok(())
        }
        .boxed()
    }
}

/// Tolerant scan for `"difficulty"` followed by `:` and a numeric token.
///
/// Does not validate the surrounding JSON. A quoted number is accepted;
/// a fractional value that is not a whole number yields `None`.
pub fn scan_difficulty(body: &str) -> Option<i64> {
    const KEY: &str = "\"difficulty\"";

    let after_key = &body[body.find(KEY)? + KEY.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();
    let value = after_colon.strip_prefix('"').unwrap_or(after_colon);

    let end = value
        .char_indices()
        .find(|(index, c)| {
            !(c.is_ascii_digit() || *c == '.' || (*index == 0 && (*c == '-' || *c == '+')))
        })
        .map(|(index, _)| index)
        .unwrap_or(value.len());

    let number: f64 = value[..end].parse().ok()?;
    if number.is_finite() && number.fract() == 0.0 {
        Some(number as i64)
    } else {
        None
    }
}
