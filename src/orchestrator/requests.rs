use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::guard::SubmissionGuard;
use crate::api::{
    decode_slot, AnalysisRequest, AnalysisResult, BatchOutcome, BatchReport, BatchRequest,
    ComparisonPayload, FakeDetectionPayload, HealthReport, HelpfulnessReport, HelpfulnessRequest,
    Method, ModelCatalog, ModelKind, ModelVerdict, SentimentPayload, Transport,
};
use crate::app::RequestConfig;
use crate::constants::{
    BATCH_ENDPOINT, COMPARE_ENDPOINT, FAKE_DETECTION_ENDPOINT, HEALTH_ENDPOINT,
    HELPFULNESS_ENDPOINT, MODELS_ENDPOINT, SENTIMENT_ENDPOINT, STATISTICS_ENDPOINT,
};
use crate::utils::{AnalysisError, NetworkError};
use crate::view::ComparisonResult;

/// Issues analysis calls for one view
///
/// Submissions (everything that analyzes user text) go through a one-slot guard:
/// a second submission while one is pending fails with `Busy`. Read-only fetches
/// are not guarded.
pub struct RequestOrchestrator {
    transport: Arc<dyn Transport>,
    config: RequestConfig,
    guard: SubmissionGuard,
}

impl RequestOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, config: RequestConfig) -> Self {
        Self {
            transport,
            config,
            guard: SubmissionGuard::new(),
        }
    }

    /// Whether a submission is currently pending
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// `POST /predict/sentiment`
    pub async fn analyze_sentiment(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let _permit = self.guard.acquire()?;
        let model = request.model().unwrap_or(self.config.default_model);
        debug!("Analyzing sentiment with {}", model);

        let body = json!({ "text": request.text(), "model": model });
        let payload: SentimentPayload = self.post(SENTIMENT_ENDPOINT, body).await?;
        Ok(payload.into())
    }

    /// `POST /detect/fake`; the rating defaults to 5 stars
    pub async fn detect_fake(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        let _permit = self.guard.acquire()?;

        let body = json!({ "text": request.text(), "rating": request.rating_or_default() });
        let payload: FakeDetectionPayload = self.post(FAKE_DETECTION_ENDPOINT, body).await?;
        Ok(payload.into())
    }

    /// Filter raw inputs and analyze what is left
    ///
    /// Blank inputs are dropped first; if nothing remains this fails with a
    /// validation error and nothing is sent.
    pub async fn analyze_batch<S: AsRef<str>>(
        &self,
        inputs: &[S],
        model: Option<ModelKind>,
    ) -> Result<BatchOutcome, AnalysisError> {
        let mut request = BatchRequest::from_inputs(inputs)?;
        if let Some(model) = model {
            request = request.with_model(model);
        }
        self.submit_batch(&request).await
    }

    /// `POST /predict/batch` with an already filtered batch
    ///
    /// One call for the whole batch. The outcome has exactly one slot per text,
    /// in submission order; a slot that failed does not affect its neighbours.
    pub async fn submit_batch(&self, request: &BatchRequest) -> Result<BatchOutcome, AnalysisError> {
        let _permit = self.guard.acquire()?;
        let model = request.model().unwrap_or(self.config.batch_model);
        let expected = request.texts().len();
        debug!("Submitting batch of {} reviews to {}", expected, model);

        let body = json!({ "texts": request.texts(), "model": model });
        let payload: BatchReport = self.post(BATCH_ENDPOINT, body).await?;
        debug!(
            "Batch answered by {:?} ({:?} analyzed)",
            payload.model, payload.total_analyzed
        );

        if payload.results.len() != expected {
            warn!(
                "Batch response has {} results for {} texts",
                payload.results.len(),
                expected
            );
            return Err(NetworkError::decode(format!(
                "Expected {} batch results, got {}",
                expected,
                payload.results.len()
            ))
            .into());
        }

        Ok(payload
            .results
            .into_iter()
            .map(|raw| decode_slot::<SentimentPayload, _>(raw, AnalysisResult::from))
            .collect())
    }

    /// `POST /compare`; the body is the review text as a bare JSON string
    pub async fn compare(&self, request: &AnalysisRequest) -> Result<ComparisonResult, AnalysisError> {
        let _permit = self.guard.acquire()?;

        let body = Value::String(request.text().to_string());
        let payload: ComparisonPayload = self.post(COMPARE_ENDPOINT, body).await?;

        let models: BTreeMap<_, _> = payload
            .models
            .into_iter()
            .map(|(name, raw)| (name, decode_slot(raw, |verdict: ModelVerdict| verdict)))
            .collect();

        Ok(ComparisonResult::from_models(models))
    }

    /// `POST /analyze/helpfulness`
    pub async fn analyze_helpfulness(
        &self,
        request: &HelpfulnessRequest,
    ) -> Result<HelpfulnessReport, AnalysisError> {
        let _permit = self.guard.acquire()?;

        let body = json!({
            "text": request.text(),
            "helpful_votes": request.helpful_votes(),
            "total_votes": request.total_votes(),
        });
        Ok(self.post(HELPFULNESS_ENDPOINT, body).await?)
    }

    /// `GET /statistics`, left as raw JSON for the tolerant dashboard reduction
    pub async fn statistics(&self) -> Result<Value, AnalysisError> {
        Ok(self
            .transport
            .call(STATISTICS_ENDPOINT, Method::Get, None)
            .await?)
    }

    /// `GET /health` with its body, for display
    pub async fn health_report(&self) -> Result<HealthReport, AnalysisError> {
        Ok(self.get(HEALTH_ENDPOINT).await?)
    }

    /// `GET /models`
    pub async fn model_catalog(&self) -> Result<ModelCatalog, AnalysisError> {
        Ok(self.get(MODELS_ENDPOINT).await?)
    }

    async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: Value) -> Result<T, NetworkError> {
        let raw = self
            .transport
            .call(endpoint, Method::Post, Some(body))
            .await?;
        decode(endpoint, raw)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, NetworkError> {
        let raw = self.transport.call(endpoint, Method::Get, None).await?;
        decode(endpoint, raw)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, raw: Value) -> Result<T, NetworkError> {
    serde_json::from_value(raw).map_err(|e| {
        NetworkError::decode(format!("Unexpected response from {}: {}", endpoint, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockTransport, RiskLevel, Sentiment};
    use crate::utils::NetworkErrorKind;
    use crate::view::{Screen, Submission};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn orchestrator(mock: MockTransport) -> RequestOrchestrator {
        RequestOrchestrator::new(Arc::new(mock), RequestConfig::default())
    }

    fn sentiment_item(label: &str, confidence: f64) -> Value {
        json!({
            "sentiment": label,
            "confidence": confidence,
            "details": {},
            "model": "vader",
            "processing_time": 0.01
        })
    }

    #[tokio::test]
    async fn test_analyze_sentiment_uses_default_model() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .withf(|endpoint, method, body| {
                endpoint == "/predict/sentiment"
                    && *method == Method::Post
                    && body.as_ref()
                        == Some(&json!({ "text": "Love it", "model": "roberta" }))
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(json!({
                    "sentiment": "Positive",
                    "confidence": 0.97,
                    "details": { "probabilities": { "Positive": 0.97 } },
                    "model": "roberta",
                    "text_length": 7,
                    "processing_time": 0.2
                }))
            });

        let request = AnalysisRequest::new("  Love it ").unwrap();
        let result = orchestrator(mock).analyze_sentiment(&request).await.unwrap();

        assert_eq!(result.sentiment, Some(Sentiment::Positive));
        assert_eq!(result.confidence, Some(0.97));
        assert_eq!(result.model, Some(ModelKind::Roberta));
        assert_eq!(result.text_length, Some(7));
    }

    #[tokio::test]
    async fn test_detect_fake_defaults_rating() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .withf(|endpoint, _, body| {
                endpoint == "/detect/fake"
                    && body.as_ref() == Some(&json!({ "text": "BEST EVER!!!", "rating": 5 }))
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(json!({
                    "is_suspicious": true,
                    "risk_level": "High",
                    "suspicion_score": 5,
                    "warnings": ["Excessive capitalization"],
                    "features": { "caps_ratio": 0.8 }
                }))
            });

        let request = AnalysisRequest::new("BEST EVER!!!").unwrap();
        let result = orchestrator(mock).detect_fake(&request).await.unwrap();

        assert_eq!(result.is_suspicious, Some(true));
        assert_eq!(result.risk_level, Some(RiskLevel::High));
        assert_eq!(result.suspicion_score, Some(5));
    }

    #[tokio::test]
    async fn test_batch_submits_only_non_blank_inputs() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .withf(|endpoint, _, body| {
                endpoint == "/predict/batch"
                    && body.as_ref() == Some(&json!({ "texts": ["good"], "model": "vader" }))
            })
            .times(1)
            .returning(|_, _, _| Ok(json!({ "results": [sentiment_item("Positive", 0.8)] })));

        let outcome = orchestrator(mock)
            .analyze_batch(&["", "  ", "good"], None)
            .await
            .unwrap();
        assert_eq!(outcome.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_batch_fails_without_io() {
        let mut mock = MockTransport::new();
        mock.expect_call().never();

        let err = orchestrator(mock)
            .analyze_batch(&["", "   ", "\n"], None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_batch_slots_stay_aligned_with_item_errors() {
        let mut mock = MockTransport::new();
        mock.expect_call().times(1).returning(|_, _, _| {
            Ok(json!({
                "results": [
                    sentiment_item("Positive", 0.9),
                    { "error": "Text too long", "text": "zzz..." },
                    sentiment_item("Negative", 0.7)
                ]
            }))
        });

        let outcome = orchestrator(mock)
            .analyze_batch(&["a", "b", "c"], Some(ModelKind::Vader))
            .await
            .unwrap();

        assert_eq!(outcome.len(), 3);
        assert_eq!(
            outcome[0].as_ref().unwrap().sentiment,
            Some(Sentiment::Positive)
        );
        assert_eq!(outcome[1].as_ref().unwrap_err().message, "Text too long");
        assert_eq!(
            outcome[2].as_ref().unwrap().sentiment,
            Some(Sentiment::Negative)
        );
    }

    #[tokio::test]
    async fn test_malformed_batch_entry_fails_only_its_slot() {
        let mut mock = MockTransport::new();
        mock.expect_call().times(1).returning(|_, _, _| {
            Ok(json!({
                "results": [
                    sentiment_item("Positive", 0.9),
                    { "sentiment": "Positive" },
                    sentiment_item("Negative", 0.7)
                ]
            }))
        });

        let outcome = orchestrator(mock)
            .analyze_batch(&["a", "b", "c"], None)
            .await
            .unwrap();

        assert_eq!(outcome.len(), 3);
        assert_eq!(
            outcome[0].as_ref().unwrap().sentiment,
            Some(Sentiment::Positive)
        );
        assert!(outcome[1]
            .as_ref()
            .unwrap_err()
            .message
            .starts_with("Malformed result"));
        assert_eq!(
            outcome[2].as_ref().unwrap().sentiment,
            Some(Sentiment::Negative)
        );
    }

    #[tokio::test]
    async fn test_batch_length_mismatch_is_decode_error() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .returning(|_, _, _| Ok(json!({ "results": [sentiment_item("Positive", 0.9)] })));

        let err = orchestrator(mock)
            .analyze_batch(&["a", "b"], None)
            .await
            .unwrap_err();
        match err {
            AnalysisError::Network(e) => assert_eq!(e.kind, NetworkErrorKind::Decode),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_fails_whole_batch() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .returning(|_, _, _| Err(NetworkError::status(500, "Internal Server Error")));

        let err = orchestrator(mock)
            .analyze_batch(&["a", "b"], None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Network(NetworkError::status(500, "Internal Server Error"))
        );
    }

    #[tokio::test]
    async fn test_compare_sends_string_body_and_derives_summary() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .withf(|endpoint, _, body| {
                endpoint == "/compare" && body.as_ref() == Some(&json!("It was fine"))
            })
            .times(1)
            .returning(|_, _, _| {
                // The service's own agreement flag is ignored
                Ok(json!({
                    "text": "It was fine",
                    "models": {
                        "vader": { "sentiment": "Positive", "confidence": 0.6 },
                        "roberta": { "sentiment": "Neutral", "confidence": 0.8 }
                    },
                    "agreement": true
                }))
            });

        let request = AnalysisRequest::new("It was fine").unwrap();
        let result = orchestrator(mock).compare(&request).await.unwrap();

        assert!(!result.agreement());
        assert_eq!(result.recommended(), Some("roberta"));
        assert_eq!(result.summary().models_tested, 2);
    }

    #[tokio::test]
    async fn test_compare_keeps_failed_model_entries() {
        let mut mock = MockTransport::new();
        mock.expect_call().returning(|_, _, _| {
            Ok(json!({
                "models": {
                    "vader": { "sentiment": "Positive", "confidence": 0.6 },
                    "roberta": { "error": "model not loaded" }
                }
            }))
        });

        let request = AnalysisRequest::new("ok").unwrap();
        let result = orchestrator(mock).compare(&request).await.unwrap();

        assert!(result.models()["roberta"].is_err());
        assert!(result.agreement());
        assert_eq!(result.recommended(), Some("vader"));
    }

    fn helpfulness_reply() -> Value {
        json!({
            "predicted_helpfulness_ratio": 0.8,
            "helpfulness_category": "Very Helpful",
            "quality_score": 0.75,
            "recommendations": ["Mention durability"]
        })
    }

    #[tokio::test]
    async fn test_helpfulness_sends_votes() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .withf(|endpoint, _, body| {
                endpoint == "/analyze/helpfulness"
                    && body.as_ref()
                        == Some(&json!({
                            "text": "Detailed review",
                            "helpful_votes": 3,
                            "total_votes": 4
                        }))
            })
            .times(1)
            .returning(|_, _, _| Ok(helpfulness_reply()));

        let request = HelpfulnessRequest::new("Detailed review", 3, 4).unwrap();
        let report = orchestrator(mock).analyze_helpfulness(&request).await.unwrap();
        assert_eq!(report.helpfulness_category, "Very Helpful");
    }

    #[tokio::test]
    async fn test_impossible_votes_keep_screen_result() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .times(1)
            .returning(|_, _, _| Ok(helpfulness_reply()));
        let orchestrator = orchestrator(mock);

        let screen = Screen::new();
        screen.activate();
        let first = screen
            .submit(HelpfulnessRequest::new("Detailed review", 3, 4), |request| {
                let orchestrator = &orchestrator;
                async move { orchestrator.analyze_helpfulness(&request).await }
            })
            .await;
        assert_eq!(first, Submission::Applied);

        let second = screen
            .submit(HelpfulnessRequest::new("Detailed review", 5, 2), |request| {
                let orchestrator = &orchestrator;
                async move { orchestrator.analyze_helpfulness(&request).await }
            })
            .await;

        assert!(matches!(second, Submission::Rejected(AnalysisError::Validation(_))));
        let state = screen.snapshot();
        assert_eq!(
            state.result.map(|r| r.helpfulness_category),
            Some("Very Helpful".to_string())
        );
        assert!(state.notice.unwrap().is_validation());
    }

    #[tokio::test]
    async fn test_statistics_passes_raw_json_through() {
        let mut mock = MockTransport::new();
        mock.expect_call()
            .withf(|endpoint, method, body| {
                endpoint == "/statistics" && *method == Method::Get && body.is_none()
            })
            .returning(|_, _, _| Ok(json!({ "dataset_info": { "total_reviews": 10 } })));

        let stats = orchestrator(mock).statistics().await.unwrap();
        assert_eq!(stats["dataset_info"]["total_reviews"], json!(10));
    }

    /// Answers every call after a fixed delay
    struct SlowTransport {
        delay: Duration,
    }

    #[async_trait]
    impl Transport for SlowTransport {
        async fn call(
            &self,
            endpoint: &str,
            _method: Method,
            _body: Option<Value>,
        ) -> Result<Value, NetworkError> {
            tokio::time::sleep(self.delay).await;
            if endpoint == SENTIMENT_ENDPOINT {
                Ok(json!({ "sentiment": "Neutral", "confidence": 0.5 }))
            } else {
                Ok(json!({}))
            }
        }

        async fn probe(&self, _endpoint: &str) -> Result<(), NetworkError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submission_is_busy_not_queued() {
        let orchestrator = Arc::new(RequestOrchestrator::new(
            Arc::new(SlowTransport {
                delay: Duration::from_secs(2),
            }),
            RequestConfig::default(),
        ));
        let request = AnalysisRequest::new("first").unwrap();

        let pending = {
            let orchestrator = Arc::clone(&orchestrator);
            let request = request.clone();
            tokio::spawn(async move { orchestrator.analyze_sentiment(&request).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(orchestrator.is_busy());

        let second = orchestrator.detect_fake(&request).await;
        assert_eq!(second.unwrap_err(), AnalysisError::Busy);

        // Read-only fetches are not guarded
        assert!(orchestrator.statistics().await.is_ok());

        assert!(pending.await.unwrap().is_ok());
        assert!(!orchestrator.is_busy());
        assert!(orchestrator.analyze_sentiment(&request).await.is_ok());
    }
}
