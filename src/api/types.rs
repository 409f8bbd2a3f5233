use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{DEFAULT_RATING, MAX_RATING, MAX_SUSPICION_SCORE, MIN_RATING};
use crate::utils::{AnalysisError, ItemError};

/// Sentiment model served by the analysis service
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Fast rule-based analyzer
    Vader,
    /// Transformer model
    Roberta,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Vader => "vader",
            ModelKind::Roberta => "roberta",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicted sentiment label
///
/// Labels the client does not know are kept verbatim instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Unrecognized(String),
}

impl Sentiment {
    pub fn as_str(&self) -> &str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Unrecognized(label) => label,
        }
    }
}

impl From<String> for Sentiment {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Positive" => Sentiment::Positive,
            "Negative" => Sentiment::Negative,
            "Neutral" => Sentiment::Neutral,
            _ => Sentiment::Unrecognized(label),
        }
    }
}

impl From<&str> for Sentiment {
    fn from(label: &str) -> Self {
        Sentiment::from(label.to_string())
    }
}

impl From<Sentiment> for String {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.as_str().to_string()
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fake-review risk classification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unrecognized(String),
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Unrecognized(label) => label,
        }
    }
}

impl From<String> for RiskLevel {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Low" => RiskLevel::Low,
            "Medium" => RiskLevel::Medium,
            "High" => RiskLevel::High,
            _ => RiskLevel::Unrecognized(label),
        }
    }
}

impl From<&str> for RiskLevel {
    fn from(label: &str) -> Self {
        RiskLevel::from(label.to_string())
    }
}

impl From<RiskLevel> for String {
    fn from(risk: RiskLevel) -> Self {
        risk.as_str().to_string()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user submission, validated at construction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    text: String,
    rating: Option<u8>,
    model: Option<ModelKind>,
}

impl AnalysisRequest {
    /// Build a request from raw input; the text is trimmed and must not be empty
    pub fn new(text: &str) -> Result<Self, AnalysisError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::validation("Please enter a review to analyze"));
        }

        Ok(Self {
            text: trimmed.to_string(),
            rating: None,
            model: None,
        })
    }

    /// Attach a star rating (1-5)
    pub fn with_rating(mut self, rating: u8) -> Result<Self, AnalysisError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(AnalysisError::validation(format!(
                "Rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, rating
            )));
        }
        self.rating = Some(rating);
        Ok(self)
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = Some(model);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    /// Rating sent to fake-review detection when none was given
    pub fn rating_or_default(&self) -> u8 {
        self.rating.unwrap_or(DEFAULT_RATING)
    }

    pub fn model(&self) -> Option<ModelKind> {
        self.model
    }
}

/// Ordered batch of review texts, blank entries already removed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRequest {
    texts: Vec<String>,
    model: Option<ModelKind>,
}

impl BatchRequest {
    /// Keep the non-blank inputs, trimmed, in their original order
    ///
    /// Blank entries get no slot in the outcome. Fails when nothing is left.
    pub fn from_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Self, AnalysisError> {
        let texts: Vec<String> = inputs
            .iter()
            .map(|input| input.as_ref().trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect();

        if texts.is_empty() {
            return Err(AnalysisError::validation(
                "Please add at least one review to analyze",
            ));
        }

        Ok(Self { texts, model: None })
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = Some(model);
        self
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn model(&self) -> Option<ModelKind> {
        self.model
    }
}

/// Review text plus the votes it has received so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelpfulnessRequest {
    review: AnalysisRequest,
    helpful_votes: u32,
    total_votes: u32,
}

impl HelpfulnessRequest {
    /// Validates the text like `AnalysisRequest::new`; helpful votes cannot exceed the total
    pub fn new(text: &str, helpful_votes: u32, total_votes: u32) -> Result<Self, AnalysisError> {
        let review = AnalysisRequest::new(text)?;
        if helpful_votes > total_votes {
            return Err(AnalysisError::validation(format!(
                "Helpful votes ({}) cannot exceed total votes ({})",
                helpful_votes, total_votes
            )));
        }

        Ok(Self {
            review,
            helpful_votes,
            total_votes,
        })
    }

    pub fn text(&self) -> &str {
        self.review.text()
    }

    pub fn helpful_votes(&self) -> u32 {
        self.helpful_votes
    }

    pub fn total_votes(&self) -> u32 {
        self.total_votes
    }
}

/// Named feature extracted by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Flag(bool),
    Number(f64),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Flag(flag) => write!(f, "{}", flag),
            Signal::Number(n) if n.fract() == 0.0 => write!(f, "{}", n),
            Signal::Number(n) => write!(f, "{:.3}", n),
        }
    }
}

/// Successful analysis of one review
///
/// Failures never land here: a slot that failed is an `ItemError`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnalysisResult {
    pub sentiment: Option<Sentiment>,
    pub confidence: Option<f64>,
    pub probabilities: BTreeMap<String, f64>,
    pub model: Option<ModelKind>,
    pub text_length: Option<usize>,
    pub is_suspicious: Option<bool>,
    pub risk_level: Option<RiskLevel>,
    pub suspicion_score: Option<u8>,
    pub warnings: Vec<String>,
    pub features: BTreeMap<String, Signal>,
    pub processing_time_secs: f64,
}

/// Per-slot outcome inside a batch or comparison
pub type Slot<T> = Result<T, ItemError>;

/// Index-aligned outcomes of one batch submission
pub type BatchOutcome = Vec<Slot<AnalysisResult>>;

/// Sentiment and confidence one model reported in a comparison
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelVerdict {
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ModelVerdict {
    pub fn new(sentiment: impl Into<Sentiment>, confidence: f64) -> Self {
        Self {
            sentiment: Some(sentiment.into()),
            confidence: Some(confidence),
        }
    }
}

/// Body of `GET /health`; only used for display, never for the liveness decision
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub models: BTreeMap<String, ModelLoadStatus>,
    #[serde(default)]
    pub uptime: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelLoadStatus {
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub loading_time: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /models`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub models: BTreeMap<String, ModelDescription>,
    #[serde(default)]
    pub total_models: usize,
    #[serde(default)]
    pub recommended_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub recommended_for: Vec<String>,
}

/// Body of `POST /analyze/helpfulness`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HelpfulnessReport {
    pub predicted_helpfulness_ratio: f64,
    pub helpfulness_category: String,
    pub quality_score: f64,
    #[serde(default)]
    pub features: BTreeMap<String, Signal>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub processing_time: f64,
}

// Wire formats below are private to the crate; callers only see the types above

/// A slot as the service encodes it: either `{ "error": ... }` or the success payload
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SlotWire<T> {
    Failed {
        error: String,
        #[serde(default)]
        text: Option<String>,
    },
    Done(T),
}

impl<T> SlotWire<T> {
    pub(crate) fn into_slot<U>(self, convert: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            SlotWire::Failed { error, text } => Err(ItemError {
                message: error,
                text,
            }),
            SlotWire::Done(payload) => Ok(convert(payload)),
        }
    }
}

/// Decode one slot on its own; an entry that fits neither shape fails only its slot
pub(crate) fn decode_slot<T, U>(raw: Value, convert: impl FnOnce(T) -> U) -> Slot<U>
where
    T: DeserializeOwned,
{
    match serde_json::from_value::<SlotWire<T>>(raw) {
        Ok(wire) => wire.into_slot(convert),
        Err(e) => {
            tracing::debug!("Malformed slot in response: {}", e);
            Err(ItemError::new(format!("Malformed result: {}", e)))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SentimentDetails {
    #[serde(default)]
    pub probabilities: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SentimentPayload {
    pub sentiment: Sentiment,
    pub confidence: f64,
    #[serde(default)]
    pub details: SentimentDetails,
    #[serde(default)]
    pub model: Option<ModelKind>,
    #[serde(default)]
    pub text_length: Option<usize>,
    #[serde(default)]
    pub processing_time: f64,
}

impl From<SentimentPayload> for AnalysisResult {
    fn from(payload: SentimentPayload) -> Self {
        AnalysisResult {
            sentiment: Some(payload.sentiment),
            confidence: Some(unit_interval(payload.confidence)),
            probabilities: payload.details.probabilities.unwrap_or_default(),
            model: payload.model,
            text_length: payload.text_length,
            processing_time_secs: payload.processing_time,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FakeDetectionPayload {
    pub is_suspicious: bool,
    pub risk_level: RiskLevel,
    pub suspicion_score: u8,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
    #[serde(default)]
    pub processing_time: f64,
}

impl From<FakeDetectionPayload> for AnalysisResult {
    fn from(payload: FakeDetectionPayload) -> Self {
        AnalysisResult {
            is_suspicious: Some(payload.is_suspicious),
            risk_level: Some(payload.risk_level),
            suspicion_score: Some(payload.suspicion_score.min(MAX_SUSPICION_SCORE)),
            warnings: payload.warnings,
            features: signals(payload.features),
            processing_time_secs: payload.processing_time,
            ..Default::default()
        }
    }
}

/// Full `/predict/batch` body
#[derive(Debug, Deserialize)]
pub(crate) struct BatchReport {
    #[serde(default)]
    pub model: Option<ModelKind>,
    #[serde(default)]
    pub total_analyzed: Option<usize>,
    /// Raw slots, decoded one by one with `decode_slot`
    pub results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComparisonPayload {
    #[serde(default)]
    pub models: BTreeMap<String, Value>,
}

/// Keep the numeric and boolean features, drop anything else
fn signals(features: BTreeMap<String, Value>) -> BTreeMap<String, Signal> {
    features
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::Bool(flag) => Some((name, Signal::Flag(flag))),
            Value::Number(n) => n.as_f64().map(|n| (name, Signal::Number(n))),
            _ => {
                tracing::debug!("Ignoring non-numeric feature '{}'", name);
                None
            }
        })
        .collect()
}

fn unit_interval(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_trims_and_rejects_blank() {
        let request = AnalysisRequest::new("  great blender  ").unwrap();
        assert_eq!(request.text(), "great blender");
        assert_eq!(request.rating_or_default(), 5);

        assert!(AnalysisRequest::new("").unwrap_err().is_validation());
        assert!(AnalysisRequest::new(" \n\t ").unwrap_err().is_validation());
    }

    #[test]
    fn test_request_rating_bounds() {
        let request = AnalysisRequest::new("ok").unwrap();
        assert_eq!(request.clone().with_rating(1).unwrap().rating(), Some(1));
        assert_eq!(request.clone().with_rating(5).unwrap().rating(), Some(5));
        assert!(request.clone().with_rating(0).is_err());
        assert!(request.with_rating(6).is_err());
    }

    #[test]
    fn test_batch_request_filters_blank_inputs() {
        let request = BatchRequest::from_inputs(&["", "  ", "good", "\t", " fine "]).unwrap();
        assert_eq!(request.texts(), &["good".to_string(), "fine".to_string()]);

        let err = BatchRequest::from_inputs(&["", "   "]).unwrap_err();
        assert!(err.is_validation());
        assert!(BatchRequest::from_inputs::<&str>(&[]).is_err());
    }

    #[test]
    fn test_helpfulness_request_validates_votes() {
        let request = HelpfulnessRequest::new(" Detailed review ", 3, 4).unwrap();
        assert_eq!(request.text(), "Detailed review");
        assert_eq!((request.helpful_votes(), request.total_votes()), (3, 4));

        assert!(HelpfulnessRequest::new("ok", 5, 2).unwrap_err().is_validation());
        assert!(HelpfulnessRequest::new("  ", 0, 0).unwrap_err().is_validation());
    }

    #[test]
    fn test_unknown_labels_survive_decoding() {
        let sentiment: Sentiment = serde_json::from_value(json!("Mixed")).unwrap();
        assert_eq!(sentiment, Sentiment::Unrecognized("Mixed".to_string()));
        assert_eq!(serde_json::to_value(&sentiment).unwrap(), json!("Mixed"));

        let risk: RiskLevel = serde_json::from_value(json!("High")).unwrap();
        assert_eq!(risk, RiskLevel::High);
    }

    #[test]
    fn test_slot_wire_distinguishes_error_entries() {
        let raw = json!({
            "results": [
                {
                    "sentiment": "Positive",
                    "confidence": 0.91,
                    "details": { "probabilities": { "Positive": 0.91, "Negative": 0.09 } },
                    "model": "vader",
                    "text_length": 12,
                    "processing_time": 0.004
                },
                { "error": "model not loaded", "text": "meh" }
            ]
        });

        let payload: BatchReport = serde_json::from_value(raw).unwrap();
        let slots: Vec<_> = payload
            .results
            .into_iter()
            .map(|raw| decode_slot::<SentimentPayload, _>(raw, AnalysisResult::from))
            .collect();

        let first = slots[0].as_ref().unwrap();
        assert_eq!(first.sentiment, Some(Sentiment::Positive));
        assert_eq!(first.model, Some(ModelKind::Vader));
        assert_eq!(first.probabilities.get("Negative"), Some(&0.09));

        let second = slots[1].as_ref().unwrap_err();
        assert_eq!(second.message, "model not loaded");
        assert_eq!(second.text.as_deref(), Some("meh"));
    }

    #[test]
    fn test_malformed_slot_fails_alone() {
        let slot: Slot<AnalysisResult> =
            decode_slot::<SentimentPayload, _>(json!({ "sentiment": "Positive" }), AnalysisResult::from);
        assert!(slot.unwrap_err().message.starts_with("Malformed result"));

        let slot: Slot<ModelVerdict> = decode_slot(json!({ "error": "timeout" }), |v: ModelVerdict| v);
        assert_eq!(slot.unwrap_err(), ItemError::new("timeout"));
    }

    #[test]
    fn test_fake_detection_payload_keeps_only_signals() {
        let raw = json!({
            "is_suspicious": true,
            "risk_level": "Medium",
            "suspicion_score": 3,
            "warnings": ["Very short review", "Extreme rating"],
            "features": {
                "text_length": 18,
                "all_caps_ratio": 0.25,
                "has_url": false,
                "note": "ignored"
            },
            "processing_time": 0.012
        });

        let payload: FakeDetectionPayload = serde_json::from_value(raw).unwrap();
        let result = AnalysisResult::from(payload);

        assert_eq!(result.risk_level, Some(RiskLevel::Medium));
        assert_eq!(result.suspicion_score, Some(3));
        assert_eq!(result.warnings, vec!["Very short review", "Extreme rating"]);
        assert_eq!(result.features.len(), 3);
        assert_eq!(result.features.get("has_url"), Some(&Signal::Flag(false)));
        assert!(result.sentiment.is_none());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let payload: SentimentPayload =
            serde_json::from_value(json!({ "sentiment": "Neutral", "confidence": 1.4 })).unwrap();
        assert_eq!(AnalysisResult::from(payload).confidence, Some(1.0));
    }
}
