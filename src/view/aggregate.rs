//! Pure reductions from raw service payloads to what the screens display.
//!
//! Nothing here holds state; every value can be re-derived from its inputs.

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::palette::sentiment_color;
use crate::api::{BatchOutcome, ModelVerdict, Sentiment, Slot};
use crate::constants::{MODEL_PREFERENCE, PLACEHOLDER};

/// A number ready for display, or the placeholder when the service left it out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub value: Option<f64>,
    pub display: String,
}

impl Metric {
    pub fn missing() -> Self {
        Self {
            value: None,
            display: PLACEHOLDER.to_string(),
        }
    }

    /// Whole count with thousands separators
    pub fn count(value: Option<f64>) -> Self {
        Self::format(value, |v| group_thousands(v.round() as i64))
    }

    /// Value already expressed in percent
    pub fn percent(value: Option<f64>) -> Self {
        Self::format(value, |v| format!("{:.1}%", v))
    }

    /// Ratio in [0, 1] shown as a percentage
    pub fn ratio(value: Option<f64>) -> Self {
        Self::format(value.map(|v| v * 100.0), |v| format!("{:.1}%", v))
    }

    pub fn fixed(value: Option<f64>, decimals: usize) -> Self {
        Self::format(value, |v| format!("{:.*}", decimals, v))
    }

    fn format(value: Option<f64>, render: impl FnOnce(f64) -> String) -> Self {
        match value.filter(|v| v.is_finite()) {
            Some(v) => Self {
                value: Some(v),
                display: render(v),
            },
            None => Self::missing(),
        }
    }

    /// Value to plot; charts draw a missing metric as zero
    pub fn chart_value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// One slice of the sentiment distribution chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub label: Sentiment,
    pub count: u64,
    /// Fraction of all reviews, 0 when the total is 0
    pub share: f64,
    pub color: &'static str,
}

/// One bar group of the model performance chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPerformanceRow {
    /// Upper-cased model name as the dashboard labels it
    pub model: String,
    pub accuracy: Metric,
    /// F1 score of the Negative class, the one the dashboard charts
    pub f1_negative: Metric,
    pub precision: BTreeMap<String, f64>,
    pub recall: BTreeMap<String, f64>,
    pub f1_score: BTreeMap<String, f64>,
}

impl ModelPerformanceRow {
    fn placeholder(model: &str) -> Self {
        Self {
            model: model.to_string(),
            accuracy: Metric::missing(),
            f1_negative: Metric::missing(),
            precision: BTreeMap::new(),
            recall: BTreeMap::new(),
            f1_score: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetTotals {
    pub total_reviews: Metric,
    pub average_text_length: Metric,
    pub helpful_reviews: Metric,
    pub suspicious_reviews: Metric,
}

/// Everything the dashboard and statistics screens show
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub sentiment_distribution: Vec<DistributionSlice>,
    pub model_performance: Vec<ModelPerformanceRow>,
    pub dataset_totals: DatasetTotals,
}

/// Reduce a raw `/statistics` payload for display
///
/// Tolerant of partial payloads: a missing or mistyped key only blanks the field
/// that depends on it.
pub fn dashboard_stats(raw: &Value) -> DashboardStats {
    let dataset = &raw["dataset"];

    DashboardStats {
        sentiment_distribution: sentiment_distribution(&dataset["sentiment_distribution"]),
        model_performance: model_performance(&raw["model_performance"]),
        dataset_totals: DatasetTotals {
            total_reviews: Metric::count(dataset["total_reviews"].as_f64()),
            average_text_length: Metric::fixed(dataset["average_text_length"].as_f64(), 0),
            helpful_reviews: Metric::percent(dataset["helpful_reviews_percentage"].as_f64()),
            suspicious_reviews: Metric::percent(dataset["suspicious_reviews_percentage"].as_f64()),
        },
    }
}

fn sentiment_distribution(raw: &Value) -> Vec<DistributionSlice> {
    let counts: Vec<(Sentiment, u64)> = match raw.as_object() {
        Some(map) if !map.is_empty() => map
            .iter()
            .map(|(label, count)| {
                let count = count
                    .as_u64()
                    .or_else(|| count.as_f64().filter(|c| *c >= 0.0).map(|c| c.round() as u64))
                    .unwrap_or(0);
                (Sentiment::from(label.as_str()), count)
            })
            .collect(),
        _ => [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral]
            .into_iter()
            .map(|label| (label, 0))
            .collect(),
    };

    let total: u64 = counts.iter().map(|(_, c)| c).sum();
    counts
        .into_iter()
        .map(|(label, count)| DistributionSlice {
            color: sentiment_color(&label),
            share: if total == 0 { 0.0 } else { count as f64 / total as f64 },
            label,
            count,
        })
        .collect()
}

fn model_performance(raw: &Value) -> Vec<ModelPerformanceRow> {
    let Some(models) = raw.as_object().filter(|m| !m.is_empty()) else {
        return vec![
            ModelPerformanceRow::placeholder("VADER"),
            ModelPerformanceRow::placeholder("ROBERTA"),
        ];
    };

    models
        .iter()
        .map(|(name, data)| ModelPerformanceRow {
            model: name.to_uppercase(),
            accuracy: Metric::ratio(data["accuracy"].as_f64()),
            f1_negative: Metric::ratio(data["f1_score"]["Negative"].as_f64()),
            precision: float_map(&data["precision"]),
            recall: float_map(&data["recall"]),
            f1_score: float_map(&data["f1_score"]),
        })
        .collect()
}

fn float_map(raw: &Value) -> BTreeMap<String, f64> {
    raw.as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_f64().map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Derived facts about a set of model verdicts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    /// At least one model reported a sentiment and all reported sentiments match
    pub agreement: bool,
    /// Model with the highest confidence; ties go to roberta, then vader, then by name
    pub recommended: Option<String>,
    pub models_tested: usize,
}

/// Summarize model verdicts; never consults anything but `models`
pub fn comparison_summary(models: &BTreeMap<String, ModelVerdict>) -> ComparisonSummary {
    let mut sentiments = models.values().filter_map(|v| v.sentiment.as_ref());
    let agreement = match sentiments.next() {
        Some(first) => sentiments.all(|s| s == first),
        None => false,
    };

    let recommended = models
        .iter()
        .max_by(|(a_name, a), (b_name, b)| {
            confidence_cmp(a.confidence, b.confidence)
                .then_with(|| preference_rank(b_name).cmp(&preference_rank(a_name)))
        })
        .map(|(name, _)| name.clone());

    ComparisonSummary {
        agreement,
        recommended,
        models_tested: models.len(),
    }
}

fn confidence_cmp(a: Option<f64>, b: Option<f64>) -> Ordering {
    let usable = |c: Option<f64>| c.filter(|c| !c.is_nan());
    match (usable(a), usable(b)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Lower is preferred
fn preference_rank(name: &str) -> (usize, &str) {
    let rank = MODEL_PREFERENCE
        .iter()
        .position(|preferred| preferred.eq_ignore_ascii_case(name))
        .unwrap_or(MODEL_PREFERENCE.len());
    (rank, name)
}

/// Side-by-side model predictions for one text
///
/// Agreement and recommendation are always derived from the models that answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    models: BTreeMap<String, Slot<ModelVerdict>>,
    summary: ComparisonSummary,
}

impl ComparisonResult {
    pub fn from_models(models: BTreeMap<String, Slot<ModelVerdict>>) -> Self {
        let answered: BTreeMap<String, ModelVerdict> = models
            .iter()
            .filter_map(|(name, slot)| slot.as_ref().ok().map(|v| (name.clone(), v.clone())))
            .collect();
        let summary = comparison_summary(&answered);

        Self { models, summary }
    }

    pub fn models(&self) -> &BTreeMap<String, Slot<ModelVerdict>> {
        &self.models
    }

    pub fn verdict(&self, model: &str) -> Option<&ModelVerdict> {
        self.models.get(model).and_then(|slot| slot.as_ref().ok())
    }

    pub fn agreement(&self) -> bool {
        self.summary.agreement
    }

    pub fn recommended(&self) -> Option<&str> {
        self.summary.recommended.as_deref()
    }

    pub fn summary(&self) -> &ComparisonSummary {
        &self.summary
    }
}

/// Counts for the batch results header
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub by_sentiment: BTreeMap<String, usize>,
    pub average_confidence: Option<f64>,
}

pub fn batch_summary(outcome: &BatchOutcome) -> BatchSummary {
    let mut summary = BatchSummary {
        total: outcome.len(),
        ..Default::default()
    };
    let mut confidences = Vec::new();

    for slot in outcome {
        match slot {
            Ok(result) => {
                summary.succeeded += 1;
                if let Some(sentiment) = &result.sentiment {
                    *summary
                        .by_sentiment
                        .entry(sentiment.as_str().to_string())
                        .or_default() += 1;
                }
                confidences.extend(result.confidence);
            }
            Err(_) => summary.failed += 1,
        }
    }

    if !confidences.is_empty() {
        summary.average_confidence =
            Some(confidences.iter().sum::<f64>() / confidences.len() as f64);
    }
    summary
}
