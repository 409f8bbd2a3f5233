use crate::api::{RiskLevel, Sentiment};
use crate::constants::{
    COLOR_ERROR, COLOR_NEUTRAL, COLOR_SUCCESS, COLOR_WARNING, SCORE_HIGH_THRESHOLD,
    SCORE_MEDIUM_THRESHOLD,
};
use crate::health::HealthStatus;

/// Color used for anything the palette does not know
pub const FALLBACK_COLOR: &str = COLOR_NEUTRAL;

pub fn sentiment_color(sentiment: &Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => COLOR_SUCCESS,
        Sentiment::Negative => COLOR_ERROR,
        Sentiment::Neutral => COLOR_WARNING,
        Sentiment::Unrecognized(_) => FALLBACK_COLOR,
    }
}

pub fn risk_color(risk: &RiskLevel) -> &'static str {
    match risk {
        RiskLevel::High => COLOR_ERROR,
        RiskLevel::Medium => COLOR_WARNING,
        RiskLevel::Low => COLOR_SUCCESS,
        RiskLevel::Unrecognized(_) => FALLBACK_COLOR,
    }
}

/// Suspicion score (0-7) to traffic-light color
pub fn score_color(score: u8) -> &'static str {
    if score >= SCORE_HIGH_THRESHOLD {
        COLOR_ERROR
    } else if score >= SCORE_MEDIUM_THRESHOLD {
        COLOR_WARNING
    } else {
        COLOR_SUCCESS
    }
}

pub fn status_color(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Online => COLOR_SUCCESS,
        HealthStatus::Offline => COLOR_ERROR,
        HealthStatus::Loading => COLOR_WARNING,
    }
}
