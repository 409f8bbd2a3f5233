use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::{json, Value};

use super::OutputFormat;
use crate::api::{
    AnalysisResult, BatchOutcome, HealthReport, HelpfulnessReport, ModelCatalog, Slot,
};
use crate::constants::PLACEHOLDER;
use crate::health::HealthStatus;
use crate::view::{
    risk_color, score_color, sentiment_color, status_color, BatchSummary, ComparisonResult,
    DashboardStats, FALLBACK_COLOR,
};

/// Paint `text` with a `#rrggbb` palette color
fn paint(text: &str, hex: &str) -> ColoredString {
    match parse_hex(hex).or_else(|| parse_hex(FALLBACK_COLOR)) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize result: {}\"}}", e))
}

/// A slot as JSON: the value itself, or `{ "error": ..., "text": ... }`
fn slot_json<T: Serialize>(slot: &Slot<T>) -> Value {
    match slot {
        Ok(value) => serde_json::to_value(value).unwrap_or(Value::Null),
        Err(e) => json!({ "error": e.message, "text": e.text }),
    }
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn health(status: HealthStatus, report: Option<&HealthReport>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => pretty(&json!({ "status": status, "report": report })),
        OutputFormat::Text => {
            let mut output = paint(status.label(), status_color(status)).bold().to_string();
            if let Some(report) = report {
                if !report.uptime.is_empty() {
                    output.push_str(&format!("\nUptime: {}", report.uptime));
                }
                for (name, model) in &report.models {
                    let state = if model.loaded {
                        "loaded".green()
                    } else {
                        "not loaded".red()
                    };
                    output.push_str(&format!("\n  {} {}", name.bold(), state));
                    if let Some(secs) = model.loading_time {
                        output.push_str(&format!(" ({:.2}s)", secs));
                    }
                    if let Some(error) = &model.error {
                        output.push_str(&format!(" - {}", error));
                    }
                }
            }
            output
        }
    }
}

pub fn status_change(status: HealthStatus, at: DateTime<Local>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(&json!({ "status": status, "at": at.to_rfc3339() }))
                .unwrap_or_default()
        }
        OutputFormat::Text => format!(
            "[{}] {}",
            at.format("%H:%M:%S"),
            paint(status.label(), status_color(status))
        ),
    }
}

/// One sentiment or fake-detection result; only the populated fields are shown
pub fn analysis(result: &AnalysisResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return pretty(result);
    }

    let mut lines = Vec::new();

    if let Some(sentiment) = &result.sentiment {
        lines.push(format!(
            "Sentiment:  {}",
            paint(sentiment.as_str(), sentiment_color(sentiment)).bold()
        ));
        lines.push(format!("Confidence: {}", percent(result.confidence)));
        if let Some(model) = result.model {
            lines.push(format!("Model:      {}", model));
        }
        for (label, p) in &result.probabilities {
            lines.push(format!("  {:<10} {}", label, percent(Some(*p))));
        }
    }

    if let Some(risk) = &result.risk_level {
        let verdict = if result.is_suspicious == Some(true) {
            "Suspicious".red().bold()
        } else {
            "Looks genuine".green().bold()
        };
        lines.push(format!("Verdict:    {}", verdict));
        lines.push(format!("Risk:       {}", paint(risk.as_str(), risk_color(risk))));
        if let Some(score) = result.suspicion_score {
            lines.push(format!(
                "Score:      {}",
                paint(&format!("{}/7", score), score_color(score))
            ));
        }
        for warning in &result.warnings {
            lines.push(format!("  ! {}", warning.yellow()));
        }
        for (name, signal) in &result.features {
            lines.push(format!("  {:<24} {}", name, signal));
        }
    }

    lines.push(format!("({:.3}s)", result.processing_time_secs).dimmed().to_string());
    lines.join("\n")
}

pub fn batch(
    texts: &[String],
    outcome: &BatchOutcome,
    summary: &BatchSummary,
    format: OutputFormat,
) -> String {
    if format == OutputFormat::Json {
        let results: Vec<Value> = outcome.iter().map(slot_json).collect();
        return pretty(&json!({ "summary": summary, "results": results }));
    }

    let mut lines = vec![format!(
        "{} reviews: {} analyzed, {} failed",
        summary.total,
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red()
    )];
    for (label, count) in &summary.by_sentiment {
        lines.push(format!("  {:<10} {}", label, count));
    }
    if let Some(avg) = summary.average_confidence {
        lines.push(format!("  Average confidence {}", percent(Some(avg))));
    }
    lines.push(String::new());

    for (i, (text, slot)) in texts.iter().zip(outcome).enumerate() {
        let excerpt: String = text.chars().take(60).collect();
        let verdict = match slot {
            Ok(result) => match &result.sentiment {
                Some(sentiment) => format!(
                    "{} {}",
                    paint(sentiment.as_str(), sentiment_color(sentiment)),
                    percent(result.confidence)
                ),
                None => PLACEHOLDER.to_string(),
            },
            Err(e) => format!("{} {}", "error:".red(), e.message),
        };
        lines.push(format!("{:>3}. {} - {}", i + 1, excerpt, verdict));
    }
    lines.join("\n")
}

pub fn comparison(result: &ComparisonResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let models: serde_json::Map<String, Value> = result
            .models()
            .iter()
            .map(|(name, slot)| (name.clone(), slot_json(slot)))
            .collect();
        return pretty(&json!({
            "models": models,
            "agreement": result.agreement(),
            "recommended": result.recommended(),
            "models_tested": result.summary().models_tested,
        }));
    }

    let mut lines = Vec::new();
    for (name, slot) in result.models() {
        match slot {
            Ok(verdict) => {
                let label = match &verdict.sentiment {
                    Some(sentiment) => paint(sentiment.as_str(), sentiment_color(sentiment)),
                    None => PLACEHOLDER.normal(),
                };
                lines.push(format!(
                    "{:<10} {} {}",
                    name.to_uppercase().bold(),
                    label,
                    percent(verdict.confidence)
                ));
            }
            Err(e) => lines.push(format!(
                "{:<10} {} {}",
                name.to_uppercase().bold(),
                "error:".red(),
                e.message
            )),
        }
    }

    let agreement = if result.agreement() {
        "Models agree".green()
    } else {
        "Models disagree".yellow()
    };
    lines.push(String::new());
    lines.push(agreement.to_string());
    lines.push(format!(
        "Recommended: {}",
        result.recommended().unwrap_or(PLACEHOLDER)
    ));
    lines.join("\n")
}

pub fn dashboard(stats: &DashboardStats, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return pretty(stats);
    }

    let totals = &stats.dataset_totals;
    let mut lines = vec![
        "Dataset".bold().to_string(),
        format!("  Total reviews       {}", totals.total_reviews.display),
        format!("  Average length      {}", totals.average_text_length.display),
        format!("  Helpful reviews     {}", totals.helpful_reviews.display),
        format!("  Suspicious reviews  {}", totals.suspicious_reviews.display),
        String::new(),
        "Sentiment distribution".bold().to_string(),
    ];
    for slice in &stats.sentiment_distribution {
        lines.push(format!(
            "  {:<10} {:>8} {:>6.1}%",
            paint(slice.label.as_str(), slice.color),
            slice.count,
            slice.share * 100.0
        ));
    }

    lines.push(String::new());
    lines.push("Model performance".bold().to_string());
    for row in &stats.model_performance {
        lines.push(format!(
            "  {:<10} accuracy {:>7}  F1 (negative) {:>7}",
            row.model, row.accuracy.display, row.f1_negative.display
        ));
    }
    lines.join("\n")
}

pub fn catalog(catalog: &ModelCatalog, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return pretty(catalog);
    }

    let mut lines = vec![format!("Available models ({}):", catalog.models.len())];
    for (id, model) in &catalog.models {
        let recommended = catalog.recommended_model.as_deref() == Some(id.as_str());
        let marker = if recommended { " (recommended)" } else { "" };
        let state = if model.loaded {
            "loaded".green()
        } else {
            "not loaded".red()
        };
        lines.push(format!(
            "  • {} - {} [{}]{}",
            id.green(),
            model.name,
            state,
            marker
        ));
        if !model.description.is_empty() {
            lines.push(format!("      {}", model.description.dimmed()));
        }
        if !model.recommended_for.is_empty() {
            lines.push(format!("      Best for: {}", model.recommended_for.join(", ")));
        }
    }
    lines.join("\n")
}

pub fn helpfulness(report: &HelpfulnessReport, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return pretty(report);
    }

    let mut lines = vec![
        format!("Category:        {}", report.helpfulness_category.bold()),
        format!(
            "Predicted ratio: {}",
            percent(Some(report.predicted_helpfulness_ratio))
        ),
        format!("Quality score:   {:.2}", report.quality_score),
    ];
    for tip in &report.recommendations {
        lines.push(format!("  - {}", tip));
    }
    lines.join("\n")
}
