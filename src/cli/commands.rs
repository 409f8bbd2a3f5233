use anyhow::{bail, Context, Result};
use chrono::Local;
use colored::Colorize;
use futures::StreamExt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use tracing::warn;

use super::{render, Commands, OutputFormat};
use crate::{
    api::{AnalysisRequest, BatchRequest, HelpfulnessRequest},
    app::{init_config, AppState},
    health::{HealthMonitor, HealthStatus},
    utils::AnalysisError,
    view::{batch_summary, dashboard_stats, Screen, Submission},
};

/// Handle CLI subcommands
pub async fn handle_command(state: &AppState, command: &Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Health => check_health(state, format).await,
        Commands::Watch { interval } => watch_health(state, *interval, format).await,
        Commands::Analyze { text, model } => {
            let orchestrator = state.orchestrator();
            let request = AnalysisRequest::new(text).map(|r| match model {
                Some(model) => r.with_model(*model),
                None => r,
            });
            let result = submit(request, |request| async move {
                orchestrator.analyze_sentiment(&request).await
            })
            .await?;
            println!("{}", render::analysis(&result, format));
            Ok(())
        }
        Commands::Fake { text, rating } => {
            let orchestrator = state.orchestrator();
            let request = AnalysisRequest::new(text).and_then(|r| r.with_rating(*rating));
            let result = submit(request, |request| async move {
                orchestrator.detect_fake(&request).await
            })
            .await?;
            println!("{}", render::analysis(&result, format));
            Ok(())
        }
        Commands::Batch { texts, file, model } => {
            let mut inputs = texts.clone();
            if let Some(path) = file {
                inputs.extend(read_lines(path)?);
            }
            let request = BatchRequest::from_inputs(&inputs).map(|r| match model {
                Some(model) => r.with_model(*model),
                None => r,
            });
            let submitted = request
                .as_ref()
                .map(|r| r.texts().to_vec())
                .unwrap_or_default();

            let orchestrator = state.orchestrator();
            let outcome = submit(request, |request| async move {
                orchestrator.submit_batch(&request).await
            })
            .await?;
            println!(
                "{}",
                render::batch(&submitted, &outcome, &batch_summary(&outcome), format)
            );
            Ok(())
        }
        Commands::Compare { text } => {
            let orchestrator = state.orchestrator();
            let result = submit(AnalysisRequest::new(text), |request| async move {
                orchestrator.compare(&request).await
            })
            .await?;
            println!("{}", render::comparison(&result, format));
            Ok(())
        }
        Commands::Stats => {
            let orchestrator = state.orchestrator();
            let screen = Screen::new();
            screen.activate();
            let outcome = screen
                .refresh(async { orchestrator.statistics().await.map(|raw| dashboard_stats(&raw)) })
                .await;
            let stats = settle(&screen, outcome)?;
            println!("{}", render::dashboard(&stats, format));
            Ok(())
        }
        Commands::Models => {
            let catalog = state.orchestrator().model_catalog().await?;
            println!("{}", render::catalog(&catalog, format));
            Ok(())
        }
        Commands::Helpfulness {
            text,
            helpful_votes,
            total_votes,
        } => {
            let orchestrator = state.orchestrator();
            let request = HelpfulnessRequest::new(text, *helpful_votes, *total_votes);
            let report = submit(request, |request| async move {
                orchestrator.analyze_helpfulness(&request).await
            })
            .await?;
            println!("{}", render::helpfulness(&report, format));
            Ok(())
        }
        Commands::Init => {
            let (path, created) = init_config()?;
            if created {
                println!("Configuration written to {}", path.display().to_string().green());
            } else {
                println!("Configuration already exists at {}", path.display());
            }
            Ok(())
        }
        Commands::Version => {
            show_version();
            Ok(())
        }
    }
}

/// Run one submission through a fresh screen and hand back what it shows
///
/// Ctrl-C tears the screen down; the late result is then discarded.
async fn submit<R, T, F, Fut>(request: Result<R, AnalysisError>, op: F) -> Result<T>
where
    T: Clone,
    F: FnOnce(R) -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let screen = Screen::new();
    screen.activate();

    let outcome = tokio::select! {
        outcome = screen.submit(request, op) => outcome,
        _ = tokio::signal::ctrl_c() => {
            screen.deactivate();
            Submission::Discarded
        }
    };
    settle(&screen, outcome)
}

fn settle<T: Clone>(screen: &Screen<T>, outcome: Submission) -> Result<T> {
    match outcome {
        Submission::Applied => screen.result().context("Screen has no result"),
        Submission::Failed(e) | Submission::Rejected(e) => Err(e.into()),
        Submission::Discarded => bail!("Request cancelled"),
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read reviews from {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Wait for the first probe to settle, then show the service's own report
async fn check_health(state: &AppState, format: OutputFormat) -> Result<()> {
    let mut monitor = state.health_monitor();
    let mut updates = monitor.subscribe();
    monitor.start();
    let status = *updates
        .wait_for(HealthStatus::is_settled)
        .await
        .context("Health monitor closed before the first probe")?;
    monitor.stop();

    let report = if status == HealthStatus::Online {
        match state.orchestrator().health_report().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Failed to fetch health report: {}", e);
                None
            }
        }
    } else {
        None
    };

    println!("{}", render::health(status, report.as_ref(), format));
    if status != HealthStatus::Online {
        bail!("Analysis service is not reachable at {}", state.config.api_url);
    }
    Ok(())
}

/// Print every status change until Ctrl-C
async fn watch_health(state: &AppState, interval: Option<u64>, format: OutputFormat) -> Result<()> {
    let monitor = match interval {
        Some(secs) => HealthMonitor::with_timing(
            Arc::clone(&state.transport),
            Duration::from_secs(secs.max(1)),
            state.config.health.timeout(),
        ),
        None => state.health_monitor(),
    };

    let screen: Screen<()> = Screen::with_monitor(monitor);
    screen.activate();
    let updates = screen.health().context("Screen has no health monitor")?;
    let mut updates = WatchStream::new(updates);

    if format == OutputFormat::Text {
        println!("Watching {} (Ctrl-C to stop)", state.config.api_url.bold());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = updates.next() => match next {
                Some(status) => println!("{}", render::status_change(status, Local::now(), format)),
                None => break,
            },
        }
    }

    screen.deactivate();
    Ok(())
}

/// Show version information
pub fn show_version() {
    println!("sentiscope v{}", env!("CARGO_PKG_VERSION"));
    println!("   Client for the review sentiment analysis service");
}
