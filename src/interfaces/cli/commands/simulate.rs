//! Headless visit command
//!
//! 用本机环境充当访问页宿主：指纹取自环境变量，定位不可用，
//! 跳转目标打印到终端。

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use crate::config::get_config;
use crate::interfaces::cli::CliError;
use crate::visit::{
    ChannelNavigator, InteractionEvent, NoGeolocation, ReportingPipeline, StaticProbe,
    VisibilityState, VisitHost, VisitSession, VisitSettings,
};

use super::open_registry;

/// 等待跳转时在停留时间之外额外允许的时间
const NAVIGATION_GRACE: Duration = Duration::from_secs(2);

fn local_probe() -> StaticProbe {
    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    StaticProbe {
        user_agent: Some(format!("tracelink-cli/{}", env!("CARGO_PKG_VERSION"))),
        platform: Some(std::env::consts::OS.to_string()),
        // en_US.UTF-8 → en-US
        language: env("LANG").map(|l| {
            l.split('.')
                .next()
                .unwrap_or_default()
                .replace('_', "-")
        }),
        screen_size: None,
        timezone: env("TZ"),
        max_touch_points: Some(0),
        do_not_track: env("DNT"),
    }
}

pub async fn simulate_visit(id: &str, dwell_ms: Option<u64>) -> Result<(), CliError> {
    let config = get_config();
    let registry = open_registry().await?;

    let mut settings = VisitSettings::from(&config.visit);
    if let Some(ms) = dwell_ms {
        settings.dwell = Duration::from_millis(ms);
    }

    let (navigator, mut navigations) = ChannelNavigator::new();
    let host = VisitHost {
        environment: Arc::new(local_probe()),
        geolocation: Arc::new(NoGeolocation),
        navigator: Arc::new(navigator),
    };
    let pipeline = ReportingPipeline::from_config(&config.reporting);

    let session = VisitSession::open(id, &registry, host, pipeline, settings).await;
    if session.is_inert() {
        return Err(CliError::CommandError(format!("Unknown link: {}", id)));
    }

    if let Some(sources) = session.sources() {
        let now_ms = chrono::Utc::now().timestamp_millis();
        sources
            .visibility
            .publish(InteractionEvent::visibility(VisibilityState::Visible, now_ms));
    }

    println!(
        "{} Visiting {} (redirect in {} ms)",
        "ℹ".bold().blue(),
        id.cyan(),
        settings.dwell.as_millis()
    );
    if config.reporting.endpoint.is_none() {
        println!(
            "  {}",
            "reporting.endpoint not set; the report is logged and discarded".dimmed()
        );
    }

    match tokio::time::timeout(settings.dwell + NAVIGATION_GRACE, navigations.recv()).await {
        Ok(Some(destination)) => {
            println!(
                "{} Redirected to {}",
                "✓".bold().green(),
                destination.blue().underline()
            );
            Ok(())
        }
        _ => Err(CliError::CommandError(
            "Visit did not redirect in time".to_string(),
        )),
    }
}
