use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::{GeoIpProvider, ReportSink, create_sink};
use crate::config::{StaticConfig, get_config};
use crate::registry::{LinkRegistry, create_store};

pub struct StartupContext {
    pub registry: Arc<LinkRegistry>,
    pub sink: Arc<dyn ReportSink>,
    pub geoip: GeoIpProvider,
}

/// 根据配置构建注册表（服务器和 CLI 共用）
pub async fn build_registry(config: &StaticConfig) -> Result<LinkRegistry> {
    let store = create_store(&config.registry)
        .await
        .context("Failed to create link store")?;
    Ok(LinkRegistry::new(store, config.registry.link_prefix.clone()))
}

/// 准备服务器启动的上下文
/// 包括链接注册表、上报存储和 GeoIP 查询
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = get_config();

    let registry = build_registry(&config).await?;
    info!(
        "Using link store: {} ({} links)",
        registry.backend_name(),
        registry.count().await.unwrap_or(0)
    );

    let sink = create_sink(&config.ingest)
        .await
        .context("Failed to create report sink")?;
    let geoip = GeoIpProvider::new(&config.geoip);

    if config.ingest.admin_token.as_deref().is_none_or(str::is_empty) {
        info!("Reports API is disabled (ingest.admin_token not set)");
    }
    if config.visit.geo_timeout_ms >= config.visit.dwell_ms {
        warn!(
            "visit.geo_timeout_ms ({}) >= visit.dwell_ms ({}): reports may be sent after the redirect",
            config.visit.geo_timeout_ms, config.visit.dwell_ms
        );
    }

    debug!("Pre-startup processing completed in {:?}", start_time.elapsed());

    Ok(StartupContext {
        registry: Arc::new(registry),
        sink,
        geoip,
    })
}
