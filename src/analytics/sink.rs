use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::geoip::GeoInfo;
use crate::config::IngestConfig;
use crate::errors::{Result, TracelinkError};
use crate::visit::VisitReport;

/// 内存 sink 保留的最大报告数
const MEMORY_SINK_CAPACITY: usize = 10_000;

/// 已接收的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub received_at: DateTime<Utc>,
    /// 服务端看到的客户端地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_geo: Option<GeoInfo>,
    #[serde(default)]
    pub vpn_suspected: bool,
    #[serde(flatten)]
    pub report: VisitReport,
}

impl StoredReport {
    pub fn now(report: VisitReport) -> Self {
        Self {
            received_at: Utc::now(),
            client_ip: None,
            ip_geo: None,
            vpn_suspected: false,
            report,
        }
    }

    /// 附加连接来源信息
    pub fn with_origin(mut self, client_ip: Option<String>, ip_geo: Option<GeoInfo>) -> Self {
        self.vpn_suspected = ip_geo.as_ref().is_some_and(GeoInfo::vpn_suspected);
        self.client_ip = client_ip;
        self.ip_geo = ip_geo;
        self
    }
}

/// 报告存储
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn record(&self, report: StoredReport) -> Result<()>;

    /// 最近的 `limit` 条报告，按接收顺序
    async fn recent(&self, limit: usize) -> Result<Vec<StoredReport>>;

    fn name(&self) -> &'static str;
}

/// 根据配置创建 sink：配置了文件路径用 JSON Lines，否则内存
pub async fn create_sink(config: &IngestConfig) -> Result<Arc<dyn ReportSink>> {
    let sink: Arc<dyn ReportSink> = match config.path.as_deref() {
        Some(path) if !path.trim().is_empty() => {
            Arc::new(JsonLinesReportSink::open(path.trim()).await?)
        }
        _ => Arc::new(MemoryReportSink::new()),
    };
    info!("Report ingestion using {} sink", sink.name());
    Ok(sink)
}

#[derive(Default)]
pub struct MemoryReportSink {
    reports: parking_lot::Mutex<VecDeque<StoredReport>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn record(&self, report: StoredReport) -> Result<()> {
        let mut reports = self.reports.lock();
        if reports.len() == MEMORY_SINK_CAPACITY {
            reports.pop_front();
        }
        reports.push_back(report);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredReport>> {
        let reports = self.reports.lock();
        let skip = reports.len().saturating_sub(limit);
        Ok(reports.iter().skip(skip).cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// 追加写入 JSON Lines 文件
pub struct JsonLinesReportSink {
    path: PathBuf,
    writer: Mutex<tokio::fs::File>,
}

impl JsonLinesReportSink {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                TracelinkError::storage(format!(
                    "Failed to open report file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }
}

#[async_trait]
impl ReportSink for JsonLinesReportSink {
    async fn record(&self, report: StoredReport) -> Result<()> {
        let mut line = serde_json::to_string(&report)?;
        line.push('\n');

        let mut file = self.writer.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StoredReport>> {
        // 持有写锁读取，避免读到写了一半的行
        let _guard = self.writer.lock().await;
        let content = tokio::fs::read_to_string(&self.path).await?;

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let skip = lines.len().saturating_sub(limit);
        let mut reports = Vec::with_capacity(lines.len() - skip);
        for line in &lines[skip..] {
            match serde_json::from_str::<StoredReport>(line) {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Skipping malformed report line in {}: {}", self.path.display(), e),
            }
        }
        Ok(reports)
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}
