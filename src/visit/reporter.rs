//! 上报管道
//!
//! 每次访问只发送一次，不重试，不等待结果。发送失败在这一层吞掉并记录日志，
//! 绝不影响跳转。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use ureq::Agent;

use super::report::VisitReport;
use crate::config::ReportingConfig;
use crate::errors::{Result, TracelinkError};

/// 上报传输层
#[async_trait]
pub trait ReportTransport: Send + Sync {
    async fn send(&self, report: &VisitReport) -> Result<()>;

    /// 传输名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 通过 HTTP POST JSON 发送到上报端点
pub struct HttpReportTransport {
    endpoint: String,
    agent: Agent,
}

impl HttpReportTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }
}

#[async_trait]
impl ReportTransport for HttpReportTransport {
    async fn send(&self, report: &VisitReport) -> Result<()> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let body = serde_json::to_value(report)?;

        // ureq 是阻塞 IO，放到 blocking 线程池执行
        tokio::task::spawn_blocking(move || {
            agent
                .post(&endpoint)
                .send_json(&body)
                .map(|_| ())
                .map_err(|e| {
                    TracelinkError::report_transmission(format!(
                        "POST {} failed: {}",
                        endpoint, e
                    ))
                })
        })
        .await
        .map_err(|e| TracelinkError::report_transmission(format!("report task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// 未配置端点时使用，只记录日志
pub struct NullTransport;

#[async_trait]
impl ReportTransport for NullTransport {
    async fn send(&self, report: &VisitReport) -> Result<()> {
        debug!(
            "No report endpoint configured, discarding report for {} ({} events)",
            report.link_id,
            report.events.len()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// 发后即忘的上报管道
#[derive(Clone)]
pub struct ReportingPipeline {
    transport: Arc<dyn ReportTransport>,
}

impl ReportingPipeline {
    pub fn new(transport: Arc<dyn ReportTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &ReportingConfig) -> Self {
        let transport: Arc<dyn ReportTransport> = match config.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => Arc::new(HttpReportTransport::new(
                endpoint.trim(),
                Duration::from_millis(config.timeout_ms),
            )),
            _ => Arc::new(NullTransport),
        };
        debug!("Reporting pipeline using {} transport", transport.name());
        Self::new(transport)
    }

    /// 派发上报任务并立即返回，调用方不持有任务句柄
    pub fn send(&self, report: VisitReport) {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            match transport.send(&report).await {
                Ok(()) => debug!(
                    "Report for {} delivered via {} ({} events)",
                    report.link_id,
                    transport.name(),
                    report.events.len()
                ),
                Err(e) => warn!("Report for {} dropped: {}", report.link_id, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::Fingerprint;
    use tokio::sync::mpsc;

    struct ChannelTransport {
        tx: mpsc::UnboundedSender<VisitReport>,
    }

    #[async_trait]
    impl ReportTransport for ChannelTransport {
        async fn send(&self, report: &VisitReport) -> Result<()> {
            let _ = self.tx.send(report.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "channel"
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl ReportTransport for FailingTransport {
        async fn send(&self, _report: &VisitReport) -> Result<()> {
            Err(TracelinkError::report_transmission("connection refused"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn report(id: &str) -> VisitReport {
        VisitReport::assemble(id, Fingerprint::default(), None, vec![], Duration::ZERO)
    }

    #[tokio::test]
    async fn test_send_dispatches_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pipeline = ReportingPipeline::new(Arc::new(ChannelTransport { tx }));

        pipeline.send(report("abc"));

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.link_id, "abc");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let pipeline = ReportingPipeline::new(Arc::new(FailingTransport));
        // 不 panic，不返回错误
        pipeline.send(report("abc"));
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn test_http_transport_unreachable_endpoint() {
        // 端口 9 (discard) 通常没有监听，连接会立即失败
        let transport = HttpReportTransport::new("http://127.0.0.1:9/api/track", Duration::from_secs(2));
        let err = transport.send(&report("abc")).await.unwrap_err();
        assert!(matches!(err, TracelinkError::ReportTransmission(_)));
    }

    #[test]
    fn test_from_config_without_endpoint() {
        let pipeline = ReportingPipeline::from_config(&ReportingConfig::default());
        assert_eq!(pipeline.transport.name(), "null");

        let pipeline = ReportingPipeline::from_config(&ReportingConfig {
            endpoint: Some("http://127.0.0.1:8080/api/track".to_string()),
            timeout_ms: 1000,
        });
        assert_eq!(pipeline.transport.name(), "http");
    }
}
