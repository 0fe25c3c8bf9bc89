//! 单次访问的编排
//!
//! 打开访问时：通过注册表解析目标 → 同步采集指纹 → 注册事件源 → 启动跳转定时器，
//! 然后在后台任务中等待定位结果、组装报告并派发。跳转定时器从访问开始计时，
//! 与上报是否完成无关。

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use strum::AsRefStr;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::events::{EventBuffer, EventCapture, EventSources};
use super::fingerprint::{self, EnvironmentProbe, Fingerprint};
use super::geolocation::{GeolocationResolver, GeolocationSource};
use super::redirect::{Navigator, RedirectScheduler, ScheduledRedirect};
use super::report::VisitReport;
use super::reporter::ReportingPipeline;
use crate::config::VisitConfig;
use crate::errors::TracelinkError;
use crate::registry::LinkRegistry;

/// 访问状态
///
/// `Redirected`、`Inert`、`TornDown` 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum VisitState {
    Initializing,
    CapturingTelemetry,
    Reporting,
    RedirectPending,
    Redirected,
    /// 链接不存在，访问不做任何事
    Inert,
    /// 跳转前被销毁
    TornDown,
}

impl VisitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Redirected | Self::Inert | Self::TornDown)
    }
}

fn transition(state: &Mutex<VisitState>, next: VisitState) -> bool {
    let mut current = state.lock();
    if current.is_terminal() {
        trace!(
            "Visit state {} is terminal, ignoring transition to {}",
            current.as_ref(),
            next.as_ref()
        );
        return false;
    }
    debug!("Visit state {} -> {}", current.as_ref(), next.as_ref());
    *current = next;
    true
}

/// 访问的时间参数
#[derive(Debug, Clone, Copy)]
pub struct VisitSettings {
    pub dwell: Duration,
    pub geo_timeout: Duration,
    pub event_capacity: usize,
}

impl Default for VisitSettings {
    fn default() -> Self {
        Self::from(&VisitConfig::default())
    }
}

impl From<&VisitConfig> for VisitSettings {
    fn from(config: &VisitConfig) -> Self {
        Self {
            dwell: Duration::from_millis(config.dwell_ms),
            geo_timeout: Duration::from_millis(config.geo_timeout_ms),
            event_capacity: config.event_capacity,
        }
    }
}

/// 宿主环境提供的能力
#[derive(Clone)]
pub struct VisitHost {
    pub environment: Arc<dyn EnvironmentProbe>,
    pub geolocation: Arc<dyn GeolocationSource>,
    pub navigator: Arc<dyn Navigator>,
}

/// 导航即销毁：跳转时同时注销事件监听
struct SessionNavigator {
    inner: Arc<dyn Navigator>,
    state: Arc<Mutex<VisitState>>,
    capture: Arc<EventCapture>,
}

impl Navigator for SessionNavigator {
    fn navigate(&self, url: &str) {
        self.capture.teardown();
        transition(&self.state, VisitState::Redirected);
        self.inner.navigate(url);
    }
}

pub struct VisitSession {
    link_id: String,
    destination: Option<String>,
    fingerprint: Option<Fingerprint>,
    state: Arc<Mutex<VisitState>>,
    capture: Option<Arc<EventCapture>>,
    sources: Option<EventSources>,
    redirect: Option<ScheduledRedirect>,
}

impl VisitSession {
    /// 打开一次访问
    ///
    /// 链接无法解析时返回惰性会话：不采集、不上报、不跳转。
    pub async fn open(
        link_id: impl Into<String>,
        registry: &LinkRegistry,
        host: VisitHost,
        pipeline: ReportingPipeline,
        settings: VisitSettings,
    ) -> Self {
        let link_id = link_id.into();
        let state = Arc::new(Mutex::new(VisitState::Initializing));

        let destination = match registry.resolve(&link_id).await {
            Ok(destination) => destination,
            Err(e) => {
                match e {
                    TracelinkError::UnknownLink(_) => debug!("Visit for unknown link {}", link_id),
                    other => warn!("Failed to resolve link {}: {}", link_id, other),
                }
                *state.lock() = VisitState::Inert;
                return Self {
                    link_id,
                    destination: None,
                    fingerprint: None,
                    state,
                    capture: None,
                    sources: None,
                    redirect: None,
                };
            }
        };

        let started = Instant::now();
        let fingerprint = fingerprint::collect(host.environment.as_ref());

        let buffer = Arc::new(EventBuffer::new(settings.event_capacity));
        let capture = Arc::new(EventCapture::new(Arc::clone(&buffer)));
        let sources = capture.register();

        let navigator: Arc<dyn Navigator> = Arc::new(SessionNavigator {
            inner: host.navigator,
            state: Arc::clone(&state),
            capture: Arc::clone(&capture),
        });
        let redirect = RedirectScheduler::schedule(navigator, destination.clone(), settings.dwell);
        transition(&state, VisitState::CapturingTelemetry);

        // 定位 → 组装 → 派发；定位请求发出后不随访问销毁而取消
        let resolver = GeolocationResolver::new(host.geolocation);
        let task_state = Arc::clone(&state);
        let task_link_id = link_id.clone();
        let task_fingerprint = fingerprint.clone();
        let geo_timeout = settings.geo_timeout;
        tokio::spawn(async move {
            let geo = resolver.resolve(geo_timeout).await;

            transition(&task_state, VisitState::Reporting);
            let report = VisitReport::assemble(
                task_link_id,
                task_fingerprint,
                geo,
                buffer.drain(),
                started.elapsed(),
            );
            pipeline.send(report);
            transition(&task_state, VisitState::RedirectPending);
        });

        info!("Visit opened for link {}", link_id);
        Self {
            link_id,
            destination: Some(destination),
            fingerprint: Some(fingerprint),
            state,
            capture: Some(capture),
            sources: Some(sources),
            redirect: Some(redirect),
        }
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn state(&self) -> VisitState {
        *self.state.lock()
    }

    pub fn is_inert(&self) -> bool {
        self.state() == VisitState::Inert
    }

    /// 宿主事件监听器使用的事件源；惰性会话没有事件源
    pub fn sources(&self) -> Option<&EventSources> {
        self.sources.as_ref()
    }

    /// 销毁访问：清除跳转定时器并注销事件监听
    ///
    /// 返回是否在跳转前取消成功。重复调用无效果。
    pub fn teardown(&mut self) -> bool {
        let cancelled = self
            .redirect
            .take()
            .is_some_and(|redirect| redirect.cancel());

        if let Some(capture) = &self.capture {
            capture.teardown();
        }

        if cancelled {
            transition(&self.state, VisitState::TornDown);
            debug!("Visit for {} torn down before redirect", self.link_id);
        }
        cancelled
    }
}

impl Drop for VisitSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
