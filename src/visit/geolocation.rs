//! 定位解析
//!
//! 发起一次带超时的定位请求。拒绝授权、平台不支持和超时都是正常结果，
//! 统一返回 `None`，不会拖慢访问流程。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub latitude: f64,
    pub longitude: f64,
    /// 精度半径（米）
    pub accuracy: f64,
}

/// 定位失败原因（只用于诊断日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationFailure {
    PermissionDenied,
    Unavailable,
    Timeout,
}

impl std::fmt::Display for GeolocationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Unavailable => write!(f, "position unavailable"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

/// 宿主提供的定位能力
#[async_trait]
pub trait GeolocationSource: Send + Sync {
    async fn current_position(&self) -> Result<GeoSample, GeolocationFailure>;
}

/// 不支持定位的宿主
pub struct NoGeolocation;

#[async_trait]
impl GeolocationSource for NoGeolocation {
    async fn current_position(&self) -> Result<GeoSample, GeolocationFailure> {
        Err(GeolocationFailure::Unavailable)
    }
}

pub struct GeolocationResolver {
    source: Arc<dyn GeolocationSource>,
}

impl GeolocationResolver {
    pub fn new(source: Arc<dyn GeolocationSource>) -> Self {
        Self { source }
    }

    /// 在 `timeout` 内解析位置，失败或超时返回 `None`
    ///
    /// 请求在独立任务中执行：超时后调用方立即返回，已发出的请求自行结束。
    pub async fn resolve(&self, timeout: Duration) -> Option<GeoSample> {
        let source = Arc::clone(&self.source);
        let request = tokio::spawn(async move { source.current_position().await });

        let outcome = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                debug!("Geolocation request task failed: {}", join_err);
                Err(GeolocationFailure::Unavailable)
            }
            Err(_) => Err(GeolocationFailure::Timeout),
        };

        match outcome {
            Ok(sample) => {
                debug!(
                    "Geolocation resolved (accuracy {:.0}m)",
                    sample.accuracy
                );
                Some(sample)
            }
            Err(failure) => {
                debug!("Geolocation unavailable: {}", failure);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    struct Delayed {
        delay: Duration,
        result: Result<GeoSample, GeolocationFailure>,
    }

    #[async_trait]
    impl GeolocationSource for Delayed {
        async fn current_position(&self) -> Result<GeoSample, GeolocationFailure> {
            tokio::time::sleep(self.delay).await;
            self.result
        }
    }

    /// 永不返回的定位源（例如用户一直不处理授权弹窗）
    struct Hanging;

    #[async_trait]
    impl GeolocationSource for Hanging {
        async fn current_position(&self) -> Result<GeoSample, GeolocationFailure> {
            std::future::pending().await
        }
    }

    const SAMPLE: GeoSample = GeoSample {
        latitude: 52.52,
        longitude: 13.405,
        accuracy: 25.0,
    };

    #[tokio::test(start_paused = true)]
    async fn test_resolves_within_timeout() {
        let resolver = GeolocationResolver::new(Arc::new(Delayed {
            delay: Duration::from_millis(200),
            result: Ok(SAMPLE),
        }));
        assert_eq!(resolver.resolve(Duration::from_millis(1000)).await, Some(SAMPLE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_denial_is_none() {
        let resolver = GeolocationResolver::new(Arc::new(Delayed {
            delay: Duration::from_millis(10),
            result: Err(GeolocationFailure::PermissionDenied),
        }));
        assert_eq!(resolver.resolve(Duration::from_millis(1000)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_source_returns_at_timeout() {
        let resolver = GeolocationResolver::new(Arc::new(Hanging));
        let start = Instant::now();
        assert_eq!(resolver.resolve(Duration::from_millis(1000)).await, None);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_success_after_timeout_is_none() {
        let resolver = GeolocationResolver::new(Arc::new(Delayed {
            delay: Duration::from_millis(1500),
            result: Ok(SAMPLE),
        }));
        assert_eq!(resolver.resolve(Duration::from_millis(1000)).await, None);
    }

    #[tokio::test]
    async fn test_no_geolocation_host() {
        let resolver = GeolocationResolver::new(Arc::new(NoGeolocation));
        assert_eq!(resolver.resolve(Duration::from_millis(50)).await, None);
    }
}
