use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, trace};

use crate::registry::LinkRegistry;

use super::helpers::json_response;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub uptime: u64,
    pub response_time_ms: u64,
}

pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        registry: web::Data<Arc<LinkRegistry>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let (links, error) =
            match tokio::time::timeout(Duration::from_secs(5), registry.count()).await {
                Ok(Ok(count)) => (Some(count), None),
                Ok(Err(e)) => {
                    error!("Registry health check failed: {}", e);
                    (None, Some(e.to_string()))
                }
                Err(_) => {
                    error!("Registry health check timeout");
                    (None, Some("timeout".to_string()))
                }
            };

        let is_healthy = error.is_none();
        let uptime = (chrono::Utc::now() - app_start_time.start_datetime)
            .num_seconds()
            .max(0) as u64;

        let body = HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" },
            backend: registry.backend_name(),
            links,
            error,
            uptime,
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        let status = if is_healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        json_response(status, &body)
    }

    // 活跃性检查，只要进程在处理请求即可
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
