//! 上报接收与查看
//!
//! `POST /api/track` 接收访问页发出的 `VisitReport`，用请求头补齐客户端缺失的指纹字段，
//! 记录客户端 IP 及其地理信息后交给 `ReportSink` 保存。`GET /api/reports` 需要 Bearer token，未配置 token 时整个接口关闭。

use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpRequest, Responder, web};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

use crate::analytics::{GeoIpProvider, ReportSink, StoredReport};
use crate::config::get_config;
use crate::registry::LinkRegistry;
use crate::utils::client_ip;
use crate::visit::{HeaderProbe, VisitReport, fingerprint};

use super::error_code::ErrorCode;
use super::helpers::{error_from_tracelink, error_response, success_response};

/// 单次查看返回的最大记录数
const MAX_REPORTS_LIMIT: usize = 500;
const DEFAULT_REPORTS_LIMIT: usize = 50;

/// 查看上报记录所需的 token，`None` 表示接口关闭
#[derive(Debug, Clone, Default)]
pub struct AdminToken(pub Option<String>);

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub count: usize,
    pub reports: Vec<StoredReport>,
}

pub struct TrackService;

impl TrackService {
    /// POST /api/track
    pub async fn ingest(
        req: HttpRequest,
        registry: web::Data<Arc<LinkRegistry>>,
        sink: web::Data<Arc<dyn ReportSink>>,
        geoip: web::Data<GeoIpProvider>,
        body: web::Json<VisitReport>,
    ) -> impl Responder {
        let mut report = body.into_inner();

        if let Err(e) = registry.lookup(&report.link_id).await {
            debug!("Report rejected for link {:?}: {}", report.link_id, e);
            return error_from_tracelink(&e);
        }

        // 客户端无法读取的字段用请求头补齐
        let server_view = fingerprint::collect(&HeaderProbe::from_headers(req.headers()));
        report.fingerprint.fill_missing_from(&server_view);

        let ip = client_ip(&req, &get_config().ingest.trusted_proxies);
        let ip_geo = match ip.as_deref() {
            Some(ip) => geoip.lookup(ip).await,
            None => None,
        };

        let link_id = report.link_id.clone();
        let event_count = report.events.len();
        let has_geo = report.geo.is_some();
        let stored = StoredReport::now(report).with_origin(ip, ip_geo);
        if stored.vpn_suspected {
            warn!(
                "Possible VPN/relay for link {} from {:?}",
                link_id, stored.client_ip
            );
        }

        match sink.record(stored).await {
            Ok(()) => {
                info!(
                    "Tracked visit for {}: {} events, geo={}",
                    link_id, event_count, has_geo
                );
                success_response(&TrackResponse { status: "tracked" })
            }
            Err(e) => {
                error!("Failed to store report for {}: {}", link_id, e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::ReportStorageError,
                    "Failed to store report",
                )
            }
        }
    }

    /// GET /api/reports?limit=N
    pub async fn list_reports(
        req: HttpRequest,
        token: web::Data<AdminToken>,
        sink: web::Data<Arc<dyn ReportSink>>,
        query: web::Query<ReportsQuery>,
    ) -> impl Responder {
        let Some(expected) = token.0.as_deref().filter(|t| !t.is_empty()) else {
            return error_response(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Not Found");
        };

        if !Self::bearer_matches(&req, expected) {
            warn!("Unauthorized reports request");
            return error_response(
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthorized,
                "Unauthorized",
            );
        }

        let limit = query
            .limit
            .unwrap_or(DEFAULT_REPORTS_LIMIT)
            .clamp(1, MAX_REPORTS_LIMIT);

        match sink.recent(limit).await {
            Ok(reports) => success_response(&ReportsResponse {
                count: reports.len(),
                reports,
            }),
            Err(e) => {
                error!("Failed to read reports: {}", e);
                error_from_tracelink(&e)
            }
        }
    }

    fn bearer_matches(req: &HttpRequest, expected: &str) -> bool {
        let Some(provided) = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };

        provided.trim().as_bytes().ct_eq(expected.as_bytes()).into()
    }
}
