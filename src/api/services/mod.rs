pub mod error_code;
pub mod health;
pub mod helpers;
pub mod links;
pub mod redirect;
pub mod track;

use actix_web::web;

pub use error_code::ErrorCode;
pub use health::{AppStartTime, HealthService, health_routes};
pub use links::LinkService;
pub use redirect::{RedirectService, redirect_routes};
pub use track::{AdminToken, TrackService};

/// `/api` 路由配置
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .route("/generate", web::post().to(LinkService::generate))
        .route("/link/{id}", web::get().to(LinkService::get_link))
        .route("/track", web::post().to(TrackService::ingest))
        .route("/reports", web::get().to(TrackService::list_reports))
}
