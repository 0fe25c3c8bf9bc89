use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::errors::TracelinkError;
use crate::registry::LinkRegistry;
use crate::utils::is_valid_link_id;

/// 分享入口：`/t/{id}` 307 到追踪页 `{link_prefix}/track/{id}`
pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        registry: web::Data<Arc<LinkRegistry>>,
        path: web::Path<String>,
    ) -> impl Responder {
        let id = path.into_inner();

        // 非法 ID 直接 404，不访问存储
        if !is_valid_link_id(&id) {
            trace!("Invalid link id rejected: {}", id);
            return Self::not_found_response();
        }

        match registry.lookup(&id).await {
            Ok(link) => HttpResponse::TemporaryRedirect()
                .insert_header(("Location", registry.link_url(&link.id)))
                .insert_header(("Cache-Control", "no-store"))
                .finish(),
            Err(TracelinkError::UnknownLink(_)) => {
                debug!("Redirect link not found: {}", id);
                Self::not_found_response()
            }
            Err(e) => {
                error!("Lookup failed during redirect: {}", e);
                Self::error_response()
            }
        }
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }

    #[inline]
    fn error_response() -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Internal Server Error")
    }
}

pub fn redirect_routes() -> actix_web::Scope {
    web::scope("/t")
        .route("/{id}", web::get().to(RedirectService::handle_redirect))
        .route("/{id}", web::head().to(RedirectService::handle_redirect))
}
