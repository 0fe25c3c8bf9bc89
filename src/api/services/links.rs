//! 追踪链接签发与查询

use actix_web::{Responder, web};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, trace};

use crate::errors::TracelinkError;
use crate::registry::LinkRegistry;

use super::helpers::{error_from_tracelink, success_response};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLinkRequest {
    #[serde(alias = "destinationUrl", alias = "url")]
    pub decoy_url: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateLinkResponse {
    pub id: String,
    pub link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInfoResponse {
    pub id: String,
    pub decoy_url: String,
    pub created_at: String,
    pub link: String,
}

pub struct LinkService;

impl LinkService {
    /// POST /api/generate
    pub async fn generate(
        registry: web::Data<Arc<LinkRegistry>>,
        body: web::Json<GenerateLinkRequest>,
    ) -> impl Responder {
        let request = body.into_inner();
        trace!("Generate link request for {:?}", request.decoy_url);

        match registry.issue(&request.decoy_url).await {
            Ok(link) => {
                info!("Generated tracking link {}", link.id);
                success_response(&GenerateLinkResponse {
                    link: registry.link_url(&link.id),
                    id: link.id,
                })
            }
            Err(e) => {
                if matches!(e, TracelinkError::Storage(_)) {
                    error!("Failed to issue link: {}", e);
                }
                error_from_tracelink(&e)
            }
        }
    }

    /// GET /api/link/{id}
    pub async fn get_link(
        registry: web::Data<Arc<LinkRegistry>>,
        path: web::Path<String>,
    ) -> impl Responder {
        let id = path.into_inner();

        match registry.lookup(&id).await {
            Ok(link) => success_response(&LinkInfoResponse {
                link: registry.link_url(&link.id),
                id: link.id,
                decoy_url: link.destination_url,
                created_at: link.created_at.to_rfc3339(),
            }),
            Err(e) => error_from_tracelink(&e),
        }
    }
}
