//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, error, web};
use serde::Serialize;
use tracing::debug;

use crate::errors::TracelinkError;

use super::error_code::ErrorCode;

/// 错误响应体：`{"code": 3000, "error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub error: String,
}

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(body)
}

/// 构建成功响应
pub fn success_response<T: Serialize>(body: &T) -> HttpResponse {
    json_response(StatusCode::OK, body)
}

/// 构建错误响应
pub fn error_response(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> HttpResponse {
    json_response(
        status,
        &ErrorBody {
            code,
            error: message.into(),
        },
    )
}

/// 领域错误对应的 HTTP 状态码
pub fn http_status(err: &TracelinkError) -> StatusCode {
    match err {
        TracelinkError::InvalidDestination(_) | TracelinkError::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        TracelinkError::UnknownLink(_) => StatusCode::NOT_FOUND,
        TracelinkError::ReportTransmission(_) => StatusCode::BAD_GATEWAY,
        TracelinkError::Storage(_) | TracelinkError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// 从 TracelinkError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_tracelink(err: &TracelinkError) -> HttpResponse {
    error_response(http_status(err), ErrorCode::from(err), err.message())
}

/// JSON 提取器配置：请求体格式错误时返回统一的错误响应
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req: &HttpRequest| {
            debug!("Rejected JSON payload: {}", err);
            let response = match &err {
                error::JsonPayloadError::Overflow { .. }
                | error::JsonPayloadError::OverflowKnownLength { .. } => error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    ErrorCode::PayloadTooLarge,
                    "Payload too large",
                ),
                _ => error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorCode::BadRequest,
                    format!("Invalid request body: {}", err),
                ),
            };
            error::InternalError::from_response(err, response).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            http_status(&TracelinkError::invalid_destination("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            http_status(&TracelinkError::unknown_link("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            http_status(&TracelinkError::storage("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorBody {
            code: ErrorCode::LinkInvalidUrl,
            error: "bad".to_string(),
        })
        .unwrap();
        assert_eq!(body["code"], 3002);
        assert_eq!(body["error"], "bad");
    }
}
