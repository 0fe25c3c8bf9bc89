//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::TracelinkError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 3000-3099: 链接错误
/// - 4000-4099: 上报错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    PayloadTooLarge = 1011,

    // 链接错误 3000-3099
    LinkNotFound = 3000,
    LinkInvalidUrl = 3002,
    LinkStorageError = 3005,

    // 上报错误 4000-4099
    ReportStorageError = 4000,
}

impl From<&TracelinkError> for ErrorCode {
    fn from(err: &TracelinkError) -> Self {
        match err {
            TracelinkError::InvalidDestination(_) => ErrorCode::LinkInvalidUrl,
            TracelinkError::UnknownLink(_) => ErrorCode::LinkNotFound,
            TracelinkError::Storage(_) => ErrorCode::LinkStorageError,
            TracelinkError::Serialization(_) => ErrorCode::BadRequest,
            TracelinkError::ReportTransmission(_) | TracelinkError::Config(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::LinkNotFound).unwrap(), "3000");
        let parsed: ErrorCode = serde_json::from_str("1001").unwrap();
        assert_eq!(parsed, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_maps_domain_errors() {
        assert_eq!(
            ErrorCode::from(&TracelinkError::invalid_destination("x")),
            ErrorCode::LinkInvalidUrl
        );
        assert_eq!(
            ErrorCode::from(&TracelinkError::unknown_link("x")),
            ErrorCode::LinkNotFound
        );
    }
}
