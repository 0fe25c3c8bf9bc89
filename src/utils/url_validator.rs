//! 目标 URL 验证
//!
//! 只接受带主机名的绝对 http(s) URL，脚本类协议直接拒绝

use url::Url;

/// URL 验证错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    DangerousScheme(String),
    UnsupportedScheme(String),
    MissingHost,
    Malformed(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "destination URL cannot be empty"),
            Self::DangerousScheme(scheme) => {
                write!(f, "destination scheme '{}' is not allowed", scheme)
            }
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "unsupported scheme '{}': only http and https destinations are accepted",
                scheme
            ),
            Self::MissingHost => write!(f, "destination URL has no host"),
            Self::Malformed(msg) => write!(f, "malformed destination URL: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 可执行脚本或读取本地资源的协议
const DANGEROUS_SCHEMES: &[&str] = &["javascript", "data", "file", "vbscript", "about", "blob"];

/// 验证目标 URL，成功时返回解析后的 `Url`
///
/// 相对路径、缺少主机名、非 http(s) 协议均视为无效
pub fn validate_url(raw: &str) -> Result<Url, UrlValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let parsed = Url::parse(raw).map_err(|e| UrlValidationError::Malformed(e.to_string()))?;

    // Url::parse 已经把 scheme 转为小写
    let scheme = parsed.scheme();
    if DANGEROUS_SCHEMES.contains(&scheme) {
        return Err(UrlValidationError::DangerousScheme(scheme.to_string()));
    }
    if scheme != "http" && scheme != "https" {
        return Err(UrlValidationError::UnsupportedScheme(scheme.to_string()));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(UrlValidationError::MissingHost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_absolute_http_urls() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("http://localhost:8080/path?q=1#frag").is_ok());
        assert!(validate_url("  HTTPS://Example.com/  ").is_ok());
    }

    #[test]
    fn test_rejects_script_schemes() {
        assert!(matches!(
            validate_url("javascript:alert(1)"),
            Err(UrlValidationError::DangerousScheme(_))
        ));
        assert!(matches!(
            validate_url("DATA:text/html,<b>x</b>"),
            Err(UrlValidationError::DangerousScheme(_))
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(UrlValidationError::DangerousScheme(_))
        ));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_url("mailto:someone@example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_rejects_relative_and_empty() {
        assert_eq!(validate_url(""), Err(UrlValidationError::EmptyUrl));
        assert_eq!(validate_url("   "), Err(UrlValidationError::EmptyUrl));
        assert!(matches!(
            validate_url("/relative/path"),
            Err(UrlValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate_url("example.com"),
            Err(UrlValidationError::Malformed(_))
        ));
    }
}
