use std::fmt;

#[derive(Debug, Clone)]
pub enum TracelinkError {
    InvalidDestination(String),
    UnknownLink(String),
    ReportTransmission(String),
    Storage(String),
    Serialization(String),
    Config(String),
}

impl TracelinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            TracelinkError::InvalidDestination(_) => "E001",
            TracelinkError::UnknownLink(_) => "E002",
            TracelinkError::ReportTransmission(_) => "E003",
            TracelinkError::Storage(_) => "E004",
            TracelinkError::Serialization(_) => "E005",
            TracelinkError::Config(_) => "E006",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            TracelinkError::InvalidDestination(_) => "Invalid Destination",
            TracelinkError::UnknownLink(_) => "Unknown Link",
            TracelinkError::ReportTransmission(_) => "Report Transmission Failed",
            TracelinkError::Storage(_) => "Storage Error",
            TracelinkError::Serialization(_) => "Serialization Error",
            TracelinkError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            TracelinkError::InvalidDestination(msg) => msg,
            TracelinkError::UnknownLink(msg) => msg,
            TracelinkError::ReportTransmission(msg) => msg,
            TracelinkError::Storage(msg) => msg,
            TracelinkError::Serialization(msg) => msg,
            TracelinkError::Config(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for TracelinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for TracelinkError {}

// 便捷的构造函数
impl TracelinkError {
    pub fn invalid_destination<T: Into<String>>(msg: T) -> Self {
        TracelinkError::InvalidDestination(msg.into())
    }

    pub fn unknown_link<T: Into<String>>(msg: T) -> Self {
        TracelinkError::UnknownLink(msg.into())
    }

    pub fn report_transmission<T: Into<String>>(msg: T) -> Self {
        TracelinkError::ReportTransmission(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        TracelinkError::Storage(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        TracelinkError::Serialization(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        TracelinkError::Config(msg.into())
    }
}

impl From<std::io::Error> for TracelinkError {
    fn from(err: std::io::Error) -> Self {
        TracelinkError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TracelinkError {
    fn from(err: serde_json::Error) -> Self {
        TracelinkError::Serialization(err.to_string())
    }
}

impl From<crate::utils::url_validator::UrlValidationError> for TracelinkError {
    fn from(err: crate::utils::url_validator::UrlValidationError) -> Self {
        TracelinkError::InvalidDestination(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TracelinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            TracelinkError::invalid_destination("a"),
            TracelinkError::unknown_link("b"),
            TracelinkError::report_transmission("c"),
            TracelinkError::storage("d"),
            TracelinkError::serialization("e"),
            TracelinkError::config("f"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_format_simple() {
        let err = TracelinkError::unknown_link("link 'abc' not found");
        assert_eq!(err.to_string(), "Unknown Link: link 'abc' not found");
        assert_eq!(err.message(), "link 'abc' not found");
    }

    #[test]
    fn test_url_validation_error_maps_to_invalid_destination() {
        let err: TracelinkError = crate::utils::url_validator::validate_url("ftp://x")
            .unwrap_err()
            .into();
        assert!(matches!(err, TracelinkError::InvalidDestination(_)));
    }
}
