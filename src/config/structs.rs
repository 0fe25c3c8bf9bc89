use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址与端口
/// - logging: 日志配置
/// - registry: 链接存储与分享链接前缀
/// - visit: 访问阶段的时间参数与缓冲区容量
/// - reporting: 上报端点
/// - ingest: 上报数据落盘与查看
/// - geoip: 按客户端 IP 补充地理信息
/// - cors: 跨域配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub visit: VisitConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub geoip: GeoIpConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：TL，分隔符：__
    /// 示例：TL__SERVER__PORT=9999
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TL")
                    .separator("__")
                    .try_parsing(true),
            );

        // 日志系统尚未初始化，这里只能写 stderr
        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// HTTP worker 数量，0 表示由 actix 自动决定
    #[serde(default)]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" 或 "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 链接注册表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// "memory" 或 "file"
    #[serde(default = "default_store_type")]
    pub store: String,
    /// file 存储使用的 JSON Lines 文件
    #[serde(default = "default_store_path")]
    pub path: String,
    /// 分享链接前缀，生成 `{link_prefix}/track/{id}`
    #[serde(default = "default_link_prefix")]
    pub link_prefix: String,
}

/// 访问阶段配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitConfig {
    /// 访问开始到自动跳转的停留时间
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
    /// 定位请求超时
    #[serde(default = "default_geo_timeout_ms")]
    pub geo_timeout_ms: u64,
    /// 交互事件缓冲区容量，满后淘汰最旧事件
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// 上报配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// 上报端点，为空时不发送
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_report_timeout_ms")]
    pub timeout_ms: u64,
}

/// 上报接收端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// 上报落盘文件，为空时只保存在内存中
    #[serde(default = "default_ingest_path")]
    pub path: Option<String>,
    /// 查看上报记录所需的 Bearer token，为空时关闭查看接口
    #[serde(default)]
    pub admin_token: Option<String>,
    /// 请求体大小上限
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// 可信反向代理（IP 或 CIDR），为空时只信任来自私有地址的转发头
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// IP 地理信息查询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    #[serde(default = "default_geoip_enabled")]
    pub enabled: bool,
    /// 外部 API 地址，`{ip}` 为占位符
    #[serde(default = "default_geoip_api_url")]
    pub api_url: String,
    #[serde(default = "default_geoip_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
    /// `["*"]` 表示允许任意来源
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_store_type() -> String {
    "memory".to_string()
}

fn default_store_path() -> String {
    "links.jsonl".to_string()
}

fn default_link_prefix() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_dwell_ms() -> u64 {
    3000
}

fn default_geo_timeout_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    1000
}

fn default_report_timeout_ms() -> u64 {
    5000
}

fn default_ingest_path() -> Option<String> {
    Some("reports.jsonl".to_string())
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024
}

fn default_geoip_enabled() -> bool {
    true
}

fn default_geoip_api_url() -> String {
    "http://ip-api.com/json/{ip}?fields=status,country,countryCode,regionName,city,lat,lon,timezone,isp,org,as,proxy,hosting".to_string()
}

fn default_geoip_timeout_ms() -> u64 {
    2000
}

fn default_cors_enabled() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            workers: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store: default_store_type(),
            path: default_store_path(),
            link_prefix: default_link_prefix(),
        }
    }
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            dwell_ms: default_dwell_ms(),
            geo_timeout_ms: default_geo_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_report_timeout_ms(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            path: default_ingest_path(),
            admin_token: None,
            max_payload_bytes: default_max_payload_bytes(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            enabled: default_geoip_enabled(),
            api_url: default_geoip_api_url(),
            timeout_ms: default_geoip_timeout_ms(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: default_cors_origins(),
            max_age: default_cors_max_age(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_timings() {
        let config = StaticConfig::default();
        assert_eq!(config.visit.dwell_ms, 3000);
        assert_eq!(config.visit.geo_timeout_ms, 1000);
        assert!(config.visit.dwell_ms > config.visit.geo_timeout_ms);
        assert_eq!(config.registry.store, "memory");
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.visit.event_capacity, 1000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str("[visit]\ndwell_ms = 5000\n").unwrap();
        assert_eq!(parsed.visit.dwell_ms, 5000);
        assert_eq!(parsed.visit.geo_timeout_ms, 1000);
        assert_eq!(parsed.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracelink.toml");
        std::fs::write(&path, "[registry]\nlink_prefix = \"https://t.example\"\n").unwrap();
        let config = StaticConfig::load_from(path.to_str().unwrap());
        assert_eq!(config.registry.link_prefix, "https://t.example");
    }
}
