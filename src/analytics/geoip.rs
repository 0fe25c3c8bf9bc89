//! 按客户端 IP 查询地理信息
//!
//! 与访问页上报的浏览器定位不同，这里的数据来自服务端看到的连接地址，
//! 用于交叉比对以及识别 VPN、中继和机房出口。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use ureq::Agent;

use crate::config::GeoIpConfig;
use crate::utils::ip::{is_private_or_local, parse_ip};

/// ISP/组织名中出现这些词时视为疑似 VPN 或中继出口
const VPN_KEYWORDS: [&str; 4] = ["cloud", "relay", "apple", "hosting"];

/// IP 地理信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// 自治系统，如 "AS13335 Cloudflare, Inc."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub hosting: bool,
}

impl GeoInfo {
    /// 疑似经由 VPN、代理、中继或机房出口访问
    pub fn vpn_suspected(&self) -> bool {
        if self.proxy || self.hosting {
            return true;
        }
        [&self.isp, &self.org, &self.asn]
            .into_iter()
            .flatten()
            .map(|name| name.to_ascii_lowercase())
            .any(|name| VPN_KEYWORDS.iter().any(|kw| name.contains(kw)))
    }
}

/// GeoIP 查询 trait
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Option<GeoInfo>;

    /// provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 解析 ip-api.com 风格的响应，失败状态返回 `None`
pub fn parse_geo_response(json: &serde_json::Value) -> Option<GeoInfo> {
    if json["status"].as_str() == Some("fail") {
        trace!("GeoIP API returned fail status: {:?}", json["message"].as_str());
        return None;
    }

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| json[*key].as_str())
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    Some(GeoInfo {
        country: text(&["country", "country_name"]),
        country_code: text(&["countryCode", "country_code"]),
        region: text(&["regionName", "region"]),
        city: text(&["city"]),
        lat: json["lat"].as_f64().or_else(|| json["latitude"].as_f64()),
        lon: json["lon"].as_f64().or_else(|| json["longitude"].as_f64()),
        timezone: text(&["timezone"]),
        isp: text(&["isp"]),
        org: text(&["org"]),
        asn: text(&["as", "asn"]),
        proxy: json["proxy"].as_bool().unwrap_or(false),
        hosting: json["hosting"].as_bool().unwrap_or(false),
    })
}

/// 外部 HTTP API 查询，`{ip}` 为占位符
pub struct ExternalApiLookup {
    api_url_template: String,
    agent: Agent,
}

impl ExternalApiLookup {
    pub fn new(api_url_template: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            api_url_template: api_url_template.to_string(),
            agent,
        }
    }

    fn fetch_sync(agent: Agent, url: String) -> Option<GeoInfo> {
        let resp = match agent.get(&url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                return None;
            }
        };

        match resp.into_body().read_json::<serde_json::Value>() {
            Ok(json) => parse_geo_response(&json),
            Err(e) => {
                warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl GeoIpLookup for ExternalApiLookup {
    async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        let url = self.api_url_template.replace("{ip}", ip);
        let agent = self.agent.clone();

        tokio::task::spawn_blocking(move || Self::fetch_sync(agent, url))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP lookup task failed: {}", e);
                None
            })
    }

    fn name(&self) -> &'static str {
        "external-api"
    }
}

/// 上报接收端使用的 GeoIP 入口，可以关闭
#[derive(Clone, Default)]
pub struct GeoIpProvider {
    inner: Option<Arc<dyn GeoIpLookup>>,
}

impl GeoIpProvider {
    pub fn new(config: &GeoIpConfig) -> Self {
        if !config.enabled || config.api_url.trim().is_empty() {
            info!("GeoIP enrichment disabled");
            return Self::disabled();
        }
        let lookup = ExternalApiLookup::new(
            config.api_url.trim(),
            Duration::from_millis(config.timeout_ms),
        );
        info!("GeoIP enrichment using {} provider", lookup.name());
        Self::with_lookup(Arc::new(lookup))
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn with_lookup(lookup: Arc<dyn GeoIpLookup>) -> Self {
        Self {
            inner: Some(lookup),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// 查询公网地址；私有地址、无法解析的地址和关闭状态都返回 `None`
    pub async fn lookup(&self, ip: &str) -> Option<GeoInfo> {
        let lookup = self.inner.as_ref()?;
        let addr = parse_ip(ip)?;
        if is_private_or_local(&addr) {
            debug!("Skipping GeoIP lookup for private address {}", addr);
            return None;
        }
        lookup.lookup(&addr.to_string()).await
    }
}
