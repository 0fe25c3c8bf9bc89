//! 设备指纹采集
//!
//! 访问开始时同步读取一次环境属性；缺失的字段记为空字符串或 `None`，
//! 不会让整体采集失败。

use actix_web::http::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// 访问设备的环境快照，采集后不可变
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub language: String,
    /// 形如 `1920x1080`
    #[serde(default, alias = "screen")]
    pub screen_resolution: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default, alias = "touchSupport")]
    pub touch_capable: bool,
    /// `None` 表示客户端没有表态
    #[serde(default, alias = "dnt", deserialize_with = "deserialize_dnt")]
    pub do_not_track: Option<bool>,
}

impl Fingerprint {
    /// 用另一份指纹补齐本指纹中的空字段
    pub fn fill_missing_from(&mut self, other: &Fingerprint) {
        fill(&mut self.user_agent, &other.user_agent);
        fill(&mut self.platform, &other.platform);
        fill(&mut self.language, &other.language);
        fill(&mut self.screen_resolution, &other.screen_resolution);
        fill(&mut self.timezone, &other.timezone);
        if self.do_not_track.is_none() {
            self.do_not_track = other.do_not_track;
        }
    }
}

fn fill(target: &mut String, source: &str) {
    if target.is_empty() && !source.is_empty() {
        *target = source.to_string();
    }
}

/// 宿主环境提供的属性读取接口
///
/// 每个方法返回 `None` 表示该属性在当前宿主中不可用
pub trait EnvironmentProbe: Send + Sync {
    fn user_agent(&self) -> Option<String>;
    fn platform(&self) -> Option<String>;
    fn language(&self) -> Option<String>;
    /// (宽, 高)
    fn screen_size(&self) -> Option<(u32, u32)>;
    fn timezone(&self) -> Option<String>;
    fn max_touch_points(&self) -> Option<u32>;
    /// 原始 DNT 值，如 "1" / "0" / "unspecified"
    fn do_not_track(&self) -> Option<String>;
}

/// 同步采集一次指纹
pub fn collect(probe: &dyn EnvironmentProbe) -> Fingerprint {
    Fingerprint {
        user_agent: probe.user_agent().unwrap_or_default(),
        platform: probe.platform().unwrap_or_default(),
        language: probe.language().unwrap_or_default(),
        screen_resolution: probe
            .screen_size()
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_default(),
        timezone: probe.timezone().unwrap_or_default(),
        touch_capable: probe.max_touch_points().is_some_and(|n| n > 0),
        do_not_track: probe.do_not_track().as_deref().and_then(parse_dnt),
    }
}

fn parse_dnt(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" => Some(true),
        "0" | "no" | "false" => Some(false),
        _ => None,
    }
}

/// 浏览器上报的 DNT 可能是布尔值，也可能是 "1" / "0" / null
fn deserialize_dnt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDnt {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<RawDnt>::deserialize(deserializer)? {
        Some(RawDnt::Bool(b)) => Some(b),
        Some(RawDnt::Text(s)) => parse_dnt(&s),
        None => None,
    })
}

/// 显式给定属性的探针
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub language: Option<String>,
    pub screen_size: Option<(u32, u32)>,
    pub timezone: Option<String>,
    pub max_touch_points: Option<u32>,
    pub do_not_track: Option<String>,
}

impl EnvironmentProbe for StaticProbe {
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn platform(&self) -> Option<String> {
        self.platform.clone()
    }

    fn language(&self) -> Option<String> {
        self.language.clone()
    }

    fn screen_size(&self) -> Option<(u32, u32)> {
        self.screen_size
    }

    fn timezone(&self) -> Option<String> {
        self.timezone.clone()
    }

    fn max_touch_points(&self) -> Option<u32> {
        self.max_touch_points
    }

    fn do_not_track(&self) -> Option<String> {
        self.do_not_track.clone()
    }
}

/// 从 HTTP 请求头推导服务端可见的属性
///
/// 屏幕、时区和触屏信息在请求头中不可见，始终为 `None`
#[derive(Debug, Clone, Default)]
pub struct HeaderProbe {
    user_agent: Option<String>,
    platform: Option<String>,
    language: Option<String>,
    do_not_track: Option<String>,
}

impl HeaderProbe {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            user_agent: get("user-agent"),
            // Client Hints 的值带引号："Windows"
            platform: get("sec-ch-ua-platform").map(|p| p.trim_matches('"').to_string()),
            // 只取首选语言：zh-CN,zh;q=0.9 → zh-CN
            language: get("accept-language").and_then(|l| {
                l.split(',')
                    .next()
                    .and_then(|first| first.split(';').next())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            }),
            do_not_track: get("dnt"),
        }
    }
}

impl EnvironmentProbe for HeaderProbe {
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn platform(&self) -> Option<String> {
        self.platform.clone()
    }

    fn language(&self) -> Option<String> {
        self.language.clone()
    }

    fn screen_size(&self) -> Option<(u32, u32)> {
        None
    }

    fn timezone(&self) -> Option<String> {
        None
    }

    fn max_touch_points(&self) -> Option<u32> {
        None
    }

    fn do_not_track(&self) -> Option<String> {
        self.do_not_track.clone()
    }
}
