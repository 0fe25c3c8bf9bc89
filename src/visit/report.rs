use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::events::InteractionEvent;
use super::fingerprint::Fingerprint;
use super::geolocation::GeoSample;

/// 一次访问的上报数据，组装后不再修改
///
/// 兼容旧客户端的字段名：`id` → `linkId`，`duration` → `visitDurationMs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitReport {
    #[serde(alias = "id")]
    pub link_id: String,
    #[serde(default)]
    pub fingerprint: Fingerprint,
    #[serde(default)]
    pub geo: Option<GeoSample>,
    #[serde(default)]
    pub events: Vec<InteractionEvent>,
    #[serde(default, alias = "duration")]
    pub visit_duration_ms: u64,
}

impl VisitReport {
    pub fn assemble(
        link_id: impl Into<String>,
        fingerprint: Fingerprint,
        geo: Option<GeoSample>,
        events: Vec<InteractionEvent>,
        elapsed: Duration,
    ) -> Self {
        Self {
            link_id: link_id.into(),
            fingerprint,
            geo,
            events,
            visit_duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
