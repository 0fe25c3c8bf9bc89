//! 访问追踪引擎
//!
//! - `fingerprint`: 访问开始时的环境快照
//! - `events`: 有界交互事件缓冲区与具名事件源
//! - `geolocation`: 带超时的定位解析
//! - `report` / `reporter`: 报告组装与发后即忘的上报
//! - `redirect`: 可取消的一次性跳转定时器
//! - `session`: 单次访问的编排与状态机
//!
//! 宿主通过 `EnvironmentProbe`、`GeolocationSource`、`Navigator` 三个 trait 接入。

pub mod events;
pub mod fingerprint;
pub mod geolocation;
pub mod redirect;
pub mod report;
pub mod reporter;
pub mod session;

pub use events::{
    EventBuffer, EventCapture, EventKind, EventSource, EventSources, InteractionEvent,
    VisibilityState,
};
pub use fingerprint::{EnvironmentProbe, Fingerprint, HeaderProbe, StaticProbe};
pub use geolocation::{
    GeoSample, GeolocationFailure, GeolocationResolver, GeolocationSource, NoGeolocation,
};
pub use redirect::{ChannelNavigator, Navigator, RedirectScheduler, ScheduledRedirect};
pub use report::VisitReport;
pub use reporter::{HttpReportTransport, NullTransport, ReportTransport, ReportingPipeline};
pub use session::{VisitHost, VisitSession, VisitSettings, VisitState};
