//! 上报数据接收端
//!
//! `/api/track` 收到的报告按客户端 IP 补充地理信息后交给 `ReportSink` 保存

pub mod geoip;
pub mod sink;

pub use geoip::{ExternalApiLookup, GeoInfo, GeoIpLookup, GeoIpProvider};
pub use sink::{JsonLinesReportSink, MemoryReportSink, ReportSink, StoredReport, create_sink};
