//! Tracelink - tracking links with a dwell-then-redirect visit page
//!
//! A link is an opaque id mapped to a destination URL. Opening it runs a visit:
//! an environment fingerprint is collected, interaction events are buffered,
//! a best-effort geolocation is requested, a single report is dispatched and
//! the visitor is redirected after a fixed dwell interval.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: Command-line interface
//!
//! # Architecture
//! - `registry`: Link issuance and resolution with pluggable stores
//! - `visit`: Per-visit telemetry capture, reporting and redirect scheduling
//! - `analytics`: Report ingestion sinks
//! - `api`: HTTP services
//! - `interfaces`: CLI commands
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod analytics;
pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod registry;
pub mod runtime;
pub mod system;
pub mod utils;
pub mod visit;
