//! Prometheus exporter for host metrics.
//!
//! A scheduler reads the host on a fixed interval and writes each cycle into
//! a registry; an HTTP server renders the registry on every scrape.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │    Scheduler    │────>│    Registry     │<────│   HTTP Server   │
//! │ (readers, build)│     │ (full-replace)  │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Run the exporter binary with a configuration file:
//!
//! ```bash
//! hostsight-exporter --config hostsight.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod http;
pub mod mapping;
pub mod registry;
pub mod scheduler;

pub use config::ExporterConfig;
pub use http::HttpServer;
pub use registry::{MetricRegistry, SharedRegistry};
pub use scheduler::{Scheduler, SchedulerState, SchedulerStatus};
