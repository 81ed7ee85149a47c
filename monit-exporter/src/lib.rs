//! Prometheus metrics exporter for the monit process supervisor.
//!
//! This crate polls a monit daemon's XML status page and republishes
//! the service checks as Prometheus gauges on an HTTP `/metrics`
//! endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Monit daemon  │<────│    Exporter     │<────│   HTTP Server   │
//! │ (_status  XML)  │     │ (fetch/decode)  │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Scraping is pull-triggered: each request to `/metrics` runs one
//! fetch→decode→map→publish cycle under an exclusive lock. A failed
//! cycle exposes `monit_up 0` with every per-service series cleared,
//! so stale samples are never served.
//!
//! # Usage
//!
//! Run the exporter binary, optionally with a configuration file:
//!
//! ```bash
//! monit-exporter --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod decoder;
pub mod exporter;
pub mod fetcher;
pub mod http;
pub mod mapping;

pub use config::ExporterConfig;
pub use decoder::{DecodeError, ServiceRecord, decode};
pub use exporter::{Exporter, ScrapeError, SharedExporter};
pub use fetcher::{FetchError, StatusFetcher};
pub use http::HttpServer;
pub use mapping::{Sample, map_records, service_type_name};
