//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Archive Metrics
    pub static ref ARCHIVE_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("action_archive_runs_total", "Total number of archive runs by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref ARCHIVE_ACTIONS_PUBLISHED: IntCounter = IntCounter::new(
        "action_archive_actions_published_total",
        "Total number of actions written to published reports"
    ).expect("metric can be created");
    pub static ref ARCHIVE_BYTES_PUBLISHED: IntCounter = IntCounter::new(
        "action_archive_bytes_published_total",
        "Total bytes of published reports"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("action_archive_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(ARCHIVE_RUNS_TOTAL.clone()))
        .expect("ARCHIVE_RUNS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ARCHIVE_ACTIONS_PUBLISHED.clone()))
        .expect("ARCHIVE_ACTIONS_PUBLISHED can be registered");
    REGISTRY
        .register(Box::new(ARCHIVE_BYTES_PUBLISHED.clone()))
        .expect("ARCHIVE_BYTES_PUBLISHED can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
