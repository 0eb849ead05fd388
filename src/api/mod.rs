//! API layer
//!
//! HTTP handlers for:
//! - Archive upload
//! - Metrics (Prometheus)

mod archive;
pub mod metrics;

pub use archive::archive_router;
pub use metrics::metrics_router;
