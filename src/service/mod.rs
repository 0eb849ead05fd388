//! Service layer
//!
//! Business logic of an archive run, independent of HTTP.

pub mod archive;
pub mod report_date;

pub use archive::{ArchiveService, ArchiveStage, PublishedReport};
pub use report_date::{
    CANONICAL_DATE_FORMAT, Clock, FixedClock, ReportDate, SystemClock, resolve_report_date,
};
