//! Weekly training report built from a full logbook history: fetch every
//! results page, bucket sessions into anchored 7-day windows, write CSV.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use aggregate::{WeekWindow, WeeklyAggregate, WeeklyReport, aggregate};
pub use config::ReportConfig;
pub use error::{ReportError, ReportResult};
pub use pipeline::{ReportOutcome, RunSummary, run, write_reports};
