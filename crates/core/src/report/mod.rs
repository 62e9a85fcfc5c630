//! Count report generation.

pub mod service;
pub mod types;

pub use service::{CountReportInput, ReportService};
pub use types::{CountReport, ReportAttestation, ReportLine};
