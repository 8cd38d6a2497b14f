//! Report layer: retrieving the lightning report and turning its table
//! into [`crate::domain::EventRecord`]s.

pub mod fetcher;
pub mod parser;

pub use fetcher::{HttpReportFetcher, ReportSource};
pub use parser::{RowKind, parse_report};
