pub mod plots;
pub mod report;

pub use report::{Report, ReportSection};
