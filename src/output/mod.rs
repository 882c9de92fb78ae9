//! Output module for discovery results
//!
//! This module handles:
//! - Building per-organization reports from finished sessions
//! - Writing markdown roster reports
//! - Writing and loading JSON session snapshots
//! - Printing run statistics

mod json;
mod markdown;
pub mod stats;
mod traits;

pub use json::{load_snapshots, write_snapshots, JsonSnapshotHandler, SnapshotFile};
pub use markdown::{format_markdown_report, write_markdown_report, MarkdownOutputHandler};
pub use stats::{print_statistics, RunStatistics};
pub use traits::{DiscoveryReport, OutputError, OutputHandler, OutputResult};
