//! Markdown roster report generation
//!
//! This module renders human-readable markdown reports of discovered
//! rosters, one section per organization.

use crate::output::traits::{DiscoveryReport, OutputHandler, OutputResult};
use crate::state::RosterDiscoverySession;
use chrono::Utc;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes a markdown report for the given sessions
///
/// # Arguments
///
/// * `reports` - One report per organization, in the order to render them
/// * `config_hash` - Hash of the configuration the run used, if known
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_report(
    reports: &[DiscoveryReport],
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(reports, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats roster reports as markdown
pub fn format_markdown_report(reports: &[DiscoveryReport], config_hash: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Roster Discovery Report\n\n");
    md.push_str(&format!("- **Generated**: {}\n", Utc::now().to_rfc3339()));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    let total_members: usize = reports.iter().map(|r| r.members.len()).sum();
    md.push_str(&format!("- **Organizations**: {}\n", reports.len()));
    md.push_str(&format!("- **Total Members**: {}\n\n", total_members));

    for report in reports {
        format_organization(&mut md, report);
    }

    md
}

fn format_organization(md: &mut String, report: &DiscoveryReport) {
    md.push_str(&format!(
        "## {} (party {})\n\n",
        escape(&report.party_name),
        report.party_id
    ));

    md.push_str(&format!("- **Status**: {}\n", report.status()));
    if report.is_partial() {
        md.push_str("- **Coverage**: partial\n");
    }
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    md.push_str(&format!("- **Pages Processed**: {}\n", report.steps_taken));
    md.push_str(&format!("- **Visited URLs**: {}\n", report.visited_count));
    md.push_str(&format!("- **Pending URLs**: {}\n", report.pending_count));
    md.push_str(&format!(
        "- **Duplicates Dropped**: {}\n",
        report.duplicates_dropped
    ));
    if let Some(error) = &report.error {
        md.push_str(&format!("- **Error**: {}\n", escape(error)));
    }
    md.push('\n');

    if report.members.is_empty() {
        md.push_str("No members found.\n\n");
        return;
    }

    md.push_str("| Name | Position | District | Prefecture | Party Position | Profile |\n");
    md.push_str("|------|----------|----------|------------|----------------|---------|\n");

    for member in &report.members {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            escape(member.name()),
            cell(&member.position),
            cell(&member.electoral_district),
            cell(&member.prefecture),
            cell(&member.party_position),
            cell(&member.profile_url),
        ));
    }
    md.push('\n');
}

fn cell(value: &Option<String>) -> String {
    value.as_deref().map(escape).unwrap_or_default()
}

/// Keeps table cells intact
fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Buffers finished sessions and writes one markdown report on finalize
pub struct MarkdownOutputHandler {
    path: PathBuf,
    config_hash: Option<String>,
    reports: Vec<DiscoveryReport>,
}

impl MarkdownOutputHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config_hash: None,
            reports: Vec::new(),
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }
}

impl OutputHandler for MarkdownOutputHandler {
    fn record_session(&mut self, session: &RosterDiscoverySession) -> OutputResult<()> {
        self.reports.push(DiscoveryReport::from_session(session));
        Ok(())
    }

    fn finalize(&mut self) -> OutputResult<()> {
        self.reports.sort_by_key(|r| r.party_id);
        write_markdown_report(&self.reports, self.config_hash.as_deref(), &self.path)?;
        tracing::info!(path = %self.path.display(), organizations = self.reports.len(), "Wrote roster report");
        Ok(())
    }
}
