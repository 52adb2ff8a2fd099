//! Cluster report generation
//!
//! For every subject whose PVS mask exists, runs the segmentation tool to
//! produce the text report (skipped when the report is already there) and
//! converts it into the CSV cluster table.

use crate::clusters::text_report::{convert_report_file, Conversion};
use crate::layout::{Hemisphere, SubjectLayout};
use crate::output;
use crate::tools::ExternalSegmentationTool;
use pvs_common::Result;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Subject directories directly under the project root, sorted
///
/// Hidden directories and the configured output directory name `summary`
/// are not subjects.
pub fn subject_codes(project_root: &Path) -> Result<Vec<String>> {
    let mut codes = Vec::new();
    for entry in WalkDir::new(project_root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| pvs_common::Error::Io(e.into()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || name == "summary" {
            continue;
        }
        codes.push(name.into_owned());
    }
    Ok(codes)
}

/// Tally of one `segment` / `convert --all` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentSummary {
    pub reports_generated: usize,
    pub reports_present: usize,
    pub tables_written: usize,
    pub tables_present: usize,
    pub no_clusters: usize,
    pub failures: usize,
}

/// Runs segmentation and conversion across subjects
pub struct ClusterReportGenerator<'a> {
    project_root: &'a Path,
    tool: Option<&'a dyn ExternalSegmentationTool>,
    header_lines: usize,
    force: bool,
}

impl<'a> ClusterReportGenerator<'a> {
    /// Generator that also runs the segmentation tool for missing reports
    pub fn new(
        project_root: &'a Path,
        tool: &'a dyn ExternalSegmentationTool,
        header_lines: usize,
    ) -> Self {
        Self {
            project_root,
            tool: Some(tool),
            header_lines,
            force: false,
        }
    }

    /// Generator that only converts reports already on disk
    pub fn convert_only(project_root: &'a Path, header_lines: usize) -> Self {
        Self {
            project_root,
            tool: None,
            header_lines,
            force: false,
        }
    }

    /// Reconvert tables that already exist
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Process every subject under the project root
    pub fn run_all(&self) -> Result<SegmentSummary> {
        let mut summary = SegmentSummary::default();
        for code in subject_codes(self.project_root)? {
            self.run_subject(&code, &mut summary);
        }
        info!(
            generated = summary.reports_generated,
            tables = summary.tables_written,
            no_clusters = summary.no_clusters,
            failures = summary.failures,
            "Cluster tables updated"
        );
        Ok(summary)
    }

    /// Process both hemispheres of one subject
    pub fn run_subject(&self, code: &str, summary: &mut SegmentSummary) {
        let layout = SubjectLayout::new(self.project_root, code);
        for hemisphere in Hemisphere::ALL {
            if self.ensure_report(&layout, hemisphere, summary) {
                self.convert(&layout, hemisphere, summary);
            }
        }
    }

    /// True when a report is available for conversion
    fn ensure_report(
        &self,
        layout: &SubjectLayout,
        hemisphere: Hemisphere,
        summary: &mut SegmentSummary,
    ) -> bool {
        let report = layout.cluster_report(hemisphere);
        if report.is_file() {
            summary.reports_present += 1;
            return true;
        }
        let Some(tool) = self.tool else {
            return false;
        };

        let mask = layout.pvs_mask(hemisphere);
        if !mask.is_file() {
            debug!(mask = %mask.display(), "No PVS mask, nothing to segment");
            return false;
        }

        let text = match tool.clusterize(&mask) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    subject = %layout.root().display(),
                    hemisphere = %hemisphere,
                    "Segmentation failed: {}",
                    e
                );
                summary.failures += 1;
                return false;
            }
        };

        if let Err(e) = output::write_atomically(&report, text.as_bytes()) {
            warn!("Cannot write {}: {}", report.display(), e);
            summary.failures += 1;
            return false;
        }
        summary.reports_generated += 1;
        true
    }

    fn convert(&self, layout: &SubjectLayout, hemisphere: Hemisphere, summary: &mut SegmentSummary) {
        let table = layout.cluster_table(hemisphere);
        if table.is_file() && !self.force {
            summary.tables_present += 1;
            return;
        }

        let report = layout.cluster_report(hemisphere);
        match convert_report_file(&report, &table, self.header_lines) {
            Ok(Conversion::Written { .. }) => summary.tables_written += 1,
            Ok(Conversion::NoClusters) => summary.no_clusters += 1,
            Err(e) => {
                warn!(report = %report.display(), "Conversion failed: {}", e);
                summary.failures += 1;
            }
        }
    }
}
