//! Segmentation text report → CSV cluster table
//!
//! # Report layout
//! ```text
//! <header_lines preamble lines>
//! #Volume  CM RL  CM AP  ...        column header
//! #------  -----  -----  ...        separator
//!      42   10.0  -20.5  ...        one row per cluster
//! #------  -----  -----  ...        separator
//! #    47                           summary footer (total voxels)
//! ```
//! A report whose first line is [`NO_CLUSTERS_SENTINEL`] has no table at all.
//! Blank lines after the preamble are ignored. Fields are separated by runs
//! of two or more spaces (single spaces occur inside column names such as
//! `CM RL`) or by tabs.

use crate::output;
use pvs_common::Result;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// First line of a report for a mask without any clusters
pub const NO_CLUSTERS_SENTINEL: &str = "#** NO CLUSTERS FOUND ***";

/// Report parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterReportError {
    /// Report file has no content
    #[error("Cluster report is empty")]
    Empty,

    /// Fewer lines than header + separators + footer
    #[error("Cluster report too short: {found} table lines after preamble, need at least 4")]
    TooShort { found: usize },

    /// Header line yielded no column names
    #[error("Cluster report header has no columns")]
    NoColumns,

    /// Row field count differs from the header
    #[error("Cluster row {row} has {found} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl From<ClusterReportError> for pvs_common::Error {
    fn from(err: ClusterReportError) -> Self {
        pvs_common::Error::InvalidInput(err.to_string())
    }
}

/// Parsed cluster table
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterReport {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// From the summary footer; `None` if the footer has no integer there
    pub total_voxels: Option<u64>,
}

/// Parse result: either no clusters or a table
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReport {
    NoClusters,
    Clusters(ClusterReport),
}

/// Split a report line into trimmed fields
pub fn split_fields(line: &str) -> Vec<String> {
    line.split('\t')
        .flat_map(|segment| segment.split("  "))
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the text report
pub fn parse_cluster_report(
    text: &str,
    header_lines: usize,
) -> std::result::Result<ParsedReport, ClusterReportError> {
    let Some(first_line) = text.lines().next() else {
        return Err(ClusterReportError::Empty);
    };
    if first_line.trim_end() == NO_CLUSTERS_SENTINEL {
        return Ok(ParsedReport::NoClusters);
    }

    let table: Vec<&str> = text
        .lines()
        .skip(header_lines)
        .filter(|line| !line.trim().is_empty())
        .collect();
    if table.len() < 4 {
        return Err(ClusterReportError::TooShort { found: table.len() });
    }

    let columns = split_fields(table[0]);
    if columns.is_empty() {
        return Err(ClusterReportError::NoColumns);
    }

    let footer = split_fields(table[table.len() - 1]);
    let total_field = match footer.first().map(String::as_str) {
        Some("#") => footer.get(1),
        _ => footer.first(),
    };
    let total_voxels = total_field.and_then(|field| field.parse().ok());

    let mut rows = Vec::with_capacity(table.len() - 4);
    for (index, line) in table[2..table.len() - 2].iter().enumerate() {
        let fields = split_fields(line);
        if fields.len() != columns.len() {
            return Err(ClusterReportError::RaggedRow {
                row: index,
                expected: columns.len(),
                found: fields.len(),
            });
        }
        rows.push(fields);
    }

    Ok(ParsedReport::Clusters(ClusterReport {
        columns,
        rows,
        total_voxels,
    }))
}

/// Write a cluster table as CSV with a leading unnamed index column
pub fn write_cluster_csv(report: &ClusterReport, path: &Path) -> Result<()> {
    let mut headers = Vec::with_capacity(report.columns.len() + 1);
    headers.push(String::new());
    headers.extend(report.columns.iter().cloned());

    let rows = report.rows.iter().enumerate().map(|(index, fields)| {
        let mut row = Vec::with_capacity(fields.len() + 1);
        row.push(index.to_string());
        row.extend(fields.iter().cloned());
        row
    });

    output::write_csv(path, &headers, rows)
}

/// What a conversion produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Written {
        rows: usize,
        total_voxels: Option<u64>,
    },
    /// Sentinel report; no CSV written
    NoClusters,
}

/// Convert one report file into a CSV cluster table
pub fn convert_report_file(input: &Path, output: &Path, header_lines: usize) -> Result<Conversion> {
    let bytes = std::fs::read(input)?;
    let text = String::from_utf8_lossy(&bytes);

    match parse_cluster_report(&text, header_lines)? {
        ParsedReport::NoClusters => {
            info!(report = %input.display(), "No clusters found");
            Ok(Conversion::NoClusters)
        }
        ParsedReport::Clusters(report) => {
            write_cluster_csv(&report, output)?;
            match report.total_voxels {
                Some(total) => info!(
                    report = %input.display(),
                    clusters = report.rows.len(),
                    "Total PVS voxels: {}",
                    total
                ),
                None => debug!(report = %input.display(), "Footer has no voxel total"),
            }
            Ok(Conversion::Written {
                rows: report.rows.len(),
                total_voxels: report.total_voxels,
            })
        }
    }
}
