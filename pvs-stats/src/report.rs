//! Report Builder
//!
//! Two passes over the subjects, each built fully in memory and written once:
//!
//! **Cohort pass**: every roster record, resolved to a code and enriched with
//! acquisition date, age, white-matter volumes and cluster statistics. Writes
//! the full cohort table and the subset with a left-hemisphere cluster count.
//!
//! **Healthy-volunteer pass**: every key-table code carrying the HV marker,
//! independent of the roster, with the same volume/statistics enrichment.
//!
//! Unavailable values stay blank: a blank cell is "not computed", a zero is a
//! computed zero. Volume caches written along the way are kept even if a
//! later write fails.

use crate::acquisition_date::AcquisitionDateExtractor;
use crate::clusters::{ClusterStatisticsReader, SubjectStatistics};
use crate::identity::IdentityResolver;
use crate::key_conversion::{AmbiguousMatch, RosterResolution};
use crate::key_table::KeyTable;
use crate::layout::Hemisphere;
use crate::output;
use crate::roster::{Roster, RosterRecord};
use crate::tools::ExternalOverlapTool;
use crate::volume::{VolumeAggregator, WhiteMatterVolumes};
use chrono::{DateTime, Utc};
use pvs_common::config::PipelineConfig;
use pvs_common::time::{age_in_years, hyphenate, parse_date_of_birth};
use pvs_common::{Error, Outcome, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INTEGRATED_REPORT: &str = "integrated_pvs_project.csv";
pub const SUBSET_REPORT: &str = "subset_pvs_project.csv";
pub const HV_REPORT: &str = "hv_stats.csv";
pub const RUN_SUMMARY: &str = "run_summary.json";

/// Identity and date columns appended to the roster
pub const COHORT_COLUMNS: [&str; 4] = ["pnum", "dob", "mri_date", "age_at_mri"];

/// Statistic columns, shared by the cohort and HV tables
pub const STATISTIC_COLUMNS: [&str; 8] = [
    "Left WM Volume",
    "Right WM Volume",
    "Left PVS Count",
    "Left PVS Volume",
    "Left PVS Mean Volume",
    "Right PVS Count",
    "Right PVS Volume",
    "Right PVS Mean Volume",
];

/// Column the subset report filters on
pub const SUBSET_COLUMN: &str = "Left PVS Count";

/// Volumes and cluster statistics of one subject
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectEnrichment {
    pub volumes: Outcome<WhiteMatterVolumes>,
    pub statistics: SubjectStatistics,
}

impl SubjectEnrichment {
    /// Cells in [`STATISTIC_COLUMNS`] order
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(STATISTIC_COLUMNS.len());
        for hemisphere in Hemisphere::ALL {
            let volume = match &self.volumes {
                Outcome::Found(volumes) => volumes.get(hemisphere).as_ref().found().copied(),
                _ => None,
            };
            cells.push(optional_cell(volume));
        }
        for hemisphere in Hemisphere::ALL {
            match self.statistics.computed() {
                Some(stats) => {
                    let stat = stats.get(hemisphere);
                    cells.push(stat.count.to_string());
                    cells.push(stat.total_volume.to_string());
                    cells.push(stat.mean_volume.to_string());
                }
                None => cells.extend(std::iter::repeat(String::new()).take(3)),
            }
        }
        cells
    }

    /// Hemisphere volumes that could not be computed (tool failure or bad cache)
    fn volume_failures(&self) -> usize {
        match &self.volumes {
            Outcome::Found(volumes) => Hemisphere::ALL
                .iter()
                .filter(|&&h| matches!(volumes.get(h), Outcome::Malformed(_)))
                .count(),
            _ => 0,
        }
    }
}

fn optional_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// In-memory report table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell by row index and column name
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    /// Rows whose `column` cell is non-blank
    pub fn non_blank(&self, column: &str) -> ReportTable {
        let rows = match self.column(column) {
            Some(index) => self
                .rows
                .iter()
                .filter(|row| row.get(index).is_some_and(|cell| !cell.is_empty()))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        ReportTable {
            headers: self.headers.clone(),
            rows,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        output::write_csv(path, &self.headers, self.rows.iter().cloned())
    }
}

/// Excluded subject with its reason, for the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedSubject {
    pub code: String,
    pub reason: String,
}

/// Machine-readable account of one `compile` run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub generated_at: Option<DateTime<Utc>>,
    pub roster_rows: usize,
    pub resolved: usize,
    pub missing: usize,
    pub ambiguous: usize,
    pub excluded: usize,
    pub healthy_volunteers: usize,
    pub volume_failures: usize,
    pub missing_names: Vec<String>,
    pub ambiguous_matches: Vec<AmbiguousMatch>,
    pub excluded_subjects: Vec<ExcludedSubject>,
    pub undated_codes: Vec<String>,
    pub outputs: Vec<PathBuf>,
}

impl RunSummary {
    fn record_enrichment(&mut self, code: &str, enrichment: &SubjectEnrichment) {
        self.volume_failures += enrichment.volume_failures();
        if let Some(exclusion) = enrichment.statistics.exclusion() {
            self.excluded += 1;
            self.excluded_subjects.push(ExcludedSubject {
                code: code.to_string(),
                reason: exclusion.to_string(),
            });
        }
    }
}

/// Drives both report passes
pub struct ReportBuilder<'a> {
    config: &'a PipelineConfig,
    resolver: IdentityResolver<'a>,
    dates: AcquisitionDateExtractor<'a>,
    volumes: VolumeAggregator<'a>,
    clusters: ClusterStatisticsReader,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        key_table: &'a KeyTable,
        overlap: &'a dyn ExternalOverlapTool,
    ) -> Self {
        let resolver = IdentityResolver::new(key_table);
        Self {
            config,
            resolver,
            dates: AcquisitionDateExtractor::new(&config.raw_data, resolver),
            volumes: VolumeAggregator::new(&config.project_root, overlap),
            clusters: ClusterStatisticsReader::new(
                &config.project_root,
                config.cohort.volume_threshold,
            ),
        }
    }

    /// Volume and statistics enrichment for one code
    pub fn enrich(&self, code: &str) -> SubjectEnrichment {
        SubjectEnrichment {
            volumes: self.volumes.volumes_for(code),
            statistics: self.clusters.read_subject(code),
        }
    }

    /// Cohort pass: roster columns plus derived columns
    pub fn cohort_pass(&self, roster: &Roster, summary: &mut RunSummary) -> ReportTable {
        let resolution =
            RosterResolution::resolve(roster, self.resolver, &self.config.cohort.hv_marker);

        let mut headers = roster.headers.clone();
        headers.extend(COHORT_COLUMNS.iter().map(|c| c.to_string()));
        headers.extend(STATISTIC_COLUMNS.iter().map(|c| c.to_string()));

        let mut rows = Vec::with_capacity(roster.len());
        for (record, found) in roster.records.iter().zip(&resolution.matches) {
            rows.push(self.cohort_row(record, found.code(), summary));
        }

        summary.roster_rows = roster.len();
        summary.resolved = resolution.codes.len();
        summary.missing = resolution.missing_names.len();
        summary.ambiguous = resolution.ambiguous.len();
        summary.missing_names = resolution.missing_names;
        summary.ambiguous_matches = resolution.ambiguous;

        info!(
            rows = rows.len(),
            resolved = summary.resolved,
            missing = summary.missing,
            "Cohort pass complete"
        );
        ReportTable { headers, rows }
    }

    fn cohort_row(
        &self,
        record: &RosterRecord,
        code: Option<&str>,
        summary: &mut RunSummary,
    ) -> Vec<String> {
        let dob = parse_date_of_birth(&record.dob_raw);
        let mut row = record.cells.clone();

        let Some(code) = code else {
            row.push(String::new());
            row.push(optional_cell(dob.map(hyphenate)));
            row.extend(std::iter::repeat(String::new()).take(2 + STATISTIC_COLUMNS.len()));
            return row;
        };

        let mri_date = match self.dates.date_for_code(code) {
            Outcome::Found(date) => Some(date),
            other => {
                debug!(code = %code, outcome = other.kind(), "No acquisition date");
                summary.undated_codes.push(code.to_string());
                None
            }
        };
        let age = match (dob, mri_date) {
            (Some(born), Some(scanned)) => age_in_years(born, scanned.date()),
            _ => None,
        };

        row.push(code.to_string());
        row.push(optional_cell(dob.map(hyphenate)));
        row.push(optional_cell(mri_date.map(|d| d.hyphenated())));
        row.push(optional_cell(age));

        let enrichment = self.enrich(code);
        summary.record_enrichment(code, &enrichment);
        row.extend(enrichment.cells());
        row
    }

    /// Healthy-volunteer pass, one row per HV code in key-file order
    pub fn healthy_volunteer_pass(&self, summary: &mut RunSummary) -> ReportTable {
        let mut headers = vec!["code".to_string()];
        headers.extend(STATISTIC_COLUMNS.iter().map(|c| c.to_string()));

        let mut rows = Vec::new();
        for entry in self
            .resolver
            .healthy_volunteers(&self.config.cohort.hv_marker)
        {
            let enrichment = self.enrich(&entry.code);
            summary.record_enrichment(&entry.code, &enrichment);

            let mut row = vec![entry.code.clone()];
            row.extend(enrichment.cells());
            rows.push(row);
        }

        summary.healthy_volunteers = rows.len();
        info!(rows = rows.len(), "Healthy-volunteer pass complete");
        ReportTable { headers, rows }
    }

    /// Run both passes and write every report plus the run summary
    pub fn compile(&self, roster: &Roster) -> Result<RunSummary> {
        let output_dir = &self.config.output_dir;
        let mut summary = RunSummary::default();

        let cohort = self.cohort_pass(roster, &mut summary);
        let subset = cohort.non_blank(SUBSET_COLUMN);
        for (table, name) in [(&cohort, INTEGRATED_REPORT), (&subset, SUBSET_REPORT)] {
            let path = output_dir.join(name);
            table.write(&path)?;
            summary.outputs.push(path);
        }

        let hv = self.healthy_volunteer_pass(&mut summary);
        let hv_path = output_dir.join(HV_REPORT);
        hv.write(&hv_path)?;
        summary.outputs.push(hv_path);

        let summary_path = output_dir.join(RUN_SUMMARY);
        summary.outputs.push(summary_path.clone());
        summary.generated_at = Some(Utc::now());
        write_run_summary(&summary, &summary_path)?;

        info!(
            output_dir = %output_dir.display(),
            subset_rows = subset.rows.len(),
            excluded = summary.excluded,
            volume_failures = summary.volume_failures,
            "Reports written"
        );
        Ok(summary)
    }
}

pub fn write_run_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(summary)
        .map_err(|e| Error::Internal(format!("Failed to serialize run summary: {}", e)))?;
    output::write_atomically(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::{
        Exclusion, ExclusionReason, HemisphereVolumeStat, SubjectClusterStats,
    };

    #[test]
    fn test_cells_blank_when_not_computed() {
        let enrichment = SubjectEnrichment {
            volumes: Outcome::NotFound,
            statistics: SubjectStatistics::NotProcessed,
        };
        assert_eq!(enrichment.cells(), vec![String::new(); 8]);
    }

    #[test]
    fn test_cells_render_values_and_zeros() {
        let enrichment = SubjectEnrichment {
            volumes: Outcome::Found(WhiteMatterVolumes {
                left: Outcome::Found(1200),
                right: Outcome::malformed("tool failed"),
            }),
            statistics: SubjectStatistics::Computed(SubjectClusterStats {
                left: HemisphereVolumeStat::from_volumes(&[500, 10]),
                right: HemisphereVolumeStat::default(),
            }),
        };
        assert_eq!(
            enrichment.cells(),
            vec!["1200", "", "2", "510", "255", "0", "0", "0"]
        );
        assert_eq!(enrichment.volume_failures(), 1);
    }

    #[test]
    fn test_excluded_subject_blank_statistics() {
        let enrichment = SubjectEnrichment {
            volumes: Outcome::NotFound,
            statistics: SubjectStatistics::Excluded(Exclusion {
                hemisphere: Hemisphere::Left,
                reason: ExclusionReason::OversizedFirstCluster {
                    volume: 501,
                    threshold: 500,
                },
            }),
        };
        assert!(enrichment.cells().iter().all(String::is_empty));

        let mut summary = RunSummary::default();
        summary.record_enrichment("p009", &enrichment);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.excluded_subjects[0].code, "p009");
    }

    #[test]
    fn test_non_blank_subset() {
        let table = ReportTable {
            headers: vec!["name".into(), SUBSET_COLUMN.into()],
            rows: vec![
                vec!["a".into(), "3".into()],
                vec!["b".into(), "".into()],
                vec!["c".into(), "0".into()],
            ],
        };
        let subset = table.non_blank(SUBSET_COLUMN);
        assert_eq!(subset.rows.len(), 2);
        assert_eq!(subset.cell(1, "name"), Some("c"));
    }
}
