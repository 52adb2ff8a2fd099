//! Cluster Statistics Reader
//!
//! Turns a subject's per-hemisphere cluster tables into count / total volume /
//! mean volume, after the outlier policy has been applied.
//!
//! # Cases
//! - `t1/csv/` missing: subject not processed, every field blank.
//! - hemisphere table missing inside `t1/csv/`: that hemisphere is `(0, 0, 0)`.
//! - table with a header and no rows: `(0, 0, 0)`.
//! - table with no header at all (zero-byte) or unreadable: whole subject
//!   excluded.
//! - first cluster larger than the threshold: whole subject excluded.
//!
//! An exclusion in either hemisphere blanks both.

use crate::layout::{Hemisphere, SubjectLayout};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cluster volume column written by the segmentation tool
pub const VOLUME_COLUMN: &str = "#Volume";

/// Cluster volumes of one hemisphere, in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTable {
    pub volumes: Vec<u64>,
}

impl ClusterTable {
    /// Read the `#Volume` column of a CSV cluster table
    ///
    /// `Ok(None)` for a file with no header row.
    pub fn read(path: &Path) -> Result<Option<Self>, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| e.to_string())?;

        let headers = reader.headers().map_err(|e| e.to_string())?.clone();
        if headers.is_empty() {
            return Ok(None);
        }
        let Some(column) = headers.iter().position(|h| h.trim() == VOLUME_COLUMN) else {
            return Err(format!("no {} column", VOLUME_COLUMN));
        };

        let mut volumes = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| e.to_string())?;
            let raw = record.get(column).unwrap_or_default();
            let volume = parse_volume(raw)
                .ok_or_else(|| format!("row {}: {:?} is not a voxel count", index, raw))?;
            volumes.push(volume);
        }
        Ok(Some(Self { volumes }))
    }
}

/// Accept `42` and the float form `42.0` some writers produce
fn parse_volume(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// Result of the outlier policy on one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlierDecision {
    /// Rows that survive filtering
    Keep(Vec<u64>),
    /// First cluster too large; drop the whole subject
    ExcludeSubject { first_volume: u64 },
}

/// Outlier policy
///
/// An oversized first cluster signals an upstream processing artifact and
/// excludes the subject. Otherwise only clusters strictly larger than the
/// threshold are dropped.
pub fn apply_outlier_policy(volumes: &[u64], threshold: u64) -> OutlierDecision {
    match volumes.first() {
        Some(&first) if first > threshold => OutlierDecision::ExcludeSubject {
            first_volume: first,
        },
        _ => OutlierDecision::Keep(
            volumes
                .iter()
                .copied()
                .filter(|&volume| volume <= threshold)
                .collect(),
        ),
    }
}

/// Count, total and mean cluster volume for one hemisphere
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HemisphereVolumeStat {
    pub count: usize,
    pub total_volume: u64,
    pub mean_volume: f64,
}

impl HemisphereVolumeStat {
    pub fn from_volumes(volumes: &[u64]) -> Self {
        let count = volumes.len();
        let total_volume: u64 = volumes.iter().sum();
        let mean_volume = if count == 0 {
            0.0
        } else {
            total_volume as f64 / count as f64
        };
        Self {
            count,
            total_volume,
            mean_volume,
        }
    }
}

/// Statistics for both hemispheres
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SubjectClusterStats {
    pub left: HemisphereVolumeStat,
    pub right: HemisphereVolumeStat,
}

impl SubjectClusterStats {
    pub fn get(&self, hemisphere: Hemisphere) -> &HemisphereVolumeStat {
        match hemisphere {
            Hemisphere::Left => &self.left,
            Hemisphere::Right => &self.right,
        }
    }
}

/// Why a subject was left out of the statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    OversizedFirstCluster { volume: u64, threshold: u64 },
    EmptyTable,
    Unreadable(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::OversizedFirstCluster { volume, threshold } => write!(
                f,
                "first cluster volume {} exceeds threshold {}",
                volume, threshold
            ),
            ExclusionReason::EmptyTable => f.write_str("cluster table has no header"),
            ExclusionReason::Unreadable(reason) => write!(f, "unreadable cluster table: {}", reason),
        }
    }
}

/// Subject-level exclusion, with the hemisphere that triggered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub hemisphere: Hemisphere,
    pub reason: ExclusionReason,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hemisphere: {}", self.hemisphere, self.reason)
    }
}

/// Statistics outcome for one subject
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectStatistics {
    Computed(SubjectClusterStats),
    /// No `t1/csv/` directory yet
    NotProcessed,
    Excluded(Exclusion),
}

impl SubjectStatistics {
    pub fn computed(&self) -> Option<&SubjectClusterStats> {
        match self {
            SubjectStatistics::Computed(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn exclusion(&self) -> Option<&Exclusion> {
        match self {
            SubjectStatistics::Excluded(exclusion) => Some(exclusion),
            _ => None,
        }
    }
}

/// Reads cluster tables under the project root
#[derive(Debug, Clone)]
pub struct ClusterStatisticsReader {
    project_root: PathBuf,
    threshold: u64,
}

impl ClusterStatisticsReader {
    pub fn new(project_root: impl Into<PathBuf>, threshold: u64) -> Self {
        Self {
            project_root: project_root.into(),
            threshold,
        }
    }

    /// Statistics for one subject
    pub fn read_subject(&self, code: &str) -> SubjectStatistics {
        let layout = SubjectLayout::new(&self.project_root, code);
        if !layout.cluster_table_dir().is_dir() {
            debug!(code = %code, "No cluster tables, statistics not computed");
            return SubjectStatistics::NotProcessed;
        }

        let mut stats = SubjectClusterStats::default();
        for hemisphere in Hemisphere::ALL {
            match self.read_hemisphere(&layout, hemisphere) {
                Ok(stat) => match hemisphere {
                    Hemisphere::Left => stats.left = stat,
                    Hemisphere::Right => stats.right = stat,
                },
                Err(reason) => {
                    let exclusion = Exclusion { hemisphere, reason };
                    warn!(code = %code, "Excluding subject from statistics: {}", exclusion);
                    return SubjectStatistics::Excluded(exclusion);
                }
            }
        }

        debug!(
            code = %code,
            left_count = stats.left.count,
            right_count = stats.right.count,
            "Read cluster statistics"
        );
        SubjectStatistics::Computed(stats)
    }

    fn read_hemisphere(
        &self,
        layout: &SubjectLayout,
        hemisphere: Hemisphere,
    ) -> Result<HemisphereVolumeStat, ExclusionReason> {
        let path = layout.cluster_table(hemisphere);
        if !path.is_file() {
            return Ok(HemisphereVolumeStat::default());
        }

        let table = match ClusterTable::read(&path) {
            Ok(Some(table)) => table,
            Ok(None) => return Err(ExclusionReason::EmptyTable),
            Err(reason) => return Err(ExclusionReason::Unreadable(reason)),
        };

        match apply_outlier_policy(&table.volumes, self.threshold) {
            OutlierDecision::ExcludeSubject { first_volume } => {
                Err(ExclusionReason::OversizedFirstCluster {
                    volume: first_volume,
                    threshold: self.threshold,
                })
            }
            OutlierDecision::Keep(volumes) => {
                let dropped = table.volumes.len() - volumes.len();
                if dropped > 0 {
                    debug!(
                        table = %path.display(),
                        dropped,
                        "Dropped clusters above threshold"
                    );
                }
                Ok(HemisphereVolumeStat::from_volumes(&volumes))
            }
        }
    }
}
