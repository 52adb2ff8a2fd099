//! Cluster tables
//!
//! The segmentation tool writes a fixed-width text report per hemisphere;
//! `text_report` turns it into the CSV cluster table, `stats` reads those
//! tables back into per-subject statistics, and `segment` drives the tool
//! across the project tree.

pub mod segment;
pub mod stats;
pub mod text_report;

pub use segment::{subject_codes, ClusterReportGenerator, SegmentSummary};
pub use stats::{
    apply_outlier_policy, ClusterStatisticsReader, ClusterTable, Exclusion, ExclusionReason,
    HemisphereVolumeStat, OutlierDecision, SubjectClusterStats, SubjectStatistics,
};
pub use text_report::{
    convert_report_file, parse_cluster_report, ClusterReport, ClusterReportError, Conversion,
    ParsedReport,
};
