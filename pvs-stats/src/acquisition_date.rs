//! Acquisition Date Extractor
//!
//! Finds the MRI acquisition date for a subject from the README files the
//! scanner export leaves in the raw-data session directory.
//!
//! # Lookup
//! code → key entry name → `<root>/<name>/` under the first raw-data root that
//! has it → session directory → files whose name contains `README`.
//!
//! # README formats
//! Dispatch is by file name:
//! - `Study` files are comma-separated; the token holding `Study:` carries the
//!   date between the colon and the first hyphen (`Study:20230504-...`).
//! - `Series` files are indented key/value entries; the entry holding
//!   `InstanceCreationDate:` carries the date after the colon.
//!
//! Every failure along the way is an absence, never an error: the subject
//! simply gets no acquisition date and no age.

use crate::identity::IdentityResolver;
use chrono::NaiveDate;
use pvs_common::config::RawDataRoots;
use pvs_common::time::{hyphenate, parse_compact_date};
use pvs_common::Outcome;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Substring identifying metadata files
pub const README_MARKER: &str = "README";

/// Field carrying the date in `Study` READMEs
pub const STUDY_FIELD: &str = "Study:";

/// Field carrying the date in `Series` READMEs
pub const SERIES_FIELD: &str = "InstanceCreationDate:";

const STUDY_DELIMITER: &str = ", ";
const SERIES_DELIMITER: &str = "\n    ";

/// Normalized acquisition date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionDate(pub NaiveDate);

impl AcquisitionDate {
    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// `YYYY-MM-DD` form written to reports
    pub fn hyphenated(self) -> String {
        hyphenate(self.0)
    }

    /// `YYYYMMDD` form as found in README files
    pub fn compact(self) -> String {
        self.0.format(pvs_common::time::COMPACT_DATE_FORMAT).to_string()
    }
}

/// README variant, selected by file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadmeFormat {
    Study,
    Series,
}

impl ReadmeFormat {
    /// Classify a README by file name; `None` for other files
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if !file_name.contains(README_MARKER) {
            return None;
        }
        if file_name.contains("Study") {
            Some(ReadmeFormat::Study)
        } else if file_name.contains("Series") {
            Some(ReadmeFormat::Series)
        } else {
            None
        }
    }

    /// Extract the date from README content in this format
    pub fn parse(self, content: &str) -> Outcome<AcquisitionDate> {
        match self {
            ReadmeFormat::Study => parse_study_readme(content),
            ReadmeFormat::Series => parse_series_readme(content),
        }
    }
}

/// Date from a comma-separated `Study` README
pub fn parse_study_readme(content: &str) -> Outcome<AcquisitionDate> {
    let Some(entry) = content
        .split(STUDY_DELIMITER)
        .find(|token| token.contains(STUDY_FIELD))
    else {
        return Outcome::NotFound;
    };

    // Between the first and second colon, then up to the first hyphen
    let after_colon = entry.split(':').nth(1).unwrap_or_default();
    let raw = after_colon.split('-').next().unwrap_or_default();
    compact_to_outcome(raw, entry)
}

/// Date from an indented `Series` README
pub fn parse_series_readme(content: &str) -> Outcome<AcquisitionDate> {
    let Some(entry) = content
        .split(SERIES_DELIMITER)
        .skip(1)
        .find(|entry| entry.contains(SERIES_FIELD))
    else {
        return Outcome::NotFound;
    };

    let after_colon = entry.split(": ").nth(1).unwrap_or_default();
    let raw = after_colon.split_whitespace().next().unwrap_or_default();
    compact_to_outcome(raw, entry)
}

fn compact_to_outcome(raw: &str, entry: &str) -> Outcome<AcquisitionDate> {
    match parse_compact_date(raw) {
        Some(date) => Outcome::Found(AcquisitionDate(date)),
        None => Outcome::malformed(format!("unparseable date in {:?}", entry.trim())),
    }
}

/// Scan one session directory for a README carrying a date
///
/// Files are visited in name order. The first date found wins; a README
/// with an unparseable date is remembered and reported only if no other
/// README yields a date.
pub fn date_from_session(session_dir: &Path) -> Outcome<AcquisitionDate> {
    if !session_dir.is_dir() {
        return Outcome::NotFound;
    }

    let mut malformed: Option<String> = None;
    let walker = WalkDir::new(session_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error accessing entry in {}: {}", session_dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        let Some(format) = ReadmeFormat::from_file_name(&file_name) else {
            continue;
        };

        let content = match std::fs::read(entry.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Cannot read {}: {}", entry.path().display(), e);
                continue;
            }
        };

        match format.parse(&content) {
            Outcome::Found(date) => {
                debug!(
                    readme = %entry.path().display(),
                    date = %date.hyphenated(),
                    "Found acquisition date"
                );
                return Outcome::Found(date);
            }
            Outcome::Malformed(reason) => {
                warn!(readme = %entry.path().display(), "{}", reason);
                malformed.get_or_insert(reason);
            }
            Outcome::NotFound => {}
        }
    }

    match malformed {
        Some(reason) => Outcome::Malformed(reason),
        None => Outcome::NotFound,
    }
}

/// Locates raw-data sessions and reads their acquisition dates
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionDateExtractor<'a> {
    roots: &'a RawDataRoots,
    resolver: IdentityResolver<'a>,
}

impl<'a> AcquisitionDateExtractor<'a> {
    pub fn new(roots: &'a RawDataRoots, resolver: IdentityResolver<'a>) -> Self {
        Self { roots, resolver }
    }

    /// Session directory for a key-file name
    ///
    /// The first root holding `<name>/` decides; a primary-root subject
    /// without `mri/mprage` is not looked up in the alternate root.
    pub fn session_dir(&self, name: &str) -> Option<PathBuf> {
        if let Some(primary) = &self.roots.primary {
            let subject_dir = primary.join(name);
            if subject_dir.is_dir() {
                return Some(subject_dir.join("mri").join("mprage"));
            }
        }
        if let Some(alternate) = &self.roots.alternate {
            let subject_dir = alternate.join(name);
            if subject_dir.is_dir() {
                return Some(subject_dir.join("mri"));
            }
        }
        None
    }

    /// Acquisition date for a subject code
    pub fn date_for_code(&self, code: &str) -> Outcome<AcquisitionDate> {
        let Some(entry) = self.resolver.names_for(code) else {
            debug!(code = %code, "Code not in key table, no acquisition date");
            return Outcome::NotFound;
        };
        self.date_for_name(&entry.name)
    }

    /// Acquisition date for a key-file name (`first_last` form)
    pub fn date_for_name(&self, name: &str) -> Outcome<AcquisitionDate> {
        match self.session_dir(name) {
            Some(session_dir) => date_from_session(&session_dir),
            None => {
                debug!(name = %name, "No raw-data directory");
                Outcome::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> AcquisitionDate {
        AcquisitionDate(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(
            ReadmeFormat::from_file_name("README-Study.txt"),
            Some(ReadmeFormat::Study)
        );
        assert_eq!(
            ReadmeFormat::from_file_name("README_Series_3.txt"),
            Some(ReadmeFormat::Series)
        );
        assert_eq!(ReadmeFormat::from_file_name("README.txt"), None);
        assert_eq!(ReadmeFormat::from_file_name("Study_notes.txt"), None);
    }

    #[test]
    fn test_parse_study_readme() {
        let content = "Patient: X, Study:20230504-141233, Modality: MR";
        assert_eq!(parse_study_readme(content), Outcome::Found(date(2023, 5, 4)));
    }

    #[test]
    fn test_parse_study_readme_with_space() {
        let content = "Study: 20230504-brain, Series: 3";
        let found = parse_study_readme(content).found().unwrap();
        assert_eq!(found.hyphenated(), "2023-05-04");
        assert_eq!(found.compact(), "20230504");
    }

    #[test]
    fn test_parse_study_readme_missing_field() {
        assert_eq!(parse_study_readme("Patient: X, Modality: MR"), Outcome::NotFound);
    }

    #[test]
    fn test_parse_study_readme_bad_date() {
        let outcome = parse_study_readme("Study:2023-05-04, Modality: MR");
        assert!(matches!(outcome, Outcome::Malformed(_)));
    }

    #[test]
    fn test_parse_series_readme() {
        let content = "Series 3\n    Modality: MR\n    InstanceCreationDate: 20230504\n    InstanceCreationTime: 101010";
        assert_eq!(parse_series_readme(content), Outcome::Found(date(2023, 5, 4)));
    }

    #[test]
    fn test_parse_series_readme_ignores_header_entry() {
        // The text before the first indented entry is never searched
        let content = "InstanceCreationDate: 20230504\n    Modality: MR";
        assert_eq!(parse_series_readme(content), Outcome::NotFound);
    }

    #[test]
    fn test_parse_series_readme_bad_date() {
        let content = "Series\n    InstanceCreationDate: unknown";
        assert!(matches!(parse_series_readme(content), Outcome::Malformed(_)));
    }

    #[test]
    fn test_date_from_missing_session() {
        assert_eq!(
            date_from_session(Path::new("/nonexistent/session")),
            Outcome::NotFound
        );
    }
}
