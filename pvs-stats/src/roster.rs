//! Clinical roster
//!
//! CSV export of the clinical spreadsheet, read once and never written back.
//! Every original column is carried through to the reports untouched.

use pvs_common::config::RosterColumns;
use pvs_common::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

/// One roster row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRecord {
    /// All cells in header order
    pub cells: Vec<String>,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth as written; blank if the column is absent
    pub dob_raw: String,
}

/// Loaded roster
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub headers: Vec<String>,
    pub records: Vec<RosterRecord>,
}

impl Roster {
    pub fn load(path: &Path, columns: &RosterColumns) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let roster = Self::from_reader(reader, columns)?;
        debug!(
            path = %path.display(),
            records = roster.records.len(),
            "Loaded roster"
        );
        Ok(roster)
    }

    /// Parse roster CSV held in memory
    pub fn parse(content: &str, columns: &RosterColumns) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());
        Self::from_reader(reader, columns)
    }

    fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        columns: &RosterColumns,
    ) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let first = position(&columns.first_name).ok_or_else(|| {
            Error::InvalidInput(format!("roster has no {:?} column", columns.first_name))
        })?;
        let last = position(&columns.last_name).ok_or_else(|| {
            Error::InvalidInput(format!("roster has no {:?} column", columns.last_name))
        })?;
        let dob = position(&columns.dob);
        if dob.is_none() {
            warn!(column = %columns.dob, "Roster has no date-of-birth column; ages left blank");
        }

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            cells.resize(headers.len(), String::new());

            let cell = |index: usize| cells[index].trim().to_string();
            let first_name = cell(first);
            if first_name.is_empty() {
                continue;
            }
            let last_name = cell(last);
            let dob_raw = dob.map(cell).unwrap_or_default();

            records.push(RosterRecord {
                cells,
                first_name,
                last_name,
                dob_raw,
            });
        }

        Ok(Self { headers, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
