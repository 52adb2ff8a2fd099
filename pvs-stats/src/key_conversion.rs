//! Roster → code resolution and its text reports
//!
//! Output files, newline separated, in the output directory:
//! - `pnums.txt`: resolved codes in roster order
//! - `missing_names.txt`: roster names without a key entry
//! - `hvs.txt`: healthy-volunteer codes in key-file order
//! - `ambiguous_names.txt`: `<names>: <code1>, <code2>, ...`, first code used

use crate::identity::{name_tokens, IdentityResolver, NameMatch};
use crate::output;
use crate::roster::{Roster, RosterRecord};
use pvs_common::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PNUMS_FILE: &str = "pnums.txt";
pub const MISSING_NAMES_FILE: &str = "missing_names.txt";
pub const HVS_FILE: &str = "hvs.txt";
pub const AMBIGUOUS_NAMES_FILE: &str = "ambiguous_names.txt";

/// A roster name that matched several key entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousMatch {
    pub names: String,
    pub chosen: String,
    pub candidates: Vec<String>,
}

impl AmbiguousMatch {
    /// `ambiguous_names.txt` line
    pub fn to_line(&self) -> String {
        format!("{}: {}", self.names, self.candidates.join(", "))
    }
}

/// Display form of a roster name, original case
pub fn display_name(record: &RosterRecord) -> String {
    record
        .first_name
        .split_whitespace()
        .chain(record.last_name.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolution of every roster record
#[derive(Debug, Clone, Default)]
pub struct RosterResolution {
    /// One entry per roster record, in roster order
    pub matches: Vec<NameMatch>,
    pub codes: Vec<String>,
    pub missing_names: Vec<String>,
    pub ambiguous: Vec<AmbiguousMatch>,
    pub hv_codes: Vec<String>,
}

impl RosterResolution {
    pub fn resolve(roster: &Roster, resolver: IdentityResolver<'_>, hv_marker: &str) -> Self {
        let mut resolution = RosterResolution::default();

        for record in &roster.records {
            let found = resolver.code_for(&name_tokens(&record.first_name, &record.last_name));
            match &found {
                NameMatch::Unique(code) => resolution.codes.push(code.clone()),
                NameMatch::Ambiguous { chosen, candidates } => {
                    resolution.codes.push(chosen.clone());
                    resolution.ambiguous.push(AmbiguousMatch {
                        names: display_name(record),
                        chosen: chosen.clone(),
                        candidates: candidates.clone(),
                    });
                }
                NameMatch::NotFound => {
                    let names = display_name(record);
                    warn!(names = %names, "Roster name not in key file");
                    resolution.missing_names.push(names);
                }
            }
            resolution.matches.push(found);
        }

        resolution.hv_codes = resolver
            .healthy_volunteers(hv_marker)
            .into_iter()
            .map(|entry| entry.code.clone())
            .collect();

        info!(
            records = roster.len(),
            resolved = resolution.codes.len(),
            missing = resolution.missing_names.len(),
            ambiguous = resolution.ambiguous.len(),
            healthy_volunteers = resolution.hv_codes.len(),
            "Resolved roster names"
        );
        resolution
    }

    /// Write the four text reports, returning their paths
    pub fn write_reports(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let ambiguous_lines: Vec<String> = self.ambiguous.iter().map(AmbiguousMatch::to_line).collect();
        let files: [(&str, &[String]); 4] = [
            (PNUMS_FILE, self.codes.as_slice()),
            (MISSING_NAMES_FILE, self.missing_names.as_slice()),
            (HVS_FILE, self.hv_codes.as_slice()),
            (AMBIGUOUS_NAMES_FILE, ambiguous_lines.as_slice()),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, lines) in files {
            let path = output_dir.join(name);
            output::write_lines(&path, lines)?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_table::KeyTable;
    use pvs_common::config::RosterColumns;

    #[test]
    fn test_resolve_roster() {
        let table = KeyTable::parse("p001=jane_doe\nhv01=al_ray\np002=sam_lee\np003=sam_lee\n");
        let roster = Roster::parse(
            "First Name,Last Name\nJane,Doe\nNo,Body\nSam,Lee\n",
            &RosterColumns::default(),
        )
        .unwrap();

        let resolution = RosterResolution::resolve(&roster, IdentityResolver::new(&table), "hv");

        assert_eq!(resolution.matches.len(), 3);
        assert_eq!(resolution.codes, vec!["p001", "p002"]);
        assert_eq!(resolution.missing_names, vec!["No Body"]);
        assert_eq!(resolution.hv_codes, vec!["hv01"]);
        assert_eq!(resolution.ambiguous.len(), 1);
        assert_eq!(resolution.ambiguous[0].to_line(), "Sam Lee: p002, p003");
    }
}
