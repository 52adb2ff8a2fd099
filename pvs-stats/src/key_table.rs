//! Flat code↔name key file
//!
//! One association per line: `<code>=<name1>_<name2>[_...]`. No header and
//! no escaping. The table is loaded fresh on every run and never written back.

use pvs_common::Result;
use std::path::Path;
use tracing::{debug, warn};

/// Separator between code and name part
pub const CODE_SEPARATOR: char = '=';

/// Separator between name components
pub const NAME_SEPARATOR: char = '_';

/// One line of the key file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Anonymized subject code (patient number or healthy-volunteer code)
    pub code: String,
    /// Name part exactly as written; raw-data directories use this form
    pub name: String,
    /// Lowercased name components, in file order
    pub name_tokens: Vec<String>,
}

impl KeyEntry {
    /// Parse one key-file line
    ///
    /// Returns `None` for lines without a separator or with an empty code.
    pub fn parse(line: &str) -> Option<Self> {
        let (code, name) = line.trim().split_once(CODE_SEPARATOR)?;
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        let name = name.trim();
        let name_tokens = name
            .split(NAME_SEPARATOR)
            .filter(|token| !token.is_empty())
            .map(|token| token.to_lowercase())
            .collect();

        Some(Self {
            code: code.to_string(),
            name: name.to_string(),
            name_tokens,
        })
    }

    /// True if every token appears among this entry's name tokens
    pub fn contains_all<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        tokens
            .iter()
            .all(|token| self.name_tokens.iter().any(|own| own == token.as_ref()))
    }
}

/// All key entries in file order
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    entries: Vec<KeyEntry>,
}

impl KeyTable {
    /// Load the key file
    ///
    /// A missing or unreadable file is fatal for the run.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::parse(&content);
        debug!(
            path = %path.display(),
            entries = table.len(),
            "Loaded key table"
        );
        Ok(table)
    }

    /// Parse key-file content, skipping blank and malformed lines
    pub fn parse(content: &str) -> Self {
        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match KeyEntry::parse(line) {
                Some(entry) => entries.push(entry),
                None => warn!(line = line_no + 1, "Skipping malformed key line"),
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        let entry = KeyEntry::parse("p001=Jane_Mary_Doe").unwrap();
        assert_eq!(entry.code, "p001");
        assert_eq!(entry.name, "Jane_Mary_Doe");
        assert_eq!(entry.name_tokens, vec!["jane", "mary", "doe"]);
    }

    #[test]
    fn test_parse_entry_trims_line_endings() {
        let entry = KeyEntry::parse("hv12=john_smith\r").unwrap();
        assert_eq!(entry.code, "hv12");
        assert_eq!(entry.name, "john_smith");
    }

    #[test]
    fn test_parse_entry_rejects_malformed() {
        assert!(KeyEntry::parse("no separator here").is_none());
        assert!(KeyEntry::parse("=jane_doe").is_none());
    }

    #[test]
    fn test_contains_all_requires_every_token() {
        let entry = KeyEntry::parse("p001=jane_mary_doe").unwrap();
        assert!(entry.contains_all(&["jane", "doe"]));
        assert!(entry.contains_all(&["doe", "mary", "jane"]));
        assert!(!entry.contains_all(&["jane", "smith"]));
        // Whole-token comparison, not substring
        assert!(!entry.contains_all(&["jan"]));
    }

    #[test]
    fn test_table_parse_skips_blank_and_bad_lines() {
        let table = KeyTable::parse("p001=jane_doe\n\ngarbage\np002=john_smith\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[0].code, "p001");
        assert_eq!(table.entries()[1].code, "p002");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = KeyTable::load(Path::new("/nonexistent/key"));
        assert!(matches!(result, Err(pvs_common::Error::Io(_))));
    }
}
