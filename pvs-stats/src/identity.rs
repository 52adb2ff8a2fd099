//! Identity Resolver
//!
//! Bidirectional lookup between free-text clinical names and anonymized
//! codes. Both directions are a linear scan over the key table in file order;
//! cohorts are small enough that an index buys nothing.
//!
//! # Matching
//! A roster name matches an entry when every lowercased roster token appears
//! among the entry's name tokens. Only case is normalized: punctuation,
//! accents and hyphenation differences surface as "not found".
//!
//! # Ambiguity
//! When several entries match, the first one in file order is used, and the
//! full candidate list is reported so duplicates can be fixed in the key file.

use crate::key_table::{KeyEntry, KeyTable};
use tracing::{debug, warn};

/// Result of resolving a name to a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Exactly one key entry matched
    Unique(String),
    /// Several entries matched; `chosen` is the first in file order
    Ambiguous {
        chosen: String,
        candidates: Vec<String>,
    },
    /// No entry matched
    NotFound,
}

impl NameMatch {
    /// Code to use downstream, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            NameMatch::Unique(code) => Some(code),
            NameMatch::Ambiguous { chosen, .. } => Some(chosen),
            NameMatch::NotFound => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, NameMatch::Ambiguous { .. })
    }
}

/// Split roster name fields into lowercase tokens
///
/// Multi-word first and last names contribute one token per word.
pub fn name_tokens(first_name: &str, last_name: &str) -> Vec<String> {
    first_name
        .split_whitespace()
        .chain(last_name.split_whitespace())
        .map(|word| word.to_lowercase())
        .collect()
}

/// Linear-scan resolver over a loaded key table
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'a> {
    table: &'a KeyTable,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(table: &'a KeyTable) -> Self {
        Self { table }
    }

    /// Resolve name tokens to a code
    ///
    /// Tokens are lowercased before comparison. An empty token list never
    /// matches.
    pub fn code_for<S: AsRef<str>>(&self, tokens: &[S]) -> NameMatch {
        let tokens: Vec<String> = tokens
            .iter()
            .map(|token| token.as_ref().to_lowercase())
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.is_empty() {
            return NameMatch::NotFound;
        }

        let mut candidates: Vec<String> = self
            .table
            .iter()
            .filter(|entry| entry.contains_all(&tokens))
            .map(|entry| entry.code.clone())
            .collect();

        match candidates.len() {
            0 => {
                debug!(names = %tokens.join(" "), "No key entry matches");
                NameMatch::NotFound
            }
            1 => {
                let code = candidates.remove(0);
                debug!(names = %tokens.join(" "), code = %code, "Resolved name");
                NameMatch::Unique(code)
            }
            _ => {
                let chosen = candidates[0].clone();
                warn!(
                    names = %tokens.join(" "),
                    chosen = %chosen,
                    candidates = %candidates.join(", "),
                    "Name matches several key entries, using first"
                );
                NameMatch::Ambiguous { chosen, candidates }
            }
        }
    }

    /// Resolve a code back to its key entry
    ///
    /// Compares whole codes; with duplicate codes the first entry wins.
    pub fn names_for(&self, code: &str) -> Option<&'a KeyEntry> {
        self.table.iter().find(|entry| entry.code == code)
    }

    /// Entries whose code contains the healthy-volunteer marker, in file order
    pub fn healthy_volunteers(&self, marker: &str) -> Vec<&'a KeyEntry> {
        self.table
            .iter()
            .filter(|entry| entry.code.contains(marker))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> KeyTable {
        KeyTable::parse(
            "p001=jane_doe\n\
             p002=john_paul_smith\n\
             hv001=alice_jones\n\
             p003=maria_de_la_cruz\n",
        )
    }

    #[test]
    fn test_name_tokens_splits_multiword() {
        assert_eq!(
            name_tokens("Maria", "De La Cruz"),
            vec!["maria", "de", "la", "cruz"]
        );
        assert_eq!(name_tokens("  Jane ", "Doe"), vec!["jane", "doe"]);
    }

    #[test]
    fn test_code_for_unique_match() {
        let table = table();
        let resolver = IdentityResolver::new(&table);
        assert_eq!(
            resolver.code_for(&["Jane", "Doe"]),
            NameMatch::Unique("p001".to_string())
        );
        // Subset of an entry's tokens is enough
        assert_eq!(
            resolver.code_for(&["john", "smith"]),
            NameMatch::Unique("p002".to_string())
        );
    }

    #[test]
    fn test_code_for_not_found() {
        let table = table();
        let resolver = IdentityResolver::new(&table);
        assert_eq!(resolver.code_for(&["jane", "smith"]), NameMatch::NotFound);
        // No punctuation normalization
        assert_eq!(resolver.code_for(&["jane", "doe-smith"]), NameMatch::NotFound);
        assert_eq!(resolver.code_for::<&str>(&[]), NameMatch::NotFound);
    }

    #[test]
    fn test_code_for_ambiguous_picks_first() {
        let table = KeyTable::parse("p010=sam_lee\np011=sam_lee\np012=sam_lee_park\n");
        let resolver = IdentityResolver::new(&table);

        let result = resolver.code_for(&["sam", "lee"]);
        assert_eq!(result.code(), Some("p010"));
        assert!(result.is_ambiguous());
        assert_eq!(
            result,
            NameMatch::Ambiguous {
                chosen: "p010".to_string(),
                candidates: vec!["p010".into(), "p011".into(), "p012".into()],
            }
        );
    }

    #[test]
    fn test_names_for_round_trip() {
        let table = table();
        let resolver = IdentityResolver::new(&table);
        for entry in table.iter() {
            let found = resolver.names_for(&entry.code).unwrap();
            assert_eq!(resolver.code_for(&found.name_tokens).code(), Some(entry.code.as_str()));
        }
    }

    #[test]
    fn test_names_for_exact_code_only() {
        let table = KeyTable::parse("p0011=ann_lee\np001=jane_doe\n");
        let resolver = IdentityResolver::new(&table);
        assert_eq!(resolver.names_for("p001").unwrap().name, "jane_doe");
        assert!(resolver.names_for("p00").is_none());
    }

    #[test]
    fn test_healthy_volunteers_by_code_marker() {
        let table = table();
        let resolver = IdentityResolver::new(&table);
        let hvs: Vec<&str> = resolver
            .healthy_volunteers("hv")
            .iter()
            .map(|entry| entry.code.as_str())
            .collect();
        assert_eq!(hvs, vec!["hv001"]);
    }
}
