//! Explicit per-operation result
//!
//! Every lookup in the pipeline can end three ways: a value was found, there
//! was nothing to find (subject not processed yet, no README, no mask), or
//! something was there but could not be read. Report cells render `Found`
//! values and stay blank otherwise, so "not computed" never prints as zero.

use std::fmt;

/// Result of a lookup that may legitimately come up empty
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Value located and parsed
    Found(T),
    /// Nothing to read (directory, file or entry absent)
    NotFound,
    /// Source present but unusable; carries a description for diagnostics
    Malformed(String),
}

impl<T> Outcome<T> {
    /// Build a `Malformed` outcome from anything displayable
    pub fn malformed(reason: impl fmt::Display) -> Self {
        Outcome::Malformed(reason.to_string())
    }

    /// Value if found, discarding the reason for absence
    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Outcome::Found(value) => Outcome::Found(value),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Malformed(reason) => Outcome::Malformed(reason.clone()),
        }
    }

    /// Short label used in logs and the run summary
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Found(_) => "found",
            Outcome::NotFound => "not_found",
            Outcome::Malformed(_) => "malformed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_extracts_value() {
        assert_eq!(Outcome::Found(7).found(), Some(7));
        assert_eq!(Outcome::<i32>::NotFound.found(), None);
        assert_eq!(Outcome::<i32>::malformed("bad").found(), None);
    }

    #[test]
    fn test_as_ref_keeps_reason() {
        let outcome: Outcome<u64> = Outcome::malformed("garbled");
        assert_eq!(outcome.as_ref(), Outcome::Malformed("garbled".to_string()));
        assert_eq!(Outcome::Found(4u64).as_ref().found(), Some(&4));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Outcome::Found(()).kind(), "found");
        assert_eq!(Outcome::<()>::NotFound.kind(), "not_found");
        assert_eq!(Outcome::<()>::malformed("x").kind(), "malformed");
    }
}
