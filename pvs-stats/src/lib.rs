//! pvs-stats library interface
//!
//! Reconciles per-subject PVS (perivascular space) statistics with the
//! clinical roster. Exposed as a library so integration tests can drive each
//! stage with fixture directories and fake imaging tools.

pub mod acquisition_date;
pub mod clusters;
pub mod identity;
pub mod key_conversion;
pub mod key_table;
pub mod layout;
pub mod output;
pub mod report;
pub mod roster;
pub mod tools;
pub mod volume;

pub use crate::identity::{IdentityResolver, NameMatch};
pub use crate::key_table::{KeyEntry, KeyTable};
pub use crate::layout::{Hemisphere, SubjectLayout};
pub use crate::report::{ReportBuilder, RunSummary};
pub use pvs_common::{Error, Outcome, Result};
