//! # PVS Common Library
//!
//! Shared code for the PVS statistics tooling including:
//! - Error and result types
//! - Pipeline configuration loading
//! - The `Outcome` type separating "not computed" from "computed"
//! - Date parsing and age helpers

pub mod config;
pub mod error;
pub mod outcome;
pub mod time;

pub use error::{Error, Result};
pub use outcome::Outcome;
