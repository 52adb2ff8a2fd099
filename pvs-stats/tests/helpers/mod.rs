//! Test Helper Utilities
//!
//! Shared fixtures for pvs-stats integration tests

#![allow(dead_code)]

pub mod fake_tools;
pub mod fixtures;

pub use fake_tools::{CountingOverlap, FailingOverlap};
pub use fixtures::ProjectFixture;
