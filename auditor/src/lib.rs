//! Repository auditor library.
//!
//! Audits a Maven-layout artifact repository before publication: checksum
//! sidecars, project models and their dependencies, bills of materials,
//! reconciliation with a prepared distribution bundle, and comparison with
//! registries that already serve the artifacts. Every finding is recorded
//! as data, pre-approved findings are suppressed by declarative rules, and
//! reproducible reports are written at the end of the run. The
//! `repository-auditor` binary drives it from the command line.
//!
//! # Modules
//!
//! - [`audit`] - Run orchestration from plan to reports
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `auditor.toml` loading
//! - [`coordinate`] - Artifact coordinates and repository paths
//! - [`digest`] - Content digests and checksum sidecars
//! - [`error`] - Run-level error types
//! - [`filter`] - Suppression rules for pre-approved findings
//! - [`report`] - Text, JSON and log reports
//! - [`repository`] - Repository scanning and archive selection
//! - [`validation`] - Error accumulation and validator orchestration
//! - [`validators`] - The checks themselves

pub mod audit;
pub mod cli;
pub mod config;
pub mod coordinate;
pub mod digest;
pub mod error;
pub mod filter;
pub mod report;
pub mod repository;
pub mod validation;
pub mod validators;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
