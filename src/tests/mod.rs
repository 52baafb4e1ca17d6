//! Crate-level tests
//!
//! - `fixtures`: fake collaborators and source file helpers
//! - `e2e`: whole-pipeline tests against the SQLite catalog
