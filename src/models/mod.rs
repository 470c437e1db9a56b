//! Core data models for the report service.
//!
//! These entities describe files held by the external object store and the
//! small display-name document. They map onto the catalog table via
//! `sqlx::FromRow` and serialize naturally as JSON via `serde`.

pub mod names;
pub mod report;
