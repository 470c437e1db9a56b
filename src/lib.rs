//! Report drop service: an admin uploads PDF reports for a fixed pair of
//! people, the bytes live in an external object store, and the public
//! downloads whatever is newest per person.
//!
//! The crate is wired as a library so integration tests can assemble the
//! router; `main.rs` only does configuration and startup.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod slots;

use std::sync::Arc;

use crate::services::{names_service::NamesStore, report_service::ReportService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService>,
    pub names: Arc<NamesStore>,
    pub admin_password: String,
}
