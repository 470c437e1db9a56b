//! Service layer: object-store access, catalog strategies, and the
//! request-level orchestration the handlers call into.

pub mod catalog;
pub mod cloud_store;
pub mod latest;
pub mod listing_catalog;
pub mod memory_store;
pub mod names_service;
pub mod object_store;
pub mod report_service;
pub mod sqlite_catalog;
