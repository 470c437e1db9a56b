//! HTTP handlers. Thin translation between the wire and the service layer;
//! everything interesting happens in `services`.

pub mod health_handlers;
pub mod name_handlers;
pub mod report_handlers;
