// File: src/services/mod.rs

pub mod auto_response;
pub mod motd;

pub use auto_response::{AutoResponseService, notification_text};
pub use motd::{MotdReport, MotdService};
