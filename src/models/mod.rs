//! Data models for the plant tracker.
//!
//! Field names serialize in camelCase to match the mobile client's records.

mod plant;
mod status;

pub use plant::*;
pub use status::*;
