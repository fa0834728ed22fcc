//! Database models (SQLx).

pub mod affiliation;
pub mod funding;
pub mod institution;
pub mod metrics;
pub mod user;
pub mod work;
