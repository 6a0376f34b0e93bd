//! Domain logic

pub mod assessment;
pub mod monitoring;
pub mod scans;
