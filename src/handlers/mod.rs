//! HTTP handlers

pub mod assessments;
pub mod health;
pub mod monitoring;
pub mod scans;
