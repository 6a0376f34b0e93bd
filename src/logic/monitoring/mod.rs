//! Monitoring Module - Continuous Vendor Monitoring
//!
//! Vendors enrolled by a completed assessment are re-checked on an interval;
//! posture changes become alerts kept in a bounded per-vendor history.

pub mod scheduler;
pub mod types;

pub use scheduler::MonitoringScheduler;
pub use types::{AlertType, MonitoredVendor, MonitoringAlert, MonitoringStatus};
