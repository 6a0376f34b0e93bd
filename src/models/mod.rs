//! Data models

pub mod assessment;
pub mod request;
pub mod results;

pub use assessment::*;
pub use request::*;
pub use results::*;
