//! Read entities definitions.

pub mod capacity;
pub mod metrics;
pub mod reply;
