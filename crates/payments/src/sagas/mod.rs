//! The concrete saga definitions.

pub mod cross_border;
pub mod domestic;
pub mod refund;
pub mod report;
