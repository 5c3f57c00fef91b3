//! Event filtering and aggregation.

pub mod aggregator;
pub mod filter;

pub use aggregator::{commits_pushed, repos_created, Categories};
pub use filter::{filter_events, ExclusionRule};
