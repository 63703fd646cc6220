//! Derived views over the entity cache.
//!
//! Both projections are pure: the same tickets and inputs always produce the
//! same output, so they are recomputed on every render instead of cached.

pub mod dashboard;
pub mod registry;

pub use dashboard::{DashboardSummary, DateRange, DayBucket};
pub use registry::{RegistryQuery, SortOrder};
