pub mod acknowledgement;
pub mod chain;
pub mod context;
pub mod delays;
pub mod filter;
pub mod maintenance;
pub mod ok;

pub use acknowledgement::AcknowledgementFilter;
pub use chain::FilterChain;
pub use context::FilterContext;
pub use delays::{DelaysFilter, DEFAULT_INITIAL_FAILURE_DELAY};
pub use filter::Filter;
pub use maintenance::{ScheduledMaintenanceFilter, UnscheduledMaintenanceFilter};
pub use ok::OkFilter;

#[cfg(test)]
pub(crate) mod test_support;
