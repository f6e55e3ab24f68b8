//! Auto-refresh: a persisted, pausable polling cycle.
//!
//! [`RefreshCoordinator`] is the pure state machine; [`AutoRefresh`] drives it
//! on a tokio task; [`DashboardRefresh`] is the dashboard's refresh action.

pub mod dashboard;
mod coordinator;
mod driver;


pub use coordinator::{RefreshCoordinator, RefreshState};
pub use dashboard::DashboardRefresh;
pub use driver::AutoRefresh;
