//! Role-based access control for console pages.

mod gate;
mod navigator;
mod policy;

pub use gate::{AccessGate, Decision};
pub use navigator::{Navigation, Navigator, RecordingNavigator};
pub use policy::{has_any_role, has_role, AccessPolicy, Capability, Destination};
