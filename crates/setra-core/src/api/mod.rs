//! Support backend REST collaborator.
//!
//! Endpoint shapes are owned by the backend; this module only maps them to
//! typed requests and normalises errors.

pub mod cache;
pub mod client;
pub mod types;


pub use cache::{CacheResult, QueryCache};
pub use client::ApiClient;
pub use types::{
    Conversation, Created, DashboardMetrics, Message, MessageSource, NewUser, OperatorRef,
    Profile, TimeseriesPoint, UserPatch, UserRecord,
};
