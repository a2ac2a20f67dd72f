//! API endpoint implementations.

mod analytics;
mod chat;
mod inventory;
mod profile;
mod resources;

pub use analytics::AnalyticsApi;
pub use chat::ChatApi;
pub use inventory::{InventoryApi, ListInventoryQuery};
pub use profile::ProfileApi;
pub use resources::{ListResourcesQuery, ResourcesApi};
