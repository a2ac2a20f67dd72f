//! HTTP client for the Larder dashboard REST API.
//!
//! This crate provides a typed client for the dashboard endpoints: profile,
//! inventory, resources, chat, and analytics. Successful responses arrive in
//! a `{ success, data }` envelope; errors carry `{ message }` with a non-2xx
//! status. The bearer token is read from the injected credential store on
//! every request.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use larder_auth::{Credentials, InMemoryCredentialStore};
//! use larder_client::{LarderClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let store = Arc::new(InMemoryCredentialStore::with_credentials(
//!     Credentials::new("token", true),
//! ));
//!
//! let client = LarderClient::builder()
//!     .base_url("https://api.larder.app")
//!     .credentials(store)
//!     .build()?;
//!
//! let profile = client.profile().get().await?;
//! println!("Signed in as {}", profile.username);
//!
//! let items = client
//!     .inventory()
//!     .list(&Default::default())
//!     .await?;
//! println!("{} items in the larder", items.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientBuilder, LarderClient};
pub use error::{Error, Result};
pub use types::*;

// Re-export query types commonly used with list endpoints
pub use api::{ListInventoryQuery, ListResourcesQuery};
