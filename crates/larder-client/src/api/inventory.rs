//! Inventory API.

use serde::Serialize;

use crate::client::LarderClient;
use crate::error::Result;
use crate::types::{InventoryItem, InventoryItemPatch, NewInventoryItem};

/// Query parameters for listing inventory items.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListInventoryQuery {
    /// Filter by category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Inventory API client.
pub struct InventoryApi {
    client: LarderClient,
}

impl InventoryApi {
    pub(crate) fn new(client: LarderClient) -> Self {
        Self { client }
    }

    /// List inventory items, optionally filtered by category.
    pub async fn list(&self, query: &ListInventoryQuery) -> Result<Vec<InventoryItem>> {
        self.client.get_with_query("inventory", query).await
    }

    /// Add an item to the inventory.
    pub async fn create(&self, item: &NewInventoryItem) -> Result<InventoryItem> {
        self.client.post("inventory", item).await
    }

    /// Update an item.
    pub async fn update(&self, id: &str, patch: &InventoryItemPatch) -> Result<InventoryItem> {
        self.client.put(&format!("inventory/{}", id), patch).await
    }

    /// Remove an item.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("inventory/{}", id)).await
    }
}
