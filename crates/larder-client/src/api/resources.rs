//! Resources API (tips and guides).

use serde::Serialize;

use crate::client::LarderClient;
use crate::error::Result;
use crate::types::Resource;

/// Query parameters for listing resources.
#[derive(Debug, Clone, Serialize)]
pub struct ListResourcesQuery {
    /// Resource category (e.g. "nutrition").
    pub category: String,
    /// Resource kind within the category (e.g. "article").
    pub kind: String,
}

/// Resources API client.
pub struct ResourcesApi {
    client: LarderClient,
}

impl ResourcesApi {
    pub(crate) fn new(client: LarderClient) -> Self {
        Self { client }
    }

    /// List resources for a category/kind pair.
    pub async fn list(&self, query: &ListResourcesQuery) -> Result<Vec<Resource>> {
        self.client.get_with_query("resources", query).await
    }
}
