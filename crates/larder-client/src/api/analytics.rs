//! Analytics API.

use crate::client::LarderClient;
use crate::error::Result;
use crate::types::AnalyticsSummary;

/// Analytics API client.
pub struct AnalyticsApi {
    client: LarderClient,
}

impl AnalyticsApi {
    pub(crate) fn new(client: LarderClient) -> Self {
        Self { client }
    }

    /// Fetch the spending/nutrition summary for the current month.
    pub async fn summary(&self) -> Result<AnalyticsSummary> {
        self.client.get("analytics/summary").await
    }
}
