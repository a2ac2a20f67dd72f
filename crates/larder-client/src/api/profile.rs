//! Profile API.

use crate::client::LarderClient;
use crate::error::Result;
use crate::types::{UserInfo, UserInfoPatch};

/// Profile API client.
pub struct ProfileApi {
    client: LarderClient,
}

impl ProfileApi {
    pub(crate) fn new(client: LarderClient) -> Self {
        Self { client }
    }

    /// Fetch the authenticated user's profile.
    ///
    /// Returns an auth error when the bearer token is missing or rejected.
    pub async fn get(&self) -> Result<UserInfo> {
        self.client.get("users/me").await
    }

    /// Update profile attributes. Absent patch fields are left untouched.
    pub async fn update(&self, patch: &UserInfoPatch) -> Result<UserInfo> {
        self.client.put("users/me", patch).await
    }
}
