//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use larder_auth::SharedCredentialStore;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use url::Url;

use crate::api::{AnalyticsApi, ChatApi, InventoryApi, ProfileApi, ResourcesApi};
use crate::error::{Error, ErrorResponse, Result};
use crate::types::Envelope;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Larder API client.
///
/// Provides typed access to the dashboard REST endpoints. The bearer token is
/// re-read from the credential store on every request; the client never holds
/// a copy, so a logout elsewhere takes effect on the next call.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use larder_auth::InMemoryCredentialStore;
/// use larder_client::LarderClient;
///
/// # async fn example() -> larder_client::Result<()> {
/// let client = LarderClient::builder()
///     .base_url("http://localhost:8080")
///     .credentials(Arc::new(InMemoryCredentialStore::new()))
///     .build()?;
///
/// let profile = client.profile().get().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LarderClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Persisted credential store, read per request.
    pub(crate) credentials: SharedCredentialStore,
}

impl LarderClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Get the credential store this client reads tokens from.
    pub fn credentials(&self) -> &SharedCredentialStore {
        &self.inner.credentials
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the profile API.
    pub fn profile(&self) -> ProfileApi {
        ProfileApi::new(self.clone())
    }

    /// Access the inventory API.
    pub fn inventory(&self) -> InventoryApi {
        InventoryApi::new(self.clone())
    }

    /// Access the resources API.
    pub fn resources(&self) -> ResourcesApi {
        ResourcesApi::new(self.clone())
    }

    /// Access the chat API.
    pub fn chat(&self) -> ChatApi {
        ChatApi::new(self.clone())
    }

    /// Access the analytics API.
    pub fn analytics(&self) -> AnalyticsApi {
        AnalyticsApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(&format!("api/v1/{}", path))
            .map_err(Error::from)
    }

    /// Start a request, attaching the bearer token read from the store.
    ///
    /// The store is consulted on every call; credentials are process-wide
    /// mutable state and must not be cached across requests.
    async fn request(&self, method: Method, url: Url) -> Result<reqwest::RequestBuilder> {
        let mut builder = self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout);

        if let Some(credentials) = self.inner.credentials.load().await? {
            builder = builder.bearer_auth(credentials.token);
        }

        Ok(builder)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = self.request(Method::GET, url).await?.send().await?;
        self.handle_response(response).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let response = self
            .request(Method::GET, url)
            .await?
            .query(query)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a POST request.
    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let response = self
            .request(Method::POST, url)
            .await?
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a PUT request.
    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let response = self
            .request(Method::PUT, url)
            .await?
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Make a DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path)?;
        let response = self.request(Method::DELETE, url).await?.send().await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        Ok(())
    }

    /// Handle a response, unwrapping the `{ success, data }` envelope.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(self.extract_error(response).await);
        }

        let envelope: Envelope<T> = response.json().await?;

        if !envelope.success {
            let message = envelope
                .message
                .unwrap_or_else(|| "request reported failure".to_string());
            tracing::warn!(status = status.as_u16(), message = %message, "Envelope reported failure");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        envelope.data.ok_or(Error::Api {
            status: status.as_u16(),
            message: "missing data in response envelope".to_string(),
        })
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        // Error bodies are `{ "message": ... }`.
        match response.json::<ErrorResponse>().await {
            Ok(err) => {
                if status == 404 {
                    Error::NotFound(err.message)
                } else if status == 401 {
                    Error::Auth(err.message)
                } else {
                    Error::Api {
                        status,
                        message: err.message,
                    }
                }
            }
            Err(_) => {
                if status == 401 {
                    Error::Auth(format!("HTTP {}", status))
                } else {
                    Error::Api {
                        status,
                        message: format!("HTTP {}", status),
                    }
                }
            }
        }
    }
}

/// Builder for creating a LarderClient.
pub struct ClientBuilder {
    base_url: Option<String>,
    credentials: Option<SharedCredentialStore>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL for the server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the credential store to read bearer tokens from.
    pub fn credentials(mut self, store: SharedCredentialStore) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<LarderClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        let credentials = self
            .credentials
            .ok_or_else(|| Error::Config("credential store is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("larder-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(LarderClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                credentials,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_auth::InMemoryCredentialStore;

    fn test_store() -> SharedCredentialStore {
        Arc::new(InMemoryCredentialStore::new())
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().credentials(test_store()).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_requires_credential_store() {
        let result = ClientBuilder::new().base_url("http://localhost:8080").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8080")
            .credentials(test_store())
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_url_building() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8080")
            .credentials(test_store())
            .build()
            .unwrap();

        let url = client.url("users/me").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/users/me");

        let url = client.url("/users/me").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/users/me");
    }
}
