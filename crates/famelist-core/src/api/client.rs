//! Client for the static catalog resource.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{header, Client};
use tracing::debug;

use crate::models::Person;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Path of the catalog resource relative to the site root.
pub const DATA_PATH: &str = "data/personalities.json";

/// HTTP request timeout in seconds.
/// A hung request must not hold up the cache/demo fallback forever.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Anything that can produce a fresh copy of the catalog.
///
/// `ApiClient` is the production implementation; tests plug in fakes.
pub trait RemoteSource: Send + Sync {
    fn fetch_people(&self) -> BoxFuture<'_, Result<Vec<Person>, ApiError>>;

    /// Where the data comes from, for logging.
    fn location(&self) -> &str;
}

/// Client for the catalog resource.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    data_url: String,
}

impl ApiClient {
    /// Create a client for the site at `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            data_url: Self::resolve_data_url(base_url),
        })
    }

    /// A base URL that already names a `.json` resource is used verbatim,
    /// otherwise the catalog path is appended to it.
    fn resolve_data_url(base_url: &str) -> String {
        if base_url.ends_with(".json") {
            base_url.to_string()
        } else {
            format!("{}/{}", base_url.trim_end_matches('/'), DATA_PATH)
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Fetch and decode the whole catalog.
    pub async fn fetch_people(&self) -> Result<Vec<Person>, ApiError> {
        let response = self
            .client
            .get(&self.data_url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        let people: Vec<Person> = serde_json::from_str(&text)?;
        debug!(url = %self.data_url, count = people.len(), "Catalog fetched");

        Ok(people)
    }
}

impl RemoteSource for ApiClient {
    fn fetch_people(&self) -> BoxFuture<'_, Result<Vec<Person>, ApiError>> {
        Box::pin(ApiClient::fetch_people(self))
    }

    fn location(&self) -> &str {
        &self.data_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_url_appends_path() {
        assert_eq!(
            ApiClient::resolve_data_url("https://famelist.example"),
            "https://famelist.example/data/personalities.json"
        );
        assert_eq!(
            ApiClient::resolve_data_url("http://localhost:8080/"),
            "http://localhost:8080/data/personalities.json"
        );
    }

    #[test]
    fn test_resolve_data_url_keeps_full_resource() {
        assert_eq!(
            ApiClient::resolve_data_url("http://cdn.example/list.json"),
            "http://cdn.example/list.json"
        );
    }

    #[test]
    fn test_client_exposes_data_url() {
        let client = ApiClient::new("http://localhost:1").unwrap();
        assert_eq!(client.location(), "http://localhost:1/data/personalities.json");
    }
}
