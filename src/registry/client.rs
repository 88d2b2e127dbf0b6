use crate::config::RegistryConfig;
use crate::error::{NetworkError, PullError, Result};
use crate::registry::listing::Listing;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Anything that can produce the listing of a registry location
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch and parse the listing at `url`.
    ///
    /// One attempt, no retries. Callers decide whether a failure is fatal.
    async fn fetch_listing(&self, url: &Url) -> Result<Listing>;
}

/// HTTP(S) client for directory-listing registries
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    listing_timeout: Duration,
}

impl RegistryClient {
    /// Create a client; `verify_tls = false` accepts any certificate
    pub fn new(verify_tls: bool, listing_timeout: Duration) -> Result<Self> {
        let http = build_http_client(verify_tls)?;
        Ok(Self {
            http,
            listing_timeout,
        })
    }

    /// Create a client from the registry section of the config
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::new(config.verify_tls, config.listing_timeout())
    }

    /// Underlying HTTP client, shared with the downloader
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl ListingSource for RegistryClient {
    async fn fetch_listing(&self, url: &Url) -> Result<Listing> {
        tracing::debug!("GET {url}");

        let response = self
            .http
            .get(url.clone())
            .timeout(self.listing_timeout)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PullError::Network(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NetworkError::from_reqwest(url.as_str(), &e))?;

        let listing = Listing::parse_html(&body);
        tracing::debug!("{} entries at {url}", listing.entries.len());
        Ok(listing)
    }
}

/// Build the shared reqwest client
pub(crate) fn build_http_client(verify_tls: bool) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("regpull/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|e| PullError::Config(format!("Failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::listing::Entry;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> RegistryClient {
        RegistryClient::new(true, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_listing_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reg/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="../">../</a><a href="alma9/">alma9/</a><a href="rocky9/">rocky9/</a>"#,
            ))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/reg/", server.uri())).unwrap();
        let listing = client().fetch_listing(&url).await.unwrap();
        assert_eq!(listing.entries, vec![Entry::dir("alma9"), Entry::dir("rocky9")]);
    }

    #[tokio::test]
    async fn test_fetch_listing_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing/", server.uri())).unwrap();
        let err = client().fetch_listing(&url).await.unwrap_err();
        assert!(matches!(
            err,
            PullError::Network(NetworkError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_listing_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<a href=\"x/\">x/</a>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = RegistryClient::new(true, Duration::from_millis(200)).unwrap();
        let url = Url::parse(&format!("{}/slow/", server.uri())).unwrap();
        let err = client.fetch_listing(&url).await.unwrap_err();
        assert!(matches!(err, PullError::Network(NetworkError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let err = client().fetch_listing(&url).await.unwrap_err();
        assert!(matches!(
            err,
            PullError::Network(NetworkError::Transport { .. })
        ));
    }
}
