use crate::error::{NetworkError, PullError, Result};
use crate::registry::client::ListingSource;
use crate::registry::listing::{Entry, Listing};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// In-memory listing source; unknown URLs answer with HTTP 404
#[derive(Debug, Default)]
pub struct FakeSource {
    pages: HashMap<String, Listing>,
    requests: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, entries: Vec<Entry>) -> Self {
        self.pages.insert(url.to_string(), Listing::new(entries));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn fetch_listing(&self, url: &Url) -> Result<Listing> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url.as_str()).cloned().ok_or_else(|| {
            PullError::Network(NetworkError::Status {
                url: url.to_string(),
                status: 404,
            })
        })
    }
}
