//! Plain (non-JS) fetch path: one GET, parsed into a [`Document`].

use crate::browser::config::random_user_agent;
use crate::error::{Result, ScrapeError};
use crate::extract::Document;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Configuration for the plain HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub enable_cookies: bool,
    pub enable_gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            enable_cookies: true,
            enable_gzip: true,
        }
    }
}

/// Fetches pages that render without JavaScript
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(random_user_agent())
            .cookie_store(config.enable_cookies)
            .gzip(config.enable_gzip)
            .brotli(config.enable_gzip)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one shared with other code
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        if url.trim().is_empty() {
            return Err(ScrapeError::validation("URL must not be empty"));
        }

        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    pub async fn fetch_document(&self, url: &str) -> Result<Document> {
        let body = self.get_text(url).await?;
        Ok(Document::parse(&body))
    }
}
