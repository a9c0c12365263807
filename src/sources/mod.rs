//! Source adapters and the engine that drives them.
//!
//! An adapter knows one site: how to build its URLs and how to turn its
//! pages into records. [`Catalog`] owns the fetch path (plain HTTP or a
//! browser session), runs the adapter's parsers over the fetched document
//! and returns the records.

pub mod mangahasu;
pub mod mangapark;

use crate::browser::{
    run_in_browser, ChromeLauncher, InterceptionPolicy, Launcher, PageLoader, SessionOptions, WaitFor,
};
use crate::channel::{deliver, Listener};
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::extract::Document;
use crate::http_client::HttpFetcher;
use crate::pipeline::{FetchStage, FetchTracker};
use std::sync::Arc;

/// How an adapter's pages are retrieved.
#[derive(Debug, Clone)]
pub enum FetchMode {
    /// Plain GET; the markup needs no JavaScript
    Plain,
    /// Rendered in a browser session gated by the policy
    Browser(Arc<InterceptionPolicy>),
}

/// A page to fetch and the condition marking it ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub wait: WaitFor,
}

impl PageRequest {
    pub fn new(url: impl Into<String>, wait: WaitFor) -> Self {
        Self {
            url: url.into(),
            wait,
        }
    }
}

pub trait SourceAdapter: Send + Sync + 'static {
    type Search: Send + 'static;
    type Meta: Send + 'static;
    type Latest: Send + 'static;

    fn name(&self) -> &'static str;

    fn base_url(&self) -> &str;

    fn fetch_mode(&self) -> FetchMode;

    fn search_request(&self, query: &str, page: u32) -> Result<PageRequest>;

    fn parse_search(&self, doc: &Document, tracker: &mut FetchTracker) -> Vec<Self::Search>;

    fn meta_request(&self, url: &str) -> Result<PageRequest>;

    fn parse_meta(&self, doc: &Document, tracker: &mut FetchTracker) -> Self::Meta;

    fn latest_request(&self, page: u32) -> Result<PageRequest>;

    fn parse_latest(&self, doc: &Document, tracker: &mut FetchTracker) -> Vec<Self::Latest>;
}

pub fn validate_query(query: &str) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ScrapeError::validation("search query must not be empty"));
    }
    Ok(query.to_string())
}

pub fn validate_page(page: u32) -> Result<()> {
    if page == 0 {
        return Err(ScrapeError::validation("page numbers start at 1"));
    }
    Ok(())
}

/// `url` must be an http(s) URL on the same host as `base_url`.
pub fn validate_manga_url(base_url: &str, url: &str) -> Result<()> {
    let host = |u: &str| -> Option<String> {
        let rest = u
            .strip_prefix("https://")
            .or_else(|| u.strip_prefix("http://"))?;
        let host = rest.split(['/', '?', '#']).next()?.to_ascii_lowercase();
        Some(host.trim_start_matches("www.").to_string())
    };

    match (host(base_url), host(url.trim())) {
        (Some(expected), Some(actual)) if expected == actual => Ok(()),
        (_, None) => Err(ScrapeError::validation(format!("not a valid URL: {:?}", url))),
        _ => Err(ScrapeError::validation(format!(
            "{} does not belong to {}",
            url, base_url
        ))),
    }
}

/// Drives one adapter over the plain or browser fetch path.
pub struct Catalog<A, L = ChromeLauncher> {
    adapter: Arc<A>,
    http: HttpFetcher,
    launcher: Arc<L>,
    options: SessionOptions,
    /// Replaces the adapter's own policy on the browser path
    policy: Option<Arc<InterceptionPolicy>>,
}

impl<A: SourceAdapter> Catalog<A, ChromeLauncher> {
    pub fn new(adapter: A) -> Result<Self> {
        Ok(Self::with_parts(
            adapter,
            HttpFetcher::new()?,
            Arc::new(ChromeLauncher::new()),
            SessionOptions::default(),
        ))
    }

    /// Build from `config.toml` settings. A declared `[interception]`
    /// table becomes the policy of every browser-path fetch.
    pub fn from_config(adapter: A, config: &Config) -> Result<Self> {
        let catalog = Self::with_parts(
            adapter,
            config.http_fetcher()?,
            Arc::new(ChromeLauncher::new()),
            config.session_options(),
        );
        Ok(match config.interception_policy() {
            Some(policy) => catalog.with_policy(policy),
            None => catalog,
        })
    }
}

impl<A, L> Catalog<A, L>
where
    A: SourceAdapter,
    L: Launcher,
    L::Page: PageLoader,
{
    pub fn with_parts(adapter: A, http: HttpFetcher, launcher: Arc<L>, options: SessionOptions) -> Self {
        Self {
            adapter: Arc::new(adapter),
            http,
            launcher,
            options,
            policy: None,
        }
    }

    /// Use `policy` instead of the adapter's for browser-path fetches.
    pub fn with_policy(mut self, policy: InterceptionPolicy) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    /// The adapter's fetch mode with any configured policy applied.
    pub fn fetch_mode(&self) -> FetchMode {
        match (self.adapter.fetch_mode(), &self.policy) {
            (FetchMode::Browser(_), Some(policy)) => FetchMode::Browser(Arc::clone(policy)),
            (mode, _) => mode,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// One page of search results. No results is an empty list.
    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<A::Search>> {
        let request = self.adapter.search_request(query, page)?;
        log::info!("[{}] search {:?} page {}", self.adapter.name(), query, page);
        self.fetch(request, |adapter, doc, tracker| adapter.parse_search(doc, tracker))
            .await
    }

    pub async fn manga_meta(&self, url: &str) -> Result<A::Meta> {
        let request = self.adapter.meta_request(url)?;
        log::info!("[{}] metadata for {}", self.adapter.name(), url);
        self.fetch(request, |adapter, doc, tracker| adapter.parse_meta(doc, tracker))
            .await
    }

    pub async fn latest(&self, page: u32) -> Result<Vec<A::Latest>> {
        let request = self.adapter.latest_request(page)?;
        log::info!("[{}] latest page {}", self.adapter.name(), page);
        self.fetch(request, |adapter, doc, tracker| adapter.parse_latest(doc, tracker))
            .await
    }

    /// [`Catalog::search`], also showing the outcome to `listener`.
    pub async fn search_with(
        &self,
        query: &str,
        page: u32,
        listener: Option<Listener<Vec<A::Search>>>,
    ) -> Result<Vec<A::Search>> {
        deliver(self.search(query, page), listener).await
    }

    pub async fn manga_meta_with(&self, url: &str, listener: Option<Listener<A::Meta>>) -> Result<A::Meta> {
        deliver(self.manga_meta(url), listener).await
    }

    pub async fn latest_with(
        &self,
        page: u32,
        listener: Option<Listener<Vec<A::Latest>>>,
    ) -> Result<Vec<A::Latest>> {
        deliver(self.latest(page), listener).await
    }

    async fn fetch<R, P>(&self, request: PageRequest, parse: P) -> Result<R>
    where
        R: Send + 'static,
        P: FnOnce(&A, &Document, &mut FetchTracker) -> R + Send + 'static,
    {
        match self.fetch_mode() {
            FetchMode::Plain => {
                let mut tracker = FetchTracker::new(&request.url);
                tracker.advance(FetchStage::Navigating);
                let body = match self.http.get_text(&request.url).await {
                    Ok(body) => body,
                    Err(e) => return Err(tracker.fail(e)),
                };

                let doc = Document::parse(&body);
                tracker.advance(FetchStage::Extracting);
                let out = parse(&*self.adapter, &doc, &mut tracker);
                tracker.advance(FetchStage::Assembled);
                Ok(out)
            }
            FetchMode::Browser(policy) => {
                let adapter = Arc::clone(&self.adapter);
                run_in_browser(Arc::clone(&self.launcher), &self.options, policy, move |page| {
                    let mut tracker = FetchTracker::new(&request.url);
                    let doc = page.load(&request.url, &request.wait, &mut tracker)?;
                    let out = parse(&*adapter, &doc, &mut tracker);
                    tracker.advance(FetchStage::Assembled);
                    Ok(out)
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  one piece ").unwrap(), "one piece");
        assert!(matches!(validate_query("   "), Err(ScrapeError::Validation(_))));
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1).is_ok());
        assert!(validate_page(0).is_err());
    }

    #[test]
    fn test_validate_manga_url() {
        let base = "https://mangapark.net";
        assert!(validate_manga_url(base, "https://mangapark.net/comic/1/x").is_ok());
        assert!(validate_manga_url(base, "https://www.mangapark.net/comic/1/x").is_ok());
        assert!(validate_manga_url(base, "https://other.net/comic/1/x").is_err());
        assert!(validate_manga_url(base, "").is_err());
        assert!(validate_manga_url(base, "ftp://mangapark.net/x").is_err());
    }
}
