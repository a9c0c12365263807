use crate::error::{Result, ScrapeError};
use crate::extract::Document;
use crate::pipeline::{FetchStage, FetchTracker};
use headless_chrome::Tab;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What a page must reach before it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitFor {
    /// An element matching the CSS selector is present
    Selector(String),
    /// `DOMContentLoaded` has fired
    ContentLoaded,
}

impl WaitFor {
    pub fn selector(selector: impl Into<String>) -> Self {
        Self::Selector(selector.into())
    }
}

/// Live page handle passed to page scripts
pub struct BrowserPage {
    tab: Arc<Tab>,
    wait_timeout: Duration,
}

impl BrowserPage {
    pub fn new(tab: Arc<Tab>, wait_timeout: Duration) -> Self {
        Self { tab, wait_timeout }
    }

    /// Navigate to a URL and wait for the navigation to commit
    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| ScrapeError::automation(format!("Failed to navigate to {}", url), e))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| ScrapeError::automation(format!("Navigation timeout for {}", url), e))?;

        Ok(())
    }

    pub fn wait_for(&self, condition: &WaitFor) -> Result<()> {
        match condition {
            WaitFor::Selector(selector) => self.wait_for_selector(selector),
            WaitFor::ContentLoaded => self.wait_for_content_loaded(),
        }
    }

    pub fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, self.wait_timeout)
            .map(|_| ())
            .map_err(|e| ScrapeError::automation(format!("Timed out waiting for selector {}", selector), e))
    }

    pub fn wait_for_content_loaded(&self) -> Result<()> {
        let start = Instant::now();

        loop {
            let state = self.evaluate("document.readyState")?;
            if matches!(state.as_str(), Some("interactive") | Some("complete")) {
                return Ok(());
            }
            if start.elapsed() > self.wait_timeout {
                return Err(ScrapeError::automation_msg(format!(
                    "Timed out waiting for DOMContentLoaded after {:?}",
                    self.wait_timeout
                )));
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    /// Evaluate a JavaScript expression, awaiting it if it is a promise
    pub fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(expression, true)
            .map_err(|e| ScrapeError::automation("JavaScript evaluation failed", e))?;

        Ok(result.value.unwrap_or(Value::Null))
    }

    /// Serialized HTML of the current DOM
    pub fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| ScrapeError::automation("Failed to read page content", e))
    }

    /// Snapshot the current DOM into a parsed document
    pub fn document(&self) -> Result<Document> {
        Ok(Document::parse(&self.content()?))
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}

/// Something that can navigate to a URL and hand back its rendered DOM.
pub trait PageLoader {
    /// Navigate, wait for `condition` and snapshot the DOM, recording each
    /// stage on `tracker`.
    fn load(&self, url: &str, condition: &WaitFor, tracker: &mut FetchTracker) -> Result<Document>;
}

impl PageLoader for BrowserPage {
    fn load(&self, url: &str, condition: &WaitFor, tracker: &mut FetchTracker) -> Result<Document> {
        tracker.advance(FetchStage::Navigating);
        self.navigate(url).map_err(|e| tracker.fail(e))?;

        tracker.advance(FetchStage::WaitingForSelector);
        self.wait_for(condition).map_err(|e| tracker.fail(e))?;

        let document = self.document().map_err(|e| tracker.fail(e))?;
        tracker.advance(FetchStage::Extracting);
        Ok(document)
    }
}
