use crate::browser::{InterceptionPolicy, PolicyConfig, SessionOptions};
use crate::error::{Result, ScrapeError};
use crate::http_client::{HttpClientConfig, HttpFetcher};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub http: HttpSettings,
    /// Default interception policy for browser-rendered sources
    #[serde(default)]
    pub interception: Option<PolicyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    /// Browser headless mode
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Upper bound for one browser operation in seconds
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,

    /// Wait for navigation and selectors in seconds
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    /// `host:port` proxy for browser traffic
    #[serde(default)]
    pub proxy: Option<String>,

    /// Visible browser and verbose request logging
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    /// Timeout for HTTP requests in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Enable cookie support
    #[serde(default = "default_true")]
    pub enable_cookies: bool,

    /// Enable gzip/brotli compression
    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

fn default_true() -> bool { true }
fn default_browser_timeout() -> u64 { 60 }
fn default_wait_timeout() -> u64 { 30 }
fn default_http_timeout() -> u64 { 30 }
fn default_window_width() -> u32 { 1920 }
fn default_window_height() -> u32 { 1080 }

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: default_browser_timeout(),
            wait_timeout_secs: default_wait_timeout(),
            proxy: None,
            debug: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            enable_cookies: true,
            enable_compression: true,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if !path.exists() {
            return Self::default();
        }
        Self::from_path(path).unwrap_or_else(|e| {
            log::warn!("Ignoring config.toml: {}", e);
            Self::default()
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ScrapeError::Config(e.to_string()))
    }

    pub fn session_options(&self) -> SessionOptions {
        let b = &self.browser;
        SessionOptions {
            proxy: b.proxy.clone().filter(|p| !p.trim().is_empty()),
            debug: b.debug || !b.headless,
            timeout: Duration::from_secs(b.timeout_secs),
            wait_timeout: Duration::from_secs(b.wait_timeout_secs),
            window_size: (b.window_width, b.window_height),
        }
    }

    /// Configured default policy, if one is declared
    pub fn interception_policy(&self) -> Option<InterceptionPolicy> {
        self.interception.clone().map(InterceptionPolicy::from)
    }

    pub fn http_fetcher(&self) -> Result<HttpFetcher> {
        HttpFetcher::with_config(HttpClientConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            enable_cookies: self.http.enable_cookies,
            enable_gzip: self.http.enable_compression,
        })
    }
}
