use rand::seq::SliceRandom;
use std::ffi::OsString;
use std::time::Duration;

/// Desktop Chrome user agents; one is drawn at random per launch.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Pick a user agent from the pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Per-operation options for a browser session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Route traffic through `host:port`
    pub proxy: Option<String>,

    /// Visible browser, verbose interception logging
    pub debug: bool,

    /// Upper bound for the whole operation, including launch and teardown
    pub timeout: Duration,

    /// Default wait for navigation and selectors inside the page
    pub wait_timeout: Duration,

    pub window_size: (u32, u32),
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            debug: false,
            timeout: Duration::from_secs(60),
            wait_timeout: Duration::from_secs(30),
            window_size: (1920, 1080),
        }
    }
}

impl SessionOptions {
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn debug_mode() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    pub fn headless(&self) -> bool {
        !self.debug
    }

    /// Hardened Chrome argument set for one launch
    pub fn chrome_args(&self, user_agent: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
            "--ignore-certificate-errors",
            "--ignore-certificate-errors-spki-list",
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-infobars",
            "--disable-extensions",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push(format!("--window-size={},{}", self.window_size.0, self.window_size.1).into());
        args.push(format!("--user-agent={}", user_agent).into());

        if let Some(proxy) = &self.proxy {
            args.push(format!("--proxy-server={}", proxy).into());
        }

        args
    }
}
