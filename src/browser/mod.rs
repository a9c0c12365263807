//! Browser automation for JavaScript-gated pages.
//!
//! Every operation gets its own headless Chrome process with a resource
//! interception policy and a stealth script installed before the first
//! navigation. The process is torn down when the operation ends, whatever
//! the outcome.
//!
//! # Example
//!
//! ```no_run
//! use manga_scraper_core::browser::{
//!     run_in_browser, ChromeLauncher, InterceptionPolicy, InterceptionRule, SessionOptions, WaitFor,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> manga_scraper_core::Result<()> {
//! let policy = InterceptionPolicy::new(vec![
//!     InterceptionRule::block_domains(["https://ads.example.net"]),
//!     InterceptionRule::allow_resources(["document", "script", "xhr", "fetch"]),
//! ]);
//!
//! let titles = run_in_browser(
//!     Arc::new(ChromeLauncher::new()),
//!     &SessionOptions::default(),
//!     Arc::new(policy),
//!     |page| {
//!         page.navigate("https://example.com")?;
//!         page.wait_for(&WaitFor::selector("h1"))?;
//!         Ok(page.document()?.select_text("h1"))
//!     },
//! )
//! .await?;
//!
//! println!("{:?}", titles);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod intercept;
pub mod page;
pub mod session;
pub mod stealth;

pub use config::SessionOptions;
pub use intercept::{Decision, InterceptionPolicy, InterceptionRule, MatchKind, PolicyConfig, RuleMode};
pub use page::{BrowserPage, PageLoader, WaitFor};
pub use session::{run_in_browser, ChromeLauncher, Launcher};
