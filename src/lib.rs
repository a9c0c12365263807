//! Scraping engine for manga catalog sites.
//!
//! Source adapters describe one site each; a [`sources::Catalog`] drives an
//! adapter over either a plain HTTP fetch or a throwaway headless browser
//! session gated by a resource interception policy, then runs the adapter's
//! extractors over the fetched document.

pub mod browser;
pub mod channel;
pub mod config;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod models;
pub mod pipeline;
pub mod sources;

pub use error::{FieldError, Result, ScrapeError};
