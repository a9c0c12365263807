//! MangaHasu: rendered client-side and gated by bot checks, so every page
//! goes through a browser session.
//!
//! Only documents, scripts and XHR/fetch calls are let through; images,
//! fonts and stylesheets are not needed to read the markup. Known ad and
//! tracker hosts are blocked outright.

use super::{validate_manga_url, validate_page, validate_query, FetchMode, PageRequest, SourceAdapter};
use crate::browser::{InterceptionPolicy, InterceptionRule, WaitFor};
use crate::error::Result;
use crate::extract::{absolute_url, attr_in, parse_rating, require, text_in, texts_in, Document};
use crate::models::{ChapterLink, LatestHotManga, Manga, MangaChapters, MangaMeta};
use crate::pipeline::FetchTracker;
use scraper::ElementRef;
use std::sync::Arc;

pub const BASE_URL: &str = "https://mangahasu.se";

pub const BLOCKED_DOMAINS: &[&str] = &[
    "https://www.googletagmanager.com",
    "https://www.google-analytics.com",
    "https://pagead2.googlesyndication.com",
    "https://cdn.onesignal.com",
    "doubleclick.net",
    "adsterra.com",
    "popads.net",
];

pub const ALLOWED_RESOURCES: &[&str] = &["document", "script", "xhr", "fetch"];

/// Bucket name for the single chapter list this site publishes
pub const CHAPTER_BUCKET: &str = "mangahasu";

#[derive(Debug, Clone)]
pub struct MangaHasu {
    base_url: String,
    policy: Arc<InterceptionPolicy>,
}

impl Default for MangaHasu {
    fn default() -> Self {
        Self::new()
    }
}

impl MangaHasu {
    pub fn new() -> Self {
        Self::with_policy(Self::default_policy())
    }

    /// Use a caller-supplied interception policy, e.g. from `config.toml`
    pub fn with_policy(policy: InterceptionPolicy) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            policy: Arc::new(policy),
        }
    }

    pub fn default_policy() -> InterceptionPolicy {
        InterceptionPolicy::new(vec![
            InterceptionRule::block_domains(BLOCKED_DOMAINS.iter().copied()),
            InterceptionRule::allow_resources(ALLOWED_RESOURCES.iter().copied()),
        ])
    }

    pub fn policy(&self) -> &InterceptionPolicy {
        &self.policy
    }

    fn listing_row(&self, row: &ElementRef<'_>) -> Option<(String, String, Option<String>)> {
        let title = text_in(row, "a.name-manga h3").or_else(|| text_in(row, "a.name-manga"))?;
        let href = attr_in(row, "a.name-manga", "href")?;
        let cover = attr_in(row, "div.wrapper_imgage img", "data-src")
            .or_else(|| attr_in(row, "div.wrapper_imgage img", "src"))
            .map(|src| absolute_url(&self.base_url, &src));
        Some((title, absolute_url(&self.base_url, &href), cover))
    }
}

/// The `div.detail_item` row whose `<b>` label reads `label`.
fn detail<'a>(doc: &'a Document, label: &str) -> Option<ElementRef<'a>> {
    let label = label.to_lowercase();
    doc.select("div.detail_item")
        .into_iter()
        .find(|row| {
            text_in(row, "b")
                .map(|b| b.trim_end_matches(':').to_lowercase() == label)
                .unwrap_or(false)
        })
}

fn detail_links(doc: &Document, label: &str) -> Vec<String> {
    detail(doc, label)
        .map(|row| texts_in(&row, "span.info a"))
        .unwrap_or_default()
}

impl SourceAdapter for MangaHasu {
    type Search = Manga;
    type Meta = MangaMeta;
    type Latest = LatestHotManga;

    fn name(&self) -> &'static str {
        "mangahasu"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::Browser(Arc::clone(&self.policy))
    }

    fn search_request(&self, query: &str, page: u32) -> Result<PageRequest> {
        let query = validate_query(query)?;
        validate_page(page)?;
        Ok(PageRequest::new(
            format!(
                "{}/advanced-search.html?keyword={}&page={}",
                self.base_url,
                urlencoding::encode(&query),
                page
            ),
            WaitFor::ContentLoaded,
        ))
    }

    fn parse_search(&self, doc: &Document, _tracker: &mut FetchTracker) -> Vec<Manga> {
        doc.select("ul.list_manga li")
            .iter()
            .filter_map(|row| {
                let (title, url, cover_url) = self.listing_row(row)?;
                Some(Manga {
                    title,
                    url,
                    cover_url,
                    authors: texts_in(row, "a.name-author"),
                    genres: Vec::new(),
                })
            })
            .collect()
    }

    fn meta_request(&self, url: &str) -> Result<PageRequest> {
        validate_manga_url(&self.base_url, url)?;
        Ok(PageRequest::new(url.trim(), WaitFor::selector("div.info-title")))
    }

    fn parse_meta(&self, doc: &Document, tracker: &mut FetchTracker) -> MangaMeta {
        let title = tracker.field(require(doc.first_text("div.info-title h1"), "title"));

        let alt_titles = doc
            .first_text("div.info-title h3")
            .map(|a| {
                a.split(';')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rating_label = require(doc.first_text("div.div-evaluate span.rating-label"), "rating");
        let rating = tracker.field(rating_label.and_then(|label| parse_rating(&label)));

        let chapters = doc
            .select("div.list-chapter tr")
            .iter()
            .filter_map(|row| {
                let href = attr_in(row, "td.name a", "href")?;
                Some(ChapterLink {
                    name: text_in(row, "td.name a").unwrap_or_default(),
                    url: absolute_url(&self.base_url, &href),
                    uploaded: text_in(row, "td.date-updated"),
                })
            })
            .collect();

        MangaMeta {
            title,
            alt_titles,
            cover_url: doc
                .first_attr("div.info-img img", "src")
                .map(|src| absolute_url(&self.base_url, &src)),
            summary: doc.first_text("div.content-info div").unwrap_or_default(),
            status: detail(doc, "Status").and_then(|row| text_in(&row, "span.info")),
            authors: detail_links(doc, "Author(s)"),
            genres: detail_links(doc, "Genre(s)"),
            rating,
            chapters: vec![MangaChapters {
                bucket: CHAPTER_BUCKET.to_string(),
                chapters,
            }],
        }
    }

    fn latest_request(&self, page: u32) -> Result<PageRequest> {
        validate_page(page)?;
        Ok(PageRequest::new(
            format!("{}/latest-releases.html?page={}", self.base_url, page),
            WaitFor::selector("ul.list_manga"),
        ))
    }

    fn parse_latest(&self, doc: &Document, _tracker: &mut FetchTracker) -> Vec<LatestHotManga> {
        doc.select("ul.list_manga li")
            .iter()
            .filter_map(|row| {
                let (title, url, cover_url) = self.listing_row(row)?;
                let latest_chapter = attr_in(row, "a.name-chapter", "href").map(|href| ChapterLink {
                    name: text_in(row, "a.name-chapter").unwrap_or_default(),
                    url: absolute_url(&self.base_url, &href),
                    uploaded: None,
                });
                Some(LatestHotManga {
                    title,
                    url,
                    cover_url,
                    latest_chapter,
                })
            })
            .collect()
    }
}
