//! MangaPark: server-rendered, read over the plain fetch path.
//!
//! Search rows list their authors as a flat run closed by an
//! `Authors/Artists:` label, so authors are read with the run-grouping
//! extractor, scoped to each row's own author block. Chapter lists are published
//! per source bucket, each list preceded by a header naming the bucket.

use super::{validate_manga_url, validate_page, validate_query, FetchMode, PageRequest, SourceAdapter};
use crate::browser::WaitFor;
use crate::error::{FieldError, Result};
use crate::extract::{
    absolute_url, attr_in, classify_buckets, first_in, group_children, parse_rating, require, text_in,
    text_marker, texts_in, BucketLayout, Document,
};
use crate::models::{ChapterLink, LatestHotManga, Manga, MangaMeta};
use crate::pipeline::FetchTracker;
use scraper::ElementRef;

pub const BASE_URL: &str = "https://mangapark.net";

/// Chapter source buckets, in display order
pub const BUCKETS: &[&str] = &["duck", "rock", "fox", "panda", "mini"];

const AUTHOR_MARKER: &str = "Authors/Artists:";

const SEARCH_ROW: &str = "#search-list div.item";
const ROW_AUTHORS: &str = "div.item-author";

const CHAPTERS: BucketLayout<'static> = BucketLayout {
    block: "div.chapters ul.chapter",
    header: "h4.source",
    row: "li",
    link: "a",
    uploaded: Some("i.time"),
};

#[derive(Debug, Clone)]
pub struct MangaPark {
    base_url: String,
}

impl Default for MangaPark {
    fn default() -> Self {
        Self::new()
    }
}

impl MangaPark {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point at a mirror
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn manga_row(&self, row: &ElementRef<'_>, authors: Vec<String>) -> Option<Manga> {
        let title = text_in(row, "a.item-title")?;
        let href = attr_in(row, "a.item-title", "href")?;

        Some(Manga {
            title,
            url: absolute_url(&self.base_url, &href),
            cover_url: attr_in(row, "a.item-cover img", "src").map(|src| absolute_url(&self.base_url, &src)),
            authors,
            genres: texts_in(row, "div.item-genre span"),
        })
    }
}

/// The `div.attr-item` whose `<b>` label reads `label`.
fn attr_item<'a>(doc: &'a Document, label: &str) -> Option<ElementRef<'a>> {
    doc.select("div.attr-item")
        .into_iter()
        .find(|item| text_in(item, "b").map_or(false, |b| b.eq_ignore_ascii_case(label)))
}

/// Comma-separated values under a labeled attribute.
fn attr_list(
    doc: &Document,
    label: &'static str,
    item_selector: &str,
) -> std::result::Result<Vec<String>, FieldError> {
    let item = attr_item(doc, label).ok_or_else(|| FieldError::new(label, "label not found"))?;
    Ok(texts_in(&item, item_selector)
        .iter()
        .flat_map(|t| t.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

impl SourceAdapter for MangaPark {
    type Search = Manga;
    type Meta = MangaMeta;
    type Latest = LatestHotManga;

    fn name(&self) -> &'static str {
        "mangapark"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::Plain
    }

    fn search_request(&self, query: &str, page: u32) -> Result<PageRequest> {
        let query = validate_query(query)?;
        validate_page(page)?;
        Ok(PageRequest::new(
            format!(
                "{}/search?word={}&page={}",
                self.base_url,
                urlencoding::encode(&query),
                page
            ),
            WaitFor::ContentLoaded,
        ))
    }

    fn parse_search(&self, doc: &Document, _tracker: &mut FetchTracker) -> Vec<Manga> {
        let is_marker = text_marker(AUTHOR_MARKER);

        doc.select(SEARCH_ROW)
            .iter()
            .filter_map(|row| {
                let authors = first_in(row, ROW_AUTHORS)
                    .map(|block| group_children(&block, &is_marker).into_iter().flatten().collect())
                    .unwrap_or_default();
                self.manga_row(row, authors)
            })
            .collect()
    }

    fn meta_request(&self, url: &str) -> Result<PageRequest> {
        validate_manga_url(&self.base_url, url)?;
        Ok(PageRequest::new(url.trim(), WaitFor::selector("h3.item-title")))
    }

    fn parse_meta(&self, doc: &Document, tracker: &mut FetchTracker) -> MangaMeta {
        let title = tracker.field(require(doc.first_text("h3.item-title"), "title"));

        let alt_titles = doc
            .first_text("div.alias-set")
            .map(|a| {
                a.split(" / ")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rating_label = require(doc.first_text("div.rating-display"), "rating");
        let rating = tracker.field(rating_label.and_then(|label| parse_rating(&label)));

        MangaMeta {
            title,
            alt_titles,
            cover_url: doc
                .first_attr("div.attr-cover img", "src")
                .map(|src| absolute_url(&self.base_url, &src)),
            summary: doc.first_text("div.limit-html").unwrap_or_default(),
            status: attr_item(doc, "Status:").and_then(|item| text_in(&item, "span")),
            authors: tracker.field(attr_list(doc, "Authors:", "span a")),
            genres: tracker.field(attr_list(doc, "Genres:", "span")),
            rating,
            chapters: classify_buckets(doc, &CHAPTERS, BUCKETS, &self.base_url),
        }
    }

    fn latest_request(&self, page: u32) -> Result<PageRequest> {
        validate_page(page)?;
        Ok(PageRequest::new(
            format!("{}/latest/{}", self.base_url, page),
            WaitFor::ContentLoaded,
        ))
    }

    fn parse_latest(&self, doc: &Document, _tracker: &mut FetchTracker) -> Vec<LatestHotManga> {
        doc.select("#release-list div.item")
            .iter()
            .filter_map(|row| {
                let title = text_in(row, "a.item-title")?;
                let href = attr_in(row, "a.item-title", "href")?;

                let latest_chapter = attr_in(row, "a.item-chapter", "href").map(|ch| ChapterLink {
                    name: text_in(row, "a.item-chapter").unwrap_or_default(),
                    url: absolute_url(&self.base_url, &ch),
                    uploaded: text_in(row, "i.item-time"),
                });

                Some(LatestHotManga {
                    title,
                    url: absolute_url(&self.base_url, &href),
                    cover_url: attr_in(row, "a.item-cover img", "src")
                        .map(|src| absolute_url(&self.base_url, &src)),
                    latest_chapter,
                })
            })
            .collect()
    }
}
