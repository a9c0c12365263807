//! HTML extraction pipeline.
//!
//! A [`Document`] is parsed once per operation and only read afterwards.
//! Extractors copy every value out into owned `String`s, so nothing
//! borrowed from the tree survives it.
//!
//! # Example
//!
//! ```
//! use manga_scraper_core::extract::{text_marker, Document};
//!
//! let doc = Document::parse(
//!     r#"<div class="info">
//!         <a>Oda</a><span class="label">Authors/Artists:</span>
//!         <a>Kishimoto</a><a>Ikemoto</a><span class="label">Authors/Artists:</span>
//!     </div>"#,
//! );
//!
//! let groups = doc.group_by_sibling_marker("div.info", text_marker("Authors/Artists:"));
//! assert_eq!(groups, vec![vec!["Oda"], vec!["Kishimoto", "Ikemoto"]]);
//! ```

pub mod chapters;
pub mod grouping;
pub mod rating;

pub use chapters::{classify_buckets, BucketLayout};
pub use grouping::{group_runs, ExtractionRun, Sibling};
pub use rating::parse_rating;

use crate::error::FieldError;
use scraper::{ElementRef, Html, Selector};

/// Immutable parsed HTML document.
///
/// Not `Send`: inside a browser session, parse and read it within the page
/// script and return only the extracted records.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Elements matching `selector`, in document order. An invalid selector
    /// is logged and yields no elements.
    pub fn select(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match parse_selector(selector) {
            Ok(sel) => self.html.select(&sel).collect(),
            Err(e) => {
                log::warn!("{}", e);
                Vec::new()
            }
        }
    }

    /// Text of every matching element, whitespace-normalized.
    pub fn select_text(&self, selector: &str) -> Vec<String> {
        self.select(selector).iter().map(element_text).collect()
    }

    /// Attribute of every matching element. Elements lacking the attribute
    /// contribute an empty string so results stay positionally aligned.
    pub fn select_attr(&self, selector: &str, attr: &str) -> Vec<String> {
        self.select(selector)
            .iter()
            .map(|e| e.value().attr(attr).unwrap_or_default().trim().to_string())
            .collect()
    }

    pub fn first_text(&self, selector: &str) -> Option<String> {
        self.select_text(selector)
            .into_iter()
            .find(|t| !t.is_empty())
    }

    pub fn first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        self.select_attr(selector, attr)
            .into_iter()
            .find(|t| !t.is_empty())
    }

    /// Split the element children of every `container_selector` match into
    /// runs terminated by marker elements. See [`ExtractionRun`].
    ///
    /// Each container is grouped on its own: a run left open at the end of
    /// one container is discarded, never carried into the next.
    pub fn group_by_sibling_marker<F>(&self, container_selector: &str, is_marker: F) -> Vec<Vec<String>>
    where
        F: Fn(&ElementRef<'_>) -> bool,
    {
        self.select(container_selector)
            .iter()
            .flat_map(|container| group_children(container, &is_marker))
            .collect()
    }
}

/// Run-group the element children of a single container.
pub fn group_children<F>(container: &ElementRef<'_>, is_marker: F) -> Vec<Vec<String>>
where
    F: Fn(&ElementRef<'_>) -> bool,
{
    group_runs(container.children().filter_map(ElementRef::wrap).map(|child| {
        if is_marker(&child) {
            Sibling::Marker
        } else {
            Sibling::Item(element_text(&child))
        }
    }))
}

/// Marker predicate matching elements whose text equals `label`,
/// ignoring case and surrounding whitespace.
pub fn text_marker(label: &str) -> impl Fn(&ElementRef<'_>) -> bool {
    let label = label.trim().to_lowercase();
    move |el: &ElementRef<'_>| element_text(el).to_lowercase() == label
}

pub fn parse_selector(selector: &str) -> Result<Selector, FieldError> {
    Selector::parse(selector)
        .map_err(|e| FieldError::new("selector", format!("invalid selector `{}`: {:?}", selector, e)))
}

/// Text content of an element with runs of whitespace collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First match of `selector` below `el`.
pub fn first_in<'a>(el: &ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let sel = parse_selector(selector).ok()?;
    el.select(&sel).next()
}

/// Text of the first match of `selector` below `el`.
pub fn text_in(el: &ElementRef<'_>, selector: &str) -> Option<String> {
    let sel = parse_selector(selector).ok()?;
    el.select(&sel)
        .map(|e| element_text(&e))
        .find(|t| !t.is_empty())
}

/// Text of every match of `selector` below `el`, empty strings dropped.
pub fn texts_in(el: &ElementRef<'_>, selector: &str) -> Vec<String> {
    match parse_selector(selector) {
        Ok(sel) => el
            .select(&sel)
            .map(|e| element_text(&e))
            .filter(|t| !t.is_empty())
            .collect(),
        Err(e) => {
            log::warn!("{}", e);
            Vec::new()
        }
    }
}

/// Attribute of the first match of `selector` below `el` carrying it.
pub fn attr_in(el: &ElementRef<'_>, selector: &str, attr: &str) -> Option<String> {
    let sel = parse_selector(selector).ok()?;
    el.select(&sel)
        .filter_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Resolve `href` against `base_url`.
pub fn absolute_url(base_url: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

/// A required single-value field.
pub fn require(value: Option<String>, field: &'static str) -> Result<String, FieldError> {
    value.ok_or_else(|| FieldError::new(field, "no matching element"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
            <ul class="list">
                <li><a href="/a" title="First">  First
                    title </a></li>
                <li><a title="Second">Second</a></li>
            </ul>
        </body></html>
    "#;

    #[test]
    fn test_select_text_normalizes_whitespace() {
        let doc = Document::parse(LISTING);
        assert_eq!(doc.select_text("ul.list a"), vec!["First title", "Second"]);
    }

    #[test]
    fn test_select_attr_keeps_positions() {
        let doc = Document::parse(LISTING);
        assert_eq!(doc.select_attr("ul.list a", "href"), vec!["/a", ""]);
    }

    #[test]
    fn test_zero_matches_is_empty_not_error() {
        let doc = Document::parse(LISTING);
        assert!(doc.select_text("div.missing").is_empty());
        assert!(doc.select_attr("div.missing", "href").is_empty());
        assert!(doc.first_text("div.missing").is_none());
    }

    #[test]
    fn test_invalid_selector_yields_nothing() {
        let doc = Document::parse(LISTING);
        assert!(doc.select_text("ul[[").is_empty());
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let doc = Document::parse(LISTING);
        let first = (doc.select_text("a"), doc.select_attr("a", "title"));
        let second = (doc.select_text("a"), doc.select_attr("a", "title"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("https://s.test/", "/m/1"), "https://s.test/m/1");
        assert_eq!(absolute_url("https://s.test", "m/1"), "https://s.test/m/1");
        assert_eq!(absolute_url("https://s.test", "//cdn.test/x.jpg"), "https://cdn.test/x.jpg");
        assert_eq!(absolute_url("https://s.test", "https://o.test/"), "https://o.test/");
    }

    #[test]
    fn test_require_reports_field() {
        let err = require(None, "title").unwrap_err();
        assert_eq!(err.field, "title");
        assert_eq!(require(Some("x".to_string()), "title").unwrap(), "x");
    }

    const ROWS: &str = r#"
        <div class="c"><a>A</a><b>M</b><a>B</a></div>
        <div class="c"><a>C</a><b>M</b></div>
    "#;

    #[test]
    fn test_open_run_does_not_cross_containers() {
        let doc = Document::parse(ROWS);
        let groups = doc.group_by_sibling_marker("div.c", text_marker("M"));
        assert_eq!(groups, vec![vec!["A"], vec!["C"]]);
    }

    #[test]
    fn test_group_children_of_one_container() {
        let doc = Document::parse(ROWS);
        let first = doc.select("div.c")[0];
        assert_eq!(group_children(&first, text_marker("M")), vec![vec!["A"]]);
    }
}
