use super::{absolute_url, element_text, parse_selector, Document};
use crate::models::{ChapterLink, MangaChapters};
use scraper::{ElementRef, Selector};

/// Where chapter lists and their bucket headers live on a page.
#[derive(Debug, Clone, Copy)]
pub struct BucketLayout<'a> {
    /// One chapter list block per bucket
    pub block: &'a str,
    /// Header element immediately preceding each block
    pub header: &'a str,
    /// One chapter row inside a block
    pub row: &'a str,
    /// Link inside a row carrying the chapter name and href
    pub link: &'a str,
    /// Upload date inside a row
    pub uploaded: Option<&'a str>,
}

/// Sort the chapter blocks of `doc` into the `known` buckets.
///
/// Each block's bucket is the first token of its header that names a known
/// bucket. Blocks with no header or an unrecognized label are dropped. The
/// result has one entry per known bucket, in the order given, possibly
/// with no chapters.
pub fn classify_buckets(
    doc: &Document,
    layout: &BucketLayout<'_>,
    known: &[&str],
    base_url: &str,
) -> Vec<MangaChapters> {
    let mut buckets: Vec<MangaChapters> = known
        .iter()
        .map(|name| MangaChapters {
            bucket: name.to_string(),
            chapters: Vec::new(),
        })
        .collect();

    let selectors = (
        parse_selector(layout.header),
        parse_selector(layout.row),
        parse_selector(layout.link),
        layout.uploaded.map(parse_selector).transpose(),
    );
    let (header, row, link, uploaded) = match selectors {
        (Ok(h), Ok(r), Ok(l), Ok(u)) => (h, r, l, u),
        _ => {
            log::warn!("Invalid chapter bucket layout {:?}", layout);
            return buckets;
        }
    };

    for block in doc.select(layout.block) {
        let label = match companion_header(&block, &header) {
            Some(text) => text,
            None => {
                log::debug!("Chapter block without a bucket header, skipping");
                continue;
            }
        };

        let index = label.split_whitespace().find_map(|token| {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            known.iter().position(|k| k.eq_ignore_ascii_case(token))
        });

        match index {
            Some(i) => {
                let chapters = block
                    .select(&row)
                    .filter_map(|r| chapter_link(&r, &link, uploaded.as_ref(), base_url));
                buckets[i].chapters.extend(chapters);
            }
            None => log::debug!("Unrecognized chapter bucket {:?}, dropping", label),
        }
    }

    buckets
}

/// Text of the nearest preceding element sibling, when it is a header.
fn companion_header(block: &ElementRef<'_>, header: &Selector) -> Option<String> {
    block
        .prev_siblings()
        .find_map(ElementRef::wrap)
        .filter(|el| header.matches(el))
        .map(|el| element_text(&el))
}

fn chapter_link(
    row: &ElementRef<'_>,
    link: &Selector,
    uploaded: Option<&Selector>,
    base_url: &str,
) -> Option<ChapterLink> {
    let anchor = row.select(link).next()?;
    let href = anchor.value().attr("href")?;

    Some(ChapterLink {
        name: element_text(&anchor),
        url: absolute_url(base_url, href),
        uploaded: uploaded
            .and_then(|sel| row.select(sel).next())
            .map(|el| element_text(&el))
            .filter(|t| !t.is_empty()),
    })
}
