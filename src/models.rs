//! Canonical records assembled by source adapters.
//!
//! Every record holds plain owned data. Nothing here borrows from a parsed
//! document, so records outlive the page or session that produced them.

use serde::{Deserialize, Serialize};

/// One row of a search listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Manga {
    pub title: String,
    pub url: String,
    pub cover_url: Option<String>,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MangaRating {
    /// e.g. `"4.3 / 5"`
    pub stars: String,
    /// e.g. `"86.00%"`, or `"NaN%"` when the label could not be read
    pub percentage: String,
    pub votes: Option<u64>,
}

impl Default for MangaRating {
    fn default() -> Self {
        Self {
            stars: String::new(),
            percentage: "NaN%".to_string(),
            votes: None,
        }
    }
}

impl MangaRating {
    pub fn is_known(&self) -> bool {
        self.percentage != "NaN%"
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ChapterLink {
    pub name: String,
    pub url: String,
    pub uploaded: Option<String>,
}

impl ChapterLink {
    /// First number in the chapter name, e.g. `"Vol.2 Ch.10.5"` -> `"2"`,
    /// `"Chapter 10.5: Title"` -> `"10.5"`.
    pub fn number(&self) -> Option<String> {
        let re = regex::Regex::new(r"(\d+(?:\.\d+)?)").ok()?;
        re.captures(&self.name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Chapters published under one named source bucket.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MangaChapters {
    pub bucket: String,
    pub chapters: Vec<ChapterLink>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MangaMeta {
    pub title: String,
    pub alt_titles: Vec<String>,
    pub cover_url: Option<String>,
    pub summary: String,
    pub status: Option<String>,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
    pub rating: MangaRating,
    pub chapters: Vec<MangaChapters>,
}

impl MangaMeta {
    /// Chapters of the named bucket, empty when the bucket is absent.
    pub fn bucket(&self, name: &str) -> &[ChapterLink] {
        self.chapters
            .iter()
            .find(|c| c.bucket.eq_ignore_ascii_case(name))
            .map(|c| c.chapters.as_slice())
            .unwrap_or(&[])
    }
}

/// One entry of a "latest updates" / "hot" listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LatestHotManga {
    pub title: String,
    pub url: String,
    pub cover_url: Option<String>,
    pub latest_chapter: Option<ChapterLink>,
}
