//! Draft scanning and frontmatter parsing.
//!
//! Stage 1 of the blogcast pipeline. The filesystem is the data source:
//! every directory under the drafts root is one article, keyed by its
//! directory name (the slug).
//!
//! ## Directory Structure
//!
//! ```text
//! drafts/                          # Drafts root
//! ├── config.toml                  # Site configuration (optional)
//! ├── how-i-build-things/          # One article per directory
//! │   ├── article.md               # Draft body (source of truth)
//! │   └── audio.mp3                # Cached synthesis artifact
//! └── thoughts-on-testing/
//!     └── article.md
//! ```
//!
//! ## Frontmatter
//!
//! Each draft opens with a TOML block between `+++` marker lines:
//!
//! ```text
//! +++
//! title = "How I Build Things"
//! date = "2024-03-15"
//! categories = ["Engineering", "Process"]
//! canonical_url = "https://medium.com/..."   # optional
//! +++
//!
//! Body markdown starts here...
//! ```
//!
//! `title`, `date` and `categories` are required; the date must be a
//! `YYYY-MM-DD` calendar date. Violations are reported with the offending
//! slug and never silently skipped.

use crate::types::ArticleSummary;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker line delimiting the frontmatter block.
pub const FRONTMATTER_MARKER: &str = "+++";

/// Name of the draft body file inside an article directory.
pub const DRAFT_FILENAME: &str = "article.md";

/// Name of the cached audio artifact inside an article directory.
pub const AUDIO_FILENAME: &str = "audio.mp3";

#[derive(Error, Debug)]
pub enum ArticleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("draft not found for '{0}' (expected {1})")]
    DraftNotFound(String, PathBuf),
    #[error("'{0}': draft has no frontmatter block (expected leading '+++' line)")]
    MissingFrontmatter(String),
    #[error("'{0}': frontmatter block is not terminated by a closing '+++' line")]
    UnterminatedFrontmatter(String),
    #[error("'{slug}': invalid frontmatter: {source}")]
    Frontmatter {
        slug: String,
        source: toml::de::Error,
    },
    #[error("'{slug}': frontmatter field '{field}' must not be empty")]
    EmptyField { slug: String, field: &'static str },
    #[error("'{slug}': invalid date '{date}' (expected YYYY-MM-DD)")]
    InvalidDate { slug: String, date: String },
}

/// A fully loaded article: frontmatter metadata plus the raw markdown body.
#[derive(Debug, Clone)]
pub struct Article {
    /// Directory name under the drafts root. Unique, filesystem-safe.
    pub slug: String,
    pub title: String,
    /// Calendar date string, `YYYY-MM-DD`, validated at load time.
    pub date: String,
    pub categories: Vec<String>,
    pub canonical_url: Option<String>,
    /// Markdown body, frontmatter stripped.
    pub body: String,
}

impl Article {
    /// The feed-facing projection of this article.
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            slug: self.slug.clone(),
            title: self.title.clone(),
            date: self.date.clone(),
            categories: self.categories.clone(),
            canonical_url: self.canonical_url.clone(),
        }
    }
}

/// Frontmatter as it appears in the draft file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Frontmatter {
    title: String,
    date: String,
    categories: Vec<String>,
    #[serde(default)]
    canonical_url: Option<String>,
}

/// Path of the draft body file for a slug.
pub fn draft_path(root: &Path, slug: &str) -> PathBuf {
    root.join(slug).join(DRAFT_FILENAME)
}

/// Path of the cached audio artifact for a slug.
pub fn audio_cache_path(root: &Path, slug: &str) -> PathBuf {
    root.join(slug).join(AUDIO_FILENAME)
}

/// List article slugs under the drafts root, sorted by name.
///
/// A slug is any non-hidden directory. Whether its draft file actually
/// exists is checked at load time, so one broken draft surfaces as that
/// article's failure instead of aborting the listing.
pub fn list_slugs(root: &Path) -> Result<Vec<String>, ArticleError> {
    let mut slugs: Vec<String> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect();
    slugs.sort();
    Ok(slugs)
}

/// Load and validate one article from its draft file.
pub fn load_article(root: &Path, slug: &str) -> Result<Article, ArticleError> {
    let path = draft_path(root, slug);
    if !path.exists() {
        return Err(ArticleError::DraftNotFound(slug.to_string(), path));
    }
    let source = fs::read_to_string(&path)?;
    parse_article(slug, &source)
}

/// Parse a draft source string into an [`Article`].
pub fn parse_article(slug: &str, source: &str) -> Result<Article, ArticleError> {
    let (raw_frontmatter, body) = split_frontmatter(slug, source)?;

    let fm: Frontmatter =
        toml::from_str(raw_frontmatter).map_err(|source| ArticleError::Frontmatter {
            slug: slug.to_string(),
            source,
        })?;

    if fm.title.trim().is_empty() {
        return Err(ArticleError::EmptyField {
            slug: slug.to_string(),
            field: "title",
        });
    }
    if fm.categories.iter().any(|c| c.trim().is_empty()) {
        return Err(ArticleError::EmptyField {
            slug: slug.to_string(),
            field: "categories",
        });
    }
    if NaiveDate::parse_from_str(&fm.date, "%Y-%m-%d").is_err() {
        return Err(ArticleError::InvalidDate {
            slug: slug.to_string(),
            date: fm.date,
        });
    }

    Ok(Article {
        slug: slug.to_string(),
        title: fm.title,
        date: fm.date,
        categories: fm.categories,
        canonical_url: fm.canonical_url,
        body: body.to_string(),
    })
}

/// Split a draft into (frontmatter TOML, body).
///
/// The frontmatter block must open on the very first line and close with a
/// matching marker line. An unterminated block is an error, never consumed
/// to end-of-text.
fn split_frontmatter<'a>(slug: &str, source: &'a str) -> Result<(&'a str, &'a str), ArticleError> {
    let rest = source
        .strip_prefix(FRONTMATTER_MARKER)
        .and_then(|r| r.strip_prefix('\n').or_else(|| r.strip_prefix("\r\n")))
        .ok_or_else(|| ArticleError::MissingFrontmatter(slug.to_string()))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_MARKER {
            let fm = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((fm, body));
        }
        offset += line.len();
    }
    Err(ArticleError::UnterminatedFrontmatter(slug.to_string()))
}
