//! Shared types used across pipeline stages.
//!
//! These types are serialized to JSON between stages (sync writes
//! `articles.json`, the feed assembler consumes it) and must be identical
//! on both sides.

use serde::{Deserialize, Serialize};

/// The feed-facing projection of an article.
///
/// Derived from draft frontmatter during sync. The draft file remains the
/// source of truth; this summary is a disposable projection regenerable at
/// any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    /// Unique, filesystem-safe key (the draft directory name).
    pub slug: String,
    /// Article title.
    pub title: String,
    /// Publication date as `YYYY-MM-DD`. Calendar date only — anchored to
    /// UTC midnight wherever a timestamp is needed.
    pub date: String,
    /// Ordered category labels. Never contains empty strings.
    pub categories: Vec<String>,
    /// External canonical-source URL, if the article was first published
    /// elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
}
