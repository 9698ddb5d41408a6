//! Podcast feed assembly.
//!
//! Builds the RSS 2.0 syndication document (atom self-link + iTunes
//! podcast namespace) from article summaries plus a per-article audio
//! probe. The document is stateless: recomputed in full from its inputs,
//! never patched incrementally, so the build-time `rss` command and any
//! request-time route derive identical bytes from identical input.
//!
//! ## Validation
//!
//! The feed is one atomic document — one bad entry must not yield a
//! half-built feed. The first violation aborts the whole build:
//!
//! - slug, title, date present and non-empty
//! - no category normalizes to the empty string
//! - date parses as `YYYY-MM-DD`, anchored to UTC midnight (never the
//!   generating machine's local timezone, so ordering is
//!   location-independent)
//! - at least one entry
//!
//! ## Entry Layout
//!
//! Entries are sorted newest-first (stable: input order breaks date
//! ties). Each emits title, canonical link, a permalink guid equal to
//! that link, an RFC-822 pubDate, a description, category tags, and —
//! only when the audio probe reports an artifact — an enclosure with the
//! reported byte length plus narration metadata tags. The channel's
//! lastBuildDate equals the newest entry's pubDate.

use crate::config::SiteConfig;
use crate::types::ArticleSummary;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("feed validation error for '{slug}': {reason}")]
    Validation { slug: String, reason: String },
    #[error("no articles to build a feed from")]
    Empty,
}

/// Escape the five XML-special characters, each exactly once.
///
/// `&` is handled first so already-produced entities are never doubled.
pub fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Parse a `YYYY-MM-DD` calendar date, anchored to UTC midnight.
pub fn parse_utc_date(date: &str) -> Option<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(day.and_time(NaiveTime::MIN).and_utc())
}

/// Format a UTC timestamp as an RFC-822 date, GMT-suffixed.
fn format_rfc822(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Probe the published audio directory for `<slug>.mp3`, reporting its
/// byte size when present. This is the production probe handed to
/// [`assemble`]; tests substitute their own closure.
pub fn audio_probe(audio_dir: &Path) -> impl Fn(&str) -> Option<u64> + '_ {
    move |slug| {
        let path = audio_dir.join(format!("{slug}.mp3"));
        std::fs::metadata(path).ok().map(|m| m.len())
    }
}

/// Assemble the complete feed document.
///
/// `probe` maps a slug to the byte size of its published audio artifact,
/// or `None` when the article has no audio.
pub fn assemble(
    config: &SiteConfig,
    summaries: &[ArticleSummary],
    probe: impl Fn(&str) -> Option<u64>,
) -> Result<String, FeedError> {
    if summaries.is_empty() {
        return Err(FeedError::Empty);
    }

    // Validate everything up front: the document is all-or-nothing.
    let mut dated: Vec<(&ArticleSummary, DateTime<Utc>)> = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let date = validate_summary(summary)?;
        dated.push((summary, date));
    }

    // Newest first; sort_by is stable, so equal dates keep input order.
    dated.sort_by(|a, b| b.1.cmp(&a.1));

    let site = &config.site;
    let last_build = format_rfc822(dated[0].1);
    let cover = resolve_site_path(&site.url, &config.podcast.cover_image);
    let explicit = if config.podcast.explicit { "yes" } else { "no" };

    let mut doc = String::new();
    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    doc.push_str("<rss version=\"2.0\"\n");
    doc.push_str("\txmlns:atom=\"http://www.w3.org/2005/Atom\"\n");
    doc.push_str("\txmlns:content=\"http://purl.org/rss/1.0/modules/content/\"\n");
    doc.push_str("\txmlns:itunes=\"http://www.itunes.com/dtds/podcast-1.0.dtd\">\n");
    doc.push_str("\t<channel>\n");
    let _ = writeln!(doc, "\t\t<title>{}</title>", escape_xml(&site.title));
    let _ = writeln!(
        doc,
        "\t\t<description>{}</description>",
        escape_xml(&site.description)
    );
    let _ = writeln!(doc, "\t\t<link>{}</link>", site.url);
    let _ = writeln!(
        doc,
        "\t\t<atom:link href=\"{}/rss.xml\" rel=\"self\" type=\"application/rss+xml\" />",
        site.url
    );
    let _ = writeln!(doc, "\t\t<language>{}</language>", site.language);
    let _ = writeln!(doc, "\t\t<lastBuildDate>{last_build}</lastBuildDate>");
    let _ = writeln!(
        doc,
        "\t\t<managingEditor>{} ({})</managingEditor>",
        site.email, site.author
    );
    let _ = writeln!(
        doc,
        "\t\t<webMaster>{} ({})</webMaster>",
        site.email, site.author
    );
    let _ = writeln!(
        doc,
        "\t\t<itunes:author>{}</itunes:author>",
        escape_xml(&site.author)
    );
    let _ = writeln!(
        doc,
        "\t\t<itunes:summary>{}</itunes:summary>",
        escape_xml(&site.description)
    );
    doc.push_str("\t\t<itunes:owner>\n");
    let _ = writeln!(
        doc,
        "\t\t\t<itunes:name>{}</itunes:name>",
        escape_xml(&site.author)
    );
    let _ = writeln!(doc, "\t\t\t<itunes:email>{}</itunes:email>", site.email);
    doc.push_str("\t\t</itunes:owner>\n");
    let _ = writeln!(doc, "\t\t<itunes:explicit>{explicit}</itunes:explicit>");
    let _ = writeln!(
        doc,
        "\t\t<itunes:category text=\"{}\" />",
        escape_xml(&config.podcast.category)
    );
    let _ = writeln!(doc, "\t\t<itunes:image href=\"{cover}\" />");

    for (summary, date) in &dated {
        push_item(&mut doc, config, summary, *date, &probe);
    }

    doc.push_str("\t</channel>\n");
    doc.push_str("</rss>\n");
    Ok(doc)
}

/// Validate one summary, returning its parsed UTC publish date.
fn validate_summary(summary: &ArticleSummary) -> Result<DateTime<Utc>, FeedError> {
    let fail = |slug: &str, reason: String| FeedError::Validation {
        slug: slug.to_string(),
        reason,
    };

    if summary.slug.trim().is_empty() {
        return Err(fail("<unknown>", "missing slug".into()));
    }
    if summary.title.trim().is_empty() {
        return Err(fail(&summary.slug, "missing title".into()));
    }
    if summary.date.trim().is_empty() {
        return Err(fail(&summary.slug, "missing date".into()));
    }
    if summary.categories.iter().any(|c| c.trim().is_empty()) {
        return Err(fail(&summary.slug, "empty category value".into()));
    }
    parse_utc_date(&summary.date).ok_or_else(|| {
        fail(
            &summary.slug,
            format!("invalid date '{}' (expected YYYY-MM-DD)", summary.date),
        )
    })
}

/// Append one `<item>` element.
fn push_item(
    doc: &mut String,
    config: &SiteConfig,
    summary: &ArticleSummary,
    date: DateTime<Utc>,
    probe: &impl Fn(&str) -> Option<u64>,
) {
    let site = &config.site;
    let article_url = format!("{}/{}", site.url, summary.slug);

    doc.push_str("\t\t<item>\n");
    let _ = writeln!(doc, "\t\t\t<title>{}</title>", escape_xml(&summary.title));
    let _ = writeln!(doc, "\t\t\t<link>{article_url}</link>");
    let _ = writeln!(
        doc,
        "\t\t\t<guid isPermaLink=\"true\">{article_url}</guid>"
    );
    let _ = writeln!(doc, "\t\t\t<pubDate>{}</pubDate>", format_rfc822(date));
    let _ = writeln!(
        doc,
        "\t\t\t<description>{}</description>",
        escape_xml(&summary.title)
    );
    for category in &summary.categories {
        let _ = writeln!(doc, "\t\t\t<category>{}</category>", escape_xml(category));
    }

    if let Some(byte_size) = probe(&summary.slug) {
        let audio_url = format!("{}/audio/{}.mp3", site.url, summary.slug);
        let _ = writeln!(
            doc,
            "\t\t\t<enclosure url=\"{audio_url}\" type=\"audio/mpeg\" length=\"{byte_size}\" />"
        );
        let _ = writeln!(
            doc,
            "\t\t\t<itunes:author>{}</itunes:author>",
            escape_xml(&site.author)
        );
        let _ = writeln!(
            doc,
            "\t\t\t<itunes:summary>{}</itunes:summary>",
            escape_xml(&summary.title)
        );
        doc.push_str("\t\t\t<itunes:explicit>no</itunes:explicit>\n");
    }

    doc.push_str("\t\t</item>\n");
}

/// Resolve a possibly site-relative path against the site origin.
fn resolve_site_path(site_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{site_url}{path}")
    } else {
        path.to_string()
    }
}
