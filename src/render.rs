//! Article page rendering.
//!
//! Converts a draft's markdown body to HTML and embeds it in a complete
//! article page. Independent of the audio path — a draft with failing
//! synthesis still gets its page.
//!
//! ## Link Safety
//!
//! After markdown conversion, anchors targeting an absolute `http(s)://`
//! URL are rewritten to open in a new browsing context with no
//! back-reference to the origin document (`target="_blank"
//! rel="noopener"`). Local and relative links are left untouched.
//!
//! ## Page Layout
//!
//! Pages are generated with [maud](https://maud.lambda.xyz/): type-safe
//! compile-time templates with automatic escaping. Each page carries the
//! article header (title, date, categories), an audio player when the
//! published narration artifact exists, the converted body, and a
//! canonical-source link when the article was first published elsewhere.
//! Styles are embedded at compile time from `static/style.css`.

use crate::article::Article;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use once_cell::sync::Lazy;
use pulldown_cmark::{Parser, html as md_html};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CSS: &str = include_str!("../static/style.css");

static EXTERNAL_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="(https?://[^"]+)">"#).expect("valid anchor regex"));

/// Convert a markdown body to embeddable HTML with safe external links.
pub fn render_body(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut body_html = String::new();
    md_html::push_html(&mut body_html, parser);
    rewrite_external_links(&body_html)
}

/// Mark anchors with absolute external targets to open in a new context.
///
/// Only plain `<a href="...">` anchors produced by the markdown converter
/// are rewritten; relative links don't match the pattern and pass through.
pub fn rewrite_external_links(html: &str) -> String {
    EXTERNAL_ANCHOR_RE
        .replace_all(html, r#"<a href="$1" target="_blank" rel="noopener">"#)
        .to_string()
}

/// Render the complete article page.
///
/// `has_audio` controls the narration player; the caller knows whether
/// the published artifact exists.
pub fn article_page(article: &Article, body_html: &str, has_audio: bool) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (article.title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                main.article-page {
                    header.article-header {
                        h1 { (article.title) }
                        p.article-meta {
                            time datetime=(article.date) { (article.date) }
                            @for category in &article.categories {
                                " · "
                                span.category { (category) }
                            }
                        }
                        @if has_audio {
                            audio.narration controls preload="none"
                                src={ "/audio/" (article.slug) ".mp3" } {}
                        }
                    }
                    article.article-body {
                        (PreEscaped(body_html))
                    }
                    @if let Some(url) = &article.canonical_url {
                        footer.article-footer {
                            a href=(url) target="_blank" rel="noopener" {
                                "Originally published elsewhere"
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Render and write one article's page to `<output_dir>/<slug>/index.html`.
///
/// Returns the path of the written file.
pub fn write_article_page(
    output_dir: &Path,
    article: &Article,
    has_audio: bool,
) -> io::Result<PathBuf> {
    let body_html = render_body(&article.body);
    let page = article_page(article, &body_html, has_audio);

    let page_dir = output_dir.join(&article.slug);
    fs::create_dir_all(&page_dir)?;
    let path = page_dir.join("index.html");
    fs::write(&path, page.into_string())?;
    Ok(path)
}
