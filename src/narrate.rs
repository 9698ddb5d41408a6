//! Narration text derivation and chunking.
//!
//! Reduces a markdown draft (possibly containing raw HTML blocks and a
//! frontmatter header) to speech-safe plain text, then splits that text
//! into provider-bounded chunks.
//!
//! ## Normalization Pipeline
//!
//! The rules run in a fixed order; later rules assume earlier ones ran:
//!
//! 1. Strip the leading `+++` frontmatter block, if present.
//! 2. Remove fenced code blocks entirely. Code read aloud is a terrible
//!    listening experience, so none of it may reach narration.
//! 3. Unwrap inline code spans, keeping the inner text.
//! 4. Remove `<figure>...</figure>` blocks entirely (images and captions
//!    are not narratable).
//! 5. Strip all remaining HTML tags, each replaced by one space so words
//!    on either side of a tag don't concatenate.
//! 6. Remove image embeds; unwrap links to their label text.
//! 7. Strip heading, emphasis, blockquote, list and horizontal-rule
//!    syntax, keeping the text.
//! 8. Normalize whitespace: 3+ newlines collapse to a paragraph break,
//!    runs of spaces/tabs collapse to one space, ends trimmed.
//!
//! Paragraph boundaries survive as `\n\n` — the chunk splitter and the
//! synthesized speech pacing both depend on them.
//!
//! ## Chunking
//!
//! Greedy accumulation of whole paragraphs under a strict character
//! bound. A single paragraph longer than the bound is rejected with a
//! typed error: subdividing it would break the invariant that the chunk
//! sequence rejoined with `\n\n` reconstructs the narration text exactly.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::article::FRONTMATTER_MARKER;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NarrateError {
    #[error("unterminated code fence (``` opened but never closed)")]
    UnterminatedFence,
    #[error("narration text is empty after normalization")]
    Empty,
    #[error("paragraph of {chars} characters exceeds the {limit}-character chunk bound")]
    ParagraphTooLong { chars: usize, limit: usize },
}

static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("valid inline code regex"));
static FIGURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<figure\b.*?</figure>").expect("valid figure regex"));
static HTML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("valid html tag regex"));
static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid link regex"));
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid heading regex"));
static BOLD_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static ITALIC_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid italic regex"));
static BOLD_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([^_]+)__").expect("valid bold underscore regex"));
static ITALIC_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b_([^_\n]+)_\b").expect("valid italic underscore regex"));
static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^>\s+").expect("valid blockquote regex"));
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+]\s+").expect("valid bullet regex"));
static ORDERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.\s+").expect("valid ordered list regex"));
static HRULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[-*_]{3,}[ \t]*$").expect("valid hrule regex"));
static MANY_NEWLINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));
static HSPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("valid hspace regex"));

/// Derive speech-safe narration text from a raw draft source.
///
/// Runs the full normalization pipeline. Returns an error for an
/// unterminated code fence or an empty result — neither is ever papered
/// over silently.
pub fn narration_text(source: &str) -> Result<String, NarrateError> {
    let text = strip_frontmatter(source);
    let text = strip_code_fences(text)?;
    let text = INLINE_CODE_RE.replace_all(&text, "$1");
    let text = FIGURE_RE.replace_all(&text, "");
    let text = HTML_TAG_RE.replace_all(&text, " ");
    let text = IMAGE_RE.replace_all(&text, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = HEADING_RE.replace_all(&text, "");
    let text = BOLD_STAR_RE.replace_all(&text, "$1");
    let text = ITALIC_STAR_RE.replace_all(&text, "$1");
    let text = BOLD_UNDER_RE.replace_all(&text, "$1");
    let text = ITALIC_UNDER_RE.replace_all(&text, "$1");
    let text = BLOCKQUOTE_RE.replace_all(&text, "");
    let text = BULLET_RE.replace_all(&text, "");
    let text = ORDERED_RE.replace_all(&text, "");
    let text = HRULE_RE.replace_all(&text, "");
    let text = MANY_NEWLINES_RE.replace_all(&text, "\n\n");
    let text = HSPACE_RE.replace_all(&text, " ");

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NarrateError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Drop the leading frontmatter block if the source opens with one.
///
/// Tolerant by design: narration also runs on bodies that were already
/// split from their frontmatter, which must pass through unchanged.
fn strip_frontmatter(source: &str) -> &str {
    let Some(rest) = source.strip_prefix(FRONTMATTER_MARKER) else {
        return source;
    };
    let Some(rest) = rest.strip_prefix('\n') else {
        return source;
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_MARKER {
            return &rest[offset + line.len()..];
        }
        offset += line.len();
    }
    // No closing marker: not a frontmatter block after all.
    source
}

/// Remove fenced code blocks wholesale.
///
/// Walks lines with a fence toggle instead of a regex: an opening fence
/// with no closing fence must be reported, not swallowed to end-of-text.
fn strip_code_fences(source: &str) -> Result<String, NarrateError> {
    let mut out = String::with_capacity(source.len());
    let mut in_fence = false;
    for line in source.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            out.push_str(line);
            out.push('\n');
        }
    }
    if in_fence {
        return Err(NarrateError::UnterminatedFence);
    }
    Ok(out)
}

/// Split narration text into chunks of at most `limit` characters.
///
/// Whole text fitting the bound is one chunk. Otherwise paragraphs are
/// accumulated greedily; the separator counts toward the bound. The
/// returned chunks, rejoined with `\n\n`, reproduce the input exactly,
/// and no chunk is empty.
pub fn split_chunks(text: &str, limit: usize) -> Result<Vec<String>, NarrateError> {
    if text.is_empty() {
        return Err(NarrateError::Empty);
    }
    if text.chars().count() <= limit {
        return Ok(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for para in text.split("\n\n") {
        let para_chars = para.chars().count();
        if para_chars > limit {
            return Err(NarrateError::ParagraphTooLong {
                chars: para_chars,
                limit,
            });
        }
        let needed = if current.is_empty() {
            para_chars
        } else {
            current_chars + 2 + para_chars
        };
        if needed > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_chars += 2;
        }
        current.push_str(para);
        current_chars += para_chars;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}
