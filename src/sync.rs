//! Sync orchestration: drafts in, pages + audio + manifest out.
//!
//! Drives the full per-article pipeline. For each draft: run the audio
//! path (cache gate → synthesis → publish copy), then render and write
//! the article page with the audio outcome known, so a freshly generated
//! narration shows its player immediately. The page renderer never talks
//! to the synthesis orchestrator — it only sees whether the published
//! artifact exists.
//!
//! ## Failure Isolation
//!
//! One article's failure never aborts its siblings. A synthesis failure
//! still syncs the article's page (audio is an enhancement, the page is
//! the product); a draft that fails to parse is reported and skipped.
//! Every outcome is collected into a [`SyncReport`] for display.
//!
//! ## Manifest
//!
//! After the loop, the summaries of all successfully parsed articles are
//! written to `<output>/articles.json` — the input the feed assembler
//! consumes. Articles whose audio failed still appear (their feed entry
//! simply carries no enclosure); articles that failed to parse do not.

use crate::article::{self, Article};
use crate::config::SiteConfig;
use crate::render;
use crate::tts::{self, SpeechSynthesizer, SynthesisReport};
use crate::types::ArticleSummary;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the summary manifest written to the output root.
pub const MANIFEST_FILENAME: &str = "articles.json";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("article error: {0}")]
    Article(#[from] article::ArticleError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no drafts found in {0}")]
    NoDrafts(PathBuf),
}

/// What happened to one article's audio.
#[derive(Debug)]
pub enum AudioStatus {
    /// Synthesized fresh and published.
    Generated(SynthesisReport),
    /// Cached artifact current, published copy already present.
    UpToDate,
    /// Cached artifact current but the published copy was missing; it was
    /// re-created by file copy, not by synthesis.
    Republished,
    /// Synthesis failed; the page was still synced.
    Failed(String),
}

/// Result of syncing one article.
#[derive(Debug)]
pub enum ArticleOutcome {
    Synced {
        slug: String,
        /// Page path relative to the output root.
        page: String,
        audio: AudioStatus,
    },
    Failed {
        slug: String,
        error: String,
    },
}

impl ArticleOutcome {
    pub fn slug(&self) -> &str {
        match self {
            ArticleOutcome::Synced { slug, .. } | ArticleOutcome::Failed { slug, .. } => slug,
        }
    }
}

/// Collected outcomes of a sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<ArticleOutcome>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ArticleOutcome::Synced { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Sync articles from the drafts root into the output directory.
///
/// With `only = Some(slug)`, only that article is fully synced; the rest
/// are still parsed so the manifest stays complete.
pub fn sync_all(
    drafts_root: &Path,
    output_dir: &Path,
    config: &SiteConfig,
    synthesizer: &dyn SpeechSynthesizer,
    only: Option<&str>,
) -> Result<SyncReport, SyncError> {
    let slugs = article::list_slugs(drafts_root)?;
    if slugs.is_empty() {
        return Err(SyncError::NoDrafts(drafts_root.to_path_buf()));
    }
    if let Some(target) = only
        && !slugs.iter().any(|s| s == target)
    {
        return Err(article::ArticleError::DraftNotFound(
            target.to_string(),
            article::draft_path(drafts_root, target),
        )
        .into());
    }

    fs::create_dir_all(output_dir)?;

    let mut report = SyncReport::default();
    let mut summaries: Vec<ArticleSummary> = Vec::new();

    for slug in &slugs {
        let source = match fs::read_to_string(article::draft_path(drafts_root, slug)) {
            Ok(s) => s,
            Err(e) => {
                report.outcomes.push(ArticleOutcome::Failed {
                    slug: slug.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        let parsed = match article::parse_article(slug, &source) {
            Ok(a) => a,
            Err(e) => {
                report.outcomes.push(ArticleOutcome::Failed {
                    slug: slug.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        summaries.push(parsed.summary());

        let selected = only.is_none_or(|target| target == slug);
        if !selected {
            continue;
        }

        report
            .outcomes
            .push(sync_article(drafts_root, output_dir, config, synthesizer, &parsed, &source));
    }

    let manifest = serde_json::to_string_pretty(&summaries)?;
    fs::write(output_dir.join(MANIFEST_FILENAME), manifest)?;

    Ok(report)
}

/// Sync one parsed article: audio path first, then its page.
fn sync_article(
    drafts_root: &Path,
    output_dir: &Path,
    config: &SiteConfig,
    synthesizer: &dyn SpeechSynthesizer,
    parsed: &Article,
    source: &str,
) -> ArticleOutcome {
    let slug = &parsed.slug;
    let audio = sync_audio(drafts_root, output_dir, config, synthesizer, slug, source);

    let has_audio = published_audio_path(output_dir, slug).exists();
    match render::write_article_page(output_dir, parsed, has_audio) {
        Ok(_) => ArticleOutcome::Synced {
            slug: slug.clone(),
            page: format!("{slug}/index.html"),
            audio,
        },
        Err(e) => ArticleOutcome::Failed {
            slug: slug.clone(),
            error: format!("writing page: {e}"),
        },
    }
}

/// Run the audio path for one article.
fn sync_audio(
    drafts_root: &Path,
    output_dir: &Path,
    config: &SiteConfig,
    synthesizer: &dyn SpeechSynthesizer,
    slug: &str,
    source: &str,
) -> AudioStatus {
    let draft = article::draft_path(drafts_root, slug);
    let cached = article::audio_cache_path(drafts_root, slug);
    let published = published_audio_path(output_dir, slug);

    let stale = match tts::needs_regeneration(&draft, &cached) {
        Ok(s) => s,
        Err(e) => return AudioStatus::Failed(format!("cache check: {e}")),
    };

    if !stale {
        if published.exists() {
            return AudioStatus::UpToDate;
        }
        return match publish_copy(&cached, &published) {
            Ok(()) => AudioStatus::Republished,
            Err(e) => AudioStatus::Failed(format!("publishing audio: {e}")),
        };
    }

    match tts::synthesize_article(source, &cached, &config.tts, synthesizer) {
        Ok(synthesis) => match publish_copy(&cached, &published) {
            Ok(()) => AudioStatus::Generated(synthesis),
            Err(e) => AudioStatus::Failed(format!("publishing audio: {e}")),
        },
        Err(e) => AudioStatus::Failed(e.to_string()),
    }
}

// ============================================================================
// Check
// ============================================================================

/// Validity details for one draft, reported by `check`.
#[derive(Debug)]
pub struct CheckInfo {
    pub title: String,
    pub date: String,
    pub character_count: usize,
    pub chunk_count: usize,
}

/// Per-draft validation result for the `check` command.
#[derive(Debug)]
pub struct CheckOutcome {
    pub slug: String,
    pub result: Result<CheckInfo, String>,
}

/// Validate every draft without writing anything.
///
/// Checks frontmatter, date format, and narration viability (normalizes
/// and chunks each body with the configured bounds).
pub fn check_all(drafts_root: &Path, config: &SiteConfig) -> Result<Vec<CheckOutcome>, SyncError> {
    let slugs = article::list_slugs(drafts_root)?;
    if slugs.is_empty() {
        return Err(SyncError::NoDrafts(drafts_root.to_path_buf()));
    }

    let mut outcomes = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let result = check_draft(drafts_root, &slug, config);
        outcomes.push(CheckOutcome { slug, result });
    }
    Ok(outcomes)
}

fn check_draft(drafts_root: &Path, slug: &str, config: &SiteConfig) -> Result<CheckInfo, String> {
    let parsed = article::load_article(drafts_root, slug).map_err(|e| e.to_string())?;
    let narration = crate::narrate::narration_text(&parsed.body).map_err(|e| e.to_string())?;
    let character_count = narration.chars().count();
    if character_count < config.tts.min_narration_chars {
        return Err(format!(
            "narration too short: {character_count} characters (minimum {})",
            config.tts.min_narration_chars
        ));
    }
    let chunks = crate::narrate::split_chunks(&narration, config.tts.max_chunk_chars)
        .map_err(|e| e.to_string())?;
    Ok(CheckInfo {
        title: parsed.title,
        date: parsed.date,
        character_count,
        chunk_count: chunks.len(),
    })
}

/// Published location of an article's audio: `<output>/audio/<slug>.mp3`.
pub fn published_audio_path(output_dir: &Path, slug: &str) -> PathBuf {
    output_dir.join("audio").join(format!("{slug}.mp3"))
}

fn publish_copy(cached: &Path, published: &Path) -> std::io::Result<()> {
    if let Some(parent) = published.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(cached, published)?;
    Ok(())
}
