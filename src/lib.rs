//! # Blogcast
//!
//! A minimal static article pipeline. Your filesystem is the data source:
//! directories under the drafts root become articles, each draft body is
//! the single source of truth, and everything else — pages, narrated
//! audio, the podcast feed — is a disposable projection regenerable from
//! it at any time.
//!
//! # Architecture: Per-Article Pipeline + Feed
//!
//! ```text
//! drafts/<slug>/article.md ──┬─▶ render  ──▶ site/<slug>/index.html
//!                            └─▶ narrate ──▶ tts ──▶ drafts/<slug>/audio.mp3
//!                                                        │ (publish copy)
//!                                                        ▼
//!                                              site/audio/<slug>.mp3
//! site/articles.json ──▶ feed ──▶ site/rss.xml
//! ```
//!
//! The sync stage drives the per-article pipeline with failure isolation
//! (one bad article never aborts its siblings) and writes the summary
//! manifest. The feed stage is the opposite: the document is atomic, so
//! any invalid entry fails the whole build.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`article`] | Drafts scan — walks the drafts root, parses `+++` frontmatter, produces articles and summaries |
//! | [`narrate`] | Speech-safe text derivation and provider-bounded chunking (pure functions) |
//! | [`tts`] | Synthesis cache gate, ElevenLabs client, chunk-by-chunk orchestration with atomic artifact writes |
//! | [`render`] | Markdown → HTML with external-link safety, maud article pages |
//! | [`feed`] | RSS 2.0 + iTunes podcast feed assembly from summaries + audio probe |
//! | [`sync`] | Per-article driver: audio path + page + manifest, with per-article failure isolation |
//! | [`config`] | `config.toml` loading/merging/validation and provider credentials |
//! | [`types`] | Summary types serialized between sync and feed |
//! | [`output`] | CLI output formatting — pure `format_*` + `print_*` wrappers |
//!
//! # Design Decisions
//!
//! ## Timestamp Cache, Not Content Hashing
//!
//! Audio synthesis is the expensive stage — every chunk is a paid
//! provider call — so artifacts are cached next to their drafts and
//! regenerated only when the draft's mtime is strictly newer. A `touch`
//! without a content change forces regeneration; that tradeoff buys a
//! cache with zero state beyond the two files themselves.
//!
//! ## Sequential Chunk Synthesis
//!
//! Chunks of one article are synthesized strictly in order, one request
//! at a time. Concatenation order is the narration order, and the
//! provider never sees a burst of parallel requests for one document.
//!
//! ## One Feed Assembler
//!
//! The `rss` command and any request-time route derive the feed through
//! the same [`feed::assemble`] function over the same manifest, so the
//! static document and an on-the-fly response cannot drift apart.
//!
//! ## Maud Over Template Engines
//!
//! Article pages are generated with [Maud](https://maud.lambda.xyz/):
//! compile-time checked templates, auto-escaped interpolation, no
//! runtime template files to ship.

pub mod article;
pub mod config;
pub mod feed;
pub mod narrate;
pub mod output;
pub mod render;
pub mod sync;
pub mod tts;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
