//! CLI output formatting for all pipeline stages.
//!
//! Output is information-centric: the primary display for every article
//! is its slug, with page/audio results as indented context lines.
//!
//! ```text
//! 001 how-i-build-things
//!     Page: how-i-build-things/index.html
//!     Audio: generated (2 chunks, 14213 chars, 0.52 MB)
//! 002 thoughts-on-testing
//!     Failed: 'thoughts-on-testing': invalid date '2024-13-01'
//!
//! Sync complete: 1 synced, 1 failed
//! ```
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::sync::{ArticleOutcome, AudioStatus, CheckOutcome, SyncReport};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable size in megabytes, two decimals.
fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

fn format_audio_status(audio: &AudioStatus) -> String {
    match audio {
        AudioStatus::Generated(report) => format!(
            "generated ({} {}, {} chars, {})",
            report.chunk_count,
            if report.chunk_count == 1 { "chunk" } else { "chunks" },
            report.character_count,
            format_megabytes(report.byte_size),
        ),
        AudioStatus::UpToDate => "up to date".to_string(),
        AudioStatus::Republished => "republished from cache".to_string(),
        AudioStatus::Failed(reason) => format!("failed: {reason}"),
    }
}

// ============================================================================
// Sync
// ============================================================================

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (idx, outcome) in report.outcomes.iter().enumerate() {
        match outcome {
            ArticleOutcome::Synced { slug, page, audio } => {
                lines.push(format!("{} {}", format_index(idx + 1), slug));
                lines.push(format!("    Page: {page}"));
                lines.push(format!("    Audio: {}", format_audio_status(audio)));
            }
            ArticleOutcome::Failed { slug, error } => {
                lines.push(format!("{} {}", format_index(idx + 1), slug));
                lines.push(format!("    Failed: {error}"));
            }
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "Sync complete: {} synced, {} failed",
        report.succeeded(),
        report.failed()
    ));
    lines
}

pub fn print_sync_report(report: &SyncReport) {
    for line in format_sync_report(report) {
        println!("{line}");
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(outcomes: &[CheckOutcome]) -> Vec<String> {
    let mut lines = Vec::new();
    for (idx, outcome) in outcomes.iter().enumerate() {
        lines.push(format!("{} {}", format_index(idx + 1), outcome.slug));
        match &outcome.result {
            Ok(info) => {
                lines.push(format!("    Title: {} ({})", info.title, info.date));
                lines.push(format!(
                    "    Narration: {} chars, {} {}",
                    info.character_count,
                    info.chunk_count,
                    if info.chunk_count == 1 { "chunk" } else { "chunks" },
                ));
            }
            Err(reason) => lines.push(format!("    Invalid: {reason}")),
        }
    }
    let invalid = outcomes.iter().filter(|o| o.result.is_err()).count();
    lines.push(String::new());
    if invalid == 0 {
        lines.push(format!("{} article(s), all valid", outcomes.len()));
    } else {
        lines.push(format!("{} article(s), {} invalid", outcomes.len(), invalid));
    }
    lines
}

pub fn print_check_output(outcomes: &[CheckOutcome]) {
    for line in format_check_output(outcomes) {
        println!("{line}");
    }
}
