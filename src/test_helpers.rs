//! Shared test utilities for the blogcast test suite.
//!
//! Provides draft-tree builders and a scripted [`SpeechSynthesizer`] so
//! synthesis and sync tests never touch the network.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use crate::tts::{SpeechSynthesizer, TtsError};

// =========================================================================
// Draft fixtures
// =========================================================================

/// Build a minimal valid draft source with the given title and date.
pub fn draft_source(title: &str, date: &str) -> String {
    format!(
        "+++\ntitle = \"{title}\"\ndate = \"{date}\"\ncategories = [\"Technology\"]\n+++\n\nFirst paragraph with enough text to narrate comfortably.\n\nSecond paragraph so chunking has something to do.\n"
    )
}

/// Write `drafts/<slug>/article.md` with the given source.
pub fn write_draft(root: &Path, slug: &str, source: &str) {
    let dir = root.join(slug);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(crate::article::DRAFT_FILENAME), source).unwrap();
}

// =========================================================================
// Scripted synthesizer
// =========================================================================

/// Returns canned results in order and records every chunk it was asked
/// to synthesize.
pub struct FakeSynthesizer {
    results: RefCell<Vec<Result<Vec<u8>, TtsError>>>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new(results: Vec<Result<Vec<u8>, TtsError>>) -> Self {
        Self {
            results: RefCell::new(results),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// A synthesizer that answers every call with a small fixed payload.
    pub fn always_ok() -> Self {
        Self::new(Vec::new())
    }

    /// A synthesizer scripted to succeed exactly `chunks` times.
    pub fn ok(chunks: usize) -> Self {
        Self::new((0..chunks).map(|i| Ok(vec![i as u8; 4])).collect())
    }

    pub fn provider_error() -> TtsError {
        TtsError::Provider {
            status: 500,
            body: "upstream sadness".to_string(),
        }
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        self.calls.borrow_mut().push(text.to_string());
        let mut results = self.results.borrow_mut();
        if results.is_empty() {
            Ok(b"AUDIO".to_vec())
        } else {
            results.remove(0)
        }
    }
}
