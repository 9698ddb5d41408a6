//! Audio synthesis: cache gate, provider client, and orchestration.
//!
//! Voice synthesis is the expensive stage of the pipeline — every chunk is
//! a paid network call — so this module is built around not repeating work
//! and never half-finishing it.
//!
//! ## Cache Gate
//!
//! [`needs_regeneration`] compares modification times: synthesis runs only
//! when the artifact is absent or the draft's mtime is strictly later than
//! the artifact's. Pure timestamp comparison, no content hashing — a
//! `touch` without a content change forces regeneration. Documented
//! tradeoff, kept as-is.
//!
//! ## Provider
//!
//! The [`SpeechSynthesizer`] trait hides the provider behind one call per
//! chunk. [`ElevenLabs`] is the production implementation: a blocking
//! HTTP POST per chunk carrying the text, model identifier, and fixed
//! voice settings. Transport errors, 429 and 5xx responses are retried up
//! to the configured attempt count with linear backoff; any other non-2xx
//! status is terminal. Every request carries an explicit timeout.
//!
//! ## Orchestration
//!
//! [`synthesize_article`] runs normalize → chunk → synthesize → persist.
//! Chunks are issued strictly sequentially: chunk N completes before
//! chunk N+1 starts, preserving audio order and bounding provider load.
//! Any chunk failure aborts the whole operation and discards buffers
//! already produced. The artifact is persisted exactly once per
//! invocation, via write-to-temp-then-rename, so a failed run never
//! partially overwrites an existing valid artifact.

use crate::config::{Credentials, TtsConfig};
use crate::narrate::{self, NarrateError};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("narration error: {0}")]
    Narration(#[from] NarrateError),
    #[error("narration too short: {chars} characters (minimum {minimum})")]
    TooShort { chars: usize, minimum: usize },
    #[error("synthesis provider error ({status}): {body}")]
    Provider { status: u16, body: String },
    #[error("synthesis request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// One synthesis call per chunk. Implementations own credentials, retry,
/// and transport; callers only see text in, audio bytes out.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;
}

/// Result metadata for a completed synthesis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisReport {
    /// Characters of narration text sent to the provider.
    pub character_count: usize,
    /// Number of chunks the narration was split into.
    pub chunk_count: usize,
    /// Size of the persisted artifact in bytes.
    pub byte_size: u64,
}

// ============================================================================
// Cache gate
// ============================================================================

/// Whether the audio artifact must be regenerated from its draft.
///
/// True when the artifact is absent, or when the draft's modification time
/// is strictly later than the artifact's. Equal timestamps mean the
/// artifact is current.
pub fn needs_regeneration(draft: &Path, artifact: &Path) -> io::Result<bool> {
    if !artifact.exists() {
        return Ok(true);
    }
    let draft_mtime = fs::metadata(draft)?.modified()?;
    let artifact_mtime = fs::metadata(artifact)?.modified()?;
    Ok(draft_mtime > artifact_mtime)
}

// ============================================================================
// Provider client
// ============================================================================

/// Request body for the provider's text-to-speech endpoint.
#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

/// Blocking ElevenLabs text-to-speech client.
pub struct ElevenLabs {
    client: reqwest::blocking::Client,
    base_url: String,
    credentials: Credentials,
    model_id: String,
    stability: f64,
    similarity_boost: f64,
    attempts: u32,
}

impl ElevenLabs {
    const BASE_URL: &'static str = "https://api.elevenlabs.io";

    pub fn new(credentials: Credentials, config: &TtsConfig) -> Result<Self, TtsError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: Self::BASE_URL.to_string(),
            credentials,
            model_id: config.model_id.clone(),
            stability: config.stability,
            similarity_boost: config.similarity_boost,
            attempts: config.attempts,
        })
    }

    /// Point the client at a different origin. Lets tests run against a
    /// local server instead of the real provider.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.base_url, self.credentials.voice_id
        )
    }

    /// Whether a failed attempt may be retried.
    fn retryable(status: reqwest::StatusCode) -> bool {
        status.as_u16() == 429 || status.is_server_error()
    }
}

impl SpeechSynthesizer for ElevenLabs {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let payload = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        };

        let mut last_err = None;
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                // Linear backoff between attempts.
                std::thread::sleep(Duration::from_secs(2 * u64::from(attempt - 1)));
            }
            let sent = self
                .client
                .post(self.endpoint())
                .header("xi-api-key", &self.credentials.api_key)
                .header("Accept", "audio/mpeg")
                .json(&payload)
                .send();
            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.bytes()?.to_vec());
                    }
                    let body = response.text().unwrap_or_default();
                    let err = TtsError::Provider {
                        status: status.as_u16(),
                        body,
                    };
                    if !Self::retryable(status) {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(e) => last_err = Some(TtsError::Http(e)),
            }
        }
        Err(last_err.expect("at least one attempt was made"))
    }
}

// ============================================================================
// Orchestration
// ============================================================================

/// Synthesize one article's narration into an audio artifact.
///
/// `source` is the full draft text (frontmatter included). The artifact is
/// written to `output_path` only after every chunk succeeded.
pub fn synthesize_article(
    source: &str,
    output_path: &Path,
    config: &TtsConfig,
    synthesizer: &dyn SpeechSynthesizer,
) -> Result<SynthesisReport, TtsError> {
    let narration = narrate::narration_text(source)?;
    let character_count = narration.chars().count();
    if character_count < config.min_narration_chars {
        return Err(TtsError::TooShort {
            chars: character_count,
            minimum: config.min_narration_chars,
        });
    }

    let chunks = narrate::split_chunks(&narration, config.max_chunk_chars)?;

    // Strictly sequential: chunk N completes before N+1 starts. A failure
    // here drops all buffers — nothing is written below.
    let mut buffers: Vec<Vec<u8>> = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        buffers.push(synthesizer.synthesize(chunk)?);
    }

    let artifact: Vec<u8> = buffers.concat();
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_atomic(output_path, &artifact)?;

    Ok(SynthesisReport {
        character_count,
        chunk_count: chunks.len(),
        byte_size: artifact.len() as u64,
    })
}

/// Write through a sibling temp file and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = std::path::PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeSynthesizer;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn provider_error() -> TtsError {
        FakeSynthesizer::provider_error()
    }

    fn test_config(max_chunk_chars: usize) -> TtsConfig {
        TtsConfig {
            max_chunk_chars,
            ..TtsConfig::default()
        }
    }

    // =========================================================================
    // Cache gate
    // =========================================================================

    #[test]
    fn regeneration_needed_when_artifact_absent() {
        let tmp = TempDir::new().unwrap();
        let draft = tmp.path().join("article.md");
        fs::write(&draft, "text").unwrap();

        let needed = needs_regeneration(&draft, &tmp.path().join("audio.mp3")).unwrap();
        assert!(needed);
    }

    #[test]
    fn regeneration_skipped_when_artifact_current() {
        let tmp = TempDir::new().unwrap();
        let draft = tmp.path().join("article.md");
        let artifact = tmp.path().join("audio.mp3");
        fs::write(&draft, "text").unwrap();
        fs::write(&artifact, "mp3").unwrap();

        // Artifact written after the draft: not stale.
        assert!(!needs_regeneration(&draft, &artifact).unwrap());
    }

    #[test]
    fn regeneration_needed_when_draft_newer() {
        let tmp = TempDir::new().unwrap();
        let draft = tmp.path().join("article.md");
        let artifact = tmp.path().join("audio.mp3");
        fs::write(&artifact, "mp3").unwrap();
        fs::write(&draft, "text").unwrap();

        let future = SystemTime::now() + Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&draft)
            .unwrap()
            .set_modified(future)
            .unwrap();

        assert!(needs_regeneration(&draft, &artifact).unwrap());
    }

    #[test]
    fn cache_gate_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let draft = tmp.path().join("article.md");
        let artifact = tmp.path().join("audio.mp3");
        fs::write(&draft, "text").unwrap();
        fs::write(&artifact, "mp3").unwrap();

        let first = needs_regeneration(&draft, &artifact).unwrap();
        let second = needs_regeneration(&draft, &artifact).unwrap();
        assert_eq!(first, second);
    }

    // =========================================================================
    // Orchestration
    // =========================================================================

    const SOURCE: &str = "First paragraph with enough text to narrate.\n\nSecond paragraph with enough text as well.\n\nThird paragraph closing things out properly.";

    #[test]
    fn single_chunk_synthesis_writes_artifact() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        let synth = FakeSynthesizer::new(vec![Ok(b"AUDIO".to_vec())]);

        let report = synthesize_article(SOURCE, &out, &test_config(9500), &synth).unwrap();

        assert_eq!(report.chunk_count, 1);
        assert_eq!(report.byte_size, 5);
        assert_eq!(fs::read(&out).unwrap(), b"AUDIO");
    }

    #[test]
    fn chunks_synthesized_in_order_and_concatenated() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        let synth = FakeSynthesizer::new(vec![
            Ok(b"one".to_vec()),
            Ok(b"two".to_vec()),
            Ok(b"three".to_vec()),
        ]);

        // Bound forces one paragraph per chunk.
        let report = synthesize_article(SOURCE, &out, &test_config(50), &synth).unwrap();

        assert_eq!(report.chunk_count, 3);
        assert_eq!(fs::read(&out).unwrap(), b"onetwothree");

        let calls = synth.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].starts_with("First"));
        assert!(calls[1].starts_with("Second"));
        assert!(calls[2].starts_with("Third"));
    }

    #[test]
    fn chunk_failure_aborts_without_writing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        let synth = FakeSynthesizer::new(vec![
            Ok(b"one".to_vec()),
            Err(provider_error()),
            Ok(b"three".to_vec()),
        ]);

        let result = synthesize_article(SOURCE, &out, &test_config(50), &synth);

        assert!(matches!(result, Err(TtsError::Provider { status: 500, .. })));
        assert!(!out.exists());
        // Later chunks never started.
        assert_eq!(synth.calls.borrow().len(), 2);
    }

    #[test]
    fn chunk_failure_leaves_prior_artifact_untouched() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        fs::write(&out, b"previous valid audio").unwrap();
        let synth = FakeSynthesizer::new(vec![Ok(b"one".to_vec()), Err(provider_error())]);

        let result = synthesize_article(SOURCE, &out, &test_config(95), &synth);

        assert!(result.is_err());
        assert_eq!(fs::read(&out).unwrap(), b"previous valid audio");
        // No temp residue either.
        assert!(!tmp.path().join("audio.mp3.part").exists());
    }

    #[test]
    fn successful_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        let synth = FakeSynthesizer::ok(1);

        synthesize_article(SOURCE, &out, &test_config(9500), &synth).unwrap();
        assert!(!tmp.path().join("audio.mp3.part").exists());
    }

    #[test]
    fn too_short_narration_rejected_before_any_call() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        let synth = FakeSynthesizer::ok(1);

        let result = synthesize_article("Tiny.", &out, &test_config(9500), &synth);

        assert!(matches!(result, Err(TtsError::TooShort { chars: 5, .. })));
        assert!(synth.calls.borrow().is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn narration_error_propagates() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        let synth = FakeSynthesizer::ok(1);

        let result = synthesize_article("Intro.\n\n```\nunclosed fence", &out, &test_config(9500), &synth);

        assert!(matches!(
            result,
            Err(TtsError::Narration(NarrateError::UnterminatedFence))
        ));
        assert!(synth.calls.borrow().is_empty());
    }

    #[test]
    fn report_counts_narration_characters() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("audio.mp3");
        let synth = FakeSynthesizer::ok(1);

        let report = synthesize_article(SOURCE, &out, &test_config(9500), &synth).unwrap();
        assert_eq!(report.character_count, SOURCE.chars().count());
    }

    #[test]
    fn output_directory_created_if_missing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("nested").join("dir").join("audio.mp3");
        let synth = FakeSynthesizer::ok(1);

        synthesize_article(SOURCE, &out, &test_config(9500), &synth).unwrap();
        assert!(out.exists());
    }

    // =========================================================================
    // Provider client
    // =========================================================================

    #[test]
    fn request_payload_shape() {
        let payload = SynthesisRequest {
            text: "hello",
            model_id: "eleven_multilingual_v2",
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["model_id"], "eleven_multilingual_v2");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.75);
    }

    #[test]
    fn endpoint_includes_voice_id() {
        let client = ElevenLabs::new(
            Credentials {
                api_key: "key".into(),
                voice_id: "voice123".into(),
            },
            &TtsConfig::default(),
        )
        .unwrap()
        .with_base_url("http://localhost:9999");

        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1/text-to-speech/voice123"
        );
    }

    #[test]
    fn retryable_statuses() {
        use reqwest::StatusCode;
        assert!(ElevenLabs::retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(ElevenLabs::retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(ElevenLabs::retryable(StatusCode::BAD_GATEWAY));
        assert!(!ElevenLabs::retryable(StatusCode::UNAUTHORIZED));
        assert!(!ElevenLabs::retryable(StatusCode::UNPROCESSABLE_ENTITY));
    }
}
