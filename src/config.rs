//! Site configuration module.
//!
//! Handles loading, validating, and merging the `config.toml` placed in the
//! drafts root. Stock defaults are overridden by whatever keys the user's
//! file provides; unknown keys are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! url = "https://example.com"       # Absolute site origin, no trailing slash
//! title = "Example - Thoughts"
//! description = "Articles and writings"
//! author = "Site Author"
//! email = "hello@example.com"
//! language = "en-us"
//!
//! [podcast]
//! cover_image = "/images/podcast-cover.jpg"
//! category = "Technology"
//! explicit = false
//!
//! [tts]
//! model_id = "eleven_multilingual_v2"
//! stability = 0.5                   # Voice stability (0.0 - 1.0)
//! similarity_boost = 0.75           # Voice similarity (0.0 - 1.0)
//! max_chunk_chars = 9500            # Provider payload bound per request
//! min_narration_chars = 10          # Reject narration shorter than this
//! attempts = 3                      # Tries per chunk (transport/429/5xx)
//! request_timeout_secs = 60         # Per-request timeout
//! ```
//!
//! ## Credentials
//!
//! The synthesis API key and voice identity are secrets, so they come from
//! the environment (`ELEVENLABS_API_KEY`, `ELEVENLABS_VOICE_ID`) rather
//! than the config file. They are resolved once into a [`Credentials`]
//! value at the CLI boundary and threaded into the synthesis path — no
//! component reads the environment on its own, so tests can supply
//! fixtures without touching process state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{0} environment variable not set")]
    MissingCredential(&'static str),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity used in pages and the feed channel.
    pub site: SiteSection,
    /// Podcast channel settings emitted into the feed.
    pub podcast: PodcastConfig,
    /// Voice-synthesis tuning.
    pub tts: TtsConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.site.url.starts_with("http://") && !self.site.url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "site.url must be an absolute http(s) URL".into(),
            ));
        }
        if self.site.url.ends_with('/') {
            return Err(ConfigError::Validation(
                "site.url must not end with a slash".into(),
            ));
        }
        if self.site.title.is_empty() || self.site.author.is_empty() {
            return Err(ConfigError::Validation(
                "site.title and site.author must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tts.stability)
            || !(0.0..=1.0).contains(&self.tts.similarity_boost)
        {
            return Err(ConfigError::Validation(
                "tts.stability and tts.similarity_boost must be 0.0-1.0".into(),
            ));
        }
        if self.tts.max_chunk_chars == 0 {
            return Err(ConfigError::Validation(
                "tts.max_chunk_chars must be non-zero".into(),
            ));
        }
        if self.tts.attempts == 0 {
            return Err(ConfigError::Validation("tts.attempts must be >= 1".into()));
        }
        Ok(())
    }
}

/// Site identity: origin URL and feed channel metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Absolute site origin, no trailing slash (e.g. `https://example.com`).
    pub url: String,
    /// Channel title.
    pub title: String,
    /// Channel description.
    pub description: String,
    /// Author name, used for managingEditor/webMaster and iTunes tags.
    pub author: String,
    /// Contact email for the feed channel.
    pub email: String,
    /// Feed language code.
    pub language: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            url: "https://example.com".to_string(),
            title: "Example - Thoughts".to_string(),
            description: "Articles and writings".to_string(),
            author: "Site Author".to_string(),
            email: "hello@example.com".to_string(),
            language: "en-us".to_string(),
        }
    }
}

/// Podcast channel settings (iTunes namespace tags).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PodcastConfig {
    /// Cover art path. Site-relative paths are resolved against `site.url`.
    pub cover_image: String,
    /// iTunes category label.
    pub category: String,
    /// Whether the channel carries explicit content.
    pub explicit: bool,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            cover_image: "/images/podcast-cover.jpg".to_string(),
            category: "Technology".to_string(),
            explicit: false,
        }
    }
}

/// Voice-synthesis tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TtsConfig {
    /// Provider model identifier.
    pub model_id: String,
    /// Voice stability parameter (0.0 - 1.0).
    pub stability: f64,
    /// Voice similarity-boost parameter (0.0 - 1.0).
    pub similarity_boost: f64,
    /// Maximum characters per synthesis request. The provider caps payloads
    /// at 10,000 characters; the default stays under that.
    pub max_chunk_chars: usize,
    /// Narration shorter than this is rejected as not viable.
    pub min_narration_chars: usize,
    /// Tries per chunk. Transport errors, 429 and 5xx are retried; other
    /// failures are terminal on the first response.
    pub attempts: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            max_chunk_chars: 9500,
            min_narration_chars: 10,
            attempts: 3,
            request_timeout_secs: 60,
        }
    }
}

/// Provider credentials, resolved once at the CLI boundary.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub voice_id: String,
}

impl Credentials {
    /// Read credentials from the environment. Fails fast with the name of
    /// the missing variable — before any network call is attempted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .map_err(|_| ConfigError::MissingCredential("ELEVENLABS_API_KEY"))?;
        let voice_id = std::env::var("ELEVENLABS_VOICE_ID")
            .map_err(|_| ConfigError::MissingCredential("ELEVENLABS_VOICE_ID"))?;
        Ok(Self { api_key, voice_id })
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the drafts root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Blogcast Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the drafts root (drafts/config.toml).
# Unknown keys will cause an error.
#
# Credentials are NOT configured here: the synthesis API key and voice
# identity come from the ELEVENLABS_API_KEY and ELEVENLABS_VOICE_ID
# environment variables.

# ---------------------------------------------------------------------------
# Site identity (pages and feed channel)
# ---------------------------------------------------------------------------
[site]
# Absolute site origin, no trailing slash.
url = "https://example.com"

# Feed channel title and description.
title = "Example - Thoughts"
description = "Articles and writings"

# Author name (managingEditor/webMaster, iTunes author/owner) and contact.
author = "Site Author"
email = "hello@example.com"

# Feed language code.
language = "en-us"

# ---------------------------------------------------------------------------
# Podcast channel (iTunes tags)
# ---------------------------------------------------------------------------
[podcast]
# Cover art. Site-relative paths are resolved against site.url.
cover_image = "/images/podcast-cover.jpg"

# iTunes category label.
category = "Technology"

# Whether the channel carries explicit content.
explicit = false

# ---------------------------------------------------------------------------
# Voice synthesis
# ---------------------------------------------------------------------------
[tts]
# Provider model identifier.
model_id = "eleven_multilingual_v2"

# Voice settings (0.0 - 1.0).
stability = 0.5
similarity_boost = 0.75

# Maximum characters per synthesis request. The provider caps payloads at
# 10,000 characters; stay under that.
max_chunk_chars = 9500

# Narration shorter than this is rejected as not viable.
min_narration_chars = 10

# Tries per chunk: transport errors, 429 and 5xx are retried with linear
# backoff; other failures are terminal on the first response.
attempts = 3

# Per-request timeout in seconds.
request_timeout_secs = 60
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_site_identity() {
        let config = SiteConfig::default();
        assert_eq!(config.site.url, "https://example.com");
        assert_eq!(config.site.language, "en-us");
    }

    #[test]
    fn default_config_has_tts_settings() {
        let config = SiteConfig::default();
        assert_eq!(config.tts.model_id, "eleven_multilingual_v2");
        assert_eq!(config.tts.max_chunk_chars, 9500);
        assert_eq!(config.tts.min_narration_chars, 10);
        assert_eq!(config.tts.attempts, 3);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[site]
title = "My Thoughts"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.site.title, "My Thoughts");
        // Default values preserved
        assert_eq!(config.site.url, "https://example.com");
        assert_eq!(config.tts.max_chunk_chars, 9500);
    }

    #[test]
    fn parse_tts_settings() {
        let toml = r#"
[tts]
max_chunk_chars = 4000
stability = 0.3
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tts.max_chunk_chars, 4000);
        assert_eq!(config.tts.stability, 0.3);
        // Unspecified defaults preserved
        assert_eq!(config.tts.similarity_boost, 0.75);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();

        assert_eq!(config.site.url, "https://example.com");
        assert_eq!(config.podcast.category, "Technology");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[site]
url = "https://blog.example.org"
author = "Someone Else"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.url, "https://blog.example.org");
        assert_eq!(config.site.author, "Someone Else");
        // Unspecified values should be defaults
        assert_eq!(config.site.language, "en-us");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[site]
ttle = "typo"
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[sight]
url = "https://example.com"
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_relative_url() {
        let mut config = SiteConfig::default();
        config.site.url = "example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("site.url"));
    }

    #[test]
    fn validate_rejects_trailing_slash() {
        let mut config = SiteConfig::default();
        config.site.url = "https://example.com/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_voice_settings() {
        let mut config = SiteConfig::default();
        config.tts.stability = 1.5;
        assert!(config.validate().is_err());

        let mut config = SiteConfig::default();
        config.tts.similarity_boost = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_chunk_bound() {
        let mut config = SiteConfig::default();
        config.tts.max_chunk_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = SiteConfig::default();
        config.tts.attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[tts]
stability = 2.0
"#,
        )
        .unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"attempts = 3"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"attempts = 5"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("attempts").unwrap().as_integer(), Some(5));
    }

    #[test]
    fn merge_toml_table_merge_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[tts]
max_chunk_chars = 9500
attempts = 3
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[tts]
attempts = 5
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let tts = merged.get("tts").unwrap();
        assert_eq!(tts.get("attempts").unwrap().as_integer(), Some(5));
        assert_eq!(tts.get("max_chunk_chars").unwrap().as_integer(), Some(9500));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let content = stock_config_toml();
        let config: SiteConfig = toml::from_str(content).unwrap();
        assert_eq!(config.site.url, "https://example.com");
        assert_eq!(config.tts.max_chunk_chars, 9500);
        assert_eq!(config.podcast.category, "Technology");
        assert!(!config.podcast.explicit);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[site]"));
        assert!(content.contains("[podcast]"));
        assert!(content.contains("[tts]"));
    }
}
