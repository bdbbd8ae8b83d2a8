//! Runtime configuration, read from the process environment (a `.env` file is
//! loaded by `main` before this runs).

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Lookup service used when `LOOKUP_BASE_URL` is not set.
pub const DEFAULT_LOOKUP_BASE_URL: &str = "https://audioslave-l9ch.onrender.com";
/// Message prefix that triggers playback.
pub const DEFAULT_TRIGGER: &str = "!play";
/// Executable used when audio is normalised.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Errors raised while reading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing bot token: set ACCESS_KEY or DISCORD_TOKEN")]
    MissingToken,

    #[error("Invalid LOOKUP_BASE_URL '{value}': {reason}")]
    InvalidLookupUrl { value: String, reason: String },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// How fetched audio is turned into a playable input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMode {
    /// Hand the fetched bytes to the decoder as-is and let it probe the format.
    #[default]
    Passthrough,
    /// Transcode through ffmpeg to 48 kHz stereo s16le PCM first.
    Normalize,
}

impl FromStr for AudioMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(Self::Passthrough),
            "normalize" | "normalise" => Ok(Self::Normalize),
            _ => Err(()),
        }
    }
}

/// What to do when a guild already has a live playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Every invocation starts its own session; sessions are mixed together.
    #[default]
    Allow,
    /// Refuse new invocations until the live session ends.
    Reject,
}

impl FromStr for ConcurrencyPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

/// Everything the bot needs to start.
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub lookup_base_url: Url,
    pub trigger: String,
    pub audio_mode: AudioMode,
    pub concurrency: ConcurrencyPolicy,
    pub ffmpeg_path: PathBuf,
}

// The token stays out of logs.
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("lookup_base_url", &self.lookup_base_url.as_str())
            .field("trigger", &self.trigger)
            .field("audio_mode", &self.audio_mode)
            .field("concurrency", &self.concurrency)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .finish()
    }
}

impl BotConfig {
    /// Build a configuration with defaults for everything but the token and lookup service.
    pub fn new(token: impl Into<String>, lookup_base_url: Url) -> Self {
        Self {
            token: token.into(),
            lookup_base_url,
            trigger: DEFAULT_TRIGGER.to_string(),
            audio_mode: AudioMode::default(),
            concurrency: ConcurrencyPolicy::default(),
            ffmpeg_path: PathBuf::from(DEFAULT_FFMPEG),
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        let token = non_empty("ACCESS_KEY")
            .or_else(|| non_empty("DISCORD_TOKEN"))
            .ok_or(ConfigError::MissingToken)?;

        let raw_url =
            non_empty("LOOKUP_BASE_URL").unwrap_or_else(|| DEFAULT_LOOKUP_BASE_URL.to_string());
        let lookup_base_url = parse_base_url(&raw_url)?;

        let mut config = Self::new(token, lookup_base_url);

        if let Some(trigger) = non_empty("PLAY_TRIGGER") {
            config.trigger = trigger.trim().to_string();
        }

        if let Some(mode) = non_empty("AUDIO_MODE") {
            config.audio_mode = mode.parse().map_err(|_| ConfigError::InvalidValue {
                key: "AUDIO_MODE",
                value: mode,
            })?;
        }

        if let Some(policy) = non_empty("PLAY_POLICY") {
            config.concurrency = policy.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PLAY_POLICY",
                value: policy,
            })?;
        }

        if let Some(path) = non_empty("FFMPEG_PATH") {
            config.ffmpeg_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidLookupUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidLookupUrl {
            value: raw.to_string(),
            reason: "expected an http(s) base URL".to_string(),
        });
    }

    Ok(url)
}
