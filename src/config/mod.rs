//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU64, path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::hooks::DEFAULT_AUDIO_ATTRIBUTE_KEY;
use crate::cache::{CacheScope, DEFAULT_EPISODE_TTL_SECS, MAX_EPISODE_TTL_SECS};
use crate::domain::types::ContentType;

mod cli;

pub use cli::{
    CliArgs, Command, EpisodesArgs, EvaluationArgs, Overrides, RoleArg, SearchArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "privatecast";
const ENV_PREFIX: &str = "PRIVATECAST";
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub episodes: EpisodeSettings,
    pub cache: CacheSettings,
    pub content: ContentSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct EpisodeSettings {
    pub audio_attribute_key: String,
    /// Types added to podcast queries by post-type expansion.
    pub podcast_post_types: Vec<ContentType>,
    pub timezone: Tz,
    pub query_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_seconds: NonZeroU64,
    pub scope: CacheScope,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub fixtures: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(environment());

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// `PRIVATECAST__SECTION__KEY` variables; list keys take comma-separated values.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("episodes.podcast_post_types")
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    episodes: RawEpisodeSettings,
    cache: RawCacheSettings,
    content: RawContentSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(key) = overrides.audio_attribute_key.as_ref() {
            self.episodes.audio_attribute_key = Some(key.clone());
        }
        if let Some(timezone) = overrides.timezone.as_ref() {
            self.episodes.timezone = Some(timezone.clone());
        }
        if let Some(timeout) = overrides.query_timeout_ms {
            self.episodes.query_timeout_ms = Some(timeout);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(scope) = overrides.cache_scope.as_ref() {
            self.cache.scope = Some(scope.clone());
        }
        if let Some(path) = overrides.fixtures.as_ref() {
            self.content.fixtures = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            episodes,
            cache,
            content,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            episodes: build_episode_settings(episodes)?,
            cache: build_cache_settings(cache)?,
            content: build_content_settings(content),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_episode_settings(episodes: RawEpisodeSettings) -> Result<EpisodeSettings, LoadError> {
    let audio_attribute_key = episodes
        .audio_attribute_key
        .and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| DEFAULT_AUDIO_ATTRIBUTE_KEY.to_string());

    let podcast_post_types = episodes
        .podcast_post_types
        .unwrap_or_default()
        .into_iter()
        .map(|value| {
            ContentType::new(value)
                .map_err(|err| LoadError::invalid("episodes.podcast_post_types", err.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let timezone = match episodes.timezone {
        Some(name) => Tz::from_str(name.trim()).map_err(|err| {
            LoadError::invalid("episodes.timezone", format!("unknown time zone `{name}`: {err}"))
        })?,
        None => Tz::UTC,
    };

    let timeout_ms = episodes
        .query_timeout_ms
        .unwrap_or(DEFAULT_QUERY_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "episodes.query_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(EpisodeSettings {
        audio_attribute_key,
        podcast_post_types,
        timezone,
        query_timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl = cache.ttl_seconds.unwrap_or(DEFAULT_EPISODE_TTL_SECS);
    let ttl_seconds = NonZeroU64::new(ttl)
        .ok_or_else(|| LoadError::invalid("cache.ttl_seconds", "must be greater than zero"))?;
    if ttl > MAX_EPISODE_TTL_SECS {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            format!("must be at most {MAX_EPISODE_TTL_SECS}"),
        ));
    }

    let scope = match cache.scope {
        Some(value) => CacheScope::try_from(value.trim()).map_err(|_| {
            LoadError::invalid(
                "cache.scope",
                format!("expected `shared` or `per_permission`, got `{value}`"),
            )
        })?,
        None => CacheScope::Shared,
    };

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        ttl_seconds,
        scope,
    })
}

fn build_content_settings(content: RawContentSettings) -> ContentSettings {
    ContentSettings {
        fixtures: content.fixtures,
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEpisodeSettings {
    audio_attribute_key: Option<String>,
    podcast_post_types: Option<Vec<String>>,
    timezone: Option<String>,
    query_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    ttl_seconds: Option<u64>,
    scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    fixtures: Option<PathBuf>,
}
