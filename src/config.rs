use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use chrono::Weekday;
use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    wallpaper_dir: PathBuf,
    wallpaper_width: u32,
    wallpaper_height: u32,
    prefer_indian_culture: bool,
    prefer_indian_achievements: bool,
    global_requires_high_popularity: bool,
    discovery_min_relevance: u8,
    search_base_url: String,
    search_timeout: Duration,
    image_base_url: String,
    image_timeout: Duration,
    anthropic_api_key: Option<String>,
    openai_api_key: Option<String>,
    llm_provider: String,
    llm_model: Option<String>,
    llm_base_url: Option<String>,
    llm_timeout: Duration,
    workflow_max_retries: u32,
    workflow_backoff_base_ms: u64,
    workflow_backoff_cap_ms: u64,
    batch_weekday: Weekday,
    batch_hour: u32,
    batch_minute: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Load and validate the worker configuration from environment
    /// variables. Every variable has a default, so an empty environment
    /// yields a working local setup.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a numeric, boolean, address or
    /// weekday value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("WALLPAPER_WORKER_HTTP_BIND", "0.0.0.0:9105")?;
        let wallpaper_dir = PathBuf::from(
            env::var("WALLPAPER_DIR").unwrap_or_else(|_| "./wallpapers".to_string()),
        );
        let wallpaper_width = parse_u32("WALLPAPER_WIDTH", 3024)?;
        let wallpaper_height = parse_u32("WALLPAPER_HEIGHT", 1964)?;

        // Theme selection preferences
        let prefer_indian_culture = parse_bool("PREFER_INDIAN_CULTURE", true)?;
        let prefer_indian_achievements = parse_bool("PREFER_INDIAN_ACHIEVEMENTS", true)?;
        let global_requires_high_popularity =
            parse_bool("GLOBAL_REQUIRES_HIGH_POPULARITY", true)?;
        let discovery_min_relevance = parse_percentage("DISCOVERY_MIN_RELEVANCE", 50)?;

        // Upstream service endpoints
        let search_base_url = env::var("SEARCH_BASE_URL")
            .unwrap_or_else(|_| "https://api.duckduckgo.com/".to_string());
        let search_timeout = parse_duration_ms("SEARCH_TIMEOUT_MS", 10000)?;
        let image_base_url = env::var("IMAGE_BASE_URL")
            .unwrap_or_else(|_| "https://image.pollinations.ai/".to_string());
        let image_timeout = parse_duration_ms("IMAGE_TIMEOUT_MS", 60000)?;

        // LLM settings; the pipeline degrades gracefully when no key is set
        let anthropic_api_key = env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty());
        let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        let llm_provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| "anthropic".to_string());
        let llm_model = env::var("LLM_MODEL").ok();
        let llm_base_url = env::var("LLM_BASE_URL").ok();
        let llm_timeout = parse_duration_ms("LLM_TIMEOUT_MS", 30000)?;

        // Retry settings (exponential backoff, deterministic)
        let workflow_max_retries = parse_u32("WORKFLOW_MAX_RETRIES", 3)?;
        let workflow_backoff_base_ms = parse_u64("WORKFLOW_BACKOFF_BASE_MS", 1000)?;
        let workflow_backoff_cap_ms = parse_u64("WORKFLOW_BACKOFF_CAP_MS", 60000)?;

        // Weekly batch schedule, interpreted in IST
        let batch_weekday = parse_weekday("WALLPAPER_BATCH_WEEKDAY", Weekday::Sun)?;
        let batch_hour = parse_bounded_u32("WALLPAPER_BATCH_HOUR", 8, 23)?;
        let batch_minute = parse_bounded_u32("WALLPAPER_BATCH_MINUTE", 0, 59)?;

        Ok(Self {
            http_bind,
            wallpaper_dir,
            wallpaper_width,
            wallpaper_height,
            prefer_indian_culture,
            prefer_indian_achievements,
            global_requires_high_popularity,
            discovery_min_relevance,
            search_base_url,
            search_timeout,
            image_base_url,
            image_timeout,
            anthropic_api_key,
            openai_api_key,
            llm_provider,
            llm_model,
            llm_base_url,
            llm_timeout,
            workflow_max_retries,
            workflow_backoff_base_ms,
            workflow_backoff_cap_ms,
            batch_weekday,
            batch_hour,
            batch_minute,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn wallpaper_dir(&self) -> &std::path::Path {
        &self.wallpaper_dir
    }

    #[must_use]
    pub fn wallpaper_width(&self) -> u32 {
        self.wallpaper_width
    }

    #[must_use]
    pub fn wallpaper_height(&self) -> u32 {
        self.wallpaper_height
    }

    #[must_use]
    pub fn prefer_indian_culture(&self) -> bool {
        self.prefer_indian_culture
    }

    #[must_use]
    pub fn prefer_indian_achievements(&self) -> bool {
        self.prefer_indian_achievements
    }

    #[must_use]
    pub fn global_requires_high_popularity(&self) -> bool {
        self.global_requires_high_popularity
    }

    #[must_use]
    pub fn discovery_min_relevance(&self) -> u8 {
        self.discovery_min_relevance
    }

    #[must_use]
    pub fn search_base_url(&self) -> &str {
        &self.search_base_url
    }

    #[must_use]
    pub fn search_timeout(&self) -> Duration {
        self.search_timeout
    }

    #[must_use]
    pub fn image_base_url(&self) -> &str {
        &self.image_base_url
    }

    #[must_use]
    pub fn image_timeout(&self) -> Duration {
        self.image_timeout
    }

    #[must_use]
    pub fn anthropic_api_key(&self) -> Option<&str> {
        self.anthropic_api_key.as_deref()
    }

    #[must_use]
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref()
    }

    #[must_use]
    pub fn llm_provider(&self) -> &str {
        &self.llm_provider
    }

    #[must_use]
    pub fn llm_model(&self) -> Option<&str> {
        self.llm_model.as_deref()
    }

    #[must_use]
    pub fn llm_base_url(&self) -> Option<&str> {
        self.llm_base_url.as_deref()
    }

    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    #[must_use]
    pub fn workflow_max_retries(&self) -> u32 {
        self.workflow_max_retries
    }

    #[must_use]
    pub fn workflow_backoff_base_ms(&self) -> u64 {
        self.workflow_backoff_base_ms
    }

    #[must_use]
    pub fn workflow_backoff_cap_ms(&self) -> u64 {
        self.workflow_backoff_cap_ms
    }

    #[must_use]
    pub fn batch_weekday(&self) -> Weekday {
        self.batch_weekday
    }

    #[must_use]
    pub fn batch_hour(&self) -> u32 {
        self.batch_hour
    }

    #[must_use]
    pub fn batch_minute(&self) -> u32 {
        self.batch_minute
    }
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_u64(name, default_ms)?;
    Ok(Duration::from_millis(ms))
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_bounded_u32(name: &'static str, default: u32, max: u32) -> Result<u32, ConfigError> {
    let parsed = parse_u32(name, default)?;
    if parsed > max {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0 and {max}"),
        });
    }
    Ok(parsed)
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_percentage(name: &'static str, default: u8) -> Result<u8, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let parsed = raw.parse::<u8>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if parsed > 100 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0 and 100"),
        });
    }
    Ok(parsed)
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}

fn parse_weekday(name: &'static str, default: Weekday) -> Result<Weekday, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };
    match raw.to_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("unknown weekday: {raw}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests run sequentially and assign valid UTF-8 values.
        unsafe {
            env::set_var(name, value);
        }
    }

    fn remove_env(name: &str) {
        // SAFETY: tests run sequentially and clean up deterministic keys.
        unsafe {
            env::remove_var(name);
        }
    }

    fn reset_env() {
        remove_env("WALLPAPER_WORKER_HTTP_BIND");
        remove_env("WALLPAPER_DIR");
        remove_env("WALLPAPER_WIDTH");
        remove_env("WALLPAPER_HEIGHT");
        remove_env("PREFER_INDIAN_CULTURE");
        remove_env("PREFER_INDIAN_ACHIEVEMENTS");
        remove_env("GLOBAL_REQUIRES_HIGH_POPULARITY");
        remove_env("DISCOVERY_MIN_RELEVANCE");
        remove_env("SEARCH_BASE_URL");
        remove_env("SEARCH_TIMEOUT_MS");
        remove_env("IMAGE_BASE_URL");
        remove_env("IMAGE_TIMEOUT_MS");
        remove_env("ANTHROPIC_API_KEY");
        remove_env("OPENAI_API_KEY");
        remove_env("LLM_PROVIDER");
        remove_env("LLM_MODEL");
        remove_env("LLM_BASE_URL");
        remove_env("LLM_TIMEOUT_MS");
        remove_env("WORKFLOW_MAX_RETRIES");
        remove_env("WORKFLOW_BACKOFF_BASE_MS");
        remove_env("WORKFLOW_BACKOFF_CAP_MS");
        remove_env("WALLPAPER_BATCH_WEEKDAY");
        remove_env("WALLPAPER_BATCH_HOUR");
        remove_env("WALLPAPER_BATCH_MINUTE");
    }

    #[test]
    fn from_env_uses_defaults_when_nothing_is_set() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.http_bind(), "0.0.0.0:9105".parse().unwrap());
        assert_eq!(config.wallpaper_dir(), std::path::Path::new("./wallpapers"));
        assert_eq!(config.wallpaper_width(), 3024);
        assert_eq!(config.wallpaper_height(), 1964);
        assert!(config.prefer_indian_culture());
        assert!(config.prefer_indian_achievements());
        assert!(config.global_requires_high_popularity());
        assert_eq!(config.discovery_min_relevance(), 50);
        assert_eq!(config.search_base_url(), "https://api.duckduckgo.com/");
        assert_eq!(config.search_timeout(), Duration::from_millis(10000));
        assert_eq!(config.image_base_url(), "https://image.pollinations.ai/");
        assert_eq!(config.image_timeout(), Duration::from_millis(60000));
        assert!(config.anthropic_api_key().is_none());
        assert!(config.openai_api_key().is_none());
        assert_eq!(config.llm_provider(), "anthropic");
        assert_eq!(config.llm_timeout(), Duration::from_millis(30000));
        assert_eq!(config.workflow_max_retries(), 3);
        assert_eq!(config.workflow_backoff_base_ms(), 1000);
        assert_eq!(config.workflow_backoff_cap_ms(), 60000);
        assert_eq!(config.batch_weekday(), Weekday::Sun);
        assert_eq!(config.batch_hour(), 8);
        assert_eq!(config.batch_minute(), 0);
    }

    #[test]
    fn from_env_honors_overrides() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("WALLPAPER_WORKER_HTTP_BIND", "127.0.0.1:7000");
        set_env("WALLPAPER_DIR", "/tmp/walls");
        set_env("WALLPAPER_WIDTH", "1920");
        set_env("WALLPAPER_HEIGHT", "1080");
        set_env("PREFER_INDIAN_CULTURE", "off");
        set_env("DISCOVERY_MIN_RELEVANCE", "70");
        set_env("ANTHROPIC_API_KEY", "sk-test");
        set_env("LLM_PROVIDER", "openai");
        set_env("WORKFLOW_MAX_RETRIES", "5");
        set_env("WALLPAPER_BATCH_WEEKDAY", "Friday");
        set_env("WALLPAPER_BATCH_HOUR", "21");

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.http_bind(), "127.0.0.1:7000".parse().unwrap());
        assert_eq!(config.wallpaper_dir(), std::path::Path::new("/tmp/walls"));
        assert_eq!(config.wallpaper_width(), 1920);
        assert_eq!(config.wallpaper_height(), 1080);
        assert!(!config.prefer_indian_culture());
        assert_eq!(config.discovery_min_relevance(), 70);
        assert_eq!(config.anthropic_api_key(), Some("sk-test"));
        assert_eq!(config.llm_provider(), "openai");
        assert_eq!(config.workflow_max_retries(), 5);
        assert_eq!(config.batch_weekday(), Weekday::Fri);
        assert_eq!(config.batch_hour(), 21);

        reset_env();
    }

    #[test]
    fn from_env_rejects_invalid_bool() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("PREFER_INDIAN_CULTURE", "maybe");

        let error = Config::from_env().expect_err("invalid bool should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "PREFER_INDIAN_CULTURE",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn from_env_rejects_unknown_weekday() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("WALLPAPER_BATCH_WEEKDAY", "someday");

        let error = Config::from_env().expect_err("invalid weekday should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "WALLPAPER_BATCH_WEEKDAY",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn from_env_rejects_out_of_range_percentage() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("DISCOVERY_MIN_RELEVANCE", "150");

        let error = Config::from_env().expect_err("percentage above 100 should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "DISCOVERY_MIN_RELEVANCE",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn from_env_rejects_out_of_range_hour() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("WALLPAPER_BATCH_HOUR", "24");

        let error = Config::from_env().expect_err("hour above 23 should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "WALLPAPER_BATCH_HOUR",
                ..
            }
        ));
        reset_env();
    }
}
