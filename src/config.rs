use shuttle_runtime::SecretStore;
use std::{str::FromStr, time::Duration};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing secret: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub openai: OpenAiConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    pub locale: String,
    pub http: HttpConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig(pub String);

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Local { path: String },
    Remote { url: String, token: String },
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct HttpConfig {
    pub proxy_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub capacity: usize,
}

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DATABASE_URL: &str = "data/bot.db";
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "ru"];

pub fn build_config(secret_store: &SecretStore) -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| secret_store.get(key))
}

impl AppConfig {
    /// Builds the configuration from any key lookup, the secret store in production.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        info!("Building AppConfig...");
        let secrets = Secrets { lookup };

        let database_url = secrets.optional("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let storage = if database_url == "memory" {
            StorageConfig::Memory
        } else if database_url.starts_with("libsql://") || database_url.starts_with("https://") {
            StorageConfig::Remote {
                url: database_url,
                token: secrets.required("DATABASE_TOKEN")?,
            }
        } else {
            StorageConfig::Local { path: database_url }
        };

        let locale = secrets.optional("BOT_LOCALE").unwrap_or_else(|| "en".to_string());
        if !SUPPORTED_LOCALES.contains(&locale.as_str()) {
            return Err(ConfigError::Invalid {
                key: "BOT_LOCALE",
                value: locale,
            });
        }

        let max_attempts = secrets.parsed::<u32>("GENERATION_MAX_ATTEMPTS", 2)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "GENERATION_MAX_ATTEMPTS",
                value: max_attempts.to_string(),
            });
        }

        let config = AppConfig {
            telegram: TelegramConfig(secrets.required("TELEGRAM_BOT_TOKEN")?),
            openai: OpenAiConfig {
                api_key: secrets.required("OPENAI_API_KEY")?,
                base_url: secrets
                    .optional("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            storage,
            generation: GenerationConfig {
                timeout: Duration::from_secs(secrets.parsed("GENERATION_TIMEOUT_SECS", 120)?),
                max_attempts,
                retry_delay: Duration::from_millis(secrets.parsed("GENERATION_RETRY_DELAY_MS", 500)?),
                max_retry_delay: Duration::from_millis(secrets.parsed("GENERATION_MAX_RETRY_DELAY_MS", 10_000)?),
            },
            locale,
            http: HttpConfig {
                proxy_url: secrets.optional("HTTP_PROXY_URL"),
            },
            session: SessionConfig {
                capacity: secrets.parsed("SESSION_CAPACITY", 1024)?,
            },
        };
        info!("AppConfig built");

        Ok(config)
    }
}

struct Secrets<F> {
    lookup: F,
}

impl<F> Secrets<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Empty values count as absent.
    fn optional(&self, key: &'static str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value.parse::<T>().map_err(|_| ConfigError::Invalid { key, value }),
            None => Ok(default),
        }
    }
}
