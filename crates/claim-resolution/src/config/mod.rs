use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub escalation: EscalationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match optional_var("APP_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let database = DatabaseConfig {
            path: env::var("DATABASE_PATH").unwrap_or_else(|_| "claims.db".to_string()),
        };

        let llm = LlmConfig {
            api_url: env::var("LLM_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            api_key: optional_var("LLM_API_KEY"),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout: Duration::from_secs(parse_var("LLM_TIMEOUT_SECS", 45u64)?),
            max_retries: parse_var("LLM_MAX_RETRIES", 2u32)?,
        };

        let storage = StorageConfig {
            base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:9000/claims".to_string()),
            signing_key: optional_var("STORAGE_SIGNING_KEY"),
            url_ttl: Duration::from_secs(parse_var("STORAGE_URL_TTL_SECS", 900u64)?),
            fetch_timeout: Duration::from_secs(parse_var("STORAGE_FETCH_TIMEOUT_SECS", 30u64)?),
        };

        let email = EmailConfig {
            api_url: optional_var("EMAIL_API_URL"),
            api_key: optional_var("EMAIL_API_KEY"),
            from: env::var("EMAIL_FROM").unwrap_or_else(|_| "claims@localhost".to_string()),
        };

        let approval_ttl_days = parse_var("APPROVAL_TTL_DAYS", 7i64)?;
        if approval_ttl_days <= 0 {
            return Err(ConfigError::InvalidNumber {
                key: "APPROVAL_TTL_DAYS",
                value: approval_ttl_days.to_string(),
            });
        }

        let escalation = EscalationConfig {
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://{host}:{port}")),
            approval_ttl_days,
            notification_timeout: Duration::from_secs(parse_var(
                "NOTIFICATION_TIMEOUT_SECS",
                20u64,
            )?),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            database,
            llm,
            storage,
            email,
            escalation,
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub path: String,
}

/// OpenAI-compatible chat completion endpoint settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub signing_key: Option<String>,
    pub url_ttl: Duration,
    /// Bound on each photo download, independent of how long a signed URL stays valid.
    pub fetch_timeout: Duration,
}

/// Outbound email settings; without an API URL mail is written to the log only.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct EscalationConfig {
    pub public_base_url: String,
    pub approval_ttl_days: i64,
    pub notification_timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive number (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "DATABASE_PATH",
            "LLM_API_KEY",
            "LLM_TIMEOUT_SECS",
            "LLM_MAX_RETRIES",
            "STORAGE_URL_TTL_SECS",
            "STORAGE_FETCH_TIMEOUT_SECS",
            "EMAIL_API_URL",
            "PUBLIC_BASE_URL",
            "APPROVAL_TTL_DAYS",
            "NOTIFICATION_TIMEOUT_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.database.path, "claims.db");
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.timeout, Duration::from_secs(45));
        assert_eq!(config.storage.url_ttl, Duration::from_secs(900));
        assert_eq!(config.storage.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.escalation.approval_ttl_days, 7);
        assert_eq!(config.escalation.public_base_url, "http://127.0.0.1:3000");
        assert!(config.email.api_url.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_timeouts() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("LLM_TIMEOUT_SECS", "soon");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key, value }) => {
                assert_eq!(key, "LLM_TIMEOUT_SECS");
                assert_eq!(value, "soon");
            }
            other => panic!("expected invalid number error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_non_positive_approval_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APPROVAL_TTL_DAYS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "APPROVAL_TTL_DAYS",
                ..
            })
        ));
        reset_env();
    }

    #[test]
    fn photo_fetch_timeout_is_separate_from_url_lifetime() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("STORAGE_URL_TTL_SECS", "1800");
        env::set_var("STORAGE_FETCH_TIMEOUT_SECS", "10");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.storage.url_ttl, Duration::from_secs(1800));
        assert_eq!(config.storage.fetch_timeout, Duration::from_secs(10));
        reset_env();
    }
}
