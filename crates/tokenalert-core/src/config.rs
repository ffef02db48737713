//! Configuration management for TokenAlert
//!
//! Settings are read once at startup from a flat key-value lookup (the
//! process environment, optionally layered over a TOML file) and validated
//! eagerly into an immutable [`Config`].

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{Price, Thresholds};

/// Default page the token price is scraped from
pub const DEFAULT_TOKEN_PAGE_URL: &str = "https://wowauction.us/token";

/// Threshold value that disables a side
pub const THRESHOLD_DISABLED: i64 = -1;

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    /// Price source configuration
    pub source: SourceConfig,

    /// Alert thresholds
    pub thresholds: Thresholds,

    /// Recipient lists
    pub recipients: RecipientsConfig,

    /// Email channel configuration
    pub email: EmailConfig,

    /// SMS channel configuration
    pub sms: SmsConfig,

    /// Persisted state configuration
    pub state: StateConfig,

    /// Built-in scheduler configuration
    pub schedule: ScheduleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Price source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Page to scrape
    pub url: String,
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl SourceConfig {
    /// Delay between fetch attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TOKEN_PAGE_URL.to_string(),
            max_retries: 3,
            retry_delay_ms: 700,
        }
    }
}

/// Recipient lists
#[derive(Debug, Clone, Default)]
pub struct RecipientsConfig {
    /// Notified on every price change
    pub always: Vec<String>,
    /// Notified when a threshold is crossed
    pub on_alert: Vec<String>,
}

/// Email (SMTP) configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Sender address, also the SMTP username
    pub from: String,
    /// SMTP password (app password for Gmail)
    pub password: String,
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP submission port
    pub smtp_port: u16,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: String::new(),
            password: String::new(),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
        }
    }
}

/// SMS configuration; empty values disable the channel
#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    /// Communication Services connection string
    pub connection_string: String,
    /// Sender phone number
    pub phone_number: String,
}

impl SmsConfig {
    /// True when both the connection string and sender number are set
    pub fn is_configured(&self) -> bool {
        !self.connection_string.is_empty() && !self.phone_number.is_empty()
    }
}

/// Persisted state configuration
#[derive(Debug, Clone)]
pub struct StateConfig {
    /// Whether the last price is persisted between ticks
    pub persist: bool,
    /// Store location (`file://`, `redis://` or `memory://`)
    pub connection_string: String,
    /// Key used by key-value backends
    pub key: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            persist: true,
            connection_string: "file://state/state.txt".to_string(),
            key: "tokenalert:last_price".to_string(),
        }
    }
}

/// Built-in scheduler configuration
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Delay before the first tick
    pub offset: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            offset: Duration::from_secs(15),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            thresholds: Thresholds::default(),
            recipients: RecipientsConfig::default(),
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            state: StateConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, optionally layered over a TOML file.
    ///
    /// A `.env` file in the working directory is honoured if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::default())
            .build()?;

        Self::from_lookup(|key| settings.get_string(&key.to_ascii_lowercase()).ok())
    }

    /// Build and validate a configuration from a key-value lookup.
    ///
    /// Keys are the upper-case names documented in the README
    /// (`TOKEN_AMOUNT_ALERT_LOW`, `FROM_EMAIL`, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required =
            |key: &str| get(key).ok_or_else(|| Error::config(format!("{key} is required")));

        let defaults = Self::default();

        let source = SourceConfig {
            url: get("TOKEN_PAGE_URL").unwrap_or(defaults.source.url),
            max_retries: parse_number(
                "GET_TOKEN_CALL_MAX_TRIES",
                &required("GET_TOKEN_CALL_MAX_TRIES")?,
            )?,
            retry_delay_ms: parse_number(
                "GET_TOKEN_CALL_RETRY_DELAY_MS",
                &required("GET_TOKEN_CALL_RETRY_DELAY_MS")?,
            )?,
        };

        let thresholds = Thresholds {
            low: parse_threshold("TOKEN_AMOUNT_ALERT_LOW", &required("TOKEN_AMOUNT_ALERT_LOW")?)?,
            high: parse_threshold(
                "TOKEN_AMOUNT_ALERT_HIGH",
                &required("TOKEN_AMOUNT_ALERT_HIGH")?,
            )?,
        };

        let recipients = RecipientsConfig {
            always: split_recipients(&get("ALWAYS_NOTIFY_EMAIL_TO").unwrap_or_default()),
            on_alert: split_recipients(&required("ON_ALERT_EMAIL_TO")?),
        };

        let email = EmailConfig {
            from: required("FROM_EMAIL")?,
            password: required("FROM_EMAIL_PASSWORD")?,
            smtp_host: get("SMTP_HOST").unwrap_or(defaults.email.smtp_host),
            smtp_port: match get("SMTP_PORT") {
                Some(port) => parse_number("SMTP_PORT", &port)?,
                None => defaults.email.smtp_port,
            },
        };

        let sms = SmsConfig {
            connection_string: get("WCS_CONNECTION_STRING").unwrap_or_default(),
            phone_number: get("WCS_PHONE_NUMBER").unwrap_or_default(),
        };

        let persist = match get("PERSIST_TOKEN_PRICE") {
            Some(flag) => parse_bool("PERSIST_TOKEN_PRICE", &flag)?,
            None => defaults.state.persist,
        };
        let state = StateConfig {
            persist,
            connection_string: if persist {
                required("STATE_CONNECTION_STRING")?
            } else {
                get("STATE_CONNECTION_STRING").unwrap_or_default()
            },
            key: get("STATE_KEY").unwrap_or(defaults.state.key),
        };

        let schedule = ScheduleConfig {
            interval: match get("POLL_INTERVAL") {
                Some(v) => parse_duration("POLL_INTERVAL", &v)?,
                None => defaults.schedule.interval,
            },
            offset: match get("POLL_OFFSET") {
                Some(v) => parse_duration("POLL_OFFSET", &v)?,
                None => defaults.schedule.offset,
            },
        };
        if schedule.interval.is_zero() {
            return Err(Error::config("POLL_INTERVAL must be greater than zero"));
        }

        let logging = LoggingConfig {
            level: get("LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: match get("LOG_FORMAT") {
                Some(format) if format == "json" || format == "pretty" => format,
                Some(other) => {
                    return Err(Error::config(format!(
                        "LOG_FORMAT must be 'json' or 'pretty', got '{other}'"
                    )))
                }
                None => defaults.logging.format,
            },
        };

        Ok(Self {
            source,
            thresholds,
            recipients,
            email,
            sms,
            state,
            schedule,
            logging,
        })
    }
}

/// Split a `;`-delimited address list, dropping blank entries.
pub fn split_recipients(list: &str) -> Vec<String> {
    list.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_threshold(key: &str, value: &str) -> Result<Option<Price>> {
    let parsed: i64 = parse_number(key, value)?;
    match parsed {
        THRESHOLD_DISABLED => Ok(None),
        v if v < 0 => Err(Error::config(format!(
            "{key} must be a non-negative price or {THRESHOLD_DISABLED} to disable, got {v}"
        ))),
        // Non-negative i64 always fits
        v => Ok(Some(v.unsigned_abs())),
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::config(format!("{key} must be an integer, got '{value}': {e}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{key} must be a boolean, got '{value}'"))),
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|e| {
        Error::config(format!("{key} must be a duration like '5m', got '{value}': {e}"))
    })
}
