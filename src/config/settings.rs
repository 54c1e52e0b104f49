use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Environment variable prefix, e.g. `MAILING__QUEUE__ENABLED=true`
const ENV_PREFIX: &str = "MAILING";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mailer: MailerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    /// Sender used when a template has none
    #[serde(default)]
    pub default_from: Option<String>,
    /// Default for `SendOptions::fail_silently`
    #[serde(default)]
    pub fail_silently: bool,
    /// Inline `<style>` rules into `text/html` alternatives
    #[serde(default = "default_inline_css")]
    pub inline_css: bool,
    /// Glob of template files loaded at startup
    #[serde(default = "default_template_glob")]
    pub template_glob: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Queue backend: "memory"
    #[serde(default = "default_queue_backend")]
    pub backend: String,
    /// Maximum number of pending jobs
    #[serde(default = "default_queue_max_size")]
    pub max_size: usize,
    /// Dead letters kept in memory, oldest dropped first
    #[serde(default = "default_dead_letter_max")]
    pub dead_letter_max: usize,
    /// Attempts per job before it is dead-lettered
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Worker sleep when no job is due, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

fn default_inline_css() -> bool {
    true
}

fn default_template_glob() -> String {
    "templates/**/*".to_string()
}

fn default_queue_backend() -> String {
    "memory".to_string()
}

fn default_queue_max_size() -> usize {
    10_000
}

fn default_dead_letter_max() -> usize {
    1_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_retry_initial_delay_ms() -> u64 {
    1_000 // 1 second
}

fn default_retry_max_delay_ms() -> u64 {
    60_000 // 1 minute
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        Self::load(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // MAILING__MAILER__DEFAULT_FROM, MAILING__QUEUE__ENABLED, etc.
            .add_source(environment);

        builder.build()?.try_deserialize()
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            default_from: None,
            fail_silently: false,
            inline_css: default_inline_css(),
            template_glob: default_template_glob(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: default_queue_backend(),
            max_size: default_queue_max_size(),
            dead_letter_max: default_dead_letter_max(),
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
