use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

use crate::adapters::binance_futures::MAX_LIMIT;
use crate::adapters::BINANCE_FUTURES_URL;
use crate::ai_clients::AnalystConfig;
use crate::services::{MonitorSettings, PipelineConfig};
use crate::strategy::detectors::OI_LOOKBACK_POINTS;

/// Upper bound for `monitor.suppression_ttl_secs` (30 days)
pub const MAX_SUPPRESSION_TTL_SECS: u64 = 30 * 24 * 3600;

/// Main configuration structure, built once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub notifier: NotifierConfig,
    pub monitor: MonitorConfig,
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub suppression: SuppressionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Feishu/Lark bot webhook
    #[serde(default)]
    pub webhook_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Comma-separated string or list, e.g. "BTCUSDT,ETHUSDT"
    #[serde(default, deserialize_with = "deserialize_symbols")]
    pub symbols: Vec<String>,
    /// Kline interval and statistics period
    pub interval: String,
    /// Intervals fetched per check (96 x 15m = one day)
    pub lookback: usize,
    /// How long a delivered signal stays suppressed
    pub suppression_ttl_secs: u64,
    /// Cadence of daemon mode
    pub schedule_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

fn default_ai_timeout() -> u64 {
    45
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: String::new(),
            api_key: String::new(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl AiConfig {
    /// Enrichment is active only when endpoint, model and key are all set
    pub fn is_enabled(&self) -> bool {
        !self.endpoint.is_empty() && !self.model.is_empty() && !self.api_key.is_empty()
    }

    fn is_partial(&self) -> bool {
        !self.is_enabled()
            && (!self.endpoint.is_empty() || !self.model.is_empty() || !self.api_key.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionBackend {
    /// Never suppress
    None,
    /// Process-local, lost on restart
    #[default]
    Memory,
    /// Shared and durable
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuppressionConfig {
    #[serde(default)]
    pub backend: SuppressionBackend,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Per-call wait for a pooled connection
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_max_connections() -> u32 {
    2
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            backend: SuppressionBackend::default(),
            database_url: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn deserialize_symbols<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSymbols {
        Csv(String),
        List(Vec<String>),
    }

    let items = match RawSymbols::deserialize(deserializer)? {
        RawSymbols::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        RawSymbols::List(list) => list,
    };
    Ok(normalize_symbols(items))
}

/// Trim, upper-case and de-duplicate symbols, keeping first-seen order
pub fn normalize_symbols<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let symbol = item.as_ref().trim().to_ascii_uppercase();
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("notifier.timeout_secs", 10)?
        .set_default("monitor.interval", "15m")?
        .set_default("monitor.lookback", 96)?
        .set_default("monitor.suppression_ttl_secs", 3600)?
        .set_default("monitor.schedule_interval_secs", 900)?
        .set_default("exchange.base_url", BINANCE_FUTURES_URL)?
        .set_default("exchange.timeout_secs", 15)?
        .set_default("ai.timeout_secs", 45)?
        .set_default("suppression.backend", "memory")?
        .set_default("logging.level", "info")?
        .set_default("logging.json", false)
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory.
    ///
    /// Layers, lowest first: built-in defaults, `default.toml`,
    /// `$SENTINEL_ENV.toml`, `SENTINEL_*` variables (`__` separates sections),
    /// then the deployment variables `LARK_WEBHOOK_URL`, `SYMBOLS`, `API_KEY`,
    /// `OPENAI_COMPATIBLE_ENDPOINT`, `AI_MODEL_NAME` and `DATABASE_URL`.
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let env_file = std::env::var("SENTINEL_ENV").unwrap_or_else(|_| "development".to_string());
        let legacy = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let builder = with_defaults()?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(env_file)).required(false))
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("notifier.webhook_url", legacy("LARK_WEBHOOK_URL"))?
            .set_override_option("monitor.symbols", legacy("SYMBOLS"))?
            .set_override_option("ai.api_key", legacy("API_KEY"))?
            .set_override_option("ai.endpoint", legacy("OPENAI_COMPATIBLE_ENDPOINT"))?
            .set_override_option("ai.model", legacy("AI_MODEL_NAME"))?
            .set_override_option("suppression.database_url", legacy("DATABASE_URL"))?;

        builder.build()?.try_deserialize()
    }

    /// Parse a TOML document on top of the built-in defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        with_defaults()?
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Validate configuration values, reporting every problem at once
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.notifier.webhook_url.is_empty() {
            errors.push("notifier.webhook_url (LARK_WEBHOOK_URL) is required".to_string());
        } else if let Err(e) = check_http_url(&self.notifier.webhook_url) {
            errors.push(format!("notifier.webhook_url is invalid: {e}"));
        }

        if self.monitor.symbols.is_empty() {
            errors.push("monitor.symbols (SYMBOLS) is required".to_string());
        }
        if self.monitor.interval.trim().is_empty() {
            errors.push("monitor.interval must not be empty".to_string());
        }
        if !(OI_LOOKBACK_POINTS..=MAX_LIMIT).contains(&self.monitor.lookback) {
            errors.push(format!(
                "monitor.lookback must be between {} and {} (24h open interest needs {})",
                OI_LOOKBACK_POINTS, MAX_LIMIT, OI_LOOKBACK_POINTS
            ));
        }
        if !(1..=MAX_SUPPRESSION_TTL_SECS).contains(&self.monitor.suppression_ttl_secs) {
            errors.push(format!(
                "monitor.suppression_ttl_secs must be between 1 and {}",
                MAX_SUPPRESSION_TTL_SECS
            ));
        }
        if self.monitor.schedule_interval_secs == 0 {
            errors.push("monitor.schedule_interval_secs must be positive".to_string());
        }

        if let Err(e) = check_http_url(&self.exchange.base_url) {
            errors.push(format!("exchange.base_url is invalid: {e}"));
        }

        if self.ai.is_enabled() {
            if let Err(e) = check_http_url(&self.ai.endpoint) {
                errors.push(format!("ai.endpoint is invalid: {e}"));
            }
        }
        if self.ai.timeout_secs == 0 {
            errors.push("ai.timeout_secs must be positive".to_string());
        }

        if self.suppression.backend == SuppressionBackend::Postgres
            && self
                .suppression
                .database_url
                .as_deref()
                .map_or(true, str::is_empty)
        {
            errors.push("suppression.database_url is required for the postgres backend".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validation for `run`, which exits after one pass.
    ///
    /// The in-memory store dies with the process, so consecutive `run`
    /// invocations would resend every live signal.
    pub fn validate_one_shot(&self) -> Result<(), Vec<String>> {
        let mut errors = self.validate().err().unwrap_or_default();
        if self.suppression.backend == SuppressionBackend::Memory {
            errors.push(
                "suppression.backend \"memory\" does not survive between `run` invocations; \
                 use \"postgres\" (or \"none\") or the `daemon` command"
                    .to_string(),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// True when some but not all AI settings are present
    pub fn ai_partially_configured(&self) -> bool {
        self.ai.is_partial()
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            symbols: self.monitor.symbols.clone(),
            interval: self.monitor.interval.clone(),
            lookback: self.monitor.lookback,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            suppression_ttl: Duration::from_secs(self.monitor.suppression_ttl_secs),
            enrichment_timeout: Duration::from_secs(self.ai.timeout_secs),
        }
    }

    pub fn analyst_config(&self) -> AnalystConfig {
        AnalystConfig {
            endpoint: self.ai.endpoint.clone(),
            model: self.ai.model.clone(),
            api_key: self.ai.api_key.clone(),
            timeout_secs: self.ai.timeout_secs,
        }
    }

    /// Short human-readable summary, safe to log (no secrets)
    pub fn summary(&self) -> String {
        format!(
            "interval={} lookback={} ttl={}s ai={} suppression={:?}",
            self.monitor.interval,
            self.monitor.lookback,
            self.monitor.suppression_ttl_secs,
            if self.ai.is_enabled() { &self.ai.model } else { "off" },
            self.suppression.backend,
        )
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = url::Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [notifier]
        webhook_url = "https://open.feishu.cn/open-apis/bot/v2/hook/abc"

        [monitor]
        symbols = " btcusdt, ETHUSDT ,,btcusdt "
    "#;

    #[test]
    fn test_defaults_apply() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.monitor.symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(config.monitor.interval, "15m");
        assert_eq!(config.monitor.lookback, 96);
        assert_eq!(config.monitor.suppression_ttl_secs, 3600);
        assert_eq!(config.exchange.base_url, BINANCE_FUTURES_URL);
        assert_eq!(config.ai.timeout_secs, 45);
        assert_eq!(config.suppression.backend, SuppressionBackend::Memory);
        assert!(!config.ai.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_symbols_accept_list() {
        let config = AppConfig::from_toml_str(
            r#"
            [notifier]
            webhook_url = "https://example.com/hook"
            [monitor]
            symbols = ["solusdt", "BNBUSDT"]
            "#,
        )
        .unwrap();
        assert_eq!(config.monitor.symbols, vec!["SOLUSDT", "BNBUSDT"]);
    }

    #[test]
    fn test_missing_required_settings_are_all_reported() {
        let config = AppConfig::from_toml_str("").unwrap();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("webhook_url"));
        assert!(errors[1].contains("symbols"));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        let config = AppConfig::from_toml_str(
            r#"
            [notifier]
            webhook_url = "ftp://example.com/hook"
            [monitor]
            symbols = "BTCUSDT"
            [ai]
            endpoint = "not a url"
            model = "m"
            api_key = "k"
            "#,
        )
        .unwrap();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("unsupported scheme 'ftp'"));
        assert!(errors[1].starts_with("ai.endpoint"));
    }

    #[test]
    fn test_ai_is_all_or_nothing() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.ai.endpoint = "https://api.example.com/v1/chat/completions".to_string();
        config.ai.model = "gpt-4o-mini".to_string();
        assert!(!config.ai.is_enabled());
        assert!(config.ai_partially_configured());

        config.ai.api_key = "sk-test".to_string();
        assert!(config.ai.is_enabled());
        assert!(!config.ai_partially_configured());
        assert!(config.analyst_config().is_configured());
    }

    #[test]
    fn test_postgres_backend_needs_url() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.suppression.backend = SuppressionBackend::Postgres;
        assert!(config.validate().is_err());

        config.suppression.database_url = Some("postgres://localhost/sentinel".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_from_settings() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.suppression_ttl, Duration::from_secs(3600));
        assert_eq!(pipeline.enrichment_timeout, Duration::from_secs(45));

        let settings = config.monitor_settings();
        assert_eq!(settings.lookback, 96);
        assert_eq!(settings.symbols.len(), 2);
    }

    #[test]
    fn test_summary_hides_secrets() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.ai.endpoint = "https://api.example.com".to_string();
        config.ai.model = "gpt-4o-mini".to_string();
        config.ai.api_key = "sk-secret".to_string();
        let summary = config.summary();
        assert!(summary.contains("ai=gpt-4o-mini"));
        assert!(!summary.contains("sk-secret"));
    }

    #[test]
    fn test_lookback_must_cover_a_day() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.monitor.lookback = 48;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("monitor.lookback"));

        config.monitor.lookback = MAX_LIMIT + 1;
        assert!(config.validate().is_err());

        config.monitor.lookback = MAX_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ttl_is_bounded() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.monitor.suppression_ttl_secs = u64::MAX;
        let errors = config.validate().unwrap_err();
        assert!(errors[0].starts_with("monitor.suppression_ttl_secs"));

        config.monitor.suppression_ttl_secs = MAX_SUPPRESSION_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ai_timeout_rejected() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        config.ai.timeout_secs = 0;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors, vec!["ai.timeout_secs must be positive".to_string()]);
    }

    #[test]
    fn test_one_shot_needs_durable_store() {
        let mut config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert!(config.validate().is_ok());
        let errors = config.validate_one_shot().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("memory"));

        config.suppression.backend = SuppressionBackend::None;
        assert!(config.validate_one_shot().is_ok());

        config.suppression.backend = SuppressionBackend::Postgres;
        config.suppression.database_url = Some("postgres://localhost/sentinel".to_string());
        assert!(config.validate_one_shot().is_ok());
    }
}
