//! Runtime configuration loaded from the environment
//!
//! Every recognized option has a default matching the documented budgets, so
//! the binary runs with no environment at all. Trigger cron expressions are
//! validated at startup; a bad expression or an unknown category aborts
//! before the scheduler starts.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use tracing_subscriber::EnvFilter;

use crate::clock::TriggerSpec;
use crate::error::ConfigError;
use crate::models::StrategyCategory;

/// Deployment environment, used to pick the default log format.
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Log output format. Production environments default to JSON for log
/// aggregation; everything else gets colored human-readable lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// One named trigger schedule.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub name: String,
    pub cron: String,
    pub session_only: bool,
    pub categories: Vec<StrategyCategory>,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Max concurrent symbol tasks per epoch.
    pub parallelism: usize,
    /// Hard deadline per scan epoch.
    pub epoch_timeout: Duration,
    /// Hard deadline per symbol task, capped by the epoch deadline.
    pub symbol_timeout: Duration,
    /// Broker call cap for intraday history.
    pub fetch_timeout_intraday: Duration,
    /// Broker call cap for long history.
    pub fetch_timeout_history: Duration,
    pub cache_ttl_intraday: chrono::Duration,
    pub cache_ttl_daily: chrono::Duration,
    pub cache_capacity: usize,
    /// PENDING signals expire this long after creation.
    pub signal_timeout: chrono::Duration,
    /// Dedup suppression window after a matching active signal.
    pub quiet_window: chrono::Duration,
    pub auto_trade: bool,
    pub auto_threshold: f64,
    /// Fetch pause after an Unauthorized broker response.
    pub unauthorized_cooldown: chrono::Duration,
    pub shutdown_grace: Duration,
    /// Cadence of the PENDING -> EXPIRED sweeper.
    pub sweep_interval: Duration,
    /// Exchange civil timezone for trigger interpretation.
    pub timezone: Tz,
    pub log_format: LogFormat,
    pub triggers: Vec<TriggerConfig>,
    pub watchlists: HashMap<StrategyCategory, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallelism: 5,
            epoch_timeout: Duration::from_secs(300),
            symbol_timeout: Duration::from_secs(60),
            fetch_timeout_intraday: Duration::from_secs(30),
            fetch_timeout_history: Duration::from_secs(60),
            cache_ttl_intraday: chrono::Duration::minutes(30),
            cache_ttl_daily: chrono::Duration::hours(24),
            cache_capacity: 2048,
            signal_timeout: chrono::Duration::hours(1),
            quiet_window: chrono::Duration::hours(6),
            auto_trade: false,
            auto_threshold: 0.8,
            unauthorized_cooldown: chrono::Duration::minutes(5),
            shutdown_grace: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(60),
            timezone: chrono_tz::Asia::Kolkata,
            log_format: LogFormat::Pretty,
            triggers: default_triggers(),
            watchlists: default_watchlists(),
        }
    }
}

fn default_triggers() -> Vec<TriggerConfig> {
    vec![
        TriggerConfig {
            name: "frequent".to_string(),
            cron: "0 */5 9-15 * * Mon-Fri".to_string(),
            session_only: true,
            categories: vec![StrategyCategory::DayTrading, StrategyCategory::ShortSelling],
        },
        TriggerConfig {
            name: "regular".to_string(),
            cron: "0 15 9,11,13,15 * * Mon-Fri".to_string(),
            session_only: true,
            categories: vec![StrategyCategory::ShortTerm],
        },
        TriggerConfig {
            name: "comprehensive".to_string(),
            cron: "0 0 10,14 * * Mon-Fri".to_string(),
            session_only: false,
            categories: StrategyCategory::ALL.to_vec(),
        },
        TriggerConfig {
            name: "daily".to_string(),
            cron: "0 0 16 * * Mon-Fri".to_string(),
            session_only: false,
            categories: vec![StrategyCategory::LongTerm],
        },
    ]
}

fn default_watchlists() -> HashMap<StrategyCategory, Vec<String>> {
    let list = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    HashMap::from([
        (
            StrategyCategory::DayTrading,
            list(&[
                "RELIANCE",
                "TCS",
                "HDFCBANK",
                "INFY",
                "HINDUNILVR",
                "ICICIBANK",
                "KOTAKBANK",
                "LT",
                "ITC",
                "AXISBANK",
            ]),
        ),
        (
            StrategyCategory::ShortSelling,
            list(&[
                "EICHERMOT",
                "HEROMOTOCO",
                "DRREDDY",
                "ADANIENT",
                "MARUTI",
                "HINDUNILVR",
                "TCS",
                "RELIANCE",
                "HDFCBANK",
                "BAJFINANCE",
            ]),
        ),
        (
            StrategyCategory::ShortTerm,
            list(&[
                "RELIANCE",
                "TCS",
                "HDFCBANK",
                "INFY",
                "HINDUNILVR",
                "ICICIBANK",
                "KOTAKBANK",
                "LT",
                "ITC",
                "AXISBANK",
                "SBIN",
                "BHARTIARTL",
                "ASIANPAINT",
                "MARUTI",
                "BAJFINANCE",
            ]),
        ),
        (
            StrategyCategory::LongTerm,
            list(&[
                "RELIANCE",
                "TCS",
                "HDFCBANK",
                "INFY",
                "HINDUNILVR",
                "ICICIBANK",
                "KOTAKBANK",
                "LT",
                "ITC",
                "AXISBANK",
                "SBIN",
                "BHARTIARTL",
                "ASIANPAINT",
                "MARUTI",
                "BAJFINANCE",
                "HCLTECH",
                "WIPRO",
                "ULTRACEMCO",
                "TITAN",
                "NESTLEIND",
                "POWERGRID",
                "NTPC",
            ]),
        ),
    ])
}

impl Config {
    /// Load configuration from `SCAN_*` environment variables on top of the
    /// defaults, then validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(v) = env_parse::<usize>("SCAN_PARALLELISM")? {
            config.parallelism = v.max(1);
        }
        if let Some(v) = env_secs("SCAN_EPOCH_TIMEOUT_SECS")? {
            config.epoch_timeout = v;
        }
        if let Some(v) = env_secs("SCAN_SYMBOL_TIMEOUT_SECS")? {
            config.symbol_timeout = v;
        }
        if let Some(v) = env_secs("SCAN_FETCH_TIMEOUT_INTRADAY_SECS")? {
            config.fetch_timeout_intraday = v;
        }
        if let Some(v) = env_secs("SCAN_FETCH_TIMEOUT_HISTORY_SECS")? {
            config.fetch_timeout_history = v;
        }
        if let Some(v) = env_parse::<i64>("SCAN_CACHE_TTL_INTRADAY_SECS")? {
            config.cache_ttl_intraday = chrono::Duration::seconds(v);
        }
        if let Some(v) = env_parse::<i64>("SCAN_CACHE_TTL_DAILY_SECS")? {
            config.cache_ttl_daily = chrono::Duration::seconds(v);
        }
        if let Some(v) = env_parse::<usize>("SCAN_CACHE_CAPACITY")? {
            config.cache_capacity = v.max(1);
        }
        if let Some(v) = env_parse::<i64>("SCAN_SIGNAL_TIMEOUT_SECS")? {
            config.signal_timeout = chrono::Duration::seconds(v);
        }
        if let Some(v) = env_parse::<i64>("SCAN_QUIET_WINDOW_SECS")? {
            config.quiet_window = chrono::Duration::seconds(v);
        }
        if let Some(v) = env_parse::<bool>("SCAN_AUTO_TRADE")? {
            config.auto_trade = v;
        }
        if let Some(v) = env_parse::<f64>("SCAN_AUTO_THRESHOLD")? {
            config.auto_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(v) = env_parse::<i64>("SCAN_UNAUTHORIZED_COOLDOWN_SECS")? {
            config.unauthorized_cooldown = chrono::Duration::seconds(v);
        }
        if let Some(v) = env_secs("SCAN_SHUTDOWN_GRACE_SECS")? {
            config.shutdown_grace = v;
        }
        if let Some(v) = env_secs("SCAN_SWEEP_INTERVAL_SECS")? {
            config.sweep_interval = v;
        }
        if let Ok(tz) = env::var("SCAN_TIMEZONE") {
            config.timezone =
                Tz::from_str(&tz).map_err(|_| ConfigError::UnknownTimezone(tz.clone()))?;
        }
        if matches!(get_environment().as_str(), "production" | "prod") {
            config.log_format = LogFormat::Json;
        }
        if let Some(v) = env_parse::<LogFormat>("SCAN_LOG_FORMAT")? {
            config.log_format = v;
        }

        for category in StrategyCategory::ALL {
            let var = format!("SCAN_WATCHLIST_{}", category.as_str().to_uppercase());
            if let Ok(raw) = env::var(&var) {
                let symbols: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                config.watchlists.insert(category, symbols);
            }
        }

        for trigger in config.triggers.iter_mut() {
            let var = format!("SCAN_TRIGGER_{}", trigger.name.to_uppercase());
            if let Ok(expr) = env::var(&var) {
                trigger.cron = expr;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate trigger schedules and categories. The only fatal errors in
    /// the system: everything after startup is contained.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for trigger in &self.triggers {
            TriggerSpec::parse(
                &trigger.name,
                &trigger.cron,
                self.timezone,
                trigger.session_only,
            )?;
            if trigger.categories.is_empty() {
                return Err(ConfigError::UnknownCategory {
                    trigger: trigger.name.clone(),
                    value: "<empty>".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn watchlist(&self, category: StrategyCategory) -> &[String] {
        self.watchlists
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Install the global tracing subscriber in this configuration's format.
    /// `RUST_LOG` overrides the default filter.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,equitrix=info"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true);
        match self.log_format {
            LogFormat::Json => builder.json().flatten_event(true).init(),
            LogFormat::Pretty => builder.with_ansi(true).with_line_number(true).init(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

fn env_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_secs))
}
