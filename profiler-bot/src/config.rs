use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default command prefix when PROFILER_PREFIX is unset
pub const DEFAULT_PREFIX: &str = "p!";

#[derive(Clone, Debug)]
pub struct Config {
    pub discord_bot_token: String,
    pub prefix: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub database_url: String,
    pub analytics: Option<AnalyticsConfig>,
    /// How long a handled command message stays before it is deleted
    pub delete_delay: Duration,
    pub reconnect: ReconnectConfig,
}

/// Universal Analytics identifiers. Tracking is off unless both are set.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsConfig {
    pub tracking_id: String,
    pub client_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReconnectConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            failure_threshold: 5,
            cooldown: Duration::from_secs(900),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_bot_token =
            var("DISCORD_BOT_TOKEN").ok_or("DISCORD_BOT_TOKEN must be set")?;

        let analytics = match (var("PROFILER_TRACKING_ID"), var("PROFILER_CLIENT_ID")) {
            (Some(tracking_id), Some(client_id)) => Some(AnalyticsConfig {
                tracking_id,
                client_id,
            }),
            _ => None,
        };

        let defaults = ReconnectConfig::default();
        let reconnect = ReconnectConfig {
            base_delay: secs(&var, "PROFILER_RECONNECT_BASE_SECS", defaults.base_delay)?,
            max_delay: secs(&var, "PROFILER_RECONNECT_MAX_SECS", defaults.max_delay)?,
            failure_threshold: parse_or(
                &var,
                "PROFILER_RECONNECT_THRESHOLD",
                defaults.failure_threshold,
            )?,
            cooldown: secs(&var, "PROFILER_RECONNECT_COOLDOWN_SECS", defaults.cooldown)?,
        };

        Ok(Self {
            discord_bot_token,
            prefix: var("PROFILER_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            log_level: var("PROFILER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_dir: var("PROFILER_LOG_DIR"),
            database_url: var("DATABASE_URL").unwrap_or_else(|| "./.db/profiler.db".to_string()),
            analytics,
            delete_delay: secs(&var, "PROFILER_DELETE_DELAY_SECS", Duration::from_secs(5))?,
            reconnect,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

fn secs<F>(var: &F, key: &str, default: Duration) -> Result<Duration, String>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(var, key, default.as_secs()).map(Duration::from_secs)
}
