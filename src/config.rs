use anyhow::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    /// Unset means the in-memory store.
    pub redis_url: Option<String>,
    pub weather_expiration: Duration,
    pub coords_expiration: Duration,
    pub cleaner_interval: Duration,
    pub accu_weather_api_key: Option<String>,
    pub open_weather_api_key: Option<String>,
    pub api_ninjas_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            redis_url: None,
            weather_expiration: Duration::from_secs(3 * 60 * 60),
            coords_expiration: Duration::from_secs(7 * 24 * 60 * 60),
            cleaner_interval: Duration::from_secs(600),
            accu_weather_api_key: None,
            open_weather_api_key: None,
            api_ninjas_api_key: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Ok(Self::from_lookup(|name| env::var(name).ok()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            parsed(&lookup, name)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let key = |name: &str| {
            lookup(name).filter(|key| !key.is_empty() && key != "YOUR_API_KEY_HERE")
        };

        Self {
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("LOG_LEVEL")
                .filter(|level| !level.is_empty())
                .unwrap_or(defaults.log_level),
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
            weather_expiration: secs("EXPIRATION_WEATHER_INFO_SECS", defaults.weather_expiration),
            coords_expiration: secs("EXPIRATION_COORDS_SECS", defaults.coords_expiration),
            cleaner_interval: secs("CLEANER_INTERVAL_SECS", defaults.cleaner_interval),
            accu_weather_api_key: key("ACCU_WEATHER_API_KEY"),
            open_weather_api_key: key("OPEN_WEATHER_API_KEY"),
            api_ninjas_api_key: key("API_NINJAS_API_KEY"),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|value| value.trim().parse().ok())
}
