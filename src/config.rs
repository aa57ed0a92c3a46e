use std::time::Duration;

use chrono_tz::Tz;

use crate::client::{FeedConfig, Zone, DEFAULT_API_ENDPOINT};
use crate::EspotError;

/// Dashboard configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,
    pub zone: Zone,
    pub api_endpoint: String,
    pub request_timeout: Duration,
    /// Timezone in which "today" and the current hour are computed
    pub timezone: Tz,
}

impl AppConfig {
    /// Reads `ESPOT_*` variables from the process environment.
    pub fn from_env() -> Result<Self, EspotError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source, falling
    /// back to defaults for unset or blank variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EspotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        };

        let port = match var("ESPOT_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| EspotError::Config(format!("ESPOT_PORT={raw}: {e}")))?,
            None => 8080,
        };

        let zone = match var("ESPOT_ZONE") {
            Some(raw) => raw
                .parse::<Zone>()
                .map_err(|_| EspotError::Config(format!("ESPOT_ZONE={raw} is not SE1-SE4")))?,
            None => Zone::default(),
        };

        let timeout_secs = match var("ESPOT_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| EspotError::Config(format!("ESPOT_TIMEOUT_SECS={raw}: {e}")))?,
            None => 10,
        };
        if timeout_secs == 0 {
            return Err(EspotError::Config(
                "ESPOT_TIMEOUT_SECS must be positive".to_owned(),
            ));
        }

        let timezone = match var("ESPOT_TIMEZONE") {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|e| EspotError::Config(format!("ESPOT_TIMEZONE={raw}: {e}")))?,
            None => chrono_tz::Europe::Stockholm,
        };

        Ok(Self {
            bind: var("ESPOT_BIND").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            zone,
            api_endpoint: var("ESPOT_API_URL").unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_owned()),
            request_timeout: Duration::from_secs(timeout_secs),
            timezone,
        })
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            endpoint: self.api_endpoint.clone(),
            zone: self.zone,
            timeout: self.request_timeout,
            ..FeedConfig::default()
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, EspotError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.listen_address(), "0.0.0.0:8080");
        assert_eq!(config.zone, Zone::Se3);
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.timezone, chrono_tz::Europe::Stockholm);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ESPOT_BIND", "127.0.0.1"),
            ("ESPOT_PORT", "9000"),
            ("ESPOT_ZONE", "se4"),
            ("ESPOT_API_URL", "http://localhost:1234/espot"),
            ("ESPOT_TIMEOUT_SECS", "3"),
            ("ESPOT_TIMEZONE", "UTC"),
        ])
        .unwrap();

        assert_eq!(config.listen_address(), "127.0.0.1:9000");
        assert_eq!(config.zone, Zone::Se4);
        assert_eq!(config.timezone, chrono_tz::UTC);

        let feed = config.feed_config();
        assert_eq!(feed.endpoint, "http://localhost:1234/espot");
        assert_eq!(feed.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("ESPOT_PORT", "  "), ("ESPOT_ZONE", "")]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.zone, Zone::Se3);
    }

    #[test]
    fn test_invalid_values() {
        for vars in [
            [("ESPOT_PORT", "eighty")],
            [("ESPOT_ZONE", "NO2")],
            [("ESPOT_TIMEOUT_SECS", "0")],
            [("ESPOT_TIMEZONE", "Mars/Olympus")],
        ] {
            assert!(matches!(config_from(&vars), Err(EspotError::Config(_))));
        }
    }
}
