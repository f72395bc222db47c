use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const CURRENT_CONFIG_VERSION: &str = "v2";

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Server runtime configuration, persisted as JSON under the asset
/// directory. Instance-facing settings (branding, signup toggles) live in
/// the database instead.
#[derive(Clone, Debug, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "configVersion")]
    pub config_version: String,
    #[serde(alias = "sessionTtlHours")]
    pub session_ttl_hours: i64,
    pub host: String,
    pub port: Option<u16>,
    #[serde(alias = "lastAppVersion")]
    pub last_app_version: Option<String>,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        if self.session_ttl_hours < 1 {
            tracing::warn!(
                "Invalid session TTL {}h, resetting to default",
                self.session_ttl_hours
            );
            self.session_ttl_hours = default_session_ttl_hours();
        }

        if self.host.trim().is_empty() {
            self.host = default_host();
        }

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            session_ttl_hours: default_session_ttl_hours(),
            host: default_host(),
            port: None,
            last_app_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = Config::from_raw("{}");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn invalid_json_falls_back_to_default() {
        let config = Config::from_raw("{invalid json");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.session_ttl_hours, 24);
    }

    #[test]
    fn aliases_and_normalization_are_applied() {
        let raw = r#"{
            "configVersion": "v1",
            "sessionTtlHours": 0,
            "host": "  "
        }"#;
        let config = Config::from_raw(raw);

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.host, "127.0.0.1");
    }
}
