// MIT License - Copyright (c) 2026 Peter Wright
// Panel configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// Browser identity presented to the panel web server.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Fedora; Linux x86_64; rv:69.0) Gecko/20100101 Firefox/69.0";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Alarm scene requested for one or more areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmScene {
    /// Full arm, nobody home
    Away,
    /// Perimeter arm, occupants inside
    Stay,
    Disarm,
}

impl FromStr for AlarmScene {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "away" => Ok(Self::Away),
            "stay" => Ok(Self::Stay),
            "disarm" | "off" => Ok(Self::Disarm),
            other => Err(format!("unknown scene '{other}' (expected away, stay or disarm)")),
        }
    }
}

impl fmt::Display for AlarmScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Away => "away",
            Self::Stay => "stay",
            Self::Disarm => "disarm",
        })
    }
}

/// HTTP basic-auth credentials for panels sitting behind a reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

/// Configuration for talking to a panel.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Hostname or address, optionally prefixed with `http://` or `https://`
    pub host: String,
    /// Panel user name (e.g. "User 1")
    pub user: String,
    /// Numeric user PIN
    pub pin: String,
    pub user_agent: String,
    /// Verify TLS certificates when the host is reached over https
    pub verify_ssl: bool,
    pub basic_auth: Option<BasicAuth>,
    pub connect_timeout_ms: u64,
    /// Overall per-request timeout, including the response body
    pub read_timeout_ms: u64,
    /// Propagate authentication and unsupported-panel failures as errors
    /// instead of reporting `false`
    pub strict: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            host: "zerowire".to_string(),
            user: "User 1".to_string(),
            pin: "1234".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_ssl: true,
            basic_auth: None,
            connect_timeout_ms: 3000,
            read_timeout_ms: 15000,
            strict: false,
        }
    }
}

impl PanelConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::default()
    }

    /// Base URL of the panel web interface, without a trailing slash.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        }
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = Self::default();
        let config = Self {
            host: file.host.unwrap_or(defaults.host),
            user: file.user.unwrap_or(defaults.user),
            pin: file.pin.unwrap_or(defaults.pin),
            user_agent: file.user_agent.unwrap_or(defaults.user_agent),
            verify_ssl: file.verify_ssl.unwrap_or(defaults.verify_ssl),
            basic_auth: file.basic_auth,
            connect_timeout_ms: file.connect_timeout_ms.unwrap_or(defaults.connect_timeout_ms),
            read_timeout_ms: file.read_timeout_ms.unwrap_or(defaults.read_timeout_ms),
            strict: file.strict.unwrap_or(defaults.strict),
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply `ULTRASYNC_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(host) = non_empty("ULTRASYNC_HOST") {
            self.host = host;
        }
        if let Some(user) = non_empty("ULTRASYNC_USER") {
            self.user = user;
        }
        if let Some(pin) = non_empty("ULTRASYNC_PIN") {
            self.pin = pin.trim().to_string();
        }
        if let Some(agent) = non_empty("ULTRASYNC_USER_AGENT") {
            self.user_agent = agent;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "host", reason: "must not be empty".into() });
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "user", reason: "must not be empty".into() });
        }
        if self.pin.is_empty() || !self.pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid {
                field: "pin",
                reason: "must be a non-empty string of digits".into(),
            });
        }
        Ok(())
    }
}

/// Candidate config file locations, most specific first.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if cfg!(windows) {
        for var in ["APPDATA", "LOCALAPPDATA"] {
            if let Some(dir) = std::env::var_os(var) {
                paths.push(PathBuf::from(dir).join("UltraSync").join("config.toml"));
            }
        }
    } else if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        paths.push(home.join(".ultrasync.toml"));
        paths.push(home.join(".config").join("ultrasync").join("config.toml"));
    }
    paths
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    host: Option<String>,
    user: Option<String>,
    #[serde(default, deserialize_with = "deserialize_pin")]
    pin: Option<String>,
    user_agent: Option<String>,
    verify_ssl: Option<bool>,
    basic_auth: Option<BasicAuth>,
    connect_timeout_ms: Option<u64>,
    read_timeout_ms: Option<u64>,
    strict: Option<bool>,
}

/// PINs are often written as bare integers in TOML.
fn deserialize_pin<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Pin {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Pin>::deserialize(deserializer)?.map(|pin| match pin {
        Pin::Text(s) => s.trim().to_string(),
        Pin::Number(n) => n.to_string(),
    }))
}

/// Builder for PanelConfig.
#[derive(Debug, Clone, Default)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    pub fn pin(mut self, pin: impl Into<String>) -> Self {
        self.config.pin = pin.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.config.verify_ssl = verify;
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.basic_auth = Some(BasicAuth { user: user.into(), password: password.into() });
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn build(self) -> PanelConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.host, "zerowire");
        assert_eq!(config.user, "User 1");
        assert_eq!(config.pin, "1234");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(!config.strict);
    }

    #[test]
    fn test_config_builder() {
        let config = PanelConfig::builder()
            .host("10.0.0.5")
            .user("Admin")
            .pin("4321")
            .basic_auth("proxy", "secret")
            .strict(true)
            .build();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.user, "Admin");
        assert_eq!(config.pin, "4321");
        assert_eq!(config.basic_auth.as_ref().map(|a| a.user.as_str()), Some("proxy"));
        assert!(config.strict);
    }

    #[test]
    fn test_base_url() {
        let plain = PanelConfig::builder().host("zerowire").build();
        assert_eq!(plain.base_url(), "http://zerowire");

        let tls = PanelConfig::builder().host("https://panel.local/").build();
        assert_eq!(tls.base_url(), "https://panel.local");
    }

    #[test]
    fn test_from_toml() {
        let config = PanelConfig::from_toml_str(
            r#"
            host = "192.168.1.20"
            user = "User 2"
            pin = 8675
            verify_ssl = false

            [basic_auth]
            user = "proxy"
            password = "pw"
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "192.168.1.20");
        assert_eq!(config.user, "User 2");
        assert_eq!(config.pin, "8675");
        assert!(!config.verify_ssl);
        assert_eq!(
            config.basic_auth,
            Some(BasicAuth { user: "proxy".into(), password: "pw".into() })
        );
        assert_eq!(config.read_timeout_ms, 15000);
    }

    #[test]
    fn test_from_toml_rejects_bad_pin() {
        let err = PanelConfig::from_toml_str(r#"pin = "12ab""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "pin", .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ULTRASYNC_HOST", "alarm.lan"),
            ("ULTRASYNC_PIN", " 9999 "),
            ("ULTRASYNC_USER", ""),
        ]
        .into_iter()
        .collect();

        let mut config = PanelConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.host, "alarm.lan");
        assert_eq!(config.pin, "9999");
        // empty values are ignored
        assert_eq!(config.user, "User 1");
    }

    #[test]
    fn test_alarm_scene_parse() {
        assert_eq!("AWAY".parse::<AlarmScene>(), Ok(AlarmScene::Away));
        assert_eq!("stay".parse::<AlarmScene>(), Ok(AlarmScene::Stay));
        assert_eq!("disarm".parse::<AlarmScene>(), Ok(AlarmScene::Disarm));
        assert!("night".parse::<AlarmScene>().is_err());
        assert_eq!(AlarmScene::Stay.to_string(), "stay");
    }
}
