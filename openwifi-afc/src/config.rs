//! Configuration file loading.
//!
//! The configuration is a TOML document with `[connection]`, `[account]`
//! and `[ap]` tables (required) plus optional `[inquiry]`, `[openwifi]`
//! and `[logging]` tables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use reqwest::Url;
use thiserror::Error;

use afc_protocol::{
    DeviceParams, FrequencyRange, LowestChannel, LowestMappable, SelectionPolicy,
    DEFAULT_CHANNEL_CLASSES,
};

/// Configuration errors. Any of these is fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration file format.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConfigFile {
    pub connection: ConnectionSection,
    pub account: AccountSection,
    pub ap: DeviceParams,
    #[serde(default)]
    pub inquiry: InquirySection,
    #[serde(default)]
    pub openwifi: OpenwifiSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConnectionSection {
    pub base_url: String,
    /// Path of the login page holding the CSRF token.
    pub login_url: String,
    /// Path of the inquiry method.
    pub method_url: String,
    /// Path the sign-in form is posted to.
    #[serde(default = "default_sign_in_url")]
    pub sign_in_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Disable TLS certificate verification. Only for portals whose
    /// identity is attested out of band.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl ConnectionSection {
    /// Request timeout. Out-of-range values, which validation rejects,
    /// become the default.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout()))
    }
}

#[derive(Clone, serde::Deserialize)]
pub struct AccountSection {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AccountSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSection")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Inquiry contents for `set` commands and the startup selection policy.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct InquirySection {
    #[serde(default = "default_channel_classes")]
    pub channel_classes: Vec<u8>,
    #[serde(default)]
    pub frequency_ranges: Vec<FrequencyRange>,
    #[serde(default)]
    pub selection: SelectionSetting,
}

impl Default for InquirySection {
    fn default() -> Self {
        Self {
            channel_classes: default_channel_classes(),
            frequency_ranges: Vec::new(),
            selection: SelectionSetting::default(),
        }
    }
}

/// How the startup inquiry picks among granted channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionSetting {
    /// Lowest granted CFI, even if it has no 5GHz partner.
    #[default]
    Lowest,
    /// Lowest granted CFI that has a 5GHz partner.
    LowestMappable,
}

impl SelectionSetting {
    pub fn policy(self) -> Box<dyn SelectionPolicy> {
        match self {
            SelectionSetting::Lowest => Box::new(LowestChannel),
            SelectionSetting::LowestMappable => Box::new(LowestMappable),
        }
    }
}

/// Local access point files.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OpenwifiSection {
    #[serde(default = "default_hostapd_config")]
    pub hostapd_config: PathBuf,
    #[serde(default = "default_restart_script")]
    pub restart_script: PathBuf,
}

impl Default for OpenwifiSection {
    fn default() -> Self {
        Self {
            hostapd_config: default_hostapd_config(),
            restart_script: default_restart_script(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

fn default_sign_in_url() -> String {
    "user/sign-in".to_string()
}

fn default_timeout() -> f64 {
    30.0
}

fn default_channel_classes() -> Vec<u8> {
    DEFAULT_CHANNEL_CLASSES.to_vec()
}

fn default_hostapd_config() -> PathBuf {
    PathBuf::from("/root/openwifi/hostapd-openwifi.conf")
}

fn default_restart_script() -> PathBuf {
    PathBuf::from("/root/openwifi/fosdem.sh")
}

impl ConfigFile {
    /// Parse and validate a configuration document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ConfigFile = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.connection.base_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "connection.base_url '{}': {}",
                self.connection.base_url, e
            ))
        })?;

        let timeout = self.connection.timeout;
        if !(timeout > 0.0 && Duration::try_from_secs_f64(timeout).is_ok()) {
            return Err(ConfigError::Invalid(format!(
                "connection.timeout must be a positive number of seconds, got {}",
                self.connection.timeout
            )));
        }

        if self.account.username.is_empty() {
            return Err(ConfigError::Invalid("account.username is empty".to_string()));
        }

        for range in &self.inquiry.frequency_ranges {
            if range.low_frequency >= range.high_frequency {
                return Err(ConfigError::Invalid(format!(
                    "inquiry frequency range {}-{} MHz is empty",
                    range.low_frequency, range.high_frequency
                )));
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = ConfigFile::from_toml(&contents)?;
    debug!("Configuration loaded: base_url={}", config.connection.base_url);
    Ok(config)
}

#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
[connection]
base_url = "https://afc.example.org/"
login_url = "user/sign-in"
method_url = "fbrat/ap-afc/availableSpectrumInquirySec"
timeout = 10

[account]
username = "ap-operator"
password = "hunter2"

[ap]
serialNumber = "SN-0001"
rulesetId = "US_47_CFR_PART_15_SUBPART_E"
certificationId = "FCCID-OPENWIFI"
latitude = 50.8125
longitude = 4.3818
majorAxis = 100
minorAxis = 50
orientation = 45
height = 10.0
heightType = "AGL"
verticalUncertainty = 5
indoorDeployment = 1
"#;
