//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//!
//! Feature toggles that would otherwise be compile-time switches
//! (codec negotiation, wideband speech, in-band ring) live here so both
//! branches of the state machine can be exercised from the same build.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{HfpError, Result};
use crate::protocol::HfFeatures;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hands-Free feature configuration
    #[serde(default)]
    pub hands_free: HandsFreeConfig,

    /// Connection handling configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Profile registration metadata
    #[serde(default)]
    pub profile: ProfileConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| HfpError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| HfpError::Config(format!("Failed to parse config: {e}")))
    }

    /// Default config file location (`<config_dir>/hfp/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hfp").join("config.toml"))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(features) = std::env::var("HFP_FEATURES") {
            if let Ok(features) = features.parse() {
                config.hands_free.features = features;
            }
        }
        if let Some(val) = env_flag("HFP_CODEC_NEGOTIATION") {
            config.hands_free.codec_negotiation = val;
        }
        if let Some(val) = env_flag("HFP_WIDEBAND_SPEECH") {
            config.hands_free.wideband_speech = val;
        }
        if let Some(val) = env_flag("HFP_IN_BAND_RING") {
            config.hands_free.in_band_ring = val;
        }
        if let Some(val) = env_flag("HFP_CIEV_ONE_BASED") {
            config.hands_free.ciev_one_based = val;
        }

        if let Ok(secs) = std::env::var("HFP_SLC_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.connection.slc_timeout_secs = secs;
            }
        }

        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Hands-Free feature configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandsFreeConfig {
    /// Local HF feature bitmask advertised in `AT+BRSF`
    pub features: u16,

    /// Allow codec negotiation when the AG supports it
    pub codec_negotiation: bool,

    /// Advertise mSBC in addition to CVSD
    pub wideband_speech: bool,

    /// Honour AG in-band ringing (suppresses the local ring alert)
    pub in_band_ring: bool,

    /// Treat `+CIEV` indices as 1-based
    pub ciev_one_based: bool,
}

impl Default for HandsFreeConfig {
    fn default() -> Self {
        Self {
            features: HfFeatures::EC_NR
                | HfFeatures::CLI_PRESENTATION
                | HfFeatures::VOICE_RECOGNITION
                | HfFeatures::REMOTE_VOLUME
                | HfFeatures::ENHANCED_CALL_STATUS,
            codec_negotiation: false,
            wideband_speech: true,
            in_band_ring: true,
            ciev_one_based: false,
        }
    }
}

/// Connection handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Seconds allowed for SLC establishment before the session is reset
    pub slc_timeout_secs: u64,

    /// Longest accepted inbound line in bytes
    pub max_line_len: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            slc_timeout_secs: 10,
            max_line_len: 512,
        }
    }
}

impl ConnectionConfig {
    /// SLC deadline as a duration
    pub fn slc_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.slc_timeout_secs)
    }
}

/// Profile registration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Service name advertised via SDP
    pub name: String,

    /// Profile version (BCD, 0x0106 = 1.6)
    pub version: u16,

    /// Require an authenticated link
    pub require_authentication: bool,

    /// Require authorization of incoming connections
    pub require_authorization: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            name: "Hands-Free unit".to_string(),
            version: 0x0106,
            require_authentication: true,
            require_authorization: true,
        }
    }
}
