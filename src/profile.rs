//! Profile registration metadata.
//!
//! Registering the profile with the platform Bluetooth daemon happens
//! outside this crate; this is the record handed to it.

use serde::Serialize;
use uuid::Uuid;

use crate::config::{Config, HandsFreeConfig};
use crate::error::{HfpError, Result};
use crate::protocol::{HfFeatures, HFP_HF_UUID};

/// SDP "wideband speech" feature bit
const SDP_WIDEBAND_SPEECH: u16 = 1 << 5;

/// HF bits 0-4 map 1:1 onto SDP bits
const SDP_SHARED_BITS: u16 = HfFeatures::EC_NR
    | HfFeatures::THREE_WAY_CALLING
    | HfFeatures::CLI_PRESENTATION
    | HfFeatures::VOICE_RECOGNITION
    | HfFeatures::REMOTE_VOLUME;

/// Record describing the HF profile to the Bluetooth daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    /// Service class UUID
    pub uuid: Uuid,
    /// Service name
    pub name: String,
    /// SDP `SupportedFeatures`
    pub features: u16,
    /// Profile version
    pub version: u16,
    /// Require authentication
    pub require_authentication: bool,
    /// Require authorization
    pub require_authorization: bool,
}

impl ProfileRecord {
    /// Build from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let uuid = Uuid::parse_str(HFP_HF_UUID)
            .map_err(|e| HfpError::Config(format!("Invalid profile UUID: {e}")))?;

        Ok(Self {
            uuid,
            name: config.profile.name.clone(),
            features: sdp_features(&config.hands_free),
            version: config.profile.version,
            require_authentication: config.profile.require_authentication,
            require_authorization: config.profile.require_authorization,
        })
    }
}

/// SDP feature bits for the configured HF features
pub fn sdp_features(config: &HandsFreeConfig) -> u16 {
    let mut features = config.features & SDP_SHARED_BITS;
    if config.wideband_speech && config.codec_negotiation {
        features |= SDP_WIDEBAND_SPEECH;
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = ProfileRecord::from_config(&Config::default()).unwrap();
        assert_eq!(
            record.uuid.to_string(),
            "0000111e-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(record.name, "Hands-Free unit");
        assert_eq!(record.version, 0x0106);
        assert!(record.require_authentication);
        // EC/NR, CLI, voice recognition, remote volume; no wideband bit
        assert_eq!(record.features, 0b1_1101);
    }

    #[test]
    fn test_wideband_bit_needs_codec_negotiation() {
        let mut hf = HandsFreeConfig::default();
        assert_eq!(sdp_features(&hf) & SDP_WIDEBAND_SPEECH, 0);

        hf.codec_negotiation = true;
        assert_ne!(sdp_features(&hf) & SDP_WIDEBAND_SPEECH, 0);

        hf.wideband_speech = false;
        assert_eq!(sdp_features(&hf) & SDP_WIDEBAND_SPEECH, 0);
    }

    #[test]
    fn test_record_serializes() {
        let record = ProfileRecord::from_config(&Config::default()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Hands-Free unit");
        assert_eq!(json["version"], 262);
    }
}
