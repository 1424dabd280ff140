//! Feature bitmasks exchanged via `AT+BRSF` and the capabilities derived
//! from them.
//!
//! The HF advertises its bitmask in `AT+BRSF=<n>`, the AG answers with
//! `+BRSF:<n>`. Bit meanings differ between the two sides, so each side
//! gets its own type.

use serde::{Deserialize, Serialize};

use crate::config::HandsFreeConfig;

/// CVSD narrowband codec id
pub const CODEC_CVSD: u8 = 1;
/// mSBC wideband codec id
pub const CODEC_MSBC: u8 = 2;

/// Hands-Free feature bits (`AT+BRSF`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HfFeatures(u16);

#[allow(missing_docs)]
impl HfFeatures {
    /// Echo canceling and/or noise reduction
    pub const EC_NR: u16 = 1 << 0;
    /// Call waiting or three-way calling
    pub const THREE_WAY_CALLING: u16 = 1 << 1;
    /// CLI presentation capability
    pub const CLI_PRESENTATION: u16 = 1 << 2;
    /// Voice recognition activation
    pub const VOICE_RECOGNITION: u16 = 1 << 3;
    /// Remote volume control
    pub const REMOTE_VOLUME: u16 = 1 << 4;
    /// Enhanced call status
    pub const ENHANCED_CALL_STATUS: u16 = 1 << 5;
    /// Enhanced call control
    pub const ENHANCED_CALL_CONTROL: u16 = 1 << 6;
    /// Codec negotiation
    pub const CODEC_NEGOTIATION: u16 = 1 << 7;

    /// Create from raw bits
    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Set a flag
    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }

    /// Clear a flag
    pub fn clear(&mut self, flag: u16) {
        self.0 &= !flag;
    }

    /// Check if flag is set
    pub fn has(&self, flag: u16) -> bool {
        self.0 & flag != 0
    }
}

/// Audio Gateway feature bits (`+BRSF`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgFeatures(u32);

impl AgFeatures {
    /// Three-way calling
    pub const THREE_WAY_CALLING: u32 = 1 << 0;
    /// Echo canceling and/or noise reduction
    pub const EC_NR: u32 = 1 << 1;
    /// Voice recognition function
    pub const VOICE_RECOGNITION: u32 = 1 << 2;
    /// In-band ring tone capability
    pub const IN_BAND_RING: u32 = 1 << 3;
    /// Attach a number to a voice tag
    pub const VOICE_TAG: u32 = 1 << 4;
    /// Ability to reject a call
    pub const REJECT_CALL: u32 = 1 << 5;
    /// Enhanced call status
    pub const ENHANCED_CALL_STATUS: u32 = 1 << 6;
    /// Enhanced call control
    pub const ENHANCED_CALL_CONTROL: u32 = 1 << 7;
    /// Extended error result codes
    pub const EXTENDED_ERROR: u32 = 1 << 8;
    /// Codec negotiation
    pub const CODEC_NEGOTIATION: u32 = 1 << 9;

    /// Create from raw bits
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Check if flag is set
    pub fn has(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

/// Derives session capabilities from the local and AG bitmasks.
#[derive(Debug, Clone)]
pub struct FeatureNegotiator {
    local: HfFeatures,
    wideband_speech: bool,
    in_band_ring: bool,
}

impl FeatureNegotiator {
    /// Create a negotiator.
    ///
    /// `codec_negotiation = false` strips the codec negotiation bit from the
    /// advertised local features.
    pub fn new(local: HfFeatures, codec_negotiation: bool, wideband_speech: bool) -> Self {
        let mut local = local;
        if codec_negotiation {
            local.set(HfFeatures::CODEC_NEGOTIATION);
        } else {
            local.clear(HfFeatures::CODEC_NEGOTIATION);
        }
        Self {
            local,
            wideband_speech,
            in_band_ring: true,
        }
    }

    /// Build from the `[hands_free]` config section
    pub fn from_config(config: &HandsFreeConfig) -> Self {
        let mut negotiator = Self::new(
            HfFeatures::from_bits(config.features),
            config.codec_negotiation,
            config.wideband_speech,
        );
        negotiator.in_band_ring = config.in_band_ring;
        negotiator
    }

    /// Features advertised in `AT+BRSF`
    pub fn local_features(&self) -> HfFeatures {
        self.local
    }

    /// Codecs offered in `AT+BAC`, CVSD first
    pub fn available_codecs(&self) -> Vec<u8> {
        if self.wideband_speech {
            vec![CODEC_CVSD, CODEC_MSBC]
        } else {
            vec![CODEC_CVSD]
        }
    }

    /// Combine with the AG bitmask
    pub fn negotiate(&self, ag: AgFeatures) -> FeatureSet {
        FeatureSet {
            local: self.local,
            ag,
            codec_negotiation: self.local.has(HfFeatures::CODEC_NEGOTIATION)
                && ag.has(AgFeatures::CODEC_NEGOTIATION),
            in_band_ring: self.in_band_ring && ag.has(AgFeatures::IN_BAND_RING),
            call_hold: self.local.has(HfFeatures::THREE_WAY_CALLING)
                && ag.has(AgFeatures::THREE_WAY_CALLING),
            voice_recognition: self.local.has(HfFeatures::VOICE_RECOGNITION)
                && ag.has(AgFeatures::VOICE_RECOGNITION),
            available_codecs: self.available_codecs(),
        }
    }
}

/// Capabilities fixed for the lifetime of a session once `+BRSF` is
/// acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSet {
    local: HfFeatures,
    ag: AgFeatures,
    codec_negotiation: bool,
    in_band_ring: bool,
    call_hold: bool,
    voice_recognition: bool,
    available_codecs: Vec<u8>,
}

impl FeatureSet {
    /// Local bitmask that was advertised
    pub fn local(&self) -> HfFeatures {
        self.local
    }

    /// AG bitmask that was reported
    pub fn ag(&self) -> AgFeatures {
        self.ag
    }

    /// Both sides support codec negotiation
    pub fn codec_negotiation(&self) -> bool {
        self.codec_negotiation
    }

    /// AG rings in-band (and the HF honours it)
    pub fn in_band_ring(&self) -> bool {
        self.in_band_ring
    }

    /// Both sides support three-way calling / call hold
    pub fn call_hold(&self) -> bool {
        self.call_hold
    }

    /// Both sides support voice recognition
    pub fn voice_recognition(&self) -> bool {
        self.voice_recognition
    }

    /// Codecs the HF can use on this session
    pub fn available_codecs(&self) -> &[u8] {
        &self.available_codecs
    }

    /// Whether `codec` may be confirmed with `AT+BCS`
    pub fn supports_codec(&self, codec: u8) -> bool {
        self.available_codecs.contains(&codec)
    }
}
