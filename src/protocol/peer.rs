//! Peer identity and channel handles.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::HfpError;

/// Bluetooth device address (`AA:BB:CC:DD:EE:FF`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// Create from raw bytes, most significant first
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BdAddr {
    type Err = HfpError;

    /// Accepts `:`, `-` or `_` separators (BlueZ object paths use `_`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '-', '_']).collect();
        if parts.len() != 6 {
            return Err(HfpError::InvalidAddress(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(&parts) {
            if part.len() != 2 {
                return Err(HfpError::InvalidAddress(s.to_string()));
            }
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| HfpError::InvalidAddress(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for BdAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Opaque handle of a connected channel, owned by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelHandle(pub u64);

/// Channel handles handed back when a session is torn down.
///
/// The owner closes whatever is returned here; a second teardown returns
/// nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleasedChannels {
    /// Control (RFCOMM) channel
    pub control: Option<ChannelHandle>,
    /// Audio (SCO) channel
    pub audio: Option<ChannelHandle>,
}

impl ReleasedChannels {
    /// Nothing was released
    pub fn is_empty(&self) -> bool {
        self.control.is_none() && self.audio.is_none()
    }
}
