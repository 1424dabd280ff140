//! AG indicator registry.
//!
//! The AG decides which indicators it exposes and in which order
//! (`+CIND:` description list). Every later value report and `+CIEV`
//! update refers to indicators by that position only, so the
//! name-to-position mapping has to be learned per connection.

use std::fmt;

use serde::Serialize;

use crate::error::{HfpError, Result};

/// Value of an indicator that has not been reported yet
pub const INDICATOR_UNSET: i32 = -1;

/// Indicator names the engine understands
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorName {
    /// Active call present
    Call,
    /// Network service availability
    Service,
    /// Call setup progress (0 none, 1 incoming, 2 outgoing, 3 alerting)
    CallSetup,
    /// Held call status
    CallHeld,
    /// Signal strength
    Signal,
    /// Battery charge level
    BatteryCharge,
    /// Roaming status
    Roam,
    /// Any indicator name the engine does not interpret
    Other(String),
}

impl IndicatorName {
    /// Map an AG label (as quoted in `+CIND:`) to a name
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "call" => Self::Call,
            "service" => Self::Service,
            "callsetup" | "call_setup" => Self::CallSetup,
            "callheld" | "call_held" => Self::CallHeld,
            "signal" => Self::Signal,
            "battchg" | "battery" => Self::BatteryCharge,
            "roam" => Self::Roam,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for IndicatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Service => write!(f, "service"),
            Self::CallSetup => write!(f, "callsetup"),
            Self::CallHeld => write!(f, "callheld"),
            Self::Signal => write!(f, "signal"),
            Self::BatteryCharge => write!(f, "battchg"),
            Self::Roam => write!(f, "roam"),
            Self::Other(label) => write!(f, "{label}"),
        }
    }
}

/// A registered indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    /// Indicator name
    pub name: IndicatorName,
    /// Position assigned by the AG
    pub position: usize,
    /// Last reported value, or [`INDICATOR_UNSET`]
    pub value: i32,
}

/// Position-ordered indicator table
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndicatorRegistry {
    indicators: Vec<Indicator>,
}

impl IndicatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` at `position`.
    ///
    /// Positions are assigned in AG order, so `position` must be the next
    /// free one (`len()`); registered positions are always `0..len()`.
    /// Fails if the name or the position is already taken, or if the
    /// position would leave a gap.
    pub fn register(&mut self, name: IndicatorName, position: usize) -> Result<()> {
        if position < self.indicators.len() {
            return Err(HfpError::RegistrationConflict(format!(
                "position {position} already registered"
            )));
        }
        if position > self.indicators.len() {
            return Err(HfpError::RegistrationConflict(format!(
                "position {position} skips {}",
                self.indicators.len()
            )));
        }
        if self.indicators.iter().any(|i| i.name == name) {
            return Err(HfpError::RegistrationConflict(format!(
                "indicator {name} already registered"
            )));
        }

        self.indicators.push(Indicator {
            name,
            position,
            value: INDICATOR_UNSET,
        });
        Ok(())
    }

    /// Update the value at `position`.
    ///
    /// Unknown positions are logged and ignored; returns whether the
    /// update was applied.
    pub fn set_value(&mut self, position: usize, value: i32) -> bool {
        match self.indicators.iter_mut().find(|i| i.position == position) {
            Some(indicator) => {
                indicator.value = value;
                true
            },
            None => {
                let err = HfpError::UnknownIndicator(position);
                tracing::warn!(value, error = %err, "Indicator value ignored");
                false
            },
        }
    }

    /// Current value of `name`, or [`INDICATOR_UNSET`]
    pub fn get(&self, name: &IndicatorName) -> i32 {
        self.indicators
            .iter()
            .find(|i| &i.name == name)
            .map_or(INDICATOR_UNSET, |i| i.value)
    }

    /// Position the AG assigned to `name`
    pub fn position_of(&self, name: &IndicatorName) -> Option<usize> {
        self.indicators
            .iter()
            .find(|i| &i.name == name)
            .map(|i| i.position)
    }

    /// Name registered at `position`
    pub fn name_at(&self, position: usize) -> Option<&IndicatorName> {
        self.indicators
            .iter()
            .find(|i| i.position == position)
            .map(|i| &i.name)
    }

    /// Number of registered indicators
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Whether no indicator is registered
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Drop all registrations
    pub fn clear(&mut self) {
        self.indicators.clear();
    }

    /// Indicators in position order
    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.iter()
    }
}
