//! HFP engine error types.
//!
//! # Recovery Classes
//!
//! Most errors are recovered locally by the session: the offending line or
//! event is logged and discarded and the state machine stays where it was.
//! Only three classes are fatal to a session and force a reset to `Init`:
//!
//! - transport failure (the byte stream is gone)
//! - SLC deadline expiry (the AG stopped answering)
//! - indicator registration conflict (all later `+CIEV` updates would be
//!   indexed against a broken table)
//!
//! See [`HfpError::is_fatal`].

use thiserror::Error;

/// HFP engine errors.
#[derive(Error, Debug)]
pub enum HfpError {
    /// Received line matched no known token or had a malformed payload.
    #[error("Unrecognized line: {0}")]
    Unrecognized(String),

    /// Indicator value reported for a position that was never registered.
    #[error("Unknown indicator position: {0}")]
    UnknownIndicator(usize),

    /// Event has no transition from the current state.
    #[error("Unexpected event {event} in state {state}")]
    UnexpectedEvent {
        /// State the session was in.
        state: String,
        /// Event that arrived.
        event: String,
    },

    /// Duplicate indicator name or position during registration.
    #[error("Indicator registration conflict: {0}")]
    RegistrationConflict(String),

    /// Generic protocol violation.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Underlying byte stream failed or closed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No session exists for the given peer.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// SLC establishment did not complete before the deadline.
    #[error("SLC establishment timed out")]
    SlcTimeout,

    /// Bluetooth device address could not be parsed.
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for HFP operations
pub type Result<T> = std::result::Result<T, HfpError>;

impl HfpError {
    /// Whether this error must tear the session back down to `Init`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HfpError::Transport(_)
                | HfpError::SlcTimeout
                | HfpError::RegistrationConflict(_)
                | HfpError::Io(_)
        )
    }
}

impl From<toml::de::Error> for HfpError {
    fn from(err: toml::de::Error) -> Self {
        HfpError::Config(err.to_string())
    }
}
