//! # HFP Core - Bluetooth Hands-Free Profile, HF role
//!
//! AT command engine for the Hands-Free side of HFP: establishes the
//! Service Level Connection with an Audio Gateway, tracks AG indicators,
//! negotiates features and codecs, and sequences the audio (SCO) setup.
//!
//! ## Features
//!
//! - **Table-driven state machine**: every `(state, event)` reaction is a
//!   static table entry
//! - **Context-aware classification**: generic `OK` / `ERROR` replies are
//!   resolved against the one pending command
//! - **Live indicator mapping**: indicator positions are learned from the
//!   AG per connection, never assumed
//! - **Runtime feature toggles**: codec negotiation, wideband speech and
//!   in-band ring are configuration, not build flags
//!
//! ## Scope
//!
//! The crate consumes an already connected control channel (RFCOMM) as a
//! byte stream and is told when the audio channel comes and goes. Radio
//! control, the AG role and audio sample coding are not part of it.
//!
//! ### Architecture
//!
//! ```text
//!  transport bytes
//!        │
//!        ▼
//!  ┌────────────┐  lines  ┌────────────┐ event ┌──────────────┐
//!  │ LineBuffer │───────> │ classify() │─────> │ state table  │
//!  └────────────┘         └────────────┘       └──────┬───────┘
//!                               ▲ pending cmd         │ handler
//!                               │                     ▼
//!                         ┌───────────────────────────────────┐
//!                         │ Session: indicators, features,    │
//!                         │ flags, outbound queue             │
//!                         └───────────────────────────────────┘
//!                                        │ AT commands
//!                                        ▼
//!                                 transport bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hfp::{ChannelHandle, ConnectionManager, Config};
//!
//! let mut manager = ConnectionManager::new(Config::default());
//! let addr = "00:1A:7D:DA:71:13".parse()?;
//!
//! let (hello, _) = manager.new_connection(addr, ChannelHandle(7))?;
//! rfcomm.write_all(&hello)?;              // AT+BRSF=...
//!
//! let reply = manager.feed(addr, &received_bytes)?;
//! rfcomm.write_all(&reply)?;
//!
//! for note in manager.take_notifications(addr) {
//!     println!("{note:?}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: classifier, state table, session, indicators, features
//! - [`manager`]: per-peer session ownership and deadline policy
//! - [`transport`]: line framing and the async stream driver
//! - [`profile`]: profile registration record
//! - [`config`]: configuration management
//! - [`error`]: error types and result aliases

pub mod config;
pub mod error;
pub mod manager;
pub mod profile;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use config::Config;
pub use error::{HfpError, Result};
pub use manager::ConnectionManager;
pub use profile::ProfileRecord;
pub use protocol::{
    AtCommand, BdAddr, ChannelHandle, Event, IndicatorName, Notification, Session, State,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
