//! Hands-Free Profile AT command engine.
//!
//! Implements the HF side of HFP 1.6: Service Level Connection (SLC)
//! establishment, indicator tracking and the codec / audio connection
//! sequence that follows.
//!
//! # Protocol Overview
//!
//! ## Message Flow
//!
//! ```text
//! HF                                AG
//!  |-------- AT+BRSF=<hf> --------->|  Feature exchange
//!  |<------- +BRSF:<ag> ------------|
//!  |<------- OK --------------------|
//!  |-------- AT+BAC=1,2 ----------->|  (codec negotiation only)
//!  |<------- OK --------------------|
//!  |-------- AT+CIND=? ------------>|  Indicator descriptions
//!  |<------- +CIND:("call",..),.. --|
//!  |<------- OK --------------------|
//!  |-------- AT+CIND? ------------->|  Indicator values
//!  |<------- +CIND:0,0,1 -----------|
//!  |<------- OK --------------------|
//!  |-------- AT+CMER=3,0,0,1 ------>|  Event reporting on
//!  |<------- OK --------------------|  == SLC established ==
//!  |-------- AT+CHLD=? ------------>|  (call hold only)
//!  |<------- +CHLD:(0,1,2,3) -------|
//!  |<------- OK --------------------|
//!  |-------- AT+BCC --------------->|  (codec negotiation only)
//!  |<------- OK --------------------|
//!  |<------- +BCS:2 ----------------|  AG picks codec
//!  |-------- AT+BCS=2 ------------->|
//!  |<------- OK --------------------|
//!  |<======= SCO setup =============|  == audio connected ==
//! ```
//!
//! ## State Machine
//!
//! | State               | Description                        | Valid Transitions      |
//! |---------------------|------------------------------------|------------------------|
//! | `Init`              | New or reset session               | → EstablishingSlc      |
//! | `EstablishingSlc`   | BRSF / BAC / CIND / CMER exchange  | → EstablishingAudio    |
//! | `EstablishingAudio` | SLC up, CHLD / codec / SCO pending | → AudioConnected       |
//! | `AudioConnected`    | SCO link up                        | → EstablishingAudio    |
//!
//! Any state returns to `Init` on [`Session::reset`].
//!
//! Once the SLC is up, `+CIEV`, `RING`, `+BSIR`, `+BVRA`, `+BTRH` and
//! `+CCWA` are handled in every state without a state change.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hfp::protocol::{BdAddr, ChannelHandle, Session};
//! use hfp::Config;
//!
//! let mut session = Session::new(&Config::default());
//! session.start("00:1A:7D:DA:71:13".parse()?, ChannelHandle(7))?;
//!
//! for command in session.take_outbound() {
//!     rfcomm.write_all(&command.to_wire())?;
//! }
//!
//! // For every line read from the AG
//! session.process_line(line)?;
//! ```

mod command;
mod features;
mod indicators;
mod peer;
mod session;
mod state_table;
mod token;

pub use command::{AtCommand, CommandKind, CMER_PARAMS};
pub use features::{AgFeatures, FeatureNegotiator, FeatureSet, HfFeatures, CODEC_CVSD, CODEC_MSBC};
pub use indicators::{Indicator, IndicatorName, IndicatorRegistry, INDICATOR_UNSET};
pub use peer::{BdAddr, ChannelHandle, ReleasedChannels};
pub use session::{Notification, Session, SessionFlags, SessionSnapshot, SessionStats};
pub use state_table::{side_handler, transition, Handler, State, Transition, TRANSITIONS};
pub use token::{classify, Event, EventKind, Token, EVENT_MAP};

/// Hands-Free service class UUID
pub const HFP_HF_UUID: &str = "0000111E-0000-1000-8000-00805f9b34fb";

/// Supported HFP version (1.6)
pub const HFP_VERSION: u16 = 0x0106;
