//! Per-peer HF session.
//!
//! Owns all mutable protocol state for one AG connection and advances it
//! one event at a time. Outbound commands and notifications are queued and
//! drained by the owner ([`Session::take_outbound`],
//! [`Session::take_notifications`]); the session itself never blocks.

use std::collections::VecDeque;

use serde::Serialize;

use super::command::{AtCommand, CommandKind};
use super::features::{AgFeatures, FeatureNegotiator, FeatureSet};
use super::indicators::{Indicator, IndicatorName, IndicatorRegistry};
use super::peer::{BdAddr, ChannelHandle, ReleasedChannels};
use super::state_table::{self, Handler, State, Transition};
use super::token::{classify, Event, EventKind};
use crate::config::Config;
use crate::error::{HfpError, Result};

/// Call setup indicator value for an incoming call
const CALL_SETUP_INCOMING: i32 = 1;

/// Session flags, all cleared on reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionFlags {
    /// `AT+CMER` acknowledged
    pub slc_established: bool,
    /// SCO link up
    pub sco_established: bool,
    /// Audio connection procedure finished
    pub audio_connection_complete: bool,
    /// AG rings in-band
    pub in_band_ring: bool,
    /// A call is on hold
    pub call_held: bool,
    /// Active and held calls can be swapped
    pub call_swap_pending: bool,
    /// A call is active
    pub first_call_active: bool,
    /// Another call is waiting while one is active
    pub second_incoming_call_pending: bool,
    /// AG voice recognition running
    pub voice_recognition_active: bool,
}

/// Events surfaced to the session owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Notification {
    /// SLC established
    SlcEstablished,
    /// Play a local ring tone
    RingAlert,
    /// Indicator value changed
    IndicatorChanged {
        /// Indicator name
        name: IndicatorName,
        /// New value
        value: i32,
    },
    /// In-band ring toggled
    InBandRing(bool),
    /// Voice recognition toggled
    VoiceRecognition(bool),
    /// Response-and-hold state
    ResponseHold(u8),
    /// Second call waiting
    CallWaiting(String),
    /// Codec confirmed with the AG
    CodecSelected(u8),
    /// SCO link up
    AudioConnected,
    /// SCO link down
    AudioDisconnected,
    /// Session returned to `Init`
    Reset,
}

/// Point-in-time view of the session's protocol state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Current state
    pub state: State,
    /// Peer address
    pub address: Option<BdAddr>,
    /// Control channel connected
    pub control_connected: bool,
    /// Audio channel connected
    pub audio_connected: bool,
    /// Flags
    pub flags: SessionFlags,
    /// Command awaiting its result code
    pub pending: Option<CommandKind>,
    /// AG feature bitmask
    pub ag_features: Option<u32>,
    /// Negotiated features
    pub features: Option<FeatureSet>,
    /// Registered indicators
    pub indicators: Vec<Indicator>,
    /// Codec selected by the AG
    pub selected_codec: Option<u8>,
    /// Supported call-hold actions
    pub call_hold_actions: Vec<String>,
    /// Response-and-hold state
    pub response_hold: Option<u8>,
}

/// Session statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Session ID
    pub session_id: String,
    /// Lines received from the AG
    pub lines_received: u64,
    /// Commands sent to the AG
    pub commands_sent: u64,
    /// Lines or events dropped as unrecognized or unexpected
    pub events_discarded: u64,
    /// Handler invocations
    pub handlers_invoked: u64,
}

/// HF protocol session for one AG
pub struct Session {
    id: String,
    state: State,
    negotiator: FeatureNegotiator,
    honour_in_band_ring: bool,
    ciev_one_based: bool,
    address: Option<BdAddr>,
    control: Option<ChannelHandle>,
    audio: Option<ChannelHandle>,
    ag_features: Option<AgFeatures>,
    features: Option<FeatureSet>,
    indicators: IndicatorRegistry,
    flags: SessionFlags,
    selected_codec: Option<u8>,
    call_hold_actions: Vec<String>,
    response_hold: Option<u8>,
    pending: Option<CommandKind>,
    deferred: VecDeque<AtCommand>,
    outbound: VecDeque<AtCommand>,
    notifications: Vec<Notification>,
    stats: SessionStats,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Session {
    /// Create a session from configuration
    pub fn new(config: &Config) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            stats: SessionStats {
                session_id: id.clone(),
                ..SessionStats::default()
            },
            id,
            state: State::Init,
            negotiator: FeatureNegotiator::from_config(&config.hands_free),
            honour_in_band_ring: config.hands_free.in_band_ring,
            ciev_one_based: config.hands_free.ciev_one_based,
            address: None,
            control: None,
            audio: None,
            ag_features: None,
            features: None,
            indicators: IndicatorRegistry::new(),
            flags: SessionFlags::default(),
            selected_codec: None,
            call_hold_actions: Vec::new(),
            response_hold: None,
            pending: None,
            deferred: VecDeque::new(),
            outbound: VecDeque::new(),
            notifications: Vec::new(),
        }
    }

    /// Create session with existing ID
    pub fn with_id(id: &str, config: &Config) -> Self {
        let mut session = Self::new(config);
        session.id = id.to_string();
        session.stats.session_id = id.to_string();
        session
    }

    /// Get session ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Check if the SLC is established
    pub fn is_slc_established(&self) -> bool {
        self.flags.slc_established
    }

    /// Session flags
    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    /// Indicator registry
    pub fn indicators(&self) -> &IndicatorRegistry {
        &self.indicators
    }

    /// Negotiated features, once `+BRSF` is acknowledged
    pub fn features(&self) -> Option<&FeatureSet> {
        self.features.as_ref()
    }

    /// Command awaiting its final result code
    pub fn pending(&self) -> Option<CommandKind> {
        self.pending
    }

    /// Peer address
    pub fn address(&self) -> Option<BdAddr> {
        self.address
    }

    /// Codec selected by the AG
    pub fn selected_codec(&self) -> Option<u8> {
        self.selected_codec
    }

    /// Statistics
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Drain commands ready to be written to the control channel
    pub fn take_outbound(&mut self) -> Vec<AtCommand> {
        self.outbound.drain(..).collect()
    }

    /// Drain queued notifications
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Bind to a newly connected AG and start SLC establishment
    pub fn start(&mut self, address: BdAddr, control: ChannelHandle) -> Result<Option<Handler>> {
        if self.state != State::Init {
            return Err(HfpError::Protocol(format!(
                "Cannot start session in state {}",
                self.state
            )));
        }
        if self.control.is_some() {
            return Err(HfpError::Protocol(
                "Control channel still held, disconnect first".to_string(),
            ));
        }
        self.address = Some(address);
        self.control = Some(control);
        tracing::info!(peer = %address, session = %self.id, "Starting SLC establishment");
        self.dispatch(Event::Connected)
    }

    /// Feed one received line.
    ///
    /// Returns the handler that ran, if any. Unrecognized lines are logged
    /// and dropped.
    pub fn process_line(&mut self, line: &str) -> Result<Option<Handler>> {
        self.stats.lines_received += 1;
        tracing::debug!(session = %self.id, line = line.trim(), "AG ->");

        match classify(line, self.pending) {
            Some(event) => self.dispatch(event),
            None => {
                if !line.trim().is_empty() {
                    let err = HfpError::Unrecognized(line.trim().to_string());
                    tracing::warn!(
                        session = %self.id,
                        pending = ?self.pending,
                        error = %err,
                        "Line discarded"
                    );
                    self.stats.events_discarded += 1;
                }
                Ok(None)
            },
        }
    }

    /// SCO link reported up by the transport.
    ///
    /// The session takes `audio` only when the current state accepts the
    /// link. Otherwise nothing changes and an error is returned; the
    /// caller still owns the handle.
    pub fn audio_connected(&mut self, audio: ChannelHandle) -> Result<Option<Handler>> {
        if let Some(held) = self.audio {
            return Err(HfpError::Protocol(format!(
                "Audio channel {held:?} already held, refusing {audio:?}"
            )));
        }
        if state_table::transition(self.state, EventKind::AudioConnected).is_none() {
            self.stats.events_discarded += 1;
            return Err(HfpError::UnexpectedEvent {
                state: self.state.to_string(),
                event: EventKind::AudioConnected.to_string(),
            });
        }
        self.audio = Some(audio);
        self.dispatch(Event::AudioConnected)
    }

    /// SCO link reported down by the transport
    pub fn audio_disconnected(&mut self) -> Result<Option<Handler>> {
        self.dispatch(Event::AudioDisconnected)
    }

    /// Advance the state machine with `event`.
    ///
    /// Returns the handler that ran. Events without a transition for the
    /// current state are discarded and return `Ok(None)`. Fatal handler
    /// failures reset the session before the error is returned.
    pub fn dispatch(&mut self, event: Event) -> Result<Option<Handler>> {
        let kind = event.kind();

        if let Event::Ack(cmd) | Event::Nack(cmd) = &event {
            if self.pending != Some(*cmd) {
                tracing::warn!(session = %self.id, event = %kind, "Result code for a command not pending");
                self.stats.events_discarded += 1;
                return Ok(None);
            }
            self.pending = None;
            self.send_deferred();
        }

        if kind.is_unsolicited() {
            if !self.flags.slc_established {
                tracing::warn!(session = %self.id, event = %kind, "Unsolicited event before SLC discarded");
                self.stats.events_discarded += 1;
                return Ok(None);
            }
            let handler = state_table::side_handler(kind);
            if let Some(handler) = handler {
                self.invoke(handler, &event)?;
            }
            return Ok(handler);
        }

        let Some(transition) = state_table::transition(self.state, kind) else {
            let err = HfpError::UnexpectedEvent {
                state: self.state.to_string(),
                event: kind.to_string(),
            };
            tracing::warn!(session = %self.id, error = %err, "Event discarded");
            self.stats.events_discarded += 1;
            return Ok(None);
        };

        if let Some(handler) = transition.handler {
            self.invoke(handler, &event)?;
        }

        if self.state != transition.next {
            tracing::debug!(session = %self.id, from = %self.state, to = %transition.next, "State change");
        }
        self.state = transition.next;
        self.send_for(transition);

        Ok(transition.handler)
    }

    /// Tear down after transport loss and release both channels
    pub fn disconnect(&mut self) -> ReleasedChannels {
        if self.control.is_some() || self.audio.is_some() {
            tracing::info!(session = %self.id, peer = ?self.address, "Disconnected");
        }
        self.reset()
    }

    /// Return to `Init`, dropping all negotiated state.
    ///
    /// Hands back the channel handles that were still held so the owner can
    /// close them. Calling it again returns nothing.
    pub fn reset(&mut self) -> ReleasedChannels {
        let released = ReleasedChannels {
            control: self.control.take(),
            audio: self.audio.take(),
        };
        let was_active = self.state != State::Init || !released.is_empty();

        self.clear_protocol_state();
        self.address = None;
        if was_active {
            self.notifications.push(Notification::Reset);
        }
        released
    }

    /// Return to `Init` after a fatal error.
    ///
    /// Protocol state is dropped but the channel handles stay with the
    /// session until [`Session::disconnect`] hands them back.
    pub fn abort(&mut self) {
        if self.state == State::Init && self.control.is_none() && self.audio.is_none() {
            return;
        }
        self.clear_protocol_state();
        self.notifications.push(Notification::Reset);
    }

    fn clear_protocol_state(&mut self) {
        self.state = State::Init;
        self.ag_features = None;
        self.features = None;
        self.indicators.clear();
        self.flags = SessionFlags::default();
        self.selected_codec = None;
        self.call_hold_actions.clear();
        self.response_hold = None;
        self.pending = None;
        self.deferred.clear();
        self.outbound.clear();
    }

    /// Snapshot of the protocol state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            address: self.address,
            control_connected: self.control.is_some(),
            audio_connected: self.audio.is_some(),
            flags: self.flags.clone(),
            pending: self.pending,
            ag_features: self.ag_features.map(|f| f.bits()),
            features: self.features.clone(),
            indicators: self.indicators.iter().cloned().collect(),
            selected_codec: self.selected_codec,
            call_hold_actions: self.call_hold_actions.clone(),
            response_hold: self.response_hold,
        }
    }

    fn send_for(&mut self, transition: &Transition) {
        let command = transition
            .command
            .and_then(|kind| self.render(kind))
            .or_else(|| transition.fallback.and_then(|kind| self.render(kind)));

        if let Some(command) = command {
            self.send(command);
        }
    }

    /// Render `kind` with session parameters, or `None` when the command
    /// is not valid for the negotiated features.
    fn render(&self, kind: CommandKind) -> Option<AtCommand> {
        let features = self.features.as_ref();
        match kind {
            CommandKind::Brsf => Some(AtCommand::Brsf(self.negotiator.local_features().bits())),
            CommandKind::Bac => features
                .filter(|f| f.codec_negotiation())
                .map(|f| AtCommand::Bac(f.available_codecs().to_vec())),
            CommandKind::CindTest => Some(AtCommand::CindTest),
            CommandKind::CindRead => Some(AtCommand::CindRead),
            CommandKind::Cmer => Some(AtCommand::Cmer),
            CommandKind::ChldTest => features
                .filter(|f| f.call_hold())
                .map(|_| AtCommand::ChldTest),
            CommandKind::Bcc => features
                .filter(|f| f.codec_negotiation())
                .map(|_| AtCommand::Bcc),
            CommandKind::Bcs => {
                let codec = self.selected_codec?;
                let supported = features.map_or_else(
                    || self.negotiator.available_codecs().contains(&codec),
                    |f| f.supports_codec(codec),
                );
                supported.then_some(AtCommand::Bcs(codec))
            },
        }
    }

    /// Send now if nothing is pending, otherwise defer
    fn send(&mut self, command: AtCommand) {
        if self.pending.is_some() {
            tracing::debug!(session = %self.id, command = %command, "Deferred behind pending command");
            self.deferred.push_back(command);
            return;
        }
        self.transmit(command);
    }

    fn send_deferred(&mut self) {
        if self.pending.is_none() {
            if let Some(command) = self.deferred.pop_front() {
                self.transmit(command);
            }
        }
    }

    fn transmit(&mut self, command: AtCommand) {
        tracing::debug!(session = %self.id, command = %command, "HF ->");
        self.pending = Some(command.kind());
        self.stats.commands_sent += 1;
        self.outbound.push_back(command);
    }

    fn invoke(&mut self, handler: Handler, event: &Event) -> Result<()> {
        self.stats.handlers_invoked += 1;
        match self.run_handler(handler, event) {
            Err(err) if err.is_fatal() => {
                tracing::error!(session = %self.id, ?handler, error = %err, "Fatal protocol error, resetting");
                self.abort();
                Err(err)
            },
            other => other,
        }
    }

    fn run_handler(&mut self, handler: Handler, event: &Event) -> Result<()> {
        match (handler, event) {
            (Handler::StoreAgFeatures, Event::BrsfReport(bits)) => {
                self.ag_features = Some(AgFeatures::from_bits(*bits));
            },
            (Handler::NegotiateFeatures, _) => self.negotiate(),
            (Handler::RegisterIndicators, Event::CindList(names)) => {
                for (position, name) in names.iter().enumerate() {
                    self.indicators.register(name.clone(), position)?;
                }
                tracing::debug!(session = %self.id, count = names.len(), "Indicators registered");
            },
            (Handler::SetIndicatorValues, Event::CindValues(values)) => {
                if values.len() != self.indicators.len() {
                    tracing::warn!(
                        session = %self.id,
                        values = values.len(),
                        registered = self.indicators.len(),
                        "Indicator value count mismatch"
                    );
                }
                for (position, value) in values.iter().enumerate() {
                    self.indicators.set_value(position, *value);
                }
            },
            (Handler::SlcEstablished, _) => {
                self.flags.slc_established = true;
                self.notifications.push(Notification::SlcEstablished);
                tracing::info!(session = %self.id, peer = ?self.address, "SLC established");
            },
            (Handler::StoreCallHold, Event::ChldList(actions)) => {
                self.call_hold_actions.clone_from(actions);
            },
            (Handler::SelectCodec, Event::Bcs(codec)) => {
                self.selected_codec = Some(*codec);
            },
            (Handler::CodecConfirmed, _) => {
                if let Some(codec) = self.selected_codec {
                    tracing::info!(session = %self.id, codec, "Codec confirmed");
                    self.notifications.push(Notification::CodecSelected(codec));
                }
            },
            (Handler::AudioUp, _) => {
                self.flags.sco_established = true;
                self.flags.audio_connection_complete = true;
                self.notifications.push(Notification::AudioConnected);
                tracing::info!(session = %self.id, codec = ?self.selected_codec, "Audio connected");
            },
            (Handler::AudioDown, _) => {
                self.flags.sco_established = false;
                self.flags.audio_connection_complete = false;
                self.audio = None;
                self.notifications.push(Notification::AudioDisconnected);
                tracing::info!(session = %self.id, "Audio disconnected");
            },
            (Handler::UpdateIndicator, Event::Ciev { index, value }) => {
                self.update_indicator(*index, *value);
            },
            (Handler::Ring, _) => {
                if !self.flags.in_band_ring {
                    self.notifications.push(Notification::RingAlert);
                }
            },
            (Handler::InBandRing, Event::Bsir(enabled)) => {
                self.flags.in_band_ring = *enabled && self.honour_in_band_ring;
                self.notifications.push(Notification::InBandRing(self.flags.in_band_ring));
            },
            (Handler::VoiceRecognition, Event::Bvra(active)) => {
                self.flags.voice_recognition_active = *active;
                self.notifications.push(Notification::VoiceRecognition(*active));
            },
            (Handler::ResponseHold, Event::Btrh(state)) => {
                self.response_hold = Some(*state);
                self.notifications.push(Notification::ResponseHold(*state));
            },
            (Handler::CallWaiting, Event::CallWaiting(number)) => {
                self.flags.second_incoming_call_pending = true;
                self.notifications.push(Notification::CallWaiting(number.clone()));
            },
            (handler, event) => {
                return Err(HfpError::Protocol(format!(
                    "Handler {handler:?} cannot take event {:?}",
                    event.kind()
                )));
            },
        }
        Ok(())
    }

    fn negotiate(&mut self) {
        if self.features.is_some() {
            return;
        }
        let ag = self.ag_features.unwrap_or_else(|| {
            tracing::warn!(session = %self.id, "BRSF acknowledged without AG features");
            AgFeatures::default()
        });
        let features = self.negotiator.negotiate(ag);
        self.flags.in_band_ring = features.in_band_ring();
        tracing::info!(
            session = %self.id,
            ag_features = ag.bits(),
            codec_negotiation = features.codec_negotiation(),
            call_hold = features.call_hold(),
            in_band_ring = features.in_band_ring(),
            "Features negotiated"
        );
        self.features = Some(features);
    }

    fn update_indicator(&mut self, index: usize, value: i32) {
        let position = if self.ciev_one_based {
            index.checked_sub(1)
        } else {
            Some(index)
        };
        let Some(position) = position else {
            tracing::warn!(session = %self.id, index, "Invalid indicator index");
            return;
        };
        if !self.indicators.set_value(position, value) {
            return;
        }
        let Some(name) = self.indicators.name_at(position).cloned() else {
            return;
        };

        match name {
            IndicatorName::Call => {
                self.flags.first_call_active = value == 1;
                if value == 0 {
                    self.flags.call_held = false;
                    self.flags.call_swap_pending = false;
                    self.flags.second_incoming_call_pending = false;
                }
            },
            IndicatorName::CallSetup => {
                if value == CALL_SETUP_INCOMING {
                    if self.flags.first_call_active {
                        self.flags.second_incoming_call_pending = true;
                    } else if !self.flags.in_band_ring {
                        self.notifications.push(Notification::RingAlert);
                    }
                } else if value == 0 {
                    self.flags.second_incoming_call_pending = false;
                }
            },
            IndicatorName::CallHeld => {
                self.flags.call_held = value > 0;
                self.flags.call_swap_pending = value == 1;
            },
            _ => {},
        }

        self.notifications.push(Notification::IndicatorChanged { name, value });
    }
}
