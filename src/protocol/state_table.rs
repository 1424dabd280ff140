//! Static SLC / audio transition table.
//!
//! Every `(state, event)` pair the engine reacts to is listed here exactly
//! once. A transition names the next state, an optional handler and an
//! optional outbound command. Some commands are only valid for certain
//! negotiated features (`AT+BAC` needs codec negotiation, `AT+CHLD=?`
//! needs call hold); when the session rejects `command` it tries
//! `fallback` instead, and when both are rejected nothing is sent.
//!
//! Unsolicited AG notifications (`+CIEV`, `RING`, `+BSIR`, ...) do not
//! appear here: once the SLC is up they are handled in every state
//! without changing it, see [`side_handler`].

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use serde::Serialize;

use super::command::CommandKind;
use super::token::EventKind;

/// Session protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum State {
    /// Fresh session, control channel not yet driven
    Init,
    /// Feature, codec and indicator exchange in progress
    EstablishingSlc,
    /// SLC up, waiting for the SCO link
    EstablishingAudio,
    /// SCO link up
    AudioConnected,
}

impl State {
    /// All states
    pub const ALL: [State; 4] = [
        State::Init,
        State::EstablishingSlc,
        State::EstablishingAudio,
        State::AudioConnected,
    ];
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Per-event handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Handler {
    /// Record the AG bitmask from `+BRSF`
    StoreAgFeatures,
    /// Derive the session feature set
    NegotiateFeatures,
    /// Register indicators in declared order
    RegisterIndicators,
    /// Apply bulk indicator values
    SetIndicatorValues,
    /// Mark the SLC established
    SlcEstablished,
    /// Record supported call-hold actions
    StoreCallHold,
    /// Record the codec the AG selected
    SelectCodec,
    /// Codec selection acknowledged
    CodecConfirmed,
    /// SCO link established
    AudioUp,
    /// SCO link lost
    AudioDown,
    /// `+CIEV` indicator update
    UpdateIndicator,
    /// `RING`. Always runs once the SLC is up; the local ring alert is the
    /// `RingAlert` notification it raises only while in-band ring is off.
    Ring,
    /// `+BSIR` in-band ring toggle
    InBandRing,
    /// `+BVRA` voice recognition state
    VoiceRecognition,
    /// `+BTRH` response-and-hold state
    ResponseHold,
    /// `+CCWA` waiting call
    CallWaiting,
}

/// One table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State after the event
    pub next: State,
    /// Handler to run
    pub handler: Option<Handler>,
    /// Command to send
    pub command: Option<CommandKind>,
    /// Command to send when `command` is not valid for the session
    pub fallback: Option<CommandKind>,
}

impl Transition {
    const fn to(next: State) -> Self {
        Self {
            next,
            handler: None,
            command: None,
            fallback: None,
        }
    }

    const fn run(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    const fn send(mut self, command: CommandKind) -> Self {
        self.command = Some(command);
        self
    }

    const fn or_send(mut self, command: CommandKind) -> Self {
        self.fallback = Some(command);
        self
    }
}

lazy_static! {
    /// The transition table
    pub static ref TRANSITIONS: HashMap<(State, EventKind), Transition> = build_table();
}

fn build_table() -> HashMap<(State, EventKind), Transition> {
    use CommandKind as C;
    use EventKind as E;
    use State::{AudioConnected, EstablishingAudio, EstablishingSlc, Init};

    let entries = [
        // SLC establishment
        ((Init, E::Connected), Transition::to(EstablishingSlc).send(C::Brsf)),
        (
            (EstablishingSlc, E::BrsfReport),
            Transition::to(EstablishingSlc).run(Handler::StoreAgFeatures),
        ),
        (
            (EstablishingSlc, E::Ack(C::Brsf)),
            Transition::to(EstablishingSlc)
                .run(Handler::NegotiateFeatures)
                .send(C::Bac)
                .or_send(C::CindTest),
        ),
        ((EstablishingSlc, E::Ack(C::Bac)), Transition::to(EstablishingSlc).send(C::CindTest)),
        (
            (EstablishingSlc, E::CindList),
            Transition::to(EstablishingSlc).run(Handler::RegisterIndicators),
        ),
        ((EstablishingSlc, E::Ack(C::CindTest)), Transition::to(EstablishingSlc).send(C::CindRead)),
        (
            (EstablishingSlc, E::CindValues),
            Transition::to(EstablishingSlc).run(Handler::SetIndicatorValues),
        ),
        ((EstablishingSlc, E::Ack(C::CindRead)), Transition::to(EstablishingSlc).send(C::Cmer)),
        (
            (EstablishingSlc, E::Ack(C::Cmer)),
            Transition::to(EstablishingAudio)
                .run(Handler::SlcEstablished)
                .send(C::ChldTest)
                .or_send(C::Bcc),
        ),
        // Post-SLC setup and codec connection
        (
            (EstablishingAudio, E::ChldList),
            Transition::to(EstablishingAudio).run(Handler::StoreCallHold),
        ),
        ((EstablishingAudio, E::Ack(C::ChldTest)), Transition::to(EstablishingAudio).send(C::Bcc)),
        ((EstablishingAudio, E::Nack(C::ChldTest)), Transition::to(EstablishingAudio).send(C::Bcc)),
        ((EstablishingAudio, E::Ack(C::Bcc)), Transition::to(EstablishingAudio)),
        ((EstablishingAudio, E::Ack(C::Bac)), Transition::to(EstablishingAudio)),
        (
            (EstablishingAudio, E::Bcs),
            Transition::to(EstablishingAudio)
                .run(Handler::SelectCodec)
                .send(C::Bcs)
                .or_send(C::Bac),
        ),
        (
            (EstablishingAudio, E::Ack(C::Bcs)),
            Transition::to(EstablishingAudio).run(Handler::CodecConfirmed),
        ),
        ((EstablishingAudio, E::Nack(C::Bcs)), Transition::to(EstablishingAudio).send(C::Bac)),
        (
            (EstablishingAudio, E::AudioConnected),
            Transition::to(AudioConnected).run(Handler::AudioUp),
        ),
        // Connected audio
        (
            (AudioConnected, E::AudioDisconnected),
            Transition::to(EstablishingAudio).run(Handler::AudioDown),
        ),
        (
            (AudioConnected, E::Bcs),
            Transition::to(AudioConnected)
                .run(Handler::SelectCodec)
                .send(C::Bcs)
                .or_send(C::Bac),
        ),
        (
            (AudioConnected, E::Ack(C::Bcs)),
            Transition::to(AudioConnected).run(Handler::CodecConfirmed),
        ),
        ((AudioConnected, E::Nack(C::Bcs)), Transition::to(AudioConnected).send(C::Bac)),
        ((AudioConnected, E::Ack(C::Bac)), Transition::to(AudioConnected)),
    ];

    entries.into_iter().collect()
}

/// Look up the transition for `(state, event)`
pub fn transition(state: State, event: EventKind) -> Option<&'static Transition> {
    TRANSITIONS.get(&(state, event))
}

/// Handler for an unsolicited event, valid in any state once the SLC is up
pub fn side_handler(event: EventKind) -> Option<Handler> {
    match event {
        EventKind::Ciev => Some(Handler::UpdateIndicator),
        EventKind::Ring => Some(Handler::Ring),
        EventKind::Bsir => Some(Handler::InBandRing),
        EventKind::Bvra => Some(Handler::VoiceRecognition),
        EventKind::Btrh => Some(Handler::ResponseHold),
        EventKind::CallWaiting => Some(Handler::CallWaiting),
        _ => None,
    }
}
