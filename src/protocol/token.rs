//! Token classifier: received AG lines to protocol events.
//!
//! A line is split at its first `:` into a head (`+CIND`, `OK`, `RING`,
//! ...) and a payload. The head is looked up in [`EVENT_MAP`]; several
//! heads may alias one token (`ERROR`, `+CME ERROR`, `NO CARRIER`).
//!
//! Two tokens cannot be resolved from text alone:
//!
//! | Token        | Pending command | Event              |
//! |--------------|-----------------|--------------------|
//! | `OK`         | any `X`         | `Ack(X)`           |
//! | `ERROR` etc. | any `X`         | `Nack(X)`          |
//! | `+CIND:`     | `AT+CIND=?`     | `CindList`         |
//! | `+CIND:`     | `AT+CIND?`      | `CindValues`       |
//!
//! Without a matching pending command these lines are not recognized.

use std::fmt;

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;
use serde::Serialize;

use super::command::CommandKind;
use super::indicators::IndicatorName;

/// Textual token classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `+BRSF:`
    Brsf,
    /// `+CIND:`
    Cind,
    /// `+CHLD:`
    Chld,
    /// `+CIEV:`
    Ciev,
    /// `+BSIR:`
    Bsir,
    /// `+BVRA:`
    Bvra,
    /// `+BTRH:`
    Btrh,
    /// `+BCS:`
    Bcs,
    /// `+CCWA:`
    Ccwa,
    /// `RING`
    Ring,
    /// Generic acknowledgement
    Ok,
    /// Generic failure
    Error,
}

/// Line head → token
pub static EVENT_MAP: phf::Map<&'static str, Token> = phf_map! {
    "+BRSF" => Token::Brsf,
    "+CIND" => Token::Cind,
    "+CHLD" => Token::Chld,
    "+CIEV" => Token::Ciev,
    "+BSIR" => Token::Bsir,
    "+BVRA" => Token::Bvra,
    "+BTRH" => Token::Btrh,
    "+BCS" => Token::Bcs,
    "+CCWA" => Token::Ccwa,
    "RING" => Token::Ring,
    "OK" => Token::Ok,
    "ERROR" => Token::Error,
    "+CME ERROR" => Token::Error,
    "NO CARRIER" => Token::Error,
    "BUSY" => Token::Error,
    "NO ANSWER" => Token::Error,
};

lazy_static! {
    /// One `("label",(range))` entry of a `+CIND:` description list
    static ref CIND_ENTRY: Regex =
        Regex::new(r#"\(\s*"([^"]+)"\s*,\s*\(([^)]*)\)\s*\)"#).expect("valid regex");
}

/// Protocol events consumed by the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Event {
    /// Control channel came up
    Connected,
    /// `+BRSF:<bitmask>`
    BrsfReport(u32),
    /// `OK` resolved against the pending command
    Ack(CommandKind),
    /// `ERROR`-class reply resolved against the pending command
    Nack(CommandKind),
    /// `+CIND:` description list, in AG order
    CindList(Vec<IndicatorName>),
    /// `+CIND:` value list, in AG order
    CindValues(Vec<i32>),
    /// `+CHLD:` supported call-hold actions
    ChldList(Vec<String>),
    /// `+CIEV:<index>,<value>`
    Ciev {
        /// Indicator index as sent by the AG
        index: usize,
        /// New value
        value: i32,
    },
    /// `RING`
    Ring,
    /// `+BSIR:<0|1>`
    Bsir(bool),
    /// `+BVRA:<0|1>`
    Bvra(bool),
    /// `+BTRH:<n>`
    Btrh(u8),
    /// `+BCS:<codec>`
    Bcs(u8),
    /// `+CCWA:<number>,...`
    CallWaiting(String),
    /// SCO link established by the transport
    AudioConnected,
    /// SCO link lost
    AudioDisconnected,
}

/// Payload-free event identity used as transition-table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(missing_docs)]
pub enum EventKind {
    Connected,
    BrsfReport,
    Ack(CommandKind),
    Nack(CommandKind),
    CindList,
    CindValues,
    ChldList,
    Ciev,
    Ring,
    Bsir,
    Bvra,
    Btrh,
    Bcs,
    CallWaiting,
    AudioConnected,
    AudioDisconnected,
}

impl Event {
    /// Table key for this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connected => EventKind::Connected,
            Event::BrsfReport(_) => EventKind::BrsfReport,
            Event::Ack(cmd) => EventKind::Ack(*cmd),
            Event::Nack(cmd) => EventKind::Nack(*cmd),
            Event::CindList(_) => EventKind::CindList,
            Event::CindValues(_) => EventKind::CindValues,
            Event::ChldList(_) => EventKind::ChldList,
            Event::Ciev { .. } => EventKind::Ciev,
            Event::Ring => EventKind::Ring,
            Event::Bsir(_) => EventKind::Bsir,
            Event::Bvra(_) => EventKind::Bvra,
            Event::Btrh(_) => EventKind::Btrh,
            Event::Bcs(_) => EventKind::Bcs,
            Event::CallWaiting(_) => EventKind::CallWaiting,
            Event::AudioConnected => EventKind::AudioConnected,
            Event::AudioDisconnected => EventKind::AudioDisconnected,
        }
    }
}

impl EventKind {
    /// Unsolicited AG notifications, handled in any state once the SLC is up
    pub fn is_unsolicited(&self) -> bool {
        matches!(
            self,
            EventKind::Ciev
                | EventKind::Ring
                | EventKind::Bsir
                | EventKind::Bvra
                | EventKind::Btrh
                | EventKind::CallWaiting
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Ack(cmd) => write!(f, "OK({cmd})"),
            EventKind::Nack(cmd) => write!(f, "ERROR({cmd})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Classify one received line.
///
/// `pending` is the command currently awaiting its final result code.
/// Returns `None` for empty, unknown or malformed lines.
pub fn classify(line: &str, pending: Option<CommandKind>) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (head, payload) = match line.split_once(':') {
        Some((head, payload)) => (head.trim(), payload.trim()),
        None => (line, ""),
    };
    let token = *EVENT_MAP.get(head)?;

    match token {
        Token::Ok => pending.map(Event::Ack),
        Token::Error => pending.map(Event::Nack),
        Token::Ring => Some(Event::Ring),
        Token::Brsf => payload.parse().ok().map(Event::BrsfReport),
        Token::Cind => match pending? {
            CommandKind::CindTest => parse_cind_list(payload).map(Event::CindList),
            CommandKind::CindRead => parse_int_list(payload).map(Event::CindValues),
            _ => None,
        },
        Token::Chld => parse_chld_list(payload).map(Event::ChldList),
        Token::Ciev => {
            let (index, value) = payload.split_once(',')?;
            Some(Event::Ciev {
                index: index.trim().parse().ok()?,
                value: value.trim().parse().ok()?,
            })
        },
        Token::Bsir => parse_flag(payload).map(Event::Bsir),
        Token::Bvra => parse_flag(first_field(payload)).map(Event::Bvra),
        Token::Btrh => payload.parse().ok().map(Event::Btrh),
        Token::Bcs => payload.parse().ok().map(Event::Bcs),
        Token::Ccwa => {
            let number = first_field(payload).trim_matches('"');
            Some(Event::CallWaiting(number.to_string()))
        },
    }
}

fn first_field(payload: &str) -> &str {
    payload.split(',').next().unwrap_or("").trim()
}

fn parse_flag(payload: &str) -> Option<bool> {
    match payload {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

/// `("call",(0,1)),("callsetup",(0-3)),...` → names in declared order
fn parse_cind_list(payload: &str) -> Option<Vec<IndicatorName>> {
    let names: Vec<IndicatorName> = CIND_ENTRY
        .captures_iter(payload)
        .map(|cap| IndicatorName::from_label(&cap[1]))
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

fn parse_int_list(payload: &str) -> Option<Vec<i32>> {
    payload
        .split(',')
        .map(|v| v.trim().parse().ok())
        .collect()
}

/// `(0,1,1x,2,2x,3,4)` → `["0", "1", "1x", ...]`
fn parse_chld_list(payload: &str) -> Option<Vec<String>> {
    let inner = payload.trim().trim_start_matches('(').trim_end_matches(')');
    let actions: Vec<String> = inner
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(ToString::to_string)
        .collect();

    if actions.is_empty() {
        None
    } else {
        Some(actions)
    }
}
