//! Outbound AT commands.

use std::fmt;

use serde::Serialize;

/// Parameter string for `AT+CMER`: mode 3, indicator reporting on
pub const CMER_PARAMS: &str = "3,0,0,1";

/// Command identity without parameters.
///
/// This is what the pending-command context records: the generic `OK`
/// and `ERROR` replies are resolved against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandKind {
    /// `AT+BRSF=<features>`
    Brsf,
    /// `AT+BAC=<codecs>`
    Bac,
    /// `AT+CIND=?`
    CindTest,
    /// `AT+CIND?`
    CindRead,
    /// `AT+CMER=3,0,0,1`
    Cmer,
    /// `AT+CHLD=?`
    ChldTest,
    /// `AT+BCC`
    Bcc,
    /// `AT+BCS=<codec>`
    Bcs,
}

impl CommandKind {
    /// All command kinds
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Brsf,
        CommandKind::Bac,
        CommandKind::CindTest,
        CommandKind::CindRead,
        CommandKind::Cmer,
        CommandKind::ChldTest,
        CommandKind::Bcc,
        CommandKind::Bcs,
    ];
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Brsf => "AT+BRSF",
            CommandKind::Bac => "AT+BAC",
            CommandKind::CindTest => "AT+CIND=?",
            CommandKind::CindRead => "AT+CIND?",
            CommandKind::Cmer => "AT+CMER",
            CommandKind::ChldTest => "AT+CHLD=?",
            CommandKind::Bcc => "AT+BCC",
            CommandKind::Bcs => "AT+BCS",
        };
        f.write_str(name)
    }
}

/// A fully rendered command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AtCommand {
    /// Supported features exchange
    Brsf(u16),
    /// Available codecs
    Bac(Vec<u8>),
    /// Indicator description request
    CindTest,
    /// Indicator value request
    CindRead,
    /// Indicator event reporting activation
    Cmer,
    /// Call hold capability query
    ChldTest,
    /// Codec connection request
    Bcc,
    /// Codec selection confirmation
    Bcs(u8),
}

impl AtCommand {
    /// Parameter-free identity
    pub fn kind(&self) -> CommandKind {
        match self {
            AtCommand::Brsf(_) => CommandKind::Brsf,
            AtCommand::Bac(_) => CommandKind::Bac,
            AtCommand::CindTest => CommandKind::CindTest,
            AtCommand::CindRead => CommandKind::CindRead,
            AtCommand::Cmer => CommandKind::Cmer,
            AtCommand::ChldTest => CommandKind::ChldTest,
            AtCommand::Bcc => CommandKind::Bcc,
            AtCommand::Bcs(_) => CommandKind::Bcs,
        }
    }

    /// Bytes to write on the control channel (CR terminated)
    pub fn to_wire(&self) -> Vec<u8> {
        format!("{self}\r").into_bytes()
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Brsf(features) => write!(f, "AT+BRSF={features}"),
            AtCommand::Bac(codecs) => {
                let list: Vec<String> = codecs.iter().map(ToString::to_string).collect();
                write!(f, "AT+BAC={}", list.join(","))
            },
            AtCommand::CindTest => f.write_str("AT+CIND=?"),
            AtCommand::CindRead => f.write_str("AT+CIND?"),
            AtCommand::Cmer => write!(f, "AT+CMER={CMER_PARAMS}"),
            AtCommand::ChldTest => f.write_str("AT+CHLD=?"),
            AtCommand::Bcc => f.write_str("AT+BCC"),
            AtCommand::Bcs(codec) => write!(f, "AT+BCS={codec}"),
        }
    }
}
