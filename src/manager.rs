//! Connection manager: one session per AG peer.
//!
//! Owns session lifecycle on behalf of the profile: creates a session on
//! each new connection, frames inbound bytes into lines, relays outbound
//! command bytes, and applies the SLC deadline policy. Sessions never
//! share state, so one peer misbehaving cannot affect another.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{HfpError, Result};
use crate::protocol::{BdAddr, ChannelHandle, Notification, ReleasedChannels, Session};
use crate::transport::LineBuffer;

/// Session entry with metadata
struct SessionEntry {
    /// The session
    session: Session,
    /// Line framer for the control channel
    framer: LineBuffer,
    /// When the control channel came up
    connected_at: Instant,
}

/// Manages active sessions
pub struct ConnectionManager {
    config: Config,
    sessions: HashMap<BdAddr, SessionEntry>,
    slc_timeout: Duration,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ConnectionManager {
    /// Create new connection manager
    pub fn new(config: Config) -> Self {
        let slc_timeout = config.connection.slc_timeout();
        Self {
            config,
            sessions: HashMap::new(),
            slc_timeout,
        }
    }

    /// Set SLC deadline
    pub fn with_slc_timeout(mut self, timeout: Duration) -> Self {
        self.slc_timeout = timeout;
        self
    }

    /// Handle a new control channel from `address`.
    ///
    /// Replaces any existing session for the same peer. Returns the bytes
    /// to write on the control channel and the channels released from a
    /// replaced session.
    pub fn new_connection(
        &mut self,
        address: BdAddr,
        control: ChannelHandle,
    ) -> Result<(Vec<u8>, ReleasedChannels)> {
        let replaced = self.disconnect(address);
        if !replaced.is_empty() {
            tracing::info!(peer = %address, "Replacing existing session on new connection");
        }

        let mut session = Session::new(&self.config);
        session.start(address, control)?;
        let out = wire(&mut session);

        self.sessions.insert(
            address,
            SessionEntry {
                session,
                framer: LineBuffer::new(self.config.connection.max_line_len),
                connected_at: Instant::now(),
            },
        );
        Ok((out, replaced))
    }

    /// Feed bytes received from `address`; returns bytes to send back.
    ///
    /// A fatal error aborts the session but leaves it registered with its
    /// channel handles; [`ConnectionManager::disconnect`] or
    /// [`ConnectionManager::expire_stalled`] hands them back.
    pub fn feed(&mut self, address: BdAddr, data: &[u8]) -> Result<Vec<u8>> {
        let entry = self.entry_mut(address)?;

        for line in entry.framer.push(data) {
            if let Err(e) = entry.session.process_line(&line) {
                if e.is_fatal() {
                    tracing::error!(peer = %address, error = %e, "Session reset");
                    entry.framer.clear();
                    return Err(e);
                }
                tracing::warn!(peer = %address, error = %e, "Line rejected");
            }
        }
        Ok(wire(&mut entry.session))
    }

    /// SCO link for `address` came up
    pub fn audio_connected(&mut self, address: BdAddr, audio: ChannelHandle) -> Result<Vec<u8>> {
        let entry = self.entry_mut(address)?;
        entry.session.audio_connected(audio)?;
        Ok(wire(&mut entry.session))
    }

    /// SCO link for `address` went down
    pub fn audio_disconnected(&mut self, address: BdAddr) -> Result<Vec<u8>> {
        let entry = self.entry_mut(address)?;
        entry.session.audio_disconnected()?;
        Ok(wire(&mut entry.session))
    }

    /// Drop the session for `address`.
    ///
    /// Idempotent: an unknown peer releases nothing.
    pub fn disconnect(&mut self, address: BdAddr) -> ReleasedChannels {
        match self.sessions.remove(&address) {
            Some(mut entry) => entry.session.disconnect(),
            None => ReleasedChannels::default(),
        }
    }

    /// Profile released: drop every session
    pub fn release(&mut self) -> Vec<(BdAddr, ReleasedChannels)> {
        let addresses: Vec<BdAddr> = self.sessions.keys().copied().collect();
        addresses
            .into_iter()
            .map(|address| (address, self.disconnect(address)))
            .collect()
    }

    /// Drop sessions whose SLC is still not established after the deadline
    pub fn expire_stalled(&mut self, now: Instant) -> Vec<(BdAddr, ReleasedChannels)> {
        let stalled: Vec<BdAddr> = self
            .sessions
            .iter()
            .filter(|(_, entry)| {
                !entry.session.is_slc_established()
                    && now.saturating_duration_since(entry.connected_at) > self.slc_timeout
            })
            .map(|(address, _)| *address)
            .collect();

        stalled
            .into_iter()
            .map(|address| {
                tracing::warn!(peer = %address, error = %HfpError::SlcTimeout, "Dropping stalled session");
                (address, self.disconnect(address))
            })
            .collect()
    }

    /// Session for `address`
    pub fn session(&self, address: BdAddr) -> Option<&Session> {
        self.sessions.get(&address).map(|entry| &entry.session)
    }

    /// Drain notifications for `address`
    pub fn take_notifications(&mut self, address: BdAddr) -> Vec<Notification> {
        self.sessions
            .get_mut(&address)
            .map(|entry| entry.session.take_notifications())
            .unwrap_or_default()
    }

    /// Get session count
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    fn entry_mut(&mut self, address: BdAddr) -> Result<&mut SessionEntry> {
        self.sessions
            .get_mut(&address)
            .ok_or_else(|| HfpError::SessionNotFound(address.to_string()))
    }
}

fn wire(session: &mut Session) -> Vec<u8> {
    session
        .take_outbound()
        .iter()
        .flat_map(crate::protocol::AtCommand::to_wire)
        .collect()
}
