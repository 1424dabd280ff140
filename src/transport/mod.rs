//! Control channel plumbing.
//!
//! The engine never owns a socket. It consumes an already connected,
//! ordered byte stream (RFCOMM in practice) and produces AT command bytes
//! for the same stream:
//!
//! ```text
//! ┌───────────────────────────┐
//! │   RFCOMM byte stream      │
//! └────────────┬──────────────┘
//!              │ bytes
//!              ▼
//! ┌───────────────────────────┐
//! │  LineBuffer (CR/LF split) │
//! └────────────┬──────────────┘
//!              │ lines
//!              ▼
//! ┌───────────────────────────┐
//! │  Session (classify +      │
//! │  state table + handlers)  │
//! └────────────┬──────────────┘
//!              │ AT commands
//!              ▼
//!        back to the stream
//! ```
//!
//! [`drive`] does all of this for any tokio `AsyncRead + AsyncWrite`
//! stream, including the SLC deadline.

mod line;
mod stream;

pub use line::LineBuffer;
pub use stream::drive;
