//! CR/LF line framing for the control channel.

use bytes::{Buf, BytesMut};

/// Accumulates transport bytes and yields complete lines.
///
/// AG responses are framed as `\r\n<line>\r\n`; any run of CR or LF
/// delimits a line and empty lines are skipped. A line longer than
/// `max_line_len` is dropped up to its next delimiter.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    max_line_len: usize,
    overflowed: bool,
}

impl LineBuffer {
    /// Create a buffer accepting lines up to `max_line_len` bytes
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_line_len),
            max_line_len,
            overflowed: false,
        }
    }

    /// Append `data` and return every line it completes
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(data);
        let mut lines = Vec::new();

        while let Some(end) = self.buf.iter().position(|b| *b == b'\r' || *b == b'\n') {
            let raw = self.buf.split_to(end);
            self.buf.advance(1);

            if self.overflowed || raw.len() > self.max_line_len {
                if !self.overflowed {
                    tracing::warn!(len = raw.len(), max = self.max_line_len, "Overlong line discarded");
                }
                self.overflowed = false;
                continue;
            }
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        if self.buf.len() > self.max_line_len {
            tracing::warn!(len = self.buf.len(), max = self.max_line_len, "Overlong line discarded");
            self.buf.clear();
            self.overflowed = true;
        }

        lines
    }

    /// Bytes held for an incomplete line
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial line
    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_crlf() {
        let mut framer = LineBuffer::new(64);
        let lines = framer.push(b"\r\n+BRSF: 607\r\n\r\nOK\r\n");
        assert_eq!(lines, vec!["+BRSF: 607", "OK"]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_partial_lines_across_chunks() {
        let mut framer = LineBuffer::new(64);
        assert!(framer.push(b"\r\n+CIE").is_empty());
        assert_eq!(framer.pending_len(), 4);
        assert_eq!(framer.push(b"V:2,1\r\nRI"), vec!["+CIEV:2,1"]);
        assert_eq!(framer.push(b"NG\r"), vec!["RING"]);
    }

    #[test]
    fn test_overlong_line_dropped() {
        let mut framer = LineBuffer::new(8);
        assert!(framer.push(b"+CIND:(\"call\",(0,1))").is_empty());
        assert_eq!(framer.pending_len(), 0);
        // Remainder of the overlong line, then a normal one
        assert_eq!(framer.push(b",(\"x\")\r\nOK\r\n"), vec!["OK"]);
    }

    #[test]
    fn test_complete_overlong_line_dropped() {
        let mut framer = LineBuffer::new(8);
        assert_eq!(framer.push(b"\r\n+CIEV:12345678\r\nOK\r\n"), vec!["OK"]);
    }
}
