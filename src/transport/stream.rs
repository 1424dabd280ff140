//! Async driver running a session over a connected control channel.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};

use super::LineBuffer;
use crate::config::ConnectionConfig;
use crate::error::{HfpError, Result};
use crate::protocol::{BdAddr, ChannelHandle, ReleasedChannels, Session};

const READ_CHUNK: usize = 256;

/// Run `session` over `stream` until the AG disconnects.
///
/// Starts SLC establishment, writes every queued command and feeds every
/// received line into the session. If the SLC is not established within
/// `config.slc_timeout_secs` the session is aborted and
/// [`HfpError::SlcTimeout`] is returned. On EOF the session is torn down
/// and the released channel handles are returned.
///
/// On any error the session keeps its channel handles; release them with
/// [`Session::disconnect`].
pub async fn drive<S>(
    stream: &mut S,
    session: &mut Session,
    address: BdAddr,
    control: ChannelHandle,
    config: &ConnectionConfig,
) -> Result<ReleasedChannels>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framer = LineBuffer::new(config.max_line_len);
    let mut chunk = [0u8; READ_CHUNK];
    let deadline = Instant::now() + config.slc_timeout();

    session.start(address, control)?;
    flush(stream, session).await?;

    loop {
        let read = if session.is_slc_established() {
            stream.read(&mut chunk).await
        } else {
            match timeout_at(deadline, stream.read(&mut chunk)).await {
                Ok(read) => read,
                Err(_) => {
                    tracing::warn!(peer = %address, session = %session.id(), "SLC establishment timed out");
                    session.abort();
                    return Err(HfpError::SlcTimeout);
                },
            }
        };

        let n = match read {
            Ok(0) => {
                tracing::info!(peer = %address, "Control channel closed by AG");
                return Ok(session.disconnect());
            },
            Ok(n) => n,
            Err(e) => {
                tracing::error!(peer = %address, error = %e, "Control channel read failed");
                session.abort();
                return Err(HfpError::Transport(e.to_string()));
            },
        };

        for line in framer.push(&chunk[..n]) {
            if let Err(e) = session.process_line(&line) {
                if e.is_fatal() {
                    return Err(e);
                }
                tracing::warn!(peer = %address, error = %e, "Line rejected");
            }
        }
        flush(stream, session).await?;
    }
}

async fn flush<S>(stream: &mut S, session: &mut Session) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    for command in session.take_outbound() {
        if let Err(e) = stream.write_all(&command.to_wire()).await {
            session.abort();
            return Err(HfpError::Transport(e.to_string()));
        }
    }
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const CIND_DESC: &[u8] = b"\r\n+CIND:(\"call\",(0,1)),(\"callsetup\",(0,3)),(\"service\",(0,1))\r\n\r\nOK\r\n";

    #[tokio::test]
    async fn test_drive_exact_wire_exchange() {
        let mut ag = tokio_test::io::Builder::new()
            .write(b"AT+BRSF=61\r")
            .read(b"\r\n+BRSF:607\r\n\r\nOK\r\n")
            .write(b"AT+CIND=?\r")
            .read(CIND_DESC)
            .write(b"AT+CIND?\r")
            .read(b"\r\n+CIND:0,0,1\r\n\r\nOK\r\n")
            .write(b"AT+CMER=3,0,0,1\r")
            .read(b"\r\nOK\r\n")
            .build();

        let config = Config::default();
        let mut session = Session::new(&config);
        let released = drive(
            &mut ag,
            &mut session,
            BdAddr::new([0, 0, 0, 0, 0, 1]),
            ChannelHandle(4),
            &config.connection,
        )
        .await
        .unwrap();

        assert_eq!(released.control, Some(ChannelHandle(4)));
        assert_eq!(session.stats().commands_sent, 4);
    }
}
