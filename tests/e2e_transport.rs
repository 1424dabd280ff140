//! End-to-end transport tests.
//!
//! These tests run the async driver against a scripted AG on the other end
//! of an in-memory stream, not just the session in isolation.

use std::time::Duration;

use hfp::config::ConnectionConfig;
use hfp::protocol::{BdAddr, ChannelHandle, IndicatorName, Notification, Session, State};
use hfp::transport::drive;
use hfp::{Config, HfpError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::time::timeout;

const CIND_DESC: &str = "+CIND:(\"call\",(0,1)),(\"callsetup\",(0,3)),(\"service\",(0,1))";

fn peer() -> BdAddr {
    "00:1A:7D:DA:71:13".parse().unwrap()
}

/// Reply the AG gives to an HF command
fn ag_reply(command: &str) -> String {
    if command.starts_with("AT+BRSF=") {
        "\r\n+BRSF:607\r\n\r\nOK\r\n".to_string()
    } else if command == "AT+CIND=?" {
        format!("\r\n{CIND_DESC}\r\n\r\nOK\r\n")
    } else if command == "AT+CIND?" {
        "\r\n+CIND:0,0,1\r\n\r\nOK\r\n".to_string()
    } else if command.starts_with("AT+CMER=") {
        "\r\nOK\r\n\r\n+CIEV:2,0\r\n".to_string()
    } else {
        "\r\nERROR\r\n".to_string()
    }
}

/// Scripted AG: answers commands until CMER, then hangs up.
///
/// Returns the commands it received. With `byte_by_byte` every reply is
/// written one byte at a time.
async fn scripted_ag(stream: DuplexStream, byte_by_byte: bool) -> Vec<String> {
    let mut reader = BufReader::new(stream);
    let mut received = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\r', &mut buf).await.unwrap() == 0 {
            break;
        }
        let command = String::from_utf8_lossy(&buf).trim().to_string();
        let reply = ag_reply(&command);
        received.push(command.clone());

        let writer = reader.get_mut();
        if byte_by_byte {
            for byte in reply.as_bytes() {
                writer.write_all(std::slice::from_ref(byte)).await.unwrap();
            }
        } else {
            writer.write_all(reply.as_bytes()).await.unwrap();
        }

        if command.starts_with("AT+CMER=") {
            break;
        }
    }
    received
}

async fn run_slc(byte_by_byte: bool) {
    let (mut hf, ag) = tokio::io::duplex(1024);
    let ag = tokio::spawn(scripted_ag(ag, byte_by_byte));

    let mut session = Session::new(&Config::default());
    let released = timeout(
        Duration::from_secs(5),
        drive(
            &mut hf,
            &mut session,
            peer(),
            ChannelHandle(7),
            &ConnectionConfig::default(),
        ),
    )
    .await
    .expect("driver did not finish")
    .unwrap();

    let received = ag.await.unwrap();
    assert_eq!(received.len(), 4);
    assert!(received[0].starts_with("AT+BRSF="));
    assert_eq!(&received[1..], &["AT+CIND=?", "AT+CIND?", "AT+CMER=3,0,0,1"]);

    // AG hung up: channel handed back, session reset
    assert_eq!(released.control, Some(ChannelHandle(7)));
    assert_eq!(released.audio, None);
    assert_eq!(session.state(), State::Init);

    let notifications = session.take_notifications();
    assert!(notifications.contains(&Notification::SlcEstablished));
    assert!(notifications.contains(&Notification::IndicatorChanged {
        name: IndicatorName::Service,
        value: 0,
    }));
    assert_eq!(notifications.last(), Some(&Notification::Reset));
}

#[tokio::test]
async fn test_drive_establishes_slc() {
    run_slc(false).await;
}

#[tokio::test]
async fn test_drive_handles_fragmented_lines() {
    run_slc(true).await;
}

#[tokio::test]
async fn test_drive_times_out_silent_ag() {
    let (mut hf, ag) = tokio::io::duplex(1024);

    let config = ConnectionConfig {
        slc_timeout_secs: 1,
        ..ConnectionConfig::default()
    };
    let mut session = Session::new(&Config::default());

    let result = timeout(
        Duration::from_secs(5),
        drive(&mut hf, &mut session, peer(), ChannelHandle(7), &config),
    )
    .await
    .expect("driver ignored the SLC deadline");

    assert!(matches!(result, Err(HfpError::SlcTimeout)));
    assert_eq!(session.state(), State::Init);
    assert_eq!(session.pending(), None);

    // Channel handle comes back on disconnect
    assert_eq!(session.disconnect().control, Some(ChannelHandle(7)));

    // AG end stays open until the deadline fired
    drop(ag);
}
