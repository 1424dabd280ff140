//! End-to-end session tests.
//!
//! These tests drive a session with real AG transcripts, line by line,
//! and verify SLC establishment, indicator tracking, codec confirmation
//! and teardown beyond the unit test level.

use hfp::protocol::{
    AtCommand, BdAddr, ChannelHandle, CommandKind, Handler, IndicatorName, Notification, Session,
    State,
};
use hfp::Config;

const CIND_DESC: &str = r#"+CIND:("call",(0,1)),("callsetup",(0,3)),("service",(0,1))"#;

/// AG replies for a full SLC without codec negotiation
const SLC_TRANSCRIPT: [&str; 7] = ["+BRSF:607", "OK", CIND_DESC, "OK", "+CIND:0,0,1", "OK", "OK"];

fn peer() -> BdAddr {
    "00:1A:7D:DA:71:13".parse().unwrap()
}

fn feed(session: &mut Session, lines: &[&str]) -> Vec<AtCommand> {
    let mut sent = Vec::new();
    for line in lines {
        session.process_line(line).unwrap();
        sent.extend(session.take_outbound());
    }
    sent
}

/// Session with the SLC established (scenario A)
fn connected(config: &Config) -> Session {
    let mut session = Session::new(config);
    session.start(peer(), ChannelHandle(1)).unwrap();
    session.take_outbound();
    feed(&mut session, &SLC_TRANSCRIPT);
    session
}

/// Full SLC exchange ends with indicators mapped and audio pending
#[test]
fn test_slc_establishment() {
    let mut session = Session::new(&Config::default());
    session.start(peer(), ChannelHandle(1)).unwrap();

    let mut sent = session.take_outbound();
    sent.extend(feed(&mut session, &SLC_TRANSCRIPT));

    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].kind(), CommandKind::Brsf);
    assert_eq!(&sent[1..], &[AtCommand::CindTest, AtCommand::CindRead, AtCommand::Cmer]);
    assert_eq!(sent[3].to_string(), "AT+CMER=3,0,0,1");

    assert!(session.is_slc_established());
    assert_eq!(session.state(), State::EstablishingAudio);
    assert_eq!(session.pending(), None);

    let indicators = session.indicators();
    assert_eq!(indicators.get(&IndicatorName::Call), 0);
    assert_eq!(indicators.get(&IndicatorName::CallSetup), 0);
    assert_eq!(indicators.get(&IndicatorName::Service), 1);

    assert!(session.take_notifications().contains(&Notification::SlcEstablished));
}

/// +CIEV updates the mapped indicator and leaves the state alone
#[test]
fn test_indicator_event_after_slc() {
    let mut session = connected(&Config::default());
    session.process_line("+CIEV:2,0").unwrap();
    assert_eq!(session.indicators().get(&IndicatorName::Service), 0);

    let handler = session.process_line("+CIEV:2,1").unwrap();

    assert_eq!(handler, Some(Handler::UpdateIndicator));
    assert_eq!(session.indicators().get(&IndicatorName::Service), 1);
    assert_eq!(session.state(), State::EstablishingAudio);
}

/// AG codec selection is confirmed, then the SCO link completes audio
#[test]
fn test_codec_selection_and_audio() {
    let mut session = connected(&Config::default());

    let sent = feed(&mut session, &["+BCS:2"]);
    assert_eq!(sent, vec![AtCommand::Bcs(2)]);
    assert_eq!(sent[0].to_wire(), b"AT+BCS=2\r".to_vec());

    session.process_line("OK").unwrap();
    assert_eq!(session.selected_codec(), Some(2));
    assert!(session.take_notifications().contains(&Notification::CodecSelected(2)));

    session.audio_connected(ChannelHandle(2)).unwrap();
    assert_eq!(session.state(), State::AudioConnected);
    assert!(session.flags().sco_established);

    session.audio_disconnected().unwrap();
    assert_eq!(session.state(), State::EstablishingAudio);
    assert!(!session.flags().sco_established);
}

/// RING only raises a local alert when the AG is not ringing in-band
#[test]
fn test_ring_alert_follows_in_band_ring() {
    let mut in_band = connected(&Config::default());
    assert!(in_band.flags().in_band_ring);
    in_band.take_notifications();

    assert_eq!(in_band.process_line("RING").unwrap(), Some(Handler::Ring));
    assert!(!in_band.take_notifications().contains(&Notification::RingAlert));

    let mut config = Config::default();
    config.hands_free.in_band_ring = false;
    let mut local = connected(&config);
    assert!(!local.flags().in_band_ring);
    local.take_notifications();

    assert_eq!(local.process_line("RING").unwrap(), Some(Handler::Ring));
    assert_eq!(local.take_notifications(), vec![Notification::RingAlert]);
}

/// AG turning in-band ring off at runtime restores the local alert
#[test]
fn test_bsir_toggles_ring_alert() {
    let mut session = connected(&Config::default());
    session.process_line("+BSIR:0").unwrap();
    session.take_notifications();

    session.process_line("RING").unwrap();
    assert_eq!(session.take_notifications(), vec![Notification::RingAlert]);
}

/// Disconnect at any point of the exchange leaves a fresh session behind
#[test]
fn test_disconnect_mid_sequence_resets() {
    let fresh = Session::new(&Config::default()).snapshot();

    for cut in 0..=SLC_TRANSCRIPT.len() {
        let mut session = Session::new(&Config::default());
        session.start(peer(), ChannelHandle(1)).unwrap();
        feed(&mut session, &SLC_TRANSCRIPT[..cut]);

        let released = session.disconnect();
        assert_eq!(released.control, Some(ChannelHandle(1)), "cut at {cut}");

        session.reset();
        assert_eq!(session.snapshot(), fresh, "cut at {cut}");
        assert!(session.indicators().is_empty());
        assert_eq!(session.pending(), None);
    }
}

/// Disconnect with audio up releases both channels
#[test]
fn test_disconnect_releases_audio() {
    let mut session = connected(&Config::default());
    session.audio_connected(ChannelHandle(2)).unwrap();

    let released = session.disconnect();
    assert_eq!(released.control, Some(ChannelHandle(1)));
    assert_eq!(released.audio, Some(ChannelHandle(2)));
    assert_eq!(session.state(), State::Init);
    assert!(session.take_notifications().contains(&Notification::Reset));
}

/// A reset session can run a second SLC
#[test]
fn test_session_reusable_after_reset() {
    let mut session = connected(&Config::default());
    session.reset();

    session.start(peer(), ChannelHandle(5)).unwrap();
    session.take_outbound();
    feed(&mut session, &SLC_TRANSCRIPT);
    assert!(session.is_slc_established());
    assert_eq!(session.indicators().len(), 3);
}

/// Stray and unknown lines never disturb the exchange
#[test]
fn test_noise_is_discarded() {
    let mut session = Session::new(&Config::default());
    session.start(peer(), ChannelHandle(1)).unwrap();
    session.take_outbound();

    let noisy = [
        "+BRSF:607",
        "+XAPL=iPhone,2",
        "OK",
        "RING",
        CIND_DESC,
        "OK",
        "+CIND:0,0,1",
        "OK",
        "OK",
    ];
    feed(&mut session, &noisy);

    assert!(session.is_slc_established());
    assert_eq!(session.stats().events_discarded, 2);
}

/// Codec negotiation adds AT+BAC and AT+BCC to the exchange
#[test]
fn test_codec_negotiation_exchange() {
    let mut config = Config::default();
    config.hands_free.codec_negotiation = true;

    let mut session = Session::new(&config);
    session.start(peer(), ChannelHandle(1)).unwrap();
    let brsf = session.take_outbound();
    assert_eq!(brsf.len(), 1);

    let sent = feed(
        &mut session,
        &["+BRSF:607", "OK", "OK", CIND_DESC, "OK", "+CIND:0,0,1", "OK", "OK", "OK"],
    );
    assert_eq!(
        sent,
        vec![
            AtCommand::Bac(vec![1, 2]),
            AtCommand::CindTest,
            AtCommand::CindRead,
            AtCommand::Cmer,
            AtCommand::Bcc,
        ]
    );
    assert_eq!(sent[0].to_string(), "AT+BAC=1,2");
    assert!(session.features().unwrap().codec_negotiation());
}
