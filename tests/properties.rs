//! Property-based tests for the protocol core.
//! Verifies invariants hold for arbitrary AG input, not just fixed transcripts.

use hfp::protocol::{
    classify, AgFeatures, CommandKind, FeatureNegotiator, HfFeatures, IndicatorName,
    IndicatorRegistry, Session, INDICATOR_UNSET,
};
use hfp::{ChannelHandle, Config};
use proptest::prelude::*;

/// `n` distinct indicator names
fn names(n: usize) -> Vec<IndicatorName> {
    (0..n)
        .map(|i| IndicatorName::Other(format!("ind{i}")))
        .collect()
}

fn pending_kind() -> impl Strategy<Value = Option<CommandKind>> {
    prop_oneof![
        Just(None),
        proptest::sample::select(CommandKind::ALL.to_vec()).prop_map(Some),
    ]
}

proptest! {
    /// Whatever names the AG lists, positions are exactly `0..len`.
    #[test]
    fn registry_positions_are_dense(order in Just((0..12usize).collect::<Vec<_>>()).prop_shuffle()) {
        let names = names(12);
        let mut registry = IndicatorRegistry::new();
        for (position, &pick) in order.iter().enumerate() {
            registry.register(names[pick].clone(), position).unwrap();
        }

        let positions: Vec<usize> = registry.iter().map(|i| i.position).collect();
        prop_assert_eq!(positions, (0..12).collect::<Vec<_>>());
        for (position, &pick) in order.iter().enumerate() {
            prop_assert_eq!(registry.position_of(&names[pick]), Some(position));
            prop_assert_eq!(registry.get(&names[pick]), INDICATOR_UNSET);
        }
    }

    /// Registering anywhere but the next free position always conflicts.
    #[test]
    fn registry_rejects_gaps(count in 0usize..8, skip in 1usize..8) {
        let mut registry = IndicatorRegistry::new();
        for (position, name) in names(count).into_iter().enumerate() {
            registry.register(name, position).unwrap();
        }

        let extra = IndicatorName::Other("extra".to_string());
        prop_assert!(registry.register(extra, count + skip).is_err());
        prop_assert_eq!(registry.len(), count);
    }

    /// A second registration at a taken position always conflicts.
    #[test]
    fn registry_rejects_duplicate_position(count in 1usize..10, pick in 0usize..10) {
        let pick = pick % count;
        let mut registry = IndicatorRegistry::new();
        for (position, name) in names(count).into_iter().enumerate() {
            registry.register(name, position).unwrap();
        }

        let extra = IndicatorName::Other("extra".to_string());
        prop_assert!(registry.register(extra, pick).is_err());
        prop_assert_eq!(registry.len(), count);
    }

    /// Set then get returns the value; unknown positions change nothing.
    #[test]
    fn registry_set_then_get(count in 1usize..8, position in 0usize..16, value in -1i32..10) {
        let names = names(count);
        let mut registry = IndicatorRegistry::new();
        for (i, name) in names.iter().enumerate() {
            registry.register(name.clone(), i).unwrap();
        }

        let known = registry.set_value(position, value);
        prop_assert_eq!(known, position < count);
        if known {
            prop_assert_eq!(registry.get(&names[position]), value);
        } else {
            prop_assert!(registry.iter().all(|i| i.value == INDICATOR_UNSET));
        }
    }

    /// Negotiation is a pure function of both bitmasks and the toggles.
    #[test]
    fn negotiation_is_deterministic(
        local in 0u16..0x100,
        ag in 0u32..0x400,
        codec in any::<bool>(),
        wideband in any::<bool>(),
    ) {
        let negotiator = FeatureNegotiator::new(HfFeatures::from_bits(local), codec, wideband);
        let a = negotiator.negotiate(AgFeatures::from_bits(ag));
        let b = negotiator.negotiate(AgFeatures::from_bits(ag));
        prop_assert_eq!(&a, &b);

        if a.codec_negotiation() {
            prop_assert!(codec);
            prop_assert!(AgFeatures::from_bits(ag).has(AgFeatures::CODEC_NEGOTIATION));
        }
        if !codec {
            prop_assert!(!a.local().has(HfFeatures::CODEC_NEGOTIATION));
        }
    }

    /// The classifier never panics, whatever the AG sends.
    #[test]
    fn classify_never_panics(line in "\\PC{0,64}", pending in pending_kind()) {
        let _ = classify(&line, pending);
    }

    /// Result-code-shaped garbage never panics the classifier either.
    #[test]
    fn classify_survives_malformed_results(
        head in prop_oneof![
            Just("+BRSF:"), Just("+CIND:"), Just("+CIEV:"), Just("+CHLD:"),
            Just("+BCS:"), Just("+BSIR:"), Just("+CCWA:"), Just("+CME ERROR:"),
        ],
        tail in "[-0-9a-z,()\" ]{0,24}",
        pending in pending_kind(),
    ) {
        let _ = classify(&format!("{head}{tail}"), pending);
    }

    /// A session fed arbitrary lines stays consistent and can always reset.
    #[test]
    fn session_survives_arbitrary_lines(lines in proptest::collection::vec("\\PC{0,32}", 0..20)) {
        let mut session = Session::new(&Config::default());
        session.start("00:00:00:00:00:01".parse().unwrap(), ChannelHandle(1)).unwrap();

        for line in &lines {
            let _ = session.process_line(line);
        }

        session.reset();
        prop_assert_eq!(session.snapshot(), Session::new(&Config::default()).snapshot());
    }
}
