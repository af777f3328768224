//! Key mode, input bias and reconfiguration behaviour

use keyer_core::codec::encode_config;
use keyer_core::hal::mock::HalEvent;
use keyer_core::sysex::build_frame;
use keyer_core::test_utils::SimulatedKeyer;
use keyer_core::{Command, InputMode, KeyMode, OutputMode, OutputPhase, Settings};
use rstest::rstest;

#[rstest]
#[case::pull_up(InputMode::PullUp)]
#[case::pull_down(InputMode::PullDown)]
#[case::floating(InputMode::Floating)]
fn test_straight_key_mirrors_key(#[case] input_mode: InputMode) {
    let mut sim = SimulatedKeyer::new(Settings {
        key_mode: KeyMode::StraightKey,
        input_mode,
        ..Settings::default()
    });

    sim.run_for(50);
    sim.set_straight(true);
    sim.run_for(250);
    sim.set_straight(false);
    sim.run_for(50);

    let capture = sim.capture();
    assert_eq!(capture.spans().len(), 1);
    assert_eq!(capture.spans()[0].start_ms, 60);
    assert_eq!(capture.durations(), vec![250]);
}

#[test]
fn test_straight_key_has_no_gap_phase() {
    let mut sim = SimulatedKeyer::straight_key();
    sim.set_straight(true);
    sim.run_for(30);
    sim.set_straight(false);
    sim.run_for(15);
    assert_eq!(sim.keyer().phase(), OutputPhase::Idle);

    // Re-key immediately; a paddle keyer would still be in its gap
    sim.set_straight(true);
    sim.run_for(15);
    assert_eq!(sim.capture().spans().len(), 1);
    assert!(sim.capture().is_open());
    assert_eq!(sim.capture().gaps(), Vec::<u32>::new());
}

#[test]
fn test_disabled_key_mode_ignores_everything() {
    let mut sim = SimulatedKeyer::new(Settings::default());
    sim.set_dit(true);
    sim.set_dah(true);
    sim.run_for(1000);
    assert!(sim.capture().spans().is_empty());
}

#[test]
fn test_zero_wpm_is_clamped() {
    let sim = SimulatedKeyer::paddles(0);
    assert_eq!(sim.dit_ms(), 120_000);
}

#[test]
fn test_reconfigure_mid_element_cuts_output() {
    let mut sim = SimulatedKeyer::paddles(1200);
    sim.set_dah(true);
    sim.run_for(100);
    assert!(sim.keyer().is_keyed());

    let straight = Settings {
        key_mode: KeyMode::StraightKey,
        output_mode: OutputMode::Normal,
        ..Settings::default()
    };
    let frame = build_frame(Command::SetConfig, &encode_config(&straight).unwrap()).unwrap();
    assert_eq!(sim.keyer_mut().handle_sysex(&frame), Ok(Command::SetConfig));

    let capture = sim.capture();
    assert!(!capture.is_open());
    assert_eq!(capture.durations(), vec![90]);
    assert_eq!(sim.keyer().settings().key_mode, KeyMode::StraightKey);

    // Pin 3 is the dit paddle and the straight key; the dah paddle on 29 is dropped
    let events = sim.hal().events();
    assert!(events.iter().any(|e| e.event
        == HalEvent::PinConfigured {
            pin: 29,
            role: keyer_core::PinRole::RELEASED,
        }));
    assert_eq!(sim.hal().role(29), Some(keyer_core::PinRole::RELEASED));
    assert_eq!(sim.hal().role(2), Some(keyer_core::PinRole::Output));
}

#[test]
fn test_velocity_and_channel_from_settings() {
    let mut sim = SimulatedKeyer::new(Settings {
        key_mode: KeyMode::StraightKey,
        channel: 10,
        note: 64,
        volume: 90,
        ..Settings::default()
    });
    sim.set_straight(true);
    sim.run_for(20);

    let note_on = sim
        .hal()
        .note_events()
        .into_iter()
        .next()
        .map(|e| e.event);
    match note_on {
        Some(HalEvent::NoteOn { address, velocity }) => {
            assert_eq!(address.channel, 9);
            assert_eq!(address.note, 64);
            assert_eq!(address.cable, 0);
            assert_eq!(velocity, 90);
        }
        other => panic!("expected note-on, got {:?}", other),
    }
}
