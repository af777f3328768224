//! Iambic squeeze and paddle memory tests

use keyer_core::test_utils::SimulatedKeyer;
use keyer_core::Element;
use rstest::rstest;

/// Debounce delay between a raw press and the first key-down
const SETTLE: u32 = 10;

#[test]
fn test_squeeze_from_idle_alternates_dit_first() {
    let mut sim = SimulatedKeyer::paddles(1200);
    sim.set_dit(true);
    sim.set_dah(true);
    sim.run_for(1200);

    sim.set_dit(false);
    sim.set_dah(false);
    sim.run_for(400);

    let capture = sim.capture();
    println!("squeeze: {}", capture.to_morse_string(100));
    assert_eq!(capture.to_morse_string(100), ".-.-.");
    assert_eq!(capture.durations(), vec![100, 300, 100, 300, 100]);
    assert_eq!(capture.gaps(), vec![100, 100, 100, 100]);
    assert_eq!(capture.spans()[0].start_ms, SETTLE);
    assert!(!capture.is_open());
}

#[test]
fn test_dah_tap_during_dit_is_remembered() {
    let mut sim = SimulatedKeyer::paddles(1200);
    sim.set_dit(true);
    sim.run_for(40);

    // Brief dah tap while the dit sounds, released well before the gap
    sim.set_dah(true);
    sim.run_for(20);
    sim.set_dit(false);
    sim.run_for(10);
    sim.set_dah(false);
    sim.run_for(600);

    let capture = sim.capture();
    assert_eq!(capture.elements(100), vec![Element::Dit, Element::Dah]);
    assert_eq!(capture.spans()[1].start_ms, SETTLE + 200);
}

#[test]
fn test_dit_tap_during_dah_is_remembered() {
    let mut sim = SimulatedKeyer::paddles(1200);
    sim.set_dah(true);
    sim.run_for(100);
    sim.set_dit(true);
    sim.run_for(30);
    sim.set_dit(false);
    sim.set_dah(false);
    sim.run_for(600);

    assert_eq!(sim.capture().to_morse_string(100), "-.");
}

#[test]
fn test_held_dit_repeats() {
    let mut sim = SimulatedKeyer::paddles(1200);
    sim.set_dit(true);
    sim.run_for(500);
    sim.set_dit(false);
    sim.run_for(400);

    let capture = sim.capture();
    assert_eq!(capture.to_morse_string(100), "...");
    assert_eq!(capture.gaps(), vec![100, 100]);
}

#[test]
fn test_letter_k_by_paddle_timing() {
    // K = -.-
    let mut sim = SimulatedKeyer::paddles(1200);
    sim.set_dah(true);
    sim.run_for(50);
    sim.set_dit(true);
    sim.run_for(300);
    sim.set_dit(false);
    // Dit from memory starts at 410; dah still held for the next element
    sim.run_for(150);
    sim.set_dah(false);
    sim.run_for(800);

    assert_eq!(sim.capture().to_morse_string(100), "-.-");
}

#[rstest]
#[case::wpm_12(1200, 100)]
#[case::wpm_20(2000, 60)]
#[case::wpm_25(2500, 48)]
#[case::wpm_20_5(2050, 58)]
fn test_element_lengths_follow_speed(#[case] wpm: u16, #[case] dit_ms: u32) {
    let mut sim = SimulatedKeyer::paddles(wpm);
    assert_eq!(sim.dit_ms(), dit_ms);

    sim.set_dit(true);
    sim.set_dah(true);
    sim.run_for(SETTLE + 6 * dit_ms);
    sim.set_dit(false);
    sim.set_dah(false);
    sim.run_for(8 * dit_ms);

    let capture = sim.capture();
    let durations = capture.durations();
    assert_eq!(&durations[..2], &[dit_ms, 3 * dit_ms]);
    assert!(capture.gaps().iter().all(|gap| *gap == dit_ms));
}
