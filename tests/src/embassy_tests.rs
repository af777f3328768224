//! Embassy time integration using the mock time driver

use std::future::Future;
use std::pin::pin;
use std::sync::Mutex;
use std::task::Context;

use embassy_time::{Duration, MockDriver};
use futures::task::noop_waker_ref;
use heapless::spsc::Queue;
use keyer_core::hal::mock::MockHal;
use keyer_core::hal::{Clock, EmbassyClock, HalParts, NoPixel};
use keyer_core::sysex::build_frame;
use keyer_core::{run, Command, KeyEvent, KeyMode, Keyer, Settings, SysExFrame};

/// The mock driver is global; tests touching it take this lock
static DRIVER: Mutex<()> = Mutex::new(());

#[test]
fn test_embassy_clock_tracks_driver() {
    let _guard = DRIVER.lock().unwrap_or_else(|e| e.into_inner());
    let driver = MockDriver::get();
    driver.reset();

    let clock = EmbassyClock;
    assert_eq!(clock.now_ms(), 0);
    driver.advance(Duration::from_millis(250));
    assert_eq!(clock.now_ms(), 250);
    driver.advance(Duration::from_secs(2));
    assert_eq!(clock.now_ms(), 2250);
}

#[test]
fn test_keyer_runs_on_embassy_clock() {
    let _guard = DRIVER.lock().unwrap_or_else(|e| e.into_inner());
    let driver = MockDriver::get();
    driver.reset();

    let settings = Settings {
        key_mode: KeyMode::StraightKey,
        ..Settings::default()
    };
    let mut store = MockHal::new();
    store.set_stored(Some(&settings.to_record()));

    let hal = HalParts {
        gpio: MockHal::new(),
        midi: MockHal::new(),
        pixel: NoPixel,
        store,
        system: MockHal::new(),
        clock: EmbassyClock,
    };
    let mut keyer = Keyer::new(hal);
    keyer.boot();

    // Straight key on pin 3 closes to ground
    keyer.hal_mut().gpio.set_level(3, false);
    let mut key_down_at = None;
    for _ in 0..20 {
        if keyer.tick() == Some(KeyEvent::KeyDown(None)) {
            key_down_at = Some(EmbassyClock.now_ms());
        }
        driver.advance(Duration::from_millis(1));
    }
    assert_eq!(key_down_at, Some(10));
    assert_eq!(keyer.hal().midi.note_events().len(), 1);
}

#[test]
fn test_run_loop_serves_sysex_and_ticks() {
    // No driver reset here: the timer queue holds the driver's only alarm
    let _guard = DRIVER.lock().unwrap_or_else(|e| e.into_inner());
    let driver = MockDriver::get();

    let settings = Settings {
        key_mode: KeyMode::StraightKey,
        ..Settings::default()
    };
    let mut store = MockHal::new();
    store.set_stored(Some(&settings.to_record()));
    let hal = HalParts {
        gpio: MockHal::new(),
        midi: MockHal::new(),
        pixel: NoPixel,
        store,
        system: MockHal::new(),
        clock: EmbassyClock,
    };
    let mut keyer = Keyer::new(hal);
    keyer.boot();
    keyer.hal_mut().gpio.set_level(3, false);

    let mut queue: Queue<SysExFrame, 4> = Queue::new();
    let (mut producer, consumer) = queue.split();
    producer
        .enqueue(build_frame(Command::GetVersion, &[]).unwrap())
        .unwrap();

    {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut control_loop = pin!(run(&mut keyer, consumer));
        // One tick per millisecond; the key settles on the eleventh
        for _ in 0..20 {
            assert!(control_loop.as_mut().poll(&mut cx).is_pending());
            driver.advance(Duration::from_millis(1));
        }
    }

    assert_eq!(
        keyer.hal().midi.sysex_frames(),
        vec![vec![0xF0, 0x7D, 0x00, 0x20, 0x00, 0x00, 0xF7]]
    );
    assert!(keyer.is_keyed());
    assert_eq!(keyer.hal().midi.note_events().len(), 1);
}
