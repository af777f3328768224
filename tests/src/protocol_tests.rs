//! Codec properties and SysEx handling through the device

use keyer_core::codec::{decode_config, encode_config, CONFIG_PACKED_LEN};
use keyer_core::hal::mock::MockHal;
use keyer_core::sysex::build_frame;
use keyer_core::{
    BitPackError, BitPacker, Command, FrameError, GpioAssignments, InputMode, KeyMode, Keyer,
    LedMode, OutputMode, Settings, SETTINGS_VERSION,
};
use proptest::prelude::*;
use rstest::rstest;

fn settings_strategy() -> impl Strategy<Value = Settings> {
    (
        (0u8..3, prop::sample::select(vec![0u8, 2, 3]), 0u8..3, 0u8..3),
        prop::array::uniform6(0u8..128),
        any::<u16>(),
        (0u8..128, 0u8..128, 0u8..128),
    )
        .prop_map(|((key, input, led, output), pins, wpm, (channel, note, volume))| Settings {
            version: SETTINGS_VERSION,
            key_mode: KeyMode::from_bits(key),
            input_mode: InputMode::from_bits(input),
            led_mode: LedMode::from_bits(led),
            output_mode: OutputMode::from_bits(output),
            gpio: GpioAssignments {
                output: pins[0],
                normal_led: pins[1],
                rgb_led: pins[2],
                dit_paddle: pins[3],
                dah_paddle: pins[4],
                straight_key: pins[5],
            },
            wpm,
            channel,
            note,
            volume,
        })
}

proptest! {
    #[test]
    fn prop_config_round_trip(settings in settings_strategy()) {
        let packed = encode_config(&settings).unwrap();
        prop_assert_eq!(decode_config(&packed).unwrap(), settings);
    }

    #[test]
    fn prop_config_is_seven_bit_clean(settings in settings_strategy()) {
        let packed = encode_config(&settings).unwrap();
        prop_assert_eq!(packed.len(), CONFIG_PACKED_LEN);
        prop_assert!(packed.iter().all(|b| *b <= 0x7F));
    }

    #[test]
    fn prop_capacity_overflow_leaves_total_unchanged(
        widths in prop::collection::vec(0u8..=64, 1..12)
    ) {
        let mut packer = BitPacker::<4>::new();
        for width in widths {
            let before = packer.total_bits();
            let result = packer.add_field(u64::MAX, width);
            if before + width as u16 > 32 {
                prop_assert_eq!(result, Err(BitPackError::Overflow));
                prop_assert_eq!(packer.total_bits(), before);
            } else {
                prop_assert_eq!(result, Ok(()));
                prop_assert_eq!(packer.total_bits(), before + width as u16);
            }
        }
    }

    #[test]
    fn prop_seven_bit_repack_restores_fields(bytes in prop::collection::vec(any::<u8>(), 0..=7)) {
        let mut packer = BitPacker::<8>::new();
        for byte in &bytes {
            packer.add_field(*byte as u64, 8).unwrap();
        }
        let mut packed = [0u8; 9];
        let len = packer.pack_7bit(&mut packed).unwrap();
        prop_assert!(packed[..len].iter().all(|b| *b <= 0x7F));

        let mut unpacked = BitPacker::<8>::new();
        unpacked.unpack_7bit(&packed[..len]).unwrap();
        for byte in &bytes {
            prop_assert_eq!(unpacked.extract_field(8), *byte as u64);
        }
    }
}

fn keyer() -> Keyer<MockHal> {
    let mut keyer = Keyer::new(MockHal::new());
    keyer.boot();
    keyer.hal_mut().clear_events();
    keyer
}

#[rstest]
#[case::empty(&[], FrameError::TooShort)]
#[case::header_only(&[0xF0, 0x7D, 0xF7], FrameError::TooShort)]
#[case::wrong_manufacturer(&[0xF0, 0x41, 0x00, 0xF7], FrameError::BadHeader)]
#[case::missing_start(&[0x7D, 0x7D, 0x00, 0xF7], FrameError::BadHeader)]
#[case::no_footer(&[0xF0, 0x7D, 0x01, 0x00], FrameError::BadFooter)]
#[case::unknown_command(&[0xF0, 0x7D, 0x7F, 0xF7], FrameError::UnknownCommand(0x7F))]
#[case::short_set(&[0xF0, 0x7D, 0x02, 0x10, 0xF7], FrameError::BadPayload)]
#[case::empty_set(&[0xF0, 0x7D, 0x02, 0xF7], FrameError::BadPayload)]
fn test_rejected_frames_have_no_effect(#[case] frame: &[u8], #[case] error: FrameError) {
    let mut keyer = keyer();
    assert_eq!(keyer.handle_sysex(frame), Err(error));
    assert!(keyer.hal().events().is_empty());
    assert_eq!(*keyer.settings(), Settings::default());
}

#[rstest]
#[case::get_version(0x00, 3)]
#[case::get_config(0x01, CONFIG_PACKED_LEN)]
fn test_query_replies_are_framed(#[case] command: u8, #[case] payload_len: usize) {
    let mut keyer = keyer();
    keyer.handle_sysex(&[0xF0, 0x7D, command, 0xF7]).unwrap();

    let frames = keyer.hal().sysex_frames();
    assert_eq!(frames.len(), 1);
    let reply = &frames[0];
    assert_eq!(reply.len(), payload_len + 4);
    assert_eq!(&reply[..3], &[0xF0, 0x7D, command]);
    assert_eq!(reply.last(), Some(&0xF7));
}

#[test]
fn test_get_set_get_round_trip() {
    let mut keyer = keyer();
    let wanted = Settings {
        key_mode: KeyMode::Paddles,
        led_mode: LedMode::Rgb,
        wpm: 1875,
        ..Settings::default()
    };
    let frame = build_frame(Command::SetConfig, &encode_config(&wanted).unwrap()).unwrap();
    keyer.handle_sysex(&frame).unwrap();
    keyer.hal_mut().clear_events();

    keyer.handle_sysex(&[0xF0, 0x7D, 0x01, 0xF7]).unwrap();
    let reply = keyer.hal().sysex_frames().remove(0);
    assert_eq!(decode_config(&reply[3..reply.len() - 1]), Ok(wanted));
}

#[test]
fn test_saved_settings_survive_reboot() {
    let mut keyer = keyer();
    let wanted = Settings {
        key_mode: KeyMode::StraightKey,
        note: 70,
        ..Settings::default()
    };
    let frame = build_frame(Command::SaveConfig, &encode_config(&wanted).unwrap()).unwrap();
    keyer.handle_sysex(&frame).unwrap();
    keyer.handle_sysex(&[0xF0, 0x7D, 0x04, 0xF7]).unwrap();

    // A fresh device over the same storage comes up with the saved record
    let mut rebooted = Keyer::new(keyer.into_hal());
    rebooted.boot();
    assert_eq!(*rebooted.settings(), wanted);
}
