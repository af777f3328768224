//! Settings and version encoding for the SysEx transport
//!
//! Field order and widths are the wire contract with the configuration client.
//! There is no per-field versioning: any change here must bump
//! `SETTINGS_VERSION`.

use crate::bitpack::{BitPackError, BitPacker};
use crate::settings::{GpioAssignments, Settings, SETTINGS_VERSION};
use crate::sysex::MAX_SYSEX_LENGTH;
use crate::types::{InputMode, KeyMode, LedMode, OutputMode};

/// Packer capacity for version frames, in bytes
const VERSION_PACKER_BYTES: usize = 4;
/// Packer capacity for configuration frames, in bytes
const CONFIG_PACKER_BYTES: usize = MAX_SYSEX_LENGTH;

const MODE_BITS: u8 = 2;
const PIN_BITS: u8 = 7;
const WPM_BITS: u8 = 16;
const MIDI_BITS: u8 = 7;
const VERSION_BITS: u8 = 16;

/// Bits in an encoded settings record
pub const CONFIG_FIELD_BITS: usize =
    4 * MODE_BITS as usize + 6 * PIN_BITS as usize + WPM_BITS as usize + 3 * MIDI_BITS as usize;

/// Length of a 7-bit packed settings record
pub const CONFIG_PACKED_LEN: usize = (CONFIG_FIELD_BITS + 6) / 7;

/// Length of a 7-bit packed version tag
pub const VERSION_PACKED_LEN: usize = (VERSION_BITS as usize + 6) / 7;

/// Packed settings record
pub type PackedConfig = [u8; CONFIG_PACKED_LEN];

/// Packed version tag
pub type PackedVersion = [u8; VERSION_PACKED_LEN];

/// Encode a version tag
pub fn encode_version(version: u16) -> Result<PackedVersion, BitPackError> {
    let mut packer = BitPacker::<VERSION_PACKER_BYTES>::new();
    packer.add_field(version as u64, VERSION_BITS)?;

    let mut out = [0u8; VERSION_PACKED_LEN];
    packer.pack_7bit(&mut out)?;
    Ok(out)
}

/// Decode a version tag
pub fn decode_version(input: &[u8]) -> Result<u16, BitPackError> {
    let mut packer = BitPacker::<VERSION_PACKER_BYTES>::new();
    packer.unpack_7bit(input)?;
    Ok(packer.extract_field(VERSION_BITS) as u16)
}

/// Encode settings in canonical field order
///
/// Every field is masked to its wire width; out-of-range values are
/// truncated, never rejected.
pub fn encode_config(settings: &Settings) -> Result<PackedConfig, BitPackError> {
    let mut packer = BitPacker::<CONFIG_PACKER_BYTES>::new();

    packer.add_field(settings.key_mode.to_bits() as u64 & 0x3, MODE_BITS)?;
    packer.add_field(settings.input_mode.to_bits() as u64 & 0x3, MODE_BITS)?;
    packer.add_field(settings.led_mode.to_bits() as u64 & 0x3, MODE_BITS)?;
    packer.add_field(settings.output_mode.to_bits() as u64 & 0x3, MODE_BITS)?;

    let gpio = &settings.gpio;
    for pin in [
        gpio.output,
        gpio.normal_led,
        gpio.rgb_led,
        gpio.dit_paddle,
        gpio.dah_paddle,
        gpio.straight_key,
    ] {
        packer.add_field(pin as u64 & 0x7F, PIN_BITS)?;
    }

    packer.add_field(settings.wpm as u64, WPM_BITS)?;
    packer.add_field(settings.channel as u64 & 0x7F, MIDI_BITS)?;
    packer.add_field(settings.note as u64 & 0x7F, MIDI_BITS)?;
    packer.add_field(settings.volume as u64 & 0x7F, MIDI_BITS)?;

    let mut out = [0u8; CONFIG_PACKED_LEN];
    packer.pack_7bit(&mut out)?;
    Ok(out)
}

/// Decode settings from their packed form
///
/// Mirrors `encode_config`. Fields beyond the end of a short input decode as
/// zero; callers that care must check the length first. The returned record
/// carries the running `SETTINGS_VERSION`.
pub fn decode_config(input: &[u8]) -> Result<Settings, BitPackError> {
    let mut packer = BitPacker::<CONFIG_PACKER_BYTES>::new();
    packer.unpack_7bit(input)?;

    let key_mode = KeyMode::from_bits(packer.extract_field(MODE_BITS) as u8);
    let input_mode = InputMode::from_bits(packer.extract_field(MODE_BITS) as u8);
    let led_mode = LedMode::from_bits(packer.extract_field(MODE_BITS) as u8);
    let output_mode = OutputMode::from_bits(packer.extract_field(MODE_BITS) as u8);

    let gpio = GpioAssignments {
        output: packer.extract_field(PIN_BITS) as u8,
        normal_led: packer.extract_field(PIN_BITS) as u8,
        rgb_led: packer.extract_field(PIN_BITS) as u8,
        dit_paddle: packer.extract_field(PIN_BITS) as u8,
        dah_paddle: packer.extract_field(PIN_BITS) as u8,
        straight_key: packer.extract_field(PIN_BITS) as u8,
    };

    let wpm = packer.extract_field(WPM_BITS) as u16;
    let channel = packer.extract_field(MIDI_BITS) as u8;
    let note = packer.extract_field(MIDI_BITS) as u8;
    let volume = packer.extract_field(MIDI_BITS) as u8;

    Ok(Settings {
        version: SETTINGS_VERSION,
        key_mode,
        input_mode,
        led_mode,
        output_mode,
        gpio,
        wpm,
        channel,
        note,
        volume,
    })
}
