//! Device settings record, compiled-in defaults and the persisted layout

use crate::types::{InputMode, KeyMode, LedMode, OutputMode};

/// Settings schema version. Bump on any change to the codec field order.
pub const SETTINGS_VERSION: u16 = 0x2;

/// Fixed-point scale of the stored speed (WPM x 100)
pub const WPM_SCALE: u32 = 100;

/// Debounce settle time in milliseconds
pub const DEBOUNCE_MS: u32 = 10;

pub const DEFAULT_WPM: u16 = 12 * WPM_SCALE as u16;
pub const DEFAULT_KEY_MODE: KeyMode = KeyMode::None;
pub const DEFAULT_INPUT_MODE: InputMode = InputMode::PullUp;
pub const DEFAULT_LED_MODE: LedMode = LedMode::Disabled;
pub const DEFAULT_OUTPUT_MODE: OutputMode = OutputMode::Disabled;
pub const DEFAULT_OUTPUT_PIN: u8 = 2;
pub const DEFAULT_NORMAL_LED: u8 = 25;
pub const DEFAULT_RGB_LED: u8 = 16;
pub const DEFAULT_DIT_PADDLE: u8 = 3;
pub const DEFAULT_DAH_PADDLE: u8 = 29;
pub const DEFAULT_STRAIGHT_KEY: u8 = 3;
pub const DEFAULT_CHANNEL: u8 = 1;
pub const DEFAULT_NOTE: u8 = 77;
pub const DEFAULT_VOLUME: u8 = 40;

/// Size of the persisted settings record in bytes
pub const SETTINGS_RECORD_LEN: usize = 17;

/// GPIO pin assignments
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioAssignments {
    /// Keyed output pin
    pub output: u8,
    pub normal_led: u8,
    pub rgb_led: u8,
    pub dit_paddle: u8,
    pub dah_paddle: u8,
    pub straight_key: u8,
}

impl Default for GpioAssignments {
    fn default() -> Self {
        Self {
            output: DEFAULT_OUTPUT_PIN,
            normal_led: DEFAULT_NORMAL_LED,
            rgb_led: DEFAULT_RGB_LED,
            dit_paddle: DEFAULT_DIT_PADDLE,
            dah_paddle: DEFAULT_DAH_PADDLE,
            straight_key: DEFAULT_STRAIGHT_KEY,
        }
    }
}

/// Complete device configuration
///
/// Built from the compiled-in defaults at startup, replaced wholesale by a
/// SysEx set-config, persisted on save and reloaded at boot behind a version
/// check.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    pub version: u16,
    pub key_mode: KeyMode,
    pub input_mode: InputMode,
    pub led_mode: LedMode,
    pub output_mode: OutputMode,
    pub gpio: GpioAssignments,
    /// Speed as WPM x `WPM_SCALE`
    pub wpm: u16,
    /// One-based MIDI channel
    pub channel: u8,
    pub note: u8,
    /// Note-on and note-off velocity
    pub volume: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            key_mode: DEFAULT_KEY_MODE,
            input_mode: DEFAULT_INPUT_MODE,
            led_mode: DEFAULT_LED_MODE,
            output_mode: DEFAULT_OUTPUT_MODE,
            gpio: GpioAssignments::default(),
            wpm: DEFAULT_WPM,
            channel: DEFAULT_CHANNEL,
            note: DEFAULT_NOTE,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl Settings {
    /// Serialize to the fixed persisted layout
    pub fn to_record(&self) -> [u8; SETTINGS_RECORD_LEN] {
        let version = self.version.to_le_bytes();
        let wpm = self.wpm.to_le_bytes();
        [
            version[0],
            version[1],
            self.key_mode.to_bits(),
            self.input_mode.to_bits(),
            self.led_mode.to_bits(),
            self.output_mode.to_bits(),
            self.gpio.output,
            self.gpio.normal_led,
            self.gpio.rgb_led,
            self.gpio.dit_paddle,
            self.gpio.dah_paddle,
            self.gpio.straight_key,
            wpm[0],
            wpm[1],
            self.channel,
            self.note,
            self.volume,
        ]
    }

    /// Parse a persisted record
    ///
    /// Returns `None` for a short buffer or a record written by another
    /// settings version. MIDI fields are masked to 7 bits.
    pub fn from_record(record: &[u8]) -> Option<Self> {
        if record.len() < SETTINGS_RECORD_LEN {
            return None;
        }
        let version = u16::from_le_bytes([record[0], record[1]]);
        if version != SETTINGS_VERSION {
            return None;
        }
        Some(Self {
            version,
            key_mode: KeyMode::from_bits(record[2]),
            input_mode: InputMode::from_bits(record[3]),
            led_mode: LedMode::from_bits(record[4]),
            output_mode: OutputMode::from_bits(record[5]),
            gpio: GpioAssignments {
                output: record[6],
                normal_led: record[7],
                rgb_led: record[8],
                dit_paddle: record[9],
                dah_paddle: record[10],
                straight_key: record[11],
            },
            wpm: u16::from_le_bytes([record[12], record[13]]),
            channel: record[14] & 0x7F,
            note: record[15] & 0x7F,
            volume: record[16] & 0x7F,
        })
    }
}
