//! Core data types for the MIDI keyer

/// Morse code elements
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Element {
    /// Dit (short element)
    Dit,
    /// Dah (long element)
    Dah,
}

impl Element {
    /// Returns the duration of this element in units
    pub const fn duration_units(&self) -> u32 {
        match self {
            Element::Dit => 1,
            Element::Dah => 3,
        }
    }

    /// Returns the opposite element (Dit <-> Dah)
    pub const fn opposite(&self) -> Element {
        match self {
            Element::Dit => Element::Dah,
            Element::Dah => Element::Dit,
        }
    }
}

/// Paddle side identification
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PaddleSide {
    /// Dit paddle (typically left side)
    Dit,
    /// Dah paddle (typically right side)
    Dah,
}

/// Which physical key the keyer listens to
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyMode {
    /// Key input disabled
    #[default]
    None,
    /// Single straight key, output follows the key
    StraightKey,
    /// Dit/dah paddles driving the iambic state machine
    Paddles,
}

impl KeyMode {
    /// Wire code used by the configuration protocol
    pub const fn to_bits(self) -> u8 {
        match self {
            KeyMode::None => 0,
            KeyMode::StraightKey => 1,
            KeyMode::Paddles => 2,
        }
    }

    /// Decode a wire code; unassigned codes disable the key
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            1 => KeyMode::StraightKey,
            2 => KeyMode::Paddles,
            _ => KeyMode::None,
        }
    }
}

/// Electrical configuration of the key input pins
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    /// No internal bias
    Floating,
    /// Internal pull-up, key closes to ground
    #[default]
    PullUp,
    /// Internal pull-down, key closes to supply
    PullDown,
}

impl InputMode {
    /// Wire code used by the configuration protocol
    pub const fn to_bits(self) -> u8 {
        match self {
            InputMode::Floating => 0,
            InputMode::PullUp => 2,
            InputMode::PullDown => 3,
        }
    }

    /// Decode a wire code; code 1 (an output role) reads as floating
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            2 => InputMode::PullUp,
            3 => InputMode::PullDown,
            _ => InputMode::Floating,
        }
    }

    /// Logic level that means "key closed" for this bias
    pub const fn active_high(self) -> bool {
        match self {
            InputMode::PullDown => true,
            InputMode::Floating | InputMode::PullUp => false,
        }
    }
}

/// Key indicator LED configuration
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedMode {
    #[default]
    Disabled,
    /// Plain GPIO LED
    Normal,
    /// Addressable RGB pixel
    Rgb,
}

impl LedMode {
    pub const fn to_bits(self) -> u8 {
        match self {
            LedMode::Disabled => 0,
            LedMode::Normal => 1,
            LedMode::Rgb => 2,
        }
    }

    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            1 => LedMode::Normal,
            2 => LedMode::Rgb,
            _ => LedMode::Disabled,
        }
    }
}

/// Keyed GPIO output configuration
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMode {
    #[default]
    Disabled,
    /// Output driven high while keyed
    Normal,
    /// Output driven low while keyed
    Inverted,
}

impl OutputMode {
    pub const fn to_bits(self) -> u8 {
        match self {
            OutputMode::Disabled => 0,
            OutputMode::Normal => 1,
            OutputMode::Inverted => 2,
        }
    }

    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            1 => OutputMode::Normal,
            2 => OutputMode::Inverted,
            _ => OutputMode::Disabled,
        }
    }

    /// Pin level for a given key state, `None` when the output is unused
    pub const fn level(self, keyed: bool) -> Option<bool> {
        match self {
            OutputMode::Disabled => None,
            OutputMode::Normal => Some(keyed),
            OutputMode::Inverted => Some(!keyed),
        }
    }
}

/// Output phase of the keyer state machine
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputPhase {
    /// Nothing sounding, waiting for input
    #[default]
    Idle,
    /// Element sounding
    OutputOn,
    /// Inter-element gap after an element
    OutputOff,
}

/// Element and gap durations in milliseconds
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timings {
    pub dit: u32,
    pub dah: u32,
    pub gap: u32,
}

impl Timings {
    /// Derive timings from a fixed-point speed (WPM x `WPM_SCALE`)
    ///
    /// PARIS timing: dit = 1200 ms / WPM. A speed of zero is clamped to the
    /// slowest representable rate.
    pub const fn from_wpm(wpm_fixed: u16) -> Self {
        let wpm = if wpm_fixed == 0 { 1 } else { wpm_fixed as u32 };
        let dit = (crate::settings::WPM_SCALE * 1200) / wpm;
        Self {
            dit,
            dah: dit * Element::Dah.duration_units(),
            gap: dit,
        }
    }

    /// On-time of an element
    pub const fn element(&self, element: Element) -> u32 {
        match element {
            Element::Dit => self.dit,
            Element::Dah => self.dah,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::from_wpm(crate::settings::DEFAULT_WPM)
    }
}

/// MIDI destination of the keyed note
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MidiAddress {
    /// Zero-based channel (0..=15)
    pub channel: u8,
    /// Note number
    pub note: u8,
    /// USB-MIDI virtual cable
    pub cable: u8,
}

impl MidiAddress {
    /// Build an address from the one-based channel stored in settings
    pub const fn new(channel: u8, note: u8) -> Self {
        Self {
            channel: channel.wrapping_sub(1) & 0x0F,
            note: note & 0x7F,
            cable: 0,
        }
    }
}

/// Colour of the RGB indicator pixel
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
    pub const KEYED: Rgb = Rgb(255, 0, 0);
}
