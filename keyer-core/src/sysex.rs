//! SysEx configuration protocol framing
//!
//! Frame layout: `[F0 7D][command][payload, each <= 0x7F][F7]`. One frame is
//! validated per call; there is no continuation across frames.

use heapless::Vec;

use crate::bitpack::BitPackError;

/// Fixed frame header (SysEx start + non-commercial manufacturer ID)
pub const SYSEX_HEADER: [u8; 2] = [0xF0, 0x7D];
/// Fixed frame footer (SysEx end)
pub const SYSEX_FOOTER: u8 = 0xF7;
/// Largest frame sent or accepted
pub const MAX_SYSEX_LENGTH: usize = 32;

/// Outbound or queued inbound frame
pub type SysExFrame = Vec<u8, MAX_SYSEX_LENGTH>;

/// Configuration commands
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Reply with the firmware settings version
    GetVersion,
    /// Reply with the live settings
    GetConfig,
    /// Replace the live settings
    SetConfig,
    /// Replace the live settings and persist them
    SaveConfig,
    /// Restart the device
    Reboot,
    /// Restart into the USB bootloader
    Bootsel,
}

impl Command {
    pub const fn code(self) -> u8 {
        match self {
            Command::GetVersion => 0,
            Command::GetConfig => 1,
            Command::SetConfig => 2,
            Command::SaveConfig => 3,
            Command::Reboot => 4,
            Command::Bootsel => 5,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Command::GetVersion),
            1 => Ok(Command::GetConfig),
            2 => Ok(Command::SetConfig),
            3 => Ok(Command::SaveConfig),
            4 => Ok(Command::Reboot),
            5 => Ok(Command::Bootsel),
            other => Err(FrameError::UnknownCommand(other)),
        }
    }
}

/// Reasons a frame is dropped
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Shorter than header + command + footer
    TooShort,
    /// Leading bytes are not `SYSEX_HEADER`
    BadHeader,
    /// Last byte is not `SYSEX_FOOTER`
    BadFooter,
    /// Reply would not fit in `MAX_SYSEX_LENGTH`
    TooLong,
    /// Command byte not recognised
    UnknownCommand(u8),
    /// Payload length does not match the command
    BadPayload,
    /// Reply payload could not be encoded
    Codec(BitPackError),
}

impl From<BitPackError> for FrameError {
    fn from(err: BitPackError) -> Self {
        FrameError::Codec(err)
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::TooShort => write!(f, "SysEx frame too short"),
            FrameError::BadHeader => write!(f, "SysEx header mismatch"),
            FrameError::BadFooter => write!(f, "SysEx footer missing"),
            FrameError::TooLong => write!(f, "SysEx frame too long"),
            FrameError::UnknownCommand(code) => write!(f, "Unknown SysEx command {}", code),
            FrameError::BadPayload => write!(f, "SysEx payload length mismatch"),
            FrameError::Codec(err) => write!(f, "SysEx payload encoding failed: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// A validated inbound request
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Request<'a> {
    pub command: Command,
    /// Bytes between the command and the footer
    pub payload: &'a [u8],
}

/// Validate framing and split out command and payload
pub fn parse(frame: &[u8]) -> Result<Request<'_>, FrameError> {
    let header_len = SYSEX_HEADER.len();
    if frame.len() < header_len + 2 {
        return Err(FrameError::TooShort);
    }
    if frame[..header_len] != SYSEX_HEADER {
        return Err(FrameError::BadHeader);
    }
    if frame[frame.len() - 1] != SYSEX_FOOTER {
        return Err(FrameError::BadFooter);
    }

    let command = Command::try_from(frame[header_len])?;
    Ok(Request {
        command,
        payload: &frame[header_len + 1..frame.len() - 1],
    })
}

/// Build `[header][command][payload][footer]`
pub fn build_frame(command: Command, payload: &[u8]) -> Result<SysExFrame, FrameError> {
    let mut frame = SysExFrame::new();
    frame
        .extend_from_slice(&SYSEX_HEADER)
        .map_err(|_| FrameError::TooLong)?;
    frame
        .push(command.code())
        .map_err(|_| FrameError::TooLong)?;
    frame
        .extend_from_slice(payload)
        .map_err(|_| FrameError::TooLong)?;
    frame.push(SYSEX_FOOTER).map_err(|_| FrameError::TooLong)?;
    Ok(frame)
}
