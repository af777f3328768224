//! Fixed-capacity bit accumulator with a 7-bit transport encoding
//!
//! Fields are written into descending bit positions starting from the top of
//! the capacity, so the first field added occupies the highest positions.
//! Extraction replays the same walk, which means a decoder must pull fields in
//! exactly the order and widths the encoder pushed them. The stream carries no
//! tags; schema changes are detected by the settings version, not here.
//!
//! `pack_7bit` walks the used region from the top position downward, seven
//! positions per output byte, so every output byte has bit 7 clear and can be
//! embedded in a SysEx body. The layout depends only on the used region, not
//! on the packer capacity: a 32-bit and a 256-bit packer produce the same
//! bytes for the same fields.

/// Bit packing errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitPackError {
    /// Field or input does not fit in the remaining capacity
    Overflow,
    /// Field width outside 0..=64
    InvalidWidth,
    /// Output slice shorter than the packed length
    OutputTooSmall,
}

#[cfg(feature = "std")]
impl core::fmt::Display for BitPackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BitPackError::Overflow => write!(f, "Bit capacity exceeded"),
            BitPackError::InvalidWidth => write!(f, "Field width must be at most 64 bits"),
            BitPackError::OutputTooSmall => write!(f, "Output buffer too small"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BitPackError {}

/// Bit accumulator backed by `N` bytes (`N * 8` bits of capacity)
#[derive(Clone, Debug)]
pub struct BitPacker<const N: usize> {
    buffer: [u8; N],
    /// Next position to write/read; counts down from `MAX_BITS`
    bit_position: u16,
    total_bits: u16,
}

impl<const N: usize> BitPacker<N> {
    /// Capacity in bits
    pub const MAX_BITS: u16 = (N * 8) as u16;

    /// Create an empty packer
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            bit_position: Self::MAX_BITS,
            total_bits: 0,
        }
    }

    /// Append the low `bits` bits of `value`, most significant bit first
    ///
    /// On error nothing is written and the cursor does not move.
    pub fn add_field(&mut self, value: u64, bits: u8) -> Result<(), BitPackError> {
        if bits > 64 {
            return Err(BitPackError::InvalidWidth);
        }
        let width = bits as u16;
        if self.bit_position < width || self.total_bits + width > Self::MAX_BITS {
            return Err(BitPackError::Overflow);
        }
        self.bit_position -= width;
        self.total_bits += width;

        for i in 0..width {
            let set = value & (1u64 << (width - 1 - i)) != 0;
            self.write_bit(self.bit_position + i, set);
        }
        Ok(())
    }

    /// Read the next `bits`-wide field in write order
    ///
    /// Returns 0 when fewer than `bits` positions remain. Positions below the
    /// used region read as zero, so a short input yields zeroed trailing
    /// fields rather than an error.
    pub fn extract_field(&mut self, bits: u8) -> u64 {
        let width = bits as u16;
        if bits > 64 || self.bit_position < width {
            return 0;
        }
        self.bit_position -= width;

        let mut value = 0u64;
        for i in 0..width {
            if self.read_bit(self.bit_position + i) {
                value |= 1u64 << (width - 1 - i);
            }
        }
        value
    }

    /// Number of bytes `pack_7bit` produces for the current contents
    pub const fn packed_len(&self) -> usize {
        (self.total_bits as usize + 6) / 7
    }

    /// Re-encode the used region as 7-bit bytes into `output`
    ///
    /// Returns the number of bytes written. The final byte is zero-filled in
    /// its low bits when the region is not a multiple of seven.
    pub fn pack_7bit(&self, output: &mut [u8]) -> Result<usize, BitPackError> {
        let size = self.packed_len();
        if output.len() < size {
            return Err(BitPackError::OutputTooSmall);
        }
        let total = self.total_bits as usize;

        for (i, byte) in output.iter_mut().take(size).enumerate() {
            let mut value = 0u8;
            for j in 0..7 {
                let offset = i * 7 + j;
                if offset >= total {
                    break;
                }
                if self.read_bit(Self::MAX_BITS - 1 - offset as u16) {
                    value |= 1 << (6 - j);
                }
            }
            *byte = value & 0x7F;
        }
        Ok(size)
    }

    /// Load 7-bit bytes produced by `pack_7bit`, ready for extraction
    ///
    /// Clears the packer first; on overflow it is left empty.
    pub fn unpack_7bit(&mut self, input: &[u8]) -> Result<(), BitPackError> {
        self.reset();
        let total = input.len() * 7;
        if total > Self::MAX_BITS as usize {
            return Err(BitPackError::Overflow);
        }

        for (i, byte) in input.iter().enumerate() {
            let value = byte & 0x7F;
            for j in 0..7 {
                let offset = (i * 7 + j) as u16;
                self.write_bit(Self::MAX_BITS - 1 - offset, value & (1 << (6 - j)) != 0);
            }
        }
        self.total_bits = total as u16;
        self.bit_position = Self::MAX_BITS;
        Ok(())
    }

    /// Total bits written (or loaded)
    pub const fn total_bits(&self) -> u16 {
        self.total_bits
    }

    /// Positions left before extraction starts returning zero
    pub const fn remaining_bits(&self) -> u16 {
        self.bit_position
    }

    /// Clear the buffer and rewind to full capacity
    pub fn reset(&mut self) {
        self.buffer = [0; N];
        self.bit_position = Self::MAX_BITS;
        self.total_bits = 0;
    }

    fn read_bit(&self, position: u16) -> bool {
        let (byte, mask) = Self::locate(position);
        self.buffer[byte] & mask != 0
    }

    fn write_bit(&mut self, position: u16, set: bool) {
        let (byte, mask) = Self::locate(position);
        if set {
            self.buffer[byte] |= mask;
        } else {
            self.buffer[byte] &= !mask;
        }
    }

    const fn locate(position: u16) -> (usize, u8) {
        ((position / 8) as usize, 1 << (7 - (position % 8)))
    }
}

impl<const N: usize> Default for BitPacker<N> {
    fn default() -> Self {
        Self::new()
    }
}
