//! Endian-aware composition of fixed-width integers, plus bit and nibble helpers.
//!
//! Big-endian places the byte at index `i` of a `N`-byte value at bit shift
//! `(N - 1 - i) * 8`, little-endian places it at `i * 8`.

use crate::error::HexSpliceErrorKind;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    #[must_use]
    pub const fn from_big(big_endian: bool) -> Self {
        if big_endian { Self::Big } else { Self::Little }
    }

    #[must_use]
    pub const fn is_big(self) -> bool {
        matches!(self, Self::Big)
    }

    /// Bit shift of the byte at `idx` within a value of `width` bytes.
    const fn shift(self, idx: usize, width: usize) -> usize {
        match self {
            Self::Big => (width - 1 - idx) * 8,
            Self::Little => idx * 8,
        }
    }
}

/// Fixed-width integer that can be read from and written to a byte store.
pub trait Primitive: Copy + Default {
    /// Width in bytes
    const SIZE: usize;

    /// Builds the value from its raw bits (truncating).
    fn from_bits(bits: u64) -> Self;

    /// Raw bits of the value, zero-extended.
    fn to_bits(self) -> u64;

    /// Composes a value from the first `SIZE` bytes of `bytes`.
    fn compose(bytes: &[u8], endian: Endianness) -> Self {
        let bits = bytes
            .iter()
            .take(Self::SIZE)
            .enumerate()
            .fold(0u64, |acc, (idx, &byte)| {
                acc | (u64::from(byte) << endian.shift(idx, Self::SIZE))
            });
        Self::from_bits(bits)
    }

    /// Decomposes the value into the first `SIZE` bytes of `out`.
    #[allow(clippy::cast_possible_truncation)]
    fn decompose(self, endian: Endianness, out: &mut [u8]) {
        let bits = self.to_bits();
        for (idx, byte) in out.iter_mut().take(Self::SIZE).enumerate() {
            *byte = (bits >> endian.shift(idx, Self::SIZE)) as u8;
        }
    }
}

macro_rules! impl_primitive {
    ($($ty:ty => $unsigned:ty),* $(,)?) => {
        $(
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_possible_wrap,
                clippy::cast_sign_loss
            )]
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_bits(bits: u64) -> Self {
                    bits as $unsigned as $ty
                }

                fn to_bits(self) -> u64 {
                    self as $unsigned as u64
                }
            }
        )*
    };
}

impl_primitive!(
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => u64,
    i8 => u8,
    i16 => u16,
    i32 => u32,
    i64 => u64,
);

/// Scalar type names accepted by the scripting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    U8,
    U16,
    U32,
    U64,
}

impl ScalarType {
    /// Width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }
}

impl FromStr for ScalarType {
    type Err = HexSpliceErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "u8" | "uint8_t" => Ok(Self::U8),
            "u16" | "uint16_t" => Ok(Self::U16),
            "u32" | "uint32_t" => Ok(Self::U32),
            "u64" | "uint64_t" => Ok(Self::U64),
            other => Err(HexSpliceErrorKind::InvalidType(other.to_string())),
        }
    }
}

/// Rejects bit indices above 7.
///
/// # Errors
/// Returns `InvalidBitIndex` if `idx > 7`.
pub fn check_bit_index(idx: u8) -> Result<(), HexSpliceErrorKind> {
    if idx > 7 {
        return Err(HexSpliceErrorKind::InvalidBitIndex(idx));
    }
    Ok(())
}

/// Rejects nibble values above 15.
///
/// # Errors
/// Returns `InvalidNibbleValue` if `value > 0xF`.
pub fn check_nibble_value(value: u8) -> Result<(), HexSpliceErrorKind> {
    if value > 0xF {
        return Err(HexSpliceErrorKind::InvalidNibbleValue(value));
    }
    Ok(())
}

#[must_use]
pub const fn bit(byte: u8, idx: u8) -> bool {
    byte & (1 << idx) != 0
}

#[must_use]
pub const fn with_bit(byte: u8, idx: u8, set: bool) -> u8 {
    if set { byte | (1 << idx) } else { byte & !(1 << idx) }
}

/// Low nibble is bits 0-3, high nibble is bits 4-7.
#[must_use]
pub const fn nibble(byte: u8, low: bool) -> u8 {
    if low { byte & 0x0F } else { byte >> 4 }
}

#[must_use]
pub const fn with_nibble(byte: u8, low: bool, value: u8) -> u8 {
    if low {
        (byte & 0xF0) | (value & 0x0F)
    } else {
        (byte & 0x0F) | ((value & 0x0F) << 4)
    }
}
