// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Bit level utilities
//!
//! Command stream packets, fetch constants and shader microcode are all
//! composed of packed bit fields within 32 bit words. This module provides the
//! means for dissecting them as well as the byte order transforms applied to
//! operands read from GPU memory.

use core::fmt;

#[cfg(test)]
mod tests;

/// Extract `width` bits of `value`, starting at bit `shift`
pub const fn field(value: u32, shift: u32, width: u32) -> u32 {
    if width >= 32 {
        value >> shift
    } else {
        (value >> shift) & ((1 << width) - 1)
    }
}

/// Test a single bit of `value`
pub const fn flag(value: u32, bit: u32) -> bool {
    (value >> bit) & 1 != 0
}

/// Reinterpret the bit pattern of a register value as IEEE-754 float
pub fn as_f32(value: u32) -> f32 {
    f32::from_bits(value)
}

/// Sign extend the lowest `width` bits of `value`
pub const fn sign_extend(value: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}

/// Sequential reader for packed bit fields
///
/// Fields are consumed starting at the least significant bit, i.e. the first
/// call to [`take`][Self::take] returns the lowest bits of the word.
#[derive(Copy, Clone, Debug)]
pub struct Unpacker {
    value: u32,
    pos: u32,
}

impl Unpacker {
    /// Create a new unpacker for the given word
    pub const fn new(value: u32) -> Self {
        Self { value, pos: 0 }
    }

    /// Take the next `width` bits
    pub fn take(&mut self, width: u32) -> u32 {
        let res = if self.pos >= 32 {
            0
        } else {
            field(self.value, self.pos, width)
        };
        self.pos += width;
        res
    }

    /// Take the next bit as a flag
    pub fn flag(&mut self) -> bool {
        self.take(1) != 0
    }

    /// Skip `width` reserved bits
    pub fn skip(&mut self, width: u32) -> &mut Self {
        self.pos += width;
        self
    }
}

/// Byte order of a value in GPU memory
///
/// Addresses of memory sourced operands carry a 2-bit tag in their lowest
/// bits which selects one of these transforms.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endian {
    /// Value is used as is
    #[default]
    Unspecified,
    /// Bytes are swapped within each 16 bit half
    Swap8In16,
    /// All four bytes are reversed
    Swap8In32,
    /// The two 16 bit halves are swapped
    Swap16In32,
}

impl Endian {
    /// Create from the two lowest bits of a tag
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::Unspecified,
            1 => Self::Swap8In16,
            2 => Self::Swap8In32,
            _ => Self::Swap16In32,
        }
    }

    /// Apply this transform to a value
    pub const fn swap(self, value: u32) -> u32 {
        match self {
            Self::Unspecified => value,
            Self::Swap8In16 => ((value << 8) & 0xFF00_FF00) | ((value >> 8) & 0x00FF_00FF),
            Self::Swap8In32 => value.swap_bytes(),
            Self::Swap16In32 => value.rotate_left(16),
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspecified => "Unspecified",
            Self::Swap8In16 => "8in16",
            Self::Swap8In32 => "8in32",
            Self::Swap16In32 => "16in32",
        };
        f.write_str(name)
    }
}

/// Apply the byte order transform selected by `mode` to `value`
///
/// Only the two lowest bits of `mode` are considered.
pub const fn gpu_swap32(value: u32, mode: u32) -> u32 {
    Endian::from_bits(mode).swap(value)
}
