// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Component selection for register reads and writes

use core::fmt;

/// Selection of a single component
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Swizzle {
    X,
    Y,
    Z,
    W,
    /// Component is forced to zero (writes only)
    Zero,
    /// Component is forced to one (writes only)
    One,
    /// Component may hold any value (writes only)
    DontCare,
    /// Component is not written (writes only)
    NotUsed,
}

impl Swizzle {
    /// Create from a 3 bit write selector
    pub fn from_code(code: u32) -> Self {
        match code & 0x7 {
            0 => Self::X,
            1 => Self::Y,
            2 => Self::Z,
            3 => Self::W,
            4 => Self::Zero,
            5 => Self::One,
            6 => Self::DontCare,
            _ => Self::NotUsed,
        }
    }

    /// Create from a component index, wrapping around
    pub fn component(index: u32) -> Self {
        Self::from_code(index & 0x3)
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::W => "w",
            Self::Zero => "0",
            Self::One => "1",
            Self::DontCare => "?",
            Self::NotUsed => "_",
        };
        f.write_str(c)
    }
}

/// Selection of all four components
///
/// Displays as the four component characters, e.g. `xyzw` or `xy__`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pattern(pub [Swizzle; 4]);

impl Pattern {
    /// Decode a 12 bit destination selector, three bits per component
    pub fn write(code: u32) -> Self {
        Self([0u32, 1, 2, 3].map(|i| Swizzle::from_code(code >> (3 * i))))
    }

    /// Decode an 8 bit ALU source selector
    ///
    /// Each component's 2 bit code is biased by the component's index, i.e.
    /// a selector of zero decodes to `xyzw`.
    pub fn source(code: u32) -> Self {
        Self([0u32, 1, 2, 3].map(|i| Swizzle::component((code >> (2 * i)) + i)))
    }

    /// Decode an 8 bit fetch source selector without any bias
    pub fn direct(code: u32) -> Self {
        Self([0u32, 1, 2, 3].map(|i| Swizzle::component(code >> (2 * i))))
    }

    /// Derive a write pattern from a 4 bit write mask
    ///
    /// Written components keep their own position, others are `NotUsed`.
    pub fn mask(mask: u32) -> Self {
        Self([0u32, 1, 2, 3].map(|i| {
            if mask & (1 << i) != 0 {
                Swizzle::component(i)
            } else {
                Swizzle::NotUsed
            }
        }))
    }

    /// Select the same component four times
    pub fn splat(swizzle: Swizzle) -> Self {
        Self([swizzle; 4])
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|s| write!(f, "{s}"))
    }
}
