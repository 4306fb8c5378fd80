// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use core::fmt;

/// Decompilation errors
///
/// Any of these renders the shader absent. They never affect replay.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The microcode ends within a control flow word triple
    Truncated { word: usize },
    /// More control flow word triples than permitted were visited
    CycleLimit { limit: u32 },
    /// An EXEC refers to an instruction slot beyond the microcode
    SlotOutOfRange { address: u32 },
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { word } => write!(f, "Microcode truncated at word {word}"),
            Self::CycleLimit { limit } => {
                write!(f, "Exceeded limit of {limit} control flow triples")
            }
            Self::SlotOutOfRange { address } => {
                write!(f, "Instruction slot {address} out of range")
            }
        }
    }
}
