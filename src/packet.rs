// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Raw command stream packets
//!
//! Every PM4 packet consists of a header word, a number of payload words and
//! possibly references to captured GPU memory. The top two bits of the header
//! select one of four packet types:
//!
//! * type 0 writes a block of consecutive registers (or one register
//!   repeatedly),
//! * type 1 writes two arbitrary registers,
//! * type 2 is a filler and
//! * type 3 carries an [`Opcode`] with opcode specific payload.
//!
//! This module provides the [`RawPacket`] itself, the decoding of its
//! [`Header`] and the decoding of the complete packet into a [`Command`].
//! Decoding is pure: it neither consults nor alters any state.

pub mod command;
pub mod opcode;


pub use command::Command;
pub use opcode::Opcode;

use std::sync::Arc;

use crate::bits::{field, flag};
use crate::memory::{self, MemoryBlock, MemoryRef};

/// A packet as captured
///
/// Packets are immutable once loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawPacket {
    header: u32,
    words: Vec<u32>,
    memory: Vec<MemoryRef>,
}

impl RawPacket {
    /// Create a new packet without memory references
    pub fn new(header: u32, words: impl Into<Vec<u32>>) -> Self {
        Self {
            header,
            words: words.into(),
            memory: Default::default(),
        }
    }

    /// Attach memory references to this packet
    pub fn with_memory(self, memory: impl Into<Vec<MemoryRef>>) -> Self {
        Self {
            memory: memory.into(),
            ..self
        }
    }

    /// Retrieve the raw header word
    pub fn header(&self) -> u32 {
        self.header
    }

    /// Retrieve the decoded [`Header`]
    pub fn decode_header(&self) -> Header {
        self.header.into()
    }

    /// Retrieve the payload words
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Retrieve the memory references attached to this packet
    pub fn memory(&self) -> &[MemoryRef] {
        &self.memory
    }

    /// Find a read-mode memory block of this packet by GPU address
    ///
    /// See the [memory module][crate::memory] for the lookup rules.
    pub fn find_read_block(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        memory::Resolver::find(self.memory.as_slice(), address)
    }

    /// Check whether this packet's type marks the end of a draw call
    pub fn is_draw(&self) -> bool {
        self.decode_header().is_draw()
    }

    /// Decode this packet into a [`Command`]
    pub fn decode(&self) -> Result<Command<'_>, command::Error> {
        Command::decode(self)
    }
}

impl memory::Resolver for RawPacket {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        self.find_read_block(address)
    }
}

/// Decoded packet header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Header {
    /// Type 0: write `count` registers starting at `base`
    ///
    /// If `write_one` is set, all values are written to `base`.
    Registers {
        base: u32,
        count: u32,
        write_one: bool,
    },
    /// Type 1: write two registers
    RegisterPair { first: u32, second: u32 },
    /// Type 2: filler
    Filler,
    /// Type 3: opcode packet with `count` payload words
    Opcode {
        opcode: Result<Opcode, u8>,
        count: u32,
        predicated: bool,
    },
}

impl Header {
    /// Retrieve the opcode of a type 3 packet
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Self::Opcode { opcode, .. } => opcode.ok(),
            _ => None,
        }
    }

    /// Check whether this header marks the end of a draw call
    pub fn is_draw(&self) -> bool {
        self.opcode().is_some_and(Opcode::is_draw)
    }
}

impl From<u32> for Header {
    fn from(header: u32) -> Self {
        match header >> 30 {
            0 => Self::Registers {
                base: field(header, 0, 15),
                count: field(header, 16, 14) + 1,
                write_one: flag(header, 15),
            },
            1 => Self::RegisterPair {
                first: field(header, 0, 11),
                second: field(header, 11, 11),
            },
            2 => Self::Filler,
            _ => Self::Opcode {
                opcode: (field(header, 8, 7) as u8).try_into(),
                count: field(header, 16, 14) + 1,
                predicated: flag(header, 0),
            },
        }
    }
}
