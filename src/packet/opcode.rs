// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Type 3 packet opcodes

use core::fmt;

/// Opcode of a type 3 packet
///
/// Only opcodes known to occur in captures are listed. Others are preserved as
/// raw values by [`Header`][super::Header].
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    NOP = 0x10,
    REG_RMW = 0x21,
    DRAW_INDX = 0x22,
    IM_LOAD = 0x27,
    IM_LOAD_IMMEDIATE = 0x2b,
    SET_CONSTANT = 0x2d,
    LOAD_ALU_CONSTANT = 0x2f,
    DRAW_INDX_BIN = 0x34,
    DRAW_INDX_2_BIN = 0x35,
    DRAW_INDX_2 = 0x36,
    INVALIDATE_STATE = 0x3b,
    WAIT_REG_MEM = 0x3c,
    INTERRUPT = 0x40,
    HACK_SWAP = 0x42,
    COND_WRITE = 0x45,
    EVENT_WRITE = 0x46,
    ME_INIT = 0x48,
    SET_BIN_MASK = 0x50,
    SET_BIN_SELECT = 0x51,
    SET_CONSTANT2 = 0x55,
    SET_SHADER_CONSTANTS = 0x56,
    EVENT_WRITE_SHD = 0x58,
    EVENT_WRITE_EXT = 0x5a,
    SET_BIN_MASK_LO = 0x60,
    SET_BIN_MASK_HI = 0x61,
    SET_BIN_SELECT_LO = 0x62,
    SET_BIN_SELECT_HI = 0x63,
}

/// All known opcodes
pub const ALL: [Opcode; 27] = {
    use Opcode::*;
    [
        NOP,
        REG_RMW,
        DRAW_INDX,
        IM_LOAD,
        IM_LOAD_IMMEDIATE,
        SET_CONSTANT,
        LOAD_ALU_CONSTANT,
        DRAW_INDX_BIN,
        DRAW_INDX_2_BIN,
        DRAW_INDX_2,
        INVALIDATE_STATE,
        WAIT_REG_MEM,
        INTERRUPT,
        HACK_SWAP,
        COND_WRITE,
        EVENT_WRITE,
        ME_INIT,
        SET_BIN_MASK,
        SET_BIN_SELECT,
        SET_CONSTANT2,
        SET_SHADER_CONSTANTS,
        EVENT_WRITE_SHD,
        EVENT_WRITE_EXT,
        SET_BIN_MASK_LO,
        SET_BIN_MASK_HI,
        SET_BIN_SELECT_LO,
        SET_BIN_SELECT_HI,
    ]
};

impl Opcode {
    /// Retrieve the mnemonic
    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            NOP => "NOP",
            REG_RMW => "REG_RMW",
            DRAW_INDX => "DRAW_INDX",
            IM_LOAD => "IM_LOAD",
            IM_LOAD_IMMEDIATE => "IM_LOAD_IMMEDIATE",
            SET_CONSTANT => "SET_CONSTANT",
            LOAD_ALU_CONSTANT => "LOAD_ALU_CONSTANT",
            DRAW_INDX_BIN => "DRAW_INDX_BIN",
            DRAW_INDX_2_BIN => "DRAW_INDX_2_BIN",
            DRAW_INDX_2 => "DRAW_INDX_2",
            INVALIDATE_STATE => "INVALIDATE_STATE",
            WAIT_REG_MEM => "WAIT_REG_MEM",
            INTERRUPT => "INTERRUPT",
            HACK_SWAP => "HACK_SWAP",
            COND_WRITE => "COND_WRITE",
            EVENT_WRITE => "EVENT_WRITE",
            ME_INIT => "ME_INIT",
            SET_BIN_MASK => "SET_BIN_MASK",
            SET_BIN_SELECT => "SET_BIN_SELECT",
            SET_CONSTANT2 => "SET_CONSTANT2",
            SET_SHADER_CONSTANTS => "SET_SHADER_CONSTANTS",
            EVENT_WRITE_SHD => "EVENT_WRITE_SHD",
            EVENT_WRITE_EXT => "EVENT_WRITE_EXT",
            SET_BIN_MASK_LO => "SET_BIN_MASK_LO",
            SET_BIN_MASK_HI => "SET_BIN_MASK_HI",
            SET_BIN_SELECT_LO => "SET_BIN_SELECT_LO",
            SET_BIN_SELECT_HI => "SET_BIN_SELECT_HI",
        }
    }

    /// Check whether this opcode terminates a draw call
    ///
    /// The explicit swap marker is considered a draw.
    pub fn is_draw(self) -> bool {
        matches!(
            self,
            Self::DRAW_INDX
                | Self::DRAW_INDX_2
                | Self::DRAW_INDX_BIN
                | Self::DRAW_INDX_2_BIN
                | Self::HACK_SWAP
        )
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        ALL.into_iter().find(|o| *o as u8 == raw).ok_or(raw)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
