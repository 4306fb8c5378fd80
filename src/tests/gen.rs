// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Packet generators for replay scenarios

use crate::packet::RawPacket;

pub const TRIANGLELIST: u32 = 4;

pub const SET_CONSTANT: u32 = 0x2D;
pub const SET_CONSTANT2: u32 = 0x55;
pub const SET_BIN_MASK_LO: u32 = 0x60;
pub const SET_BIN_MASK_HI: u32 = 0x61;
pub const SET_BIN_SELECT_LO: u32 = 0x62;
pub const SET_BIN_SELECT_HI: u32 = 0x63;

/// Replay the packets and check registers captured at the last draw
macro_rules! capture_test {
    ($n:ident, [$($p:expr),* $(,)?], { $($r:expr => $v:expr),* $(,)? }) => {
        #[test]
        fn $n() {
            let packets = vec![$($p),*];
            let replay = draw::builder().build().replay(&packets);
            let call = replay.calls().last().expect("No draw call");
            let capture = call.capture().expect("No capture");
            $(
                assert_eq!(capture.reg($r), $v, "Register {:#x}", $r);
            )*
        }
    };
}

/// Type 0 write of consecutive registers
pub fn write_block(base: u32, values: &[u32]) -> RawPacket {
    RawPacket::new(((values.len() as u32 - 1) << 16) | base, values)
}

/// Type 0 write of all values to a single register
pub fn write_repeat(base: u32, values: &[u32]) -> RawPacket {
    RawPacket::new(((values.len() as u32 - 1) << 16) | 0x8000 | base, values)
}

/// Type 1 write of two registers
pub fn write_pair(first: (u32, u32), second: (u32, u32)) -> RawPacket {
    RawPacket::new(0x4000_0000 | (second.0 << 11) | first.0, [first.1, second.1])
}

/// Type 3 packet
pub fn type3(opcode: u32, words: &[u32]) -> RawPacket {
    let count = (words.len() as u32 - 1) << 16;
    RawPacket::new(0xC000_0000 | count | (opcode << 8), words)
}

/// Copy of a type 3 packet with the predicate bit set
pub fn predicated(packet: RawPacket) -> RawPacket {
    RawPacket::new(packet.header() | 1, packet.words())
}

pub fn set_constant(bank: u32, index: u32, values: &[u32]) -> RawPacket {
    let mut words = vec![(bank << 16) | index];
    words.extend(values);
    type3(SET_CONSTANT, &words)
}

/// DRAW_INDX with auto-generated indices
pub fn draw(count: u32, primitive: u32) -> RawPacket {
    type3(0x22, &[0x0, (count << 16) | 0x80 | primitive])
}
