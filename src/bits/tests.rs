// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::*;

macro_rules! swap_test {
    ($n:ident, $m:literal, $v:literal => $r:literal) => {
        #[test]
        fn $n() {
            assert_eq!(gpu_swap32($v, $m), $r);
        }
    };
}

swap_test!(swap_passthrough, 0, 0x1122_3344 => 0x1122_3344);
swap_test!(swap_8in16, 1, 0x1122_3344 => 0x2211_4433);
swap_test!(swap_8in32, 2, 0x1122_3344 => 0x4433_2211);
swap_test!(swap_16in32, 3, 0x1122_3344 => 0x3344_1122);
swap_test!(swap_mode_upper_bits_ignored, 0x7, 0x1122_3344 => 0x3344_1122);

#[test]
fn unpacker_lsb_first() {
    let mut unpacker = Unpacker::new(0b1_0110_0101);
    assert_eq!(unpacker.take(4), 0b0101);
    assert_eq!(unpacker.take(4), 0b0110);
    assert!(unpacker.flag());
    assert_eq!(unpacker.take(23), 0);
    assert_eq!(unpacker.take(4), 0);
}

#[test]
fn unpacker_skip() {
    let mut unpacker = Unpacker::new(0xF0);
    assert_eq!(unpacker.skip(4).take(4), 0xF);
}

#[test]
fn fields() {
    assert_eq!(field(0xC001_2200, 30, 2), 3);
    assert_eq!(field(0xC001_2200, 8, 7), 0x22);
    assert_eq!(field(0xDEAD_BEEF, 0, 32), 0xDEAD_BEEF);
    assert!(flag(0x8000, 15));
    assert!(!flag(0x8000, 14));
}

#[test]
fn sign_extension() {
    assert_eq!(sign_extend(0x7FFF, 15), -1);
    assert_eq!(sign_extend(0x3FFF, 15), 0x3FFF);
    assert_eq!(sign_extend(0x4000, 15), -0x4000);
    assert_eq!(sign_extend(0x10, 5), -16);
}

#[test]
fn float_view() {
    assert_eq!(as_f32(0x3F80_0000), 1.0);
    assert_eq!(as_f32(0xC000_0000), -2.0);
}
