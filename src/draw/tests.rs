// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::*;

use crate::memory::{BlockId, MemoryBlock, MemoryRef};
use crate::registers::{RegisterFile, names};

use targets::{ColorFormat, DepthFormat, Msaa};

const DRAW: u32 = 0xC001_2200;
const DRAW_WORDS: [u32; 2] = [0x0, 0x0003_0084];

fn draw() -> RawPacket {
    RawPacket::new(DRAW, DRAW_WORDS)
}

fn write(index: u32, value: u32) -> RawPacket {
    RawPacket::new(index, [value])
}

fn invalid() -> RawPacket {
    RawPacket::new(0xC000_7F00, [0x0])
}

fn capture(values: &[(u32, u32)]) -> Capture {
    let mut registers = RegisterFile::default();
    for (index, value) in values {
        registers.write(*index, *value).unwrap();
    }
    registers.capture()
}

/// Check the number of packets per draw call and the members per group
macro_rules! replay_test {
    ($n:ident, [$($p:expr),*], [$($c:literal),*], [$([$($m:literal),*]),*]) => {
        #[test]
        fn $n() {
            let packets = vec![$($p),*];
            let replay = builder().build().replay(&packets);
            let calls: Vec<usize> = replay.calls().iter().map(|c| c.packets().len()).collect();
            let expected: Vec<usize> = vec![$($c),*];
            assert_eq!(calls, expected);
            let groups: Vec<Vec<usize>> = replay.groups().iter().map(|g| g.members().to_vec()).collect();
            let expected: Vec<Vec<usize>> = vec![$(vec![$($m),*]),*];
            assert_eq!(groups, expected);
        }
    };
}

replay_test!(empty, [], [], []);
replay_test!(single, [write(names::RB_SURFACE_INFO, 0x500), draw()], [2], [[0]]);
replay_test!(trailing, [draw(), write(0x2000, 1)], [1, 1], [[0]]);
replay_test!(invalid_excluded, [write(0x2000, 1), invalid(), draw()], [2], [[0]]);
replay_test!(invalid_tail, [draw(), invalid()], [1, 0], [[0]]);
replay_test!(same_state, [draw(), write(0x2100, 1), draw()], [1, 2], [[0, 1]]);
replay_test!(
    surface_change,
    [draw(), write(names::RB_SURFACE_INFO, 0x500), draw()],
    [1, 2],
    [[0], [1]]
);
replay_test!(
    scissor_change,
    [
        draw(),
        write(names::PA_SC_WINDOW_SCISSOR_BR, 0x0100_0100),
        draw(),
        write(names::PA_SC_WINDOW_SCISSOR_BR, 0),
        draw()
    ],
    [1, 2, 2],
    [[0], [1], [2]]
);
replay_test!(
    swap_marker,
    [RawPacket::new(0xC000_4200, [0x0]), draw()],
    [1, 1],
    [[0, 1]]
);
replay_test!(
    binned_draw_invalid,
    [RawPacket::new(0xC001_3400, DRAW_WORDS), draw()],
    [1],
    [[0]]
);

#[test]
fn packet_indices() {
    let packets = [write(0x2000, 1), invalid(), draw(), write(0x2001, 2), draw()];
    let replay = builder().build().replay(&packets);
    let indices: Vec<Vec<usize>> = replay
        .calls()
        .iter()
        .map(|c| c.packets().iter().map(Packet::index).collect())
        .collect();
    assert_eq!(indices, [vec![1, 2], vec![3, 4]]);
    assert_eq!(
        replay.calls().iter().map(DrawCall::index).collect::<Vec<_>>(),
        [1, 2]
    );
}

#[test]
fn trailing_without_capture() {
    let packets = [draw(), write(0x2000, 1)];
    let replay = builder().build().replay(&packets);
    assert!(replay.calls()[0].capture().is_some());
    assert!(replay.calls()[1].capture().is_none());
    assert_eq!(replay.calls()[1].viewport(), None);
    assert_eq!(replay.calls()[1].render_targets(), None);
}

#[test]
fn empty_bucket_display() {
    let packets = [draw(), invalid()];
    let replay = builder().build().replay(&packets);
    assert_eq!(replay.calls()[1].to_string(), "[2] (empty)");
}

#[test]
fn capture_at_draw() {
    let packets = [write(0x2000, 1), draw(), write(0x2000, 2)];
    let replay = builder().build().replay(&packets);
    let capture = replay.calls()[0].capture().unwrap();
    assert_eq!(capture.reg(0x2000), 1);
}

#[test]
fn predicated_draw_finalizes() {
    let packets = [
        RawPacket::new(0xC000_6000, [0x0]),
        RawPacket::new(DRAW | 1, DRAW_WORDS),
        write(0x2000, 1),
    ];
    let replay = builder().build().replay(&packets);
    assert_eq!(replay.calls().len(), 2);
    let call = &replay.calls()[0];
    assert_eq!(call.packets()[1].outcome(), Outcome::Skipped);
    assert!(call.capture().is_some());
}

#[test]
fn described() {
    let params = config::Parameters {
        describe: true,
        ..Default::default()
    };
    let packets = [write(names::RB_SURFACE_INFO, 0x500), draw()];
    let replay = builder().with_params(&params).build().replay(&packets);
    let call = &replay.calls()[0];
    assert_eq!(call.to_string(), "[1] (1-2): Draw: TRIANGLELIST 3");
    let record = call.packets()[0].record().unwrap();
    assert_eq!(record.description, "SetRegs [Start: 8192, Count: 1]");
    assert_eq!(record.log.len(), 1);
}

#[test]
fn undescribed() {
    let packets = [draw()];
    let replay = builder().build().replay(&packets);
    let packet = &replay.calls()[0].packets()[0];
    assert!(packet.record().is_none());
    assert_eq!(packet.to_string(), "Packet 0xC0012200");
    assert!(std::ptr::eq(packet.raw(), &packets[0]));
}

#[test]
fn members() {
    let packets = [draw(), draw(), write(names::PA_SC_WINDOW_SCISSOR_TL, 1), draw()];
    let replay = builder().build().replay(&packets);
    let groups = replay.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].index(), 1);
    assert_eq!(groups[1].index(), 2);
    let first: Vec<usize> = replay.members(&groups[0]).map(DrawCall::index).collect();
    assert_eq!(first, [1, 2]);
    let second: Vec<usize> = replay.members(&groups[1]).map(DrawCall::index).collect();
    assert_eq!(second, [3]);
}

#[test]
fn fallback_memory() {
    let constants = Arc::new(MemoryBlock::from_words(BlockId(0), 0x3000, &[7, 8]));
    let reconstructor = builder()
        .with_fallback(vec![MemoryRef::read(constants)])
        .build();
    let packets = [RawPacket::new(0xC002_2F00, [0x3000, 0x0, 2]), draw()];
    let replay = reconstructor.replay(&packets);
    let capture = replay.calls()[0].capture().unwrap();
    assert_eq!(capture.reg(names::SHADER_CONSTANT_000_X), 7);
    assert_eq!(capture.reg(names::SHADER_CONSTANT_000_X + 1), 8);
}

#[test]
fn shared_cache() {
    let cache = Arc::new(ShaderCache::new());
    let reconstructor = builder().with_cache(cache.clone()).build();
    assert!(Arc::ptr_eq(reconstructor.cache(), &cache));
}

#[test]
fn viewport() {
    let vte = 0b11 | (1 << 8) | (1 << 10);
    let capture = capture(&[
        (names::PA_CL_VTE_CNTL, vte),
        (names::PA_CL_VPORT_XSCALE, 2.0f32.to_bits()),
        (names::PA_CL_VPORT_XOFFSET, 0.5f32.to_bits()),
        (names::PA_CL_VPORT_YSCALE, 3.0f32.to_bits()),
        (names::PA_SU_SC_MODE_CNTL, 1 << 16),
        (names::PA_SC_WINDOW_OFFSET, 0x7FFF_0010),
        (names::PA_SC_WINDOW_SCISSOR_TL, 0x0008_0004),
        (names::PA_SC_WINDOW_SCISSOR_BR, 0x81E0_8280),
    ]);
    let viewport = Viewport::from(&capture);
    assert!(viewport.xy_divided);
    assert!(!viewport.z_divided);
    assert!(viewport.w_not_divided);
    assert!(viewport.normalized);
    assert_eq!(viewport.window_offset, [16, -1]);
    assert_eq!(
        viewport.scissor,
        viewport::Scissor {
            x1: 4,
            y1: 8,
            x2: 640,
            y2: 480
        }
    );
    assert_eq!(viewport.scale[0].value, 2.0);
    assert_eq!(viewport.offset[0].value, 0.5);
    assert!(!viewport.scale[1].enabled);
    assert_eq!(viewport.scale[1].value, 0.0);
}

#[test]
fn window_offset_disabled() {
    let capture = capture(&[(names::PA_SC_WINDOW_OFFSET, 0x0010_0010)]);
    assert_eq!(Viewport::from(&capture).window_offset, [0, 0]);
}

#[test]
fn render_targets() {
    let capture = capture(&[
        (names::RB_SURFACE_INFO, 0x0002_0500),
        (names::RB_MODECONTROL, targets::MODE_COLOR_DEPTH),
        (names::RB_COLOR_MASK, 0x0000_030F),
        (names::RB_COLOR_INFO, 0x0006_0100),
        (names::RB_COLOR1_INFO, 0x0001_0180),
        (names::RB_COLOR2_INFO, 0x000E_0200),
        (names::RB_DEPTHCONTROL, 0x2),
        (names::RB_DEPTH_INFO, 0x0001_0300),
    ]);
    let targets = RenderTargets::from(&capture);
    assert_eq!(targets.pitch, 0x500);
    assert_eq!(targets.msaa, Msaa::X4);

    let [c0, c1, c2, c3] = targets.color;
    assert!(c0.enabled);
    assert_eq!(c0.edram_base, 0x100);
    assert_eq!(c0.write, [true; 4]);
    assert_eq!(c0.format, ColorFormat::FMT_16_16_FLOAT);
    assert!(!c1.enabled);
    assert!(c2.enabled);
    assert_eq!(c2.write, [true, true, false, false]);
    assert_eq!(c2.format, ColorFormat::FMT_32_FLOAT);
    assert!(!c3.enabled);

    assert!(targets.depth.enabled);
    assert_eq!(targets.depth.edram_base, 0x300);
    assert_eq!(targets.depth.format, DepthFormat::D24FS8);
}

#[test]
fn color_targets_need_mode() {
    let capture = capture(&[
        (names::RB_MODECONTROL, 5),
        (names::RB_COLOR_MASK, 0xFFFF),
    ]);
    let targets = RenderTargets::from(&capture);
    assert!(targets.color.iter().all(|c| !c.enabled));
    assert!(!targets.depth.enabled);
}

#[test]
fn stencil_enables_depth() {
    let capture = capture(&[(names::RB_STENCILREFMASK, 0x0001_0000)]);
    assert!(RenderTargets::from(&capture).depth.enabled);
}

#[test]
fn group_display() {
    let packets = [
        write(names::PA_SC_WINDOW_SCISSOR_BR, 0x01E0_0280),
        write(names::RB_MODECONTROL, targets::MODE_COLOR_DEPTH),
        write(names::RB_COLOR_MASK, 0x0F0F),
        write(names::RB_DEPTHCONTROL, 0x4),
        draw(),
    ];
    let replay = builder().build().replay(&packets);
    assert_eq!(replay.groups()[0].to_string(), "[640x480] COLOR0 COLOR2 DEPTH [1]");
}

#[test]
fn deterministic() {
    let packets = [
        write(names::PA_SC_WINDOW_SCISSOR_BR, 0x0100_0100),
        draw(),
        RawPacket::new(0xC002_2D00, [0x0000_0004, 0xA, 0xB]),
        draw(),
        write(0x2000, 1),
    ];
    let reconstructor = builder().build();
    let a = reconstructor.replay(&packets);
    let b = reconstructor.replay(&packets);
    assert_eq!(a.groups(), b.groups());
    assert_eq!(a.calls().len(), b.calls().len());
    for (a, b) in a.calls().iter().zip(b.calls()) {
        assert_eq!(a.capture(), b.capture());
        assert_eq!(a.packets().len(), b.packets().len());
    }
}
