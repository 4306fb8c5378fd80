// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::*;

use crate::memory::{BlockId, MemoryRef};
use crate::shader::fetch::{DataType, Dimension, FetchFormat, TextureFetchInstruction};
use crate::shader::tests::{exec_program, position_fetch};

fn block(id: u32, address: u32, words: &[u32]) -> Arc<MemoryBlock> {
    Arc::new(MemoryBlock::from_words(BlockId(id), address, words))
}

fn run(packets: &[RawPacket]) -> Executor {
    let mut executor = builder().build();
    packets.iter().for_each(|p| {
        executor.execute(p);
    });
    executor
}

fn record<R: Resolver>(executor: &mut Executor<R>, packet: &RawPacket) -> (Outcome, Record) {
    let mut record = Record::default();
    let outcome = executor.execute_with(packet, &mut record);
    (outcome, record)
}

fn logged(record: &Record, line: &str) -> bool {
    record.log.iter().any(|l| l == line)
}

macro_rules! outcome_test {
    ($n:ident, $h:literal, [$($w:literal),*], $o:expr) => {
        #[test]
        fn $n() {
            let words: Vec<u32> = vec![$($w),*];
            let mut executor = builder().build();
            assert_eq!(executor.execute(&RawPacket::new($h, words)), $o);
        }
    };
}

outcome_test!(filler, 0x8000_0000, [], Outcome::Skipped);
outcome_test!(nop, 0xC000_1000, [0x0], Outcome::Executed);
outcome_test!(bin_mask, 0xC000_5000, [0x0], Outcome::Skipped);
outcome_test!(unknown_opcode, 0xC000_7F00, [0x0], Outcome::Invalid);
outcome_test!(truncated, 0xC000_4600, [], Outcome::Invalid);
outcome_test!(binned_draw, 0xC001_3400, [0x0, 0x0003_0084], Outcome::Invalid);
outcome_test!(unknown_bank, 0xC001_2D00, [0x0007_0000, 0x1], Outcome::Invalid);

#[test]
fn register_block() {
    let executor = run(&[RawPacket::new(0x0003_2000, [1, 2, 3, 4])]);
    let values = &executor.registers().values()[0x2000..0x2005];
    assert_eq!(values, [1, 2, 3, 4, 0]);
}

#[test]
fn register_repeat() {
    let executor = run(&[RawPacket::new(0x0001_A102, [5, 6])]);
    assert_eq!(executor.registers().reg(0x2102), 6);
    assert_eq!(executor.registers().reg(0x2103), 0);
}

#[test]
fn register_pair() {
    let executor = run(&[RawPacket::new(0x4010_2981, [7, 8])]);
    assert_eq!(executor.registers().reg(0x181), 7);
    assert_eq!(executor.registers().reg(0x205), 8);
}

#[test]
fn register_out_of_range() {
    let mut executor = builder().build();
    let outcome = executor.execute(&RawPacket::new(0x0000_7FFF, [1]));
    assert_eq!(outcome, Outcome::Executed);
    assert!(executor.registers().values().iter().all(|v| *v == 0));
}

#[test]
fn register_write_log() {
    let mut executor = builder().build();
    let (_, record) = record(&mut executor, &RawPacket::new(0x0000_2000, [0x500]));
    assert_eq!(record.description, "SetRegs [Start: 8192, Count: 1]");
    assert!(record.log[0].starts_with("Register RB_SURFACE_INFO (8192) written with 1280 ("));
}

#[test]
fn event_write() {
    let executor = run(&[RawPacket::new(0xC000_4600, [0xFFFF_FFC5])]);
    assert_eq!(executor.registers().reg(names::VGT_EVENT_INITIATOR), 0x05);
}

#[test]
fn tile_splice() {
    let mut executor = builder().build();
    assert_eq!(executor.tile_mask(), 0xFFFF_FFFF);
    assert_eq!(executor.tile_select(), 0xFFFF_FFFF);

    executor.execute(&RawPacket::new(0xC000_6000, [0x1234_5678]));
    assert_eq!(executor.tile_mask(), 0x0000_0000_1234_5678);
    executor.execute(&RawPacket::new(0xC000_6100, [0xAABB_CCDD]));
    assert_eq!(executor.tile_mask(), 0xAABB_CCDD_1234_5678);

    executor.execute(&RawPacket::new(0xC000_6300, [0x0000_0001]));
    assert_eq!(executor.tile_select(), 0x0000_0001_FFFF_FFFF);
}

#[test]
fn predicated_skip() {
    let mut executor = builder().build();
    executor.execute(&RawPacket::new(0xC000_6000, [0x0]));
    assert_eq!(executor.tile_mask(), 0);

    let (outcome, record) = record(&mut executor, &RawPacket::new(0xC000_4601, [0x16]));
    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(record.description, "EVENT_WRITE");
    assert_eq!(executor.registers().reg(names::VGT_EVENT_INITIATOR), 0);

    // Predication is checked before decoding
    let outcome = executor.execute(&RawPacket::new(0xC000_4601, []));
    assert_eq!(outcome, Outcome::Skipped);

    // Unpredicated packets are unaffected
    let outcome = executor.execute(&RawPacket::new(0xC000_4600, [0x16]));
    assert_eq!(outcome, Outcome::Executed);
    assert_eq!(executor.registers().reg(names::VGT_EVENT_INITIATOR), 0x16);
}

#[test]
fn predicated_pass() {
    let mut executor = builder().build();
    executor.execute(&RawPacket::new(0xC000_6000, [0x0000_0002]));
    executor.execute(&RawPacket::new(0xC000_6200, [0x0000_0006]));
    let outcome = executor.execute(&RawPacket::new(0xC000_4601, [0x16]));
    assert_eq!(outcome, Outcome::Executed);
    assert_eq!(executor.registers().reg(names::VGT_EVENT_INITIATOR), 0x16);
}

#[test]
fn set_constant() {
    let mut executor = builder().build();
    let packet = RawPacket::new(0xC002_2D00, [0x0000_0004, 0xA, 0xB]);
    let (_, record) = record(&mut executor, &packet);
    assert_eq!(executor.registers().reg(0x4004), 0xA);
    assert_eq!(executor.registers().reg(0x4005), 0xB);
    assert!(logged(&record, "Block: ALU"));

    executor.execute(&RawPacket::new(0xC001_2D00, [0x0001_0002, 0xC]));
    assert_eq!(executor.registers().reg(0x4802), 0xC);
    executor.execute(&RawPacket::new(0xC001_2D00, [0x0004_0001, 0xD]));
    assert_eq!(executor.registers().reg(names::RB_SURFACE_INFO + 1), 0xD);
}

#[test]
fn set_constant_direct() {
    let executor = run(&[RawPacket::new(0xC001_5500, [0x2100, 9])]);
    assert_eq!(executor.registers().reg(0x2100), 9);
}

#[test]
fn load_alu_constant() {
    let data = block(1, 0x3000, &[1, 2, 3, 4]);
    let packet = RawPacket::new(0xC002_2F00, [0x3000, 0x0000_0008, 3])
        .with_memory([MemoryRef::read(data)]);
    let (outcome, record) = record(&mut builder().build(), &packet);
    assert_eq!(outcome, Outcome::Executed);
    assert!(logged(&record, "Data address: 0x00003000"));

    let executor = run(&[packet]);
    let values = &executor.registers().values()[0x4008..0x400C];
    assert_eq!(values, [1, 2, 3, 0]);
}

#[test]
fn load_alu_constant_fallback() {
    let data = block(1, 0x3000, &[1, 2]);
    let mut executor = builder()
        .with_fallback(vec![MemoryRef::read(data)])
        .build();
    executor.execute(&RawPacket::new(0xC002_2F00, [0x3000, 0x0001_0000, 2]));
    assert_eq!(executor.registers().reg(0x4800), 1);
    assert_eq!(executor.registers().reg(0x4801), 2);
}

#[test]
fn load_alu_constant_unresolved() {
    let mut executor = builder().build();
    let outcome = executor.execute(&RawPacket::new(0xC002_2F00, [0x3000, 0x8, 2]));
    assert_eq!(outcome, Outcome::Executed);
    assert_eq!(executor.registers().reg(0x4008), 0);
}

#[test]
fn reg_rmw_immediate() {
    let executor = run(&[
        RawPacket::new(0x0000_0100, [0x0F0]),
        RawPacket::new(0xC000_2100, [0x0000_0100]),
    ]);
    assert_eq!(executor.registers().reg(0x100), 0x100);
}

#[test]
fn reg_rmw_registers() {
    let mut executor = run(&[RawPacket::new(0x0000_0100, [0x0F0])]);
    let (_, record) = record(&mut executor, &RawPacket::new(0xC000_2100, [0xC000_0100]));
    assert_eq!(executor.registers().reg(0x100), 0x0F0);
    assert!(logged(&record, "Or mask value: 0xF0"));
    assert!(logged(&record, "Final value: 0xF0"));
}

#[test]
fn wait_reg_mem_register() {
    let mut executor = run(&[RawPacket::new(0x0000_0100, [0x105])]);
    let packet = RawPacket::new(0xC004_3C00, [0x3, 0x100, 0x5, 0xFF, 10]);
    let (outcome, record) = record(&mut executor, &packet);
    assert_eq!(outcome, Outcome::Executed);
    assert_eq!(record.description, "WAIT_REG_MEM");
    assert!(logged(&record, "Incoming value: 0x105"));
    assert!(logged(&record, "Masked value: 0x5"));
    assert!(logged(&record, "Condition: 0x5 == 0x5"));
}

#[test]
fn wait_reg_mem_memory() {
    let data = block(1, 0x3000, &[7]);
    let packet = RawPacket::new(0xC004_3C00, [0x17, 0x3000, 0x5, 0xFF, 10])
        .with_memory([MemoryRef::read(data)]);
    let (_, record) = record(&mut builder().build(), &packet);
    assert!(logged(&record, "Memory address: 0x3000"));
    assert!(logged(&record, "Incoming value: 0x7"));
    assert!(logged(&record, "Condition: Always"));
}

#[test]
fn cond_write_register() {
    let mut executor = run(&[RawPacket::new(0x0000_0100, [5])]);
    let packet = RawPacket::new(0xC005_4500, [0x3, 0x100, 5, 0xFF, 0x101, 0xABCD]);
    let (_, record) = record(&mut executor, &packet);
    assert_eq!(executor.registers().reg(0x101), 0xABCD);
    assert!(logged(&record, "Matched: YES"));

    let packet = RawPacket::new(0xC005_4500, [0x3, 0x100, 6, 0xFF, 0x102, 0xABCD]);
    let (_, record) = self::record(&mut executor, &packet);
    assert_eq!(executor.registers().reg(0x102), 0);
    assert!(logged(&record, "Matched: NO"));
}

#[test]
fn cond_write_swapped_memory() {
    let data = block(1, 0x3000, &[5]);
    let packet = RawPacket::new(0xC005_4500, [0x13, 0x3002, 5, 0xFF, 0x101, 0x1])
        .with_memory([MemoryRef::read(data)]);
    let mut executor = builder().build();
    let (_, record) = record(&mut executor, &packet);
    assert!(logged(&record, "Memory mode: 8in32"));
    assert!(logged(&record, "Matched: YES"));
    assert_eq!(executor.registers().reg(0x101), 1);
}

#[test]
fn cond_write_memory_target() {
    let mut executor = builder().build();
    let packet = RawPacket::new(0xC005_4500, [0x107, 0x100, 0, 0, 0x4002, 0x1]);
    let (outcome, record) = record(&mut executor, &packet);
    assert_eq!(outcome, Outcome::Executed);
    assert!(logged(&record, "Write address: 0x4000"));
    assert!(logged(&record, "Write mode: 8in32"));
    assert!(executor.registers().values().iter().all(|v| *v == 0));
}

#[test]
fn load_shader() {
    let microcode = block(1, 0x1000, &[0, 0, 0]);
    let packet = RawPacket::new(0xC001_2700, [0x1001, 3])
        .with_memory([MemoryRef::read(microcode.clone())]);
    let mut executor = builder().build();
    let (_, record) = record(&mut executor, &packet);
    assert_eq!(record.description, "LoadPixelShader");
    assert!(logged(&record, "Shader type: Pixel"));
    assert!(logged(&record, "Shader data: 0x001000"));
    assert_eq!(executor.registers().shader(Stage::Pixel), Some(&microcode));
    assert_eq!(executor.registers().shader(Stage::Vertex), None);
}

#[test]
fn load_shader_unresolved() {
    let mut executor = builder().build();
    let (outcome, record) = record(&mut executor, &RawPacket::new(0xC001_2700, [0x1000, 3]));
    assert_eq!(outcome, Outcome::Executed);
    assert!(logged(&record, "Shader data: NONE"));
    assert_eq!(executor.registers().shader(Stage::Vertex), None);
}

#[test]
fn load_shader_immediate() {
    let microcode = block(1, 0x1000, &[0, 0, 0]);
    let other = block(2, 0x2000, &[0, 0, 0]);

    let single = RawPacket::new(0xC001_2B00, [0x0, 3]).with_memory([MemoryRef::read(
        microcode.clone(),
    )]);
    let mut executor = builder().build();
    let (_, record) = record(&mut executor, &single);
    assert_eq!(record.description, "LoadVertexShaderIM");
    assert_eq!(executor.registers().shader(Stage::Vertex), Some(&microcode));

    let ambiguous = RawPacket::new(0xC001_2B00, [0x1, 3])
        .with_memory([MemoryRef::read(microcode), MemoryRef::read(other)]);
    executor.execute(&ambiguous);
    assert_eq!(executor.registers().shader(Stage::Pixel), None);
}

/// Packets binding shaders and fetch constants for a draw
fn draw_setup() -> (Vec<RawPacket>, RawPacket) {
    let vertex_shader = block(1, 0x1000, &exec_program(&[position_fetch().encode()], 0b01));
    let texture = TextureFetchInstruction {
        dst_reg: 0,
        const_idx: 3,
        dst_swiz: 0x688,
        dimension: 1,
        ..Default::default()
    };
    let pixel_shader = block(2, 0x1800, &exec_program(&[texture.encode()], 0b01));
    let vertices = block(3, 0x2000, &[0; 9]);

    let setup = vec![
        RawPacket::new(0xC001_2700, [0x1000, 6])
            .with_memory([MemoryRef::read(vertex_shader).with_tag("VSSourceCode")]),
        RawPacket::new(0xC001_2700, [0x1801, 6]).with_memory([MemoryRef::read(pixel_shader)]),
        // Vertex fetch constant in slot 95
        RawPacket::new(0x0001_48BE, [0x0000_2003, 0x0000_0026]),
        // Texture fetch constant in slot 3
        RawPacket::new(0x0005_4812, [0x2, 0x0000_5006, 0xFF, 0x0, 0x0, 0x200]),
    ];
    let draw = RawPacket::new(0xC001_2200, [0x0, 0x0003_0084])
        .with_memory([MemoryRef::read(vertices).with_tag("VSSourceCode")]);
    (setup, draw)
}

#[test]
fn draw_details() {
    let (setup, draw) = draw_setup();
    let mut executor = run(&setup);
    let (outcome, record) = record(&mut executor, &draw);
    assert_eq!(outcome, Outcome::Executed);
    assert_eq!(record.description, "Draw: TRIANGLELIST 3");
    assert!(logged(&record, "Draw: Not Indexed"));
    assert!(logged(&record, "Index count: 3"));
    assert!(logged(&record, "Base vertex: 0"));
    assert!(logged(&record, "Primitive type: TRIANGLELIST"));
    assert!(logged(&record, "Vertex shader HLSL: 0x002000 (block #3)"));
    assert!(logged(
        &record,
        "VFetch: Address=0x002000 Slot=95 Offset=0 Stride=12 Format=FMT_32_32_32_FLOAT DataType=FLOAT"
    ));

    assert_eq!(record.streams.len(), 1);
    let stream = &record.streams[0];
    assert_eq!(stream.block.id(), BlockId(3));
    assert_eq!(stream.stride, 48);
    assert_eq!(stream.endian, crate::bits::Endian::Swap8In32);
    assert_eq!(stream.elements.len(), 1);
    assert_eq!(stream.elements[0].offset, 0);
    assert_eq!(stream.elements[0].format, FetchFormat::FMT_32_32_32_FLOAT);
    assert_eq!(stream.elements[0].data_type, DataType::Float);

    assert_eq!(record.textures.len(), 1);
    let texture = &record.textures[0];
    assert_eq!(texture.kind, 2);
    assert_eq!(texture.format, 6);
    assert_eq!(texture.byte_address(), 0x5000);
    assert_eq!(texture.size, 0xFF);
    assert_eq!(texture.dimension, Dimension::D2);
    assert!(logged(&record, "Pixel shader texture 3"));
    assert!(logged(&record, "  Bound: Address: 0x00005000"));
    assert!(logged(&record, "  Shader: Dimension: DIMENSION_2D"));

    assert_eq!(executor.cache().len(), 2);
}

#[test]
fn draw_without_sink() {
    let (setup, draw) = draw_setup();
    let mut executor = run(&setup);
    assert_eq!(executor.execute(&draw), Outcome::Executed);
    assert!(executor.cache().is_empty());
}

#[test]
fn draw_without_fetch_details() {
    let (setup, draw) = draw_setup();
    let params = config::Parameters {
        fetch_details: false,
        ..Default::default()
    };
    let mut executor = builder().with_params(&params).build();
    setup.iter().for_each(|p| {
        executor.execute(p);
    });
    let (_, record) = record(&mut executor, &draw);
    assert!(logged(&record, "Draw: Not Indexed"));
    assert!(record.streams.is_empty());
    assert!(record.textures.is_empty());
    assert!(executor.cache().is_empty());
}

#[test]
fn draw_indexed() {
    let mut executor = run(&[RawPacket::new(0x0000_2102, [10])]);
    let packet = RawPacket::new(0xC003_2200, [0x0, 0x0006_0004, 0x6000, 0x8000_0006]);
    let (_, record) = record(&mut executor, &packet);
    assert_eq!(record.description, "Draw: Indexed TRIANGLELIST 6");
    assert!(logged(&record, "Draw: Indexed"));
    assert!(logged(&record, "Index data endianess: 8in32"));
    assert!(logged(&record, "Index data address: 0x006000"));
    assert!(logged(&record, "Index count: 6"));
    assert!(logged(&record, "Base vertex: 10"));
}

#[test]
fn draw_not_issued() {
    let mut executor = builder().build();
    let packet = RawPacket::new(0xC000_3600, [0x0006_0044]);
    let (outcome, record) = record(&mut executor, &packet);
    assert_eq!(outcome, Outcome::Executed);
    assert!(logged(&record, "Draw: Indexed2"));
    assert!(!record.log.iter().any(|l| l.starts_with("Index count")));
}

#[test]
fn shared_cache() {
    let cache = Arc::new(ShaderCache::new());
    let executor = builder().with_cache(cache.clone()).build();
    assert!(Arc::ptr_eq(executor.cache(), &cache));
}

#[test]
fn initial_registers() {
    let mut registers = RegisterFile::default();
    registers.write(0x2000, 0x42).unwrap();
    let executor = builder().with_registers(registers).build();
    assert_eq!(executor.registers().reg(0x2000), 0x42);
    assert_eq!(executor.into_registers().reg(0x2000), 0x42);
}
