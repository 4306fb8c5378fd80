// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::*;

use crate::draw;
use crate::memory::{Mode, Resolver};
use crate::registers::names;

const BLOCK_RECORD: usize = 24;
const REF_RECORD: usize = 24;
const PACKET_RECORD: usize = 20;
const COMMAND_RECORD: usize = 32;

/// Writer for synthetic dumps
#[derive(Clone)]
struct Writer {
    magic: u32,
    version: u32,
    blocks: Vec<(u64, u32, Vec<u8>)>,
    refs: Vec<(u32, u32, &'static str)>,
    words: Vec<u32>,
    packets: Vec<[u32; 5]>,
    command_blocks: Vec<(&'static str, [u32; 4])>,
}

impl Writer {
    fn new() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            blocks: Vec::new(),
            refs: Vec::new(),
            words: Vec::new(),
            packets: Vec::new(),
            command_blocks: Vec::new(),
        }
    }

    fn bytes(&self) -> Vec<u8> {
        let block_table = HEADER_SIZE;
        let ref_table = block_table + BLOCK_RECORD * self.blocks.len();
        let word_table = ref_table + REF_RECORD * self.refs.len();
        let packet_table = word_table + 4 * self.words.len();
        let command_table = packet_table + PACKET_RECORD * self.packets.len();
        let memory = command_table + COMMAND_RECORD * self.command_blocks.len();

        let mut out = Vec::new();
        let put32 = |out: &mut Vec<u8>, v: u32| out.extend(v.to_le_bytes());
        let put64 = |out: &mut Vec<u8>, v: u64| out.extend(v.to_le_bytes());
        let put_tag = |out: &mut Vec<u8>, t: &str| {
            let mut raw = [0u8; 16];
            raw[..t.len()].copy_from_slice(t.as_bytes());
            out.extend(raw);
        };

        put32(&mut out, self.magic);
        put32(&mut out, self.version);
        for (count, offset) in [
            (self.command_blocks.len(), command_table),
            (self.packets.len(), packet_table),
            (self.refs.len(), ref_table),
            (self.blocks.len(), block_table),
            (self.words.len(), word_table),
        ] {
            put32(&mut out, count as u32);
            put64(&mut out, offset as u64);
        }
        put64(&mut out, memory as u64);
        assert_eq!(out.len(), HEADER_SIZE);

        let mut data_offset = 0;
        for (crc, address, data) in &self.blocks {
            put64(&mut out, *crc);
            put64(&mut out, data_offset);
            put32(&mut out, *address);
            put32(&mut out, data.len() as u32);
            data_offset += data.len() as u64;
        }
        for (block, mode, t) in &self.refs {
            put32(&mut out, *block);
            put32(&mut out, *mode);
            put_tag(&mut out, t);
        }
        self.words.iter().for_each(|w| put32(&mut out, *w));
        for packet in &self.packets {
            packet.iter().for_each(|w| put32(&mut out, *w));
        }
        for (t, spans) in &self.command_blocks {
            put_tag(&mut out, t);
            spans.iter().for_each(|w| put32(&mut out, *w));
        }
        assert_eq!(out.len(), memory);

        for (_, _, data) in &self.blocks {
            out.extend(data);
        }
        out
    }
}

/// A small frame: a register write and a draw inside a nested command block
fn frame() -> Writer {
    Writer {
        blocks: vec![
            (0xDEAD, 0x1000, b"float4 main()".to_vec()),
            (0xBEEF, 0xC000_2000, vec![0, 0, 0, 7, 0, 0, 0, 8]),
        ],
        refs: vec![(0, 0, "PSSourceCode"), (1, 1, "RenderTarget")],
        words: vec![0x500, 0x0, 0x0003_0084],
        packets: vec![
            [0x0000_2000, 0, 1, 0, 0],
            [0xC001_2200, 1, 2, 0, 2],
        ],
        command_blocks: vec![("Frame", [1, 1, 0, 0]), ("Draw", [0, 0, 0, 2])],
        ..Writer::new()
    }
}

#[test]
fn load() {
    let dump = Dump::from_bytes(&frame().bytes()).unwrap();

    let header = dump.header();
    assert_eq!(header.packets.count, 2);
    assert_eq!(header.memory_blocks.offset, HEADER_SIZE as u64);

    let blocks = dump.memory_blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].id(), BlockId(0));
    assert_eq!(blocks[0].address(), 0x1000);
    assert_eq!(blocks[0].crc(), 0xDEAD);
    assert_eq!(blocks[0].data(), b"float4 main()");
    assert_eq!(blocks[1].id(), BlockId(1));
    assert_eq!(blocks[1].load_u32_be(4), Some(8));

    let packets = dump.packets();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].header(), 0x0000_2000);
    assert_eq!(packets[0].words(), [0x500]);
    assert!(packets[0].memory().is_empty());
    assert_eq!(packets[1].words(), [0x0, 0x0003_0084]);

    let memory = packets[1].memory();
    assert_eq!(memory.len(), 2);
    assert_eq!(memory[0].tag, "PSSourceCode");
    assert_eq!(memory[0].mode, Mode::Read);
    assert_eq!(memory[1].tag, "RenderTarget");
    assert_eq!(memory[1].mode, Mode::Write);
    assert!(Arc::ptr_eq(&memory[1].block, &blocks[1]));
}

#[test]
fn command_blocks() {
    let dump = Dump::from_bytes(&frame().bytes()).unwrap();
    let root = dump.root().unwrap();
    assert_eq!(root.tag, "Frame");
    assert!(dump.block_packets(root).is_empty());

    let subs = dump.sub_blocks(root);
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].tag, "Draw");
    assert_eq!(subs[0].packets, 0..2);
    assert_eq!(dump.block_packets(&subs[0]), dump.packets());
}

#[test]
fn empty() {
    let dump = Dump::from_bytes(&Writer::new().bytes()).unwrap();
    assert!(dump.packets().is_empty());
    assert!(dump.root().is_none());
}

#[test]
fn resolver() {
    let dump = Dump::from_bytes(&frame().bytes()).unwrap();
    assert_eq!(dump.find(0x1000).map(|b| b.id()), Some(BlockId(0)));
    assert_eq!(dump.find(0x2000).map(|b| b.id()), Some(BlockId(1)));
    assert_eq!(dump.find(0xC000_2000).map(|b| b.id()), Some(BlockId(1)));
    assert!(dump.find(0x3000).is_none());
}

#[test]
fn replay() {
    let writer = Writer {
        blocks: vec![(0, 0x3000, vec![0, 0, 0, 7, 0, 0, 0, 8])],
        words: vec![0x3000, 0x0, 2, 0x0, 0x0003_0084],
        packets: vec![[0xC002_2F00, 0, 3, 0, 0], [0xC001_2200, 3, 2, 0, 0]],
        ..Writer::new()
    };
    let dump = Dump::from_bytes(&writer.bytes()).unwrap();
    let replay = draw::builder()
        .with_fallback(&dump)
        .build()
        .replay(dump.packets());
    assert_eq!(replay.calls().len(), 1);
    let capture = replay.calls()[0].capture().unwrap();
    assert_eq!(capture.reg(names::SHADER_CONSTANT_000_X), 7);
    assert_eq!(capture.reg(names::SHADER_CONSTANT_000_X + 1), 8);
}

#[test]
fn error_source() {
    use core::error::Error as _;

    let io = Error::from(io::Error::other("disk"));
    assert!(io.source().is_some());
    assert!(Error::BadMagic(0).source().is_none());
    assert_eq!(
        Error::Truncated(Section::Packets).to_string(),
        "Dump ends within the packet table"
    );
}

macro_rules! error_test {
    ($n:ident, $b:expr, $p:pat) => {
        #[test]
        fn $n() {
            let result = Dump::from_bytes(&$b);
            assert!(matches!(result, Err($p)), "{result:?}");
        }
    };
}

fn truncated(mut bytes: Vec<u8>, len: usize) -> Vec<u8> {
    bytes.truncate(len);
    bytes
}

error_test!(
    bad_magic,
    Writer {
        magic: 0x1234,
        ..frame()
    }
    .bytes(),
    Error::BadMagic(0x1234)
);
error_test!(
    bad_version,
    Writer {
        version: 2,
        ..frame()
    }
    .bytes(),
    Error::UnsupportedVersion(2)
);
error_test!(no_magic, Vec::<u8>::new(), Error::Truncated(Section::Header));
error_test!(
    truncated_header,
    truncated(frame().bytes(), 40),
    Error::Truncated(Section::Header)
);
error_test!(
    truncated_blocks,
    truncated(frame().bytes(), HEADER_SIZE + 30),
    Error::Truncated(Section::MemoryBlocks)
);
error_test!(
    truncated_data,
    {
        let bytes = frame().bytes();
        let len = bytes.len() - 1;
        truncated(bytes, len)
    },
    Error::Truncated(Section::MemoryData)
);
error_test!(
    block_out_of_range,
    Writer {
        refs: vec![(2, 0, "")],
        ..frame()
    }
    .bytes(),
    Error::BlockOutOfRange { index: 2 }
);
error_test!(
    words_out_of_range,
    Writer {
        packets: vec![[0xC001_2200, 2, 2, 0, 0]],
        command_blocks: Vec::new(),
        ..frame()
    }
    .bytes(),
    Error::WordsOutOfRange { first: 2, count: 2 }
);
error_test!(
    refs_out_of_range,
    Writer {
        packets: vec![[0xC001_2200, 1, 2, 1, 2]],
        command_blocks: Vec::new(),
        ..frame()
    }
    .bytes(),
    Error::RefOutOfRange { first: 1, count: 2 }
);
error_test!(
    packets_out_of_range,
    Writer {
        command_blocks: vec![("Frame", [0, 0, 1, 2])],
        ..frame()
    }
    .bytes(),
    Error::PacketsOutOfRange { first: 1, count: 2 }
);
error_test!(
    sub_blocks_out_of_range,
    Writer {
        command_blocks: vec![("Frame", [1, 1, 0, 0])],
        ..frame()
    }
    .bytes(),
    Error::SubBlocksOutOfRange { first: 1, count: 1 }
);
