// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Capture dump files
//!
//! A dump holds the complete packet stream of one captured frame, the GPU
//! memory blocks the packets refer to and a hierarchy of tagged
//! [`CommandBlock`]s grouping the packets. All values are little endian.
//!
//! The file starts with a fixed size [`Header`]. The tables follow the header
//! back to back in the order memory blocks, memory references, data words,
//! packets and command blocks. The contents of the memory blocks are located
//! relative to [`Header::memory_dump_offset`].
//!
//! # Example
//!
//! ```no_run
//! use xenon_gpu_replay::{draw, dump};
//!
//! let dump = dump::Dump::open("frame.gpud")?;
//! let replay = draw::builder()
//!     .with_fallback(&dump)
//!     .build()
//!     .replay(dump.packets());
//! println!("{} draw calls", replay.calls().len());
//! # Ok::<(), dump::Error>(())
//! ```

pub mod error;

#[cfg(test)]
mod tests;

pub use error::{Error, Section};

use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use crate::memory::{self, BlockId, HIGH_ADDRESS_TAG, MemoryBlock, MemoryRef};
use crate::packet::RawPacket;

/// Magic number at the start of every dump, `"DUPG"` in file order
pub const MAGIC: u32 = 0x4750_5544;

/// Supported format version
pub const VERSION: u32 = 1;

/// Size of the [`Header`] in bytes
pub const HEADER_SIZE: usize = 76;

/// Size of a tag field in bytes
const TAG_SIZE: usize = 16;

/// Number of entries and file offset of a table
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub count: u32,
    pub offset: u64,
}

/// Dump file header
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub command_blocks: Table,
    pub packets: Table,
    pub memory_refs: Table,
    pub memory_blocks: Table,
    pub words: Table,
    /// Base offset of the memory block contents
    pub memory_dump_offset: u64,
}

/// A tagged group of packets, possibly containing nested groups
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandBlock {
    pub tag: String,
    /// Indices of the nested blocks in [`Dump::command_blocks`]
    pub sub_blocks: Range<usize>,
    /// Indices of the packets in [`Dump::packets`]
    pub packets: Range<usize>,
}

/// A loaded dump
#[derive(Clone, Debug)]
pub struct Dump {
    header: Header,
    blocks: Vec<Arc<MemoryBlock>>,
    packets: Vec<RawPacket>,
    command_blocks: Vec<CommandBlock>,
}

impl Dump {
    /// Load a dump from the file at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Self::read(io::BufReader::new(file))
    }

    /// Load a dump from an in-memory buffer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::read(io::Cursor::new(bytes))
    }

    /// Load a dump from the given reader
    ///
    /// The reader is expected to be positioned at the start of the dump.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self, Error> {
        let mut input = Input { inner: reader };

        let magic = input.u32(Section::Header)?;
        if magic != MAGIC {
            return Err(Error::BadMagic(magic));
        }
        let version = input.u32(Section::Header)?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let header = Header {
            command_blocks: input.table()?,
            packets: input.table()?,
            memory_refs: input.table()?,
            memory_blocks: input.table()?,
            words: input.table()?,
            memory_dump_offset: input.u64(Section::Header)?,
        };

        let block_records = (0..header.memory_blocks.count)
            .map(|_| -> Result<_, Error> {
                let section = Section::MemoryBlocks;
                Ok(BlockRecord {
                    crc: input.u64(section)?,
                    offset: input.u64(section)?,
                    address: input.u32(section)?,
                    size: input.u32(section)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let ref_records = (0..header.memory_refs.count)
            .map(|_| -> Result<_, Error> {
                let section = Section::MemoryRefs;
                Ok(RefRecord {
                    block: input.u32(section)?,
                    mode: input.u32(section)?,
                    tag: input.tag(section)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let words = (0..header.words.count)
            .map(|_| input.u32(Section::Words))
            .collect::<Result<Vec<_>, Error>>()?;

        let packet_records = (0..header.packets.count)
            .map(|_| -> Result<_, Error> {
                let section = Section::Packets;
                Ok(PacketRecord {
                    header: input.u32(section)?,
                    words: input.span(section)?,
                    refs: input.span(section)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let command_records = (0..header.command_blocks.count)
            .map(|_| -> Result<_, Error> {
                let section = Section::CommandBlocks;
                Ok((input.tag(section)?, input.span(section)?, input.span(section)?))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let blocks = block_records
            .iter()
            .enumerate()
            .map(|(i, record)| -> Result<_, Error> {
                let data = input.data(header.memory_dump_offset, record)?;
                let block = MemoryBlock::new(BlockId(i as u32), record.address, data);
                Ok(Arc::new(block.with_crc(record.crc)))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let refs = ref_records
            .into_iter()
            .map(|record| -> Result<_, Error> {
                let block = blocks
                    .get(record.block as usize)
                    .ok_or(Error::BlockOutOfRange {
                        index: record.block,
                    })?;
                Ok(MemoryRef {
                    block: block.clone(),
                    mode: memory::Mode::from(record.mode),
                    tag: record.tag,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let packets = packet_records
            .into_iter()
            .map(|record| -> Result<_, Error> {
                let payload = record
                    .words
                    .slice(&words)
                    .ok_or(Error::WordsOutOfRange {
                        first: record.words.first,
                        count: record.words.count,
                    })?;
                let memory = record.refs.slice(&refs).ok_or(Error::RefOutOfRange {
                    first: record.refs.first,
                    count: record.refs.count,
                })?;
                Ok(RawPacket::new(record.header, payload).with_memory(memory))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let command_blocks = command_records
            .into_iter()
            .map(|(tag, sub_blocks, block_packets)| -> Result<_, Error> {
                Ok(CommandBlock {
                    tag,
                    sub_blocks: sub_blocks
                        .range(header.command_blocks.count as usize)
                        .ok_or(Error::SubBlocksOutOfRange {
                            first: sub_blocks.first,
                            count: sub_blocks.count,
                        })?,
                    packets: block_packets
                        .range(packets.len())
                        .ok_or(Error::PacketsOutOfRange {
                            first: block_packets.first,
                            count: block_packets.count,
                        })?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        tracing::debug!(
            blocks = blocks.len(),
            packets = packets.len(),
            command_blocks = command_blocks.len(),
            "Loaded dump"
        );

        Ok(Self {
            header,
            blocks,
            packets,
            command_blocks,
        })
    }

    /// Retrieve the dump's header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Retrieve all memory blocks, indexed by [`BlockId`]
    pub fn memory_blocks(&self) -> &[Arc<MemoryBlock>] {
        &self.blocks
    }

    /// Retrieve the complete packet stream
    pub fn packets(&self) -> &[RawPacket] {
        &self.packets
    }

    /// Retrieve all command blocks
    pub fn command_blocks(&self) -> &[CommandBlock] {
        &self.command_blocks
    }

    /// Retrieve the root of the command block hierarchy
    pub fn root(&self) -> Option<&CommandBlock> {
        self.command_blocks.first()
    }

    /// Retrieve the packets directly contained in a command block
    pub fn block_packets(&self, block: &CommandBlock) -> &[RawPacket] {
        self.packets.get(block.packets.clone()).unwrap_or_default()
    }

    /// Retrieve the command blocks nested in a command block
    pub fn sub_blocks(&self, block: &CommandBlock) -> &[CommandBlock] {
        self.command_blocks
            .get(block.sub_blocks.clone())
            .unwrap_or_default()
    }
}

/// Exact-then-tagged lookup over all memory blocks of the dump
impl memory::Resolver for Dump {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        let find = |address| self.blocks.iter().find(|b| b.address() == address);
        find(address).or_else(|| find(HIGH_ADDRESS_TAG | address))
    }
}

struct BlockRecord {
    crc: u64,
    offset: u64,
    address: u32,
    size: u32,
}

struct RefRecord {
    block: u32,
    mode: u32,
    tag: String,
}

struct PacketRecord {
    header: u32,
    words: Span,
    refs: Span,
}

/// A `first`/`count` pair referring into another table
#[derive(Copy, Clone, Debug)]
struct Span {
    first: u32,
    count: u32,
}

impl Span {
    fn range(self, len: usize) -> Option<Range<usize>> {
        let start = self.first as usize;
        let end = start.checked_add(self.count as usize)?;
        (end <= len).then_some(start..end)
    }

    fn slice<T: Clone>(self, items: &[T]) -> Option<Vec<T>> {
        self.range(items.len()).map(|r| items[r].to_vec())
    }
}

/// Little endian reader tracking the current [`Section`]
struct Input<R> {
    inner: R,
}

impl<R: Read + Seek> Input<R> {
    fn bytes<const N: usize>(&mut self, section: Section) -> Result<[u8; N], Error> {
        let mut buf = [0; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| truncated(e, section))?;
        Ok(buf)
    }

    fn u32(&mut self, section: Section) -> Result<u32, Error> {
        self.bytes(section).map(u32::from_le_bytes)
    }

    fn u64(&mut self, section: Section) -> Result<u64, Error> {
        self.bytes(section).map(u64::from_le_bytes)
    }

    fn table(&mut self) -> Result<Table, Error> {
        Ok(Table {
            count: self.u32(Section::Header)?,
            offset: self.u64(Section::Header)?,
        })
    }

    fn span(&mut self, section: Section) -> Result<Span, Error> {
        Ok(Span {
            first: self.u32(section)?,
            count: self.u32(section)?,
        })
    }

    /// Read a NUL padded ASCII tag
    fn tag(&mut self, section: Section) -> Result<String, Error> {
        let raw: [u8; TAG_SIZE] = self.bytes(section)?;
        Ok(String::from_utf8_lossy(&raw).replace('\0', ""))
    }

    fn data(&mut self, base: u64, record: &BlockRecord) -> Result<Vec<u8>, Error> {
        let offset = base
            .checked_add(record.offset)
            .ok_or(Error::Truncated(Section::MemoryData))?;
        self.inner.seek(SeekFrom::Start(offset))?;

        let size = u64::from(record.size);
        let mut data = Vec::new();
        (&mut self.inner).take(size).read_to_end(&mut data)?;
        if data.len() as u64 != size {
            return Err(Error::Truncated(Section::MemoryData));
        }
        Ok(data)
    }
}

fn truncated(e: io::Error, section: Section) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated(section)
    } else {
        Error::Io(e)
    }
}
