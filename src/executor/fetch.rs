// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Fetch constants and vertex streams
//!
//! Shaders name vertex and texture fetch constants by slot. The constants
//! themselves live in the fetch constant bank of the register file and are
//! only resolved at draws.

use std::sync::Arc;

use core::fmt;

use crate::bits::{Endian, Unpacker};
use crate::memory::MemoryBlock;
use crate::registers::names;
use crate::shader::fetch::{DataType, Dimension, FetchFormat, Filter, VertexFetch};
use crate::shader::swizzle::Pattern;

/// Vertex fetch constant, occupying two registers
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexFetchConstant {
    pub kind: u32,
    /// Address of the vertex data in words
    pub address: u32,
    pub endian: Endian,
    /// Size of the vertex data in words
    pub size: u32,
}

impl VertexFetchConstant {
    /// Index of the first register of the constant in the given slot
    pub fn register(slot: u32) -> u32 {
        names::SHADER_CONSTANT_FETCH_00_0 + slot * 2
    }

    /// Decode the constant from its two registers
    pub fn decode([d0, d1]: [u32; 2]) -> Self {
        let mut a = Unpacker::new(d0);
        let mut b = Unpacker::new(d1);
        Self {
            kind: a.take(2),
            address: a.take(30),
            endian: Endian::from_bits(b.take(2)),
            size: b.take(24),
        }
    }

    /// GPU address of the vertex data in bytes
    pub fn byte_address(&self) -> u32 {
        self.address << 2
    }
}

/// Texture fetch constant, occupying six registers
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureFetchConstant {
    pub kind: u32,
    /// Signedness of the x, y, z and w components
    pub sign: [u32; 4],
    /// Clamp modes along x, y and z
    pub clamp: [u32; 3],
    pub pitch: u32,
    pub tiled: bool,
    pub format: u32,
    pub endian: Endian,
    /// Address of the texture data in 4 KiB pages
    pub address: u32,
    /// Packed size, layout depending on the dimension
    pub size: u32,
    pub swizzle: u32,
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mip_filter: Filter,
    pub border: bool,
    pub mip_min_level: u32,
    pub mip_max_level: u32,
    pub dimension: Dimension,
}

impl TextureFetchConstant {
    /// Index of the first register of the constant in the given slot
    pub fn register(slot: u32) -> u32 {
        names::SHADER_CONSTANT_FETCH_00_0 + slot * 6
    }

    /// Decode the constant from its six registers
    pub fn decode([d0, d1, d2, d3, d4, d5]: [u32; 6]) -> Self {
        let mut a = Unpacker::new(d0);
        let mut b = Unpacker::new(d1);
        let mut d = Unpacker::new(d3);
        let mut e = Unpacker::new(d4);

        let kind = a.take(2);
        let sign = [a.take(2), a.take(2), a.take(2), a.take(2)];
        let clamp = [a.take(3), a.take(3), a.take(3)];
        let pitch = a.skip(3).take(9);
        let tiled = a.flag();

        let format = b.take(6);
        let endian = Endian::from_bits(b.take(2));
        let address = b.skip(4).take(20);

        let swizzle = d.skip(1).take(12);
        let mag_filter = Filter::from(d.skip(6).take(2));
        let min_filter = Filter::from(d.take(2));
        let mip_filter = Filter::from(d.take(2));
        let border = d.skip(6).flag();

        Self {
            kind,
            sign,
            clamp,
            pitch,
            tiled,
            format,
            endian,
            address,
            size: d2,
            swizzle,
            mag_filter,
            min_filter,
            mip_filter,
            border,
            mip_min_level: e.skip(2).take(4),
            mip_max_level: e.take(4),
            dimension: Dimension::from(d5 >> 9),
        }
    }

    /// GPU address of the texture data in bytes
    pub fn byte_address(&self) -> u32 {
        self.address << 12
    }
}

impl fmt::Display for TextureFetchConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Type: {}", self.kind)?;
        writeln!(f, "Format: {}", self.format)?;
        writeln!(f, "Endian: {}", self.endian)?;
        writeln!(f, "Address: 0x{:08X}", self.byte_address())?;
        writeln!(f, "Dimension: {}", self.dimension)?;
        writeln!(f, "Size: 0x{:X}", self.size)?;
        writeln!(f, "Pitch: {}", self.pitch)?;
        writeln!(f, "Tiled: {}", self.tiled as u8)?;
        let [x, y, z, w] = self.sign;
        writeln!(f, "Sign: [{x},{y},{z},{w}]")?;
        let [x, y, z] = self.clamp;
        writeln!(f, "Clamp: [{x},{y},{z}]")?;
        writeln!(f, "Swizzle: {}", Pattern::write(self.swizzle))?;
        writeln!(f, "MagFilter: {}", self.mag_filter)?;
        writeln!(f, "MinFilter: {}", self.min_filter)?;
        writeln!(f, "MipFilter: {}", self.mip_filter)?;
        writeln!(f, "MipLevels: {}-{}", self.mip_min_level, self.mip_max_level)?;
        write!(f, "Border: {}", self.border as u8)
    }
}

/// An attribute within a vertex [`Stream`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamElement {
    /// Offset within a vertex in bytes
    pub offset: u32,
    pub format: FetchFormat,
    pub data_type: DataType,
}

/// Interleaved vertex data read by a draw
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stream {
    pub block: Arc<MemoryBlock>,
    /// Distance between vertices in bytes
    pub stride: u32,
    pub endian: Endian,
    pub elements: Vec<StreamElement>,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:06X}, {} element(s), stride {}",
            self.block.address(),
            self.elements.len(),
            self.stride
        )?;
        self.elements
            .iter()
            .try_for_each(|e| write!(f, ", {}:{},{}", e.offset, e.format, e.data_type))
    }
}

/// Merges vertex fetches into [`Stream`]s
///
/// Fetches from the same block with the same stride belong to one stream.
/// Streams and their elements keep the order in which they were first seen.
#[derive(Clone, Debug, Default)]
pub struct StreamMerger {
    streams: Vec<Stream>,
}

impl StreamMerger {
    /// Add a fetch reading from the given block
    pub fn add(&mut self, block: &Arc<MemoryBlock>, fetch: &VertexFetch) {
        let stride = fetch.byte_stride();
        let element = StreamElement {
            offset: fetch.byte_offset(),
            format: fetch.format,
            data_type: fetch.data_type,
        };

        let existing = self
            .streams
            .iter_mut()
            .find(|s| s.block.id() == block.id() && s.stride == stride);
        match existing {
            Some(stream) => stream.elements.push(element),
            None => self.streams.push(Stream {
                block: block.clone(),
                stride,
                endian: Endian::Swap8In32,
                elements: vec![element],
            }),
        }
    }

    /// Retrieve the merged streams
    pub fn finish(self) -> Vec<Stream> {
        self.streams
    }
}
