// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Packet execution
//!
//! The [`Executor`] replays [`RawPacket`]s one by one against a
//! [`RegisterFile`]. Every packet yields an [`Outcome`]. Execution never
//! fails as a whole: malformed packets are reported as
//! [`Invalid`][Outcome::Invalid] and unresolved memory reads as zero.
//!
//! State mutation and its description are separate concerns. Callers wanting
//! a human readable account of a packet supply a [`Sink`] via
//! [`Executor::execute_with`]. The [`Record`] sink collects everything.
//!
//! # Example
//!
//! ```
//! use xenon_gpu_replay::executor::{self, Outcome, Record};
//! use xenon_gpu_replay::packet::RawPacket;
//! use xenon_gpu_replay::registers::names;
//!
//! let mut executor = executor::builder().build();
//!
//! // EVENT_WRITE with initiator 0x16
//! let packet = RawPacket::new(0xC000_4600, [0x0000_0016]);
//! let mut record = Record::default();
//! assert_eq!(executor.execute_with(&packet, &mut record), Outcome::Executed);
//! assert_eq!(executor.registers().reg(names::VGT_EVENT_INITIATOR), 0x16);
//! assert_eq!(record.description, "EVENT_WRITE");
//! ```

pub mod fetch;
pub mod sink;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use sink::{Record, Sink};

use crate::bits;
use crate::config;
use crate::memory::{self, MemoryBlock, Resolver};
use crate::packet::command::{
    CondWrite, Draw, Half, IndexSource, Poll, PollSource, RegRmw, WriteTarget,
};
use crate::packet::{Command, Header, Opcode, RawPacket};
use crate::registers::{RegisterFile, names};
use crate::shader::{ShaderCache, Stage};

use fetch::{StreamMerger, TextureFetchConstant, VertexFetchConstant};

/// Initial value of the tile mask and selector
const TILE_INIT: u64 = 0xFFFF_FFFF;

/// Result of executing a single packet
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The packet was replayed
    Executed,
    /// The packet was deliberately not replayed
    Skipped,
    /// The packet could not be decoded
    Invalid,
}

/// Create a new [`Builder`] for [`Executor`]s
pub fn builder() -> Builder {
    Builder::new()
}

/// Builder for [`Executor`]s
#[derive(Clone, Debug)]
pub struct Builder<R = memory::Empty> {
    fallback: R,
    registers: RegisterFile,
    cache: Option<Arc<ShaderCache>>,
    params: config::Parameters,
}

impl Builder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            fallback: memory::Empty,
            registers: Default::default(),
            cache: None,
            params: Default::default(),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Builder<R> {
    /// Build the [`Executor`] with the given [`config::Parameters`]
    ///
    /// New builders assume [`Default`] parameters.
    pub fn with_params(self, params: &config::Parameters) -> Self {
        Self {
            params: *params,
            ..self
        }
    }

    /// Build the [`Executor`] with a fallback [`Resolver`]
    ///
    /// Addresses not covered by a packet's own memory references are resolved
    /// via the fallback.
    pub fn with_fallback<F: Resolver>(self, fallback: F) -> Builder<F> {
        Builder {
            fallback,
            registers: self.registers,
            cache: self.cache,
            params: self.params,
        }
    }

    /// Build the [`Executor`] starting from the given register state
    pub fn with_registers(self, registers: RegisterFile) -> Self {
        Self { registers, ..self }
    }

    /// Build the [`Executor`] sharing the given [`ShaderCache`]
    ///
    /// By default, every [`Executor`] has its own cache.
    pub fn with_cache(self, cache: Arc<ShaderCache>) -> Self {
        Self {
            cache: Some(cache),
            ..self
        }
    }

    /// Build the [`Executor`]
    pub fn build(self) -> Executor<R> {
        let cf_limit = self.params.cf_limit;
        Executor {
            registers: self.registers,
            tile_mask: TILE_INIT,
            tile_select: TILE_INIT,
            fallback: self.fallback,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(ShaderCache::with_cf_limit(cf_limit))),
            params: self.params,
        }
    }
}

/// Replays packets against a [`RegisterFile`]
#[derive(Debug)]
pub struct Executor<R = memory::Empty> {
    registers: RegisterFile,
    tile_mask: u64,
    tile_select: u64,
    fallback: R,
    cache: Arc<ShaderCache>,
    params: config::Parameters,
}

impl<R> Executor<R> {
    /// Retrieve the current register state
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Retrieve the 64 bit tile mask
    pub fn tile_mask(&self) -> u64 {
        self.tile_mask
    }

    /// Retrieve the 64 bit tile selector
    pub fn tile_select(&self) -> u64 {
        self.tile_select
    }

    /// Retrieve the shader cache used for draw details
    pub fn cache(&self) -> &Arc<ShaderCache> {
        &self.cache
    }

    /// Retrieve the parameters this executor was built with
    pub fn params(&self) -> &config::Parameters {
        &self.params
    }

    /// Consume the executor, retrieving the final register state
    pub fn into_registers(self) -> RegisterFile {
        self.registers
    }
}

impl<R: Resolver> Executor<R> {
    /// Execute a single packet without describing it
    pub fn execute(&mut self, packet: &RawPacket) -> Outcome {
        self.execute_with(packet, &mut ())
    }

    /// Execute a single packet, describing it to the given [`Sink`]
    pub fn execute_with<S: Sink + ?Sized>(&mut self, packet: &RawPacket, sink: &mut S) -> Outcome {
        if let Header::Opcode {
            opcode,
            predicated: true,
            ..
        } = packet.decode_header()
        {
            if self.tile_mask & self.tile_select == 0 {
                match opcode {
                    Ok(opcode) => sink.describe(format_args!("{opcode}")),
                    Err(raw) => sink.describe(format_args!("Opcode {raw:#04x}")),
                }
                tracing::trace!(header = packet.header(), "Skipping predicated packet");
                return Outcome::Skipped;
            }
        }

        let command = match packet.decode() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(header = packet.header(), "Invalid packet: {e}");
                return Outcome::Invalid;
            }
        };
        sink.describe(format_args!("{command}"));
        if let Some(opcode) = command.opcode() {
            tracing::debug!(%opcode, "Executing packet");
        }

        self.apply(packet, command, sink)
    }

    fn apply<S: Sink + ?Sized>(
        &mut self,
        packet: &RawPacket,
        command: Command<'_>,
        sink: &mut S,
    ) -> Outcome {
        match command {
            Command::SetRegisters {
                base,
                write_one,
                values,
            } => {
                for (i, value) in (0u32..).zip(values) {
                    let index = if write_one { base } else { base + i };
                    self.write(index, *value, sink);
                }
            }
            Command::SetRegisterPair { registers, values } => {
                for (index, value) in registers.into_iter().zip(values) {
                    self.write(index, value, sink);
                }
            }
            Command::Filler | Command::Ignored(_) => return Outcome::Skipped,
            Command::NoOp(_) => (),
            Command::EventWrite { initiator } => {
                self.write(names::VGT_EVENT_INITIATOR, initiator, sink);
            }
            Command::SetTileMask { half, value } => {
                self.tile_mask = splice(self.tile_mask, half, value);
                sink.log(format_args!("Tile mask: 0x{:016X}", self.tile_mask));
            }
            Command::SetTileSelect { half, value } => {
                self.tile_select = splice(self.tile_select, half, value);
                sink.log(format_args!("Tile selector: 0x{:016X}", self.tile_select));
            }
            Command::WaitRegMem { poll, wait } => {
                let value = self.poll(packet, &poll, Read::BigEndian, sink);
                compare(&poll, value, sink);
                sink.log(format_args!("Wait: {wait}"));
            }
            Command::RegRmw(rmw) => self.reg_rmw(&rmw, sink),
            Command::CondWrite(cond) => self.cond_write(packet, &cond, sink),
            Command::SetConstant {
                bank,
                index,
                values,
            } => {
                sink.log(format_args!("Block: {bank}"));
                self.write_block(bank.base() + index, values, sink);
            }
            Command::SetConstantDirect { index, values, .. } => {
                self.write_block(index, values, sink);
            }
            Command::LoadAluConstant {
                address,
                bank,
                index,
                size,
            } => {
                let base = bank.map_or(index, |b| b.base() + index);
                self.load_constants(packet, address, base, size, sink);
            }
            Command::Draw(draw) => self.draw(packet, &draw, sink),
            Command::LoadShader {
                stage,
                address,
                size,
                ..
            } => self.load_shader(packet, stage, address, size, sink),
        }
        Outcome::Executed
    }

    /// Write a single register
    ///
    /// This is the only place mutating register values.
    fn write<S: Sink + ?Sized>(&mut self, index: u32, value: u32, sink: &mut S) {
        if let Err(e) = self.registers.write(index, value) {
            tracing::warn!("Ignoring register write: {e}");
            return;
        }

        tracing::trace!(index, value, "Register written");
        if sink.wants_details() {
            let name = names::name(index).unwrap_or_default();
            sink.log(format_args!(
                "Register {name} ({index}) written with {value} ({})",
                bits::as_f32(value)
            ));
        }
    }

    fn write_block<S: Sink + ?Sized>(&mut self, base: u32, values: &[u32], sink: &mut S) {
        for (i, value) in (0u32..).zip(values) {
            self.write(base + i, *value, sink);
        }
    }

    /// Resolve a GPU address via the packet's memory, then the fallback
    fn resolve<'a>(&'a self, packet: &'a RawPacket, address: u32) -> Option<&'a Arc<MemoryBlock>> {
        let block = packet
            .find_read_block(address)
            .or_else(|| self.fallback.find(address));
        if block.is_none() {
            tracing::warn!("Memory at 0x{address:08X} was not captured");
        }
        block
    }

    /// Read the value polled by WAIT_REG_MEM or COND_WRITE
    fn poll<S: Sink + ?Sized>(
        &self,
        packet: &RawPacket,
        poll: &Poll,
        read: Read,
        sink: &mut S,
    ) -> u32 {
        match poll.source {
            PollSource::Register(index) => {
                let name = names::name(index).unwrap_or_default();
                sink.log(format_args!("Read register: {name} ({index})"));
                self.registers.reg(index)
            }
            PollSource::Memory { address, endian } => {
                sink.log(format_args!("Memory address: 0x{address:X}"));
                sink.log(format_args!("Memory mode: {endian}"));
                let value = self.resolve(packet, address).and_then(|b| match read {
                    Read::BigEndian => b.load_u32_be(0),
                    Read::Swapped => b.load_u32_le(0).map(|v| endian.swap(v)),
                });
                value.unwrap_or(0)
            }
        }
    }

    fn reg_rmw<S: Sink + ?Sized>(&mut self, rmw: &RegRmw, sink: &mut S) {
        let index = rmw.register();
        let name = names::name(index).unwrap_or_default();
        sink.log(format_args!("Register: {name} ({index})"));

        let mut value = self.registers.reg(index);
        sink.log(format_args!("Incoming value: 0x{value:X}"));

        let or_value = if rmw.or_from_register() {
            self.registers.reg(rmw.or_mask & 0x1FFF)
        } else {
            rmw.or_mask
        };
        sink.log(format_args!("Or mask value: 0x{or_value:X}"));
        value |= or_value;

        let and_value = if rmw.and_from_register() {
            self.registers.reg(rmw.and_mask & 0x1FFF)
        } else {
            rmw.and_mask
        };
        sink.log(format_args!("And mask value: 0x{and_value:X}"));
        value &= and_value;

        sink.log(format_args!("Final value: 0x{value:X}"));
        self.write(index, value, sink);
    }

    fn cond_write<S: Sink + ?Sized>(&mut self, packet: &RawPacket, cond: &CondWrite, sink: &mut S) {
        let value = self.poll(packet, &cond.poll, Read::Swapped, sink);
        let matched = compare(&cond.poll, value, sink);
        sink.log(format_args!("Matched: {}", if matched { "YES" } else { "NO" }));
        if !matched {
            return;
        }

        sink.log(format_args!("Write data: 0x{:X}", cond.data));
        match cond.target {
            WriteTarget::Register(index) => self.write(index, cond.data, sink),
            WriteTarget::Memory { address, endian } => {
                sink.log(format_args!("Write address: 0x{address:X}"));
                sink.log(format_args!("Write mode: {endian}"));
                tracing::debug!("Memory write to 0x{address:08X} not replayed");
            }
        }
    }

    fn load_constants<S: Sink + ?Sized>(
        &mut self,
        packet: &RawPacket,
        address: u32,
        base: u32,
        size: u32,
        sink: &mut S,
    ) {
        let name = names::name(base).unwrap_or_default();
        sink.log(format_args!("First register: {name} ({base})"));
        sink.log(format_args!("Num registers: {}", size / 4));
        sink.log(format_args!("Data address: 0x{address:08X}"));

        let Some(block) = self.resolve(packet, address).cloned() else {
            return;
        };
        for (i, value) in (0u32..).zip(block.words_be().take(size as usize)) {
            self.write(base + i, value, sink);
        }
    }

    fn load_shader<S: Sink + ?Sized>(
        &mut self,
        packet: &RawPacket,
        stage: Stage,
        address: Option<u32>,
        size: u32,
        sink: &mut S,
    ) {
        let block = match address {
            Some(address) => self.resolve(packet, address).cloned(),
            None => match packet.memory() {
                [single] => Some(single.block.clone()),
                _ => {
                    tracing::warn!("Embedded shader without a unique memory reference");
                    None
                }
            },
        };

        sink.log(format_args!("Shader type: {stage}"));
        sink.log(format_args!("Shader words: {size}"));
        match block {
            Some(block) => {
                sink.log(format_args!("Shader data: 0x{:06X}", block.address()));
                self.registers.bind_shader(stage, block);
            }
            None => sink.log(format_args!("Shader data: NONE")),
        }
    }

    fn draw<S: Sink + ?Sized>(&mut self, packet: &RawPacket, draw: &Draw, sink: &mut S) {
        tracing::debug!(%draw, "Draw");
        if !sink.wants_details() {
            return;
        }

        let kind = match (draw.opcode, draw.source) {
            (Opcode::DRAW_INDX_2, _) => "Indexed2",
            (_, IndexSource::Dma { .. }) => "Indexed",
            _ => "Not Indexed",
        };
        sink.log(format_args!("Draw: {kind}"));
        if !draw.is_issued() || !self.params.fetch_details {
            return;
        }

        let mut base_vertex = 0;
        if let IndexSource::Dma {
            format,
            address,
            endian,
        } = draw.source
        {
            sink.log(format_args!("Index data endianess: {endian}"));
            match self.resolve(packet, address) {
                Some(block) => sink.log(format_args!(
                    "Index data address: 0x{address:X} (block {}, {format}, stride {})",
                    block.id(),
                    format.size()
                )),
                None => sink.log(format_args!("Index data address: 0x{address:06X}")),
            }
            base_vertex = self.registers.reg(names::VGT_INDX_OFFSET);
        }
        sink.log(format_args!("Index count: {}", draw.index_count));
        sink.log(format_args!("Base vertex: {base_vertex}"));
        sink.log(format_args!("Primitive type: {}", draw.primitive));

        for memory in packet.memory() {
            let stage = match memory.tag.as_str() {
                "PSSourceCode" => "Pixel",
                "VSSourceCode" => "Vertex",
                _ => continue,
            };
            sink.log(format_args!(
                "{stage} shader HLSL: 0x{:06X} (block {})",
                memory.block.address(),
                memory.block.id()
            ));
        }

        self.vertex_streams(packet, sink);
        self.textures(sink);
    }

    /// Resolve the vertex streams read by the bound vertex shader
    fn vertex_streams<S: Sink + ?Sized>(&self, packet: &RawPacket, sink: &mut S) {
        let Some(block) = self.registers.shader(Stage::Vertex) else {
            return;
        };
        let Some(shader) = self.cache.get_or_decompile(Stage::Vertex, block) else {
            return;
        };

        let mut merger = StreamMerger::default();
        for fetch in shader.vertex_fetches() {
            let register = VertexFetchConstant::register(fetch.slot);
            let constant = VertexFetchConstant::decode([
                self.registers.reg(register),
                self.registers.reg(register + 1),
            ]);
            let address = constant.byte_address();
            sink.log(format_args!("VFetch: Address=0x{address:06X} {fetch}"));
            if let Some(block) = self.resolve(packet, address) {
                merger.add(block, fetch);
            }
        }

        for stream in merger.finish() {
            sink.log(format_args!("Stream: {stream}"));
            sink.stream(stream);
        }
    }

    /// Resolve the textures sampled by the bound pixel shader
    fn textures<S: Sink + ?Sized>(&self, sink: &mut S) {
        let Some(block) = self.registers.shader(Stage::Pixel) else {
            return;
        };
        let Some(shader) = self.cache.get_or_decompile(Stage::Pixel, block) else {
            return;
        };

        for fetch in shader.texture_fetches() {
            sink.log(format_args!("Pixel shader texture {}", fetch.slot));
            fetch
                .to_string()
                .lines()
                .for_each(|l| sink.log(format_args!("  Shader: {l}")));

            let register = TextureFetchConstant::register(fetch.slot);
            let words = core::array::from_fn(|i| self.registers.reg(register + i as u32));
            let bound = TextureFetchConstant::decode(words);
            bound
                .to_string()
                .lines()
                .for_each(|l| sink.log(format_args!("  Bound: {l}")));
            sink.texture(bound);
        }
    }
}

/// Byte order applied to polled memory
#[derive(Copy, Clone, Debug)]
enum Read {
    /// Plain big endian load
    BigEndian,
    /// Little endian load followed by the address tag's swap
    Swapped,
}

/// Apply a poll's comparison, describing it
fn compare<S: Sink + ?Sized>(poll: &Poll, value: u32, sink: &mut S) -> bool {
    let masked = value & poll.mask;
    sink.log(format_args!("Incoming value: 0x{value:X}"));
    sink.log(format_args!("Incoming mask: 0x{:X}", poll.mask));
    sink.log(format_args!("Masked value: 0x{masked:X}"));
    match poll.compare.symbol() {
        Some(op) => sink.log(format_args!(
            "Condition: 0x{masked:X} {op} 0x{:X}",
            poll.reference
        )),
        None => sink.log(format_args!("Condition: {:?}", poll.compare)),
    }
    poll.compare.test(masked, poll.reference)
}

/// Replace one half of a 64 bit accumulator
fn splice(value: u64, half: Half, word: u32) -> u64 {
    match half {
        Half::Low => (value & !0xFFFF_FFFF) | u64::from(word),
        Half::High => (value & 0xFFFF_FFFF) | (u64::from(word) << 32),
    }
}
