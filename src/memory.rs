// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! GPU memory captured alongside the command stream
//!
//! A capture contains a number of [`MemoryBlock`]s: byte ranges of GPU memory
//! which were referenced by packets, e.g. shader microcode, constant buffers
//! or vertex data. Packets refer to them through [`MemoryRef`]s.
//!
//! Operands of some packets are GPU addresses which need to be mapped to one
//! of those blocks. This module defines the [`Resolver`] trait for that
//! purpose as well as a number of combinators.
//!
//! # Address resolution
//!
//! The GPU may address the same physical memory with the high configuration
//! bits ([`HIGH_ADDRESS_TAG`]) set. A lookup over [`MemoryRef`]s thus first
//! searches for a read-mode reference with an exactly matching address and
//! only then for one matching the tagged address. The first match wins.

use std::sync::Arc;

use core::fmt;


/// High configuration bits under which memory may also be addressed
pub const HIGH_ADDRESS_TAG: u32 = 0xC000_0000;

/// Identity of a [`MemoryBlock`] within a capture
///
/// The identity, not the content, distinguishes blocks. It is the index of the
/// block in the capture's block table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A captured range of GPU memory
///
/// Blocks are immutable for the duration of a session.
#[derive(Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    id: BlockId,
    address: u32,
    crc: u64,
    data: Vec<u8>,
}

impl MemoryBlock {
    /// Create a new block at the given GPU address
    pub fn new(id: BlockId, address: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            address,
            crc: 0,
            data: data.into(),
        }
    }

    /// Create a new block from big endian words
    pub fn from_words(id: BlockId, address: u32, words: &[u32]) -> Self {
        let data: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        Self::new(id, address, data)
    }

    /// Attach the checksum recorded by the capture tool
    pub fn with_crc(self, crc: u64) -> Self {
        Self { crc, ..self }
    }

    /// Retrieve this block's identity
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Retrieve the GPU address of the first byte
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Retrieve the checksum recorded by the capture tool
    pub fn crc(&self) -> u64 {
        self.crc
    }

    /// Retrieve the size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether this block holds no data at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Retrieve the raw bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Load the big endian word at the given byte offset
    pub fn load_u32_be(&self, offset: usize) -> Option<u32> {
        self.word_bytes(offset).map(u32::from_be_bytes)
    }

    /// Load the little endian word at the given byte offset
    pub fn load_u32_le(&self, offset: usize) -> Option<u32> {
        self.word_bytes(offset).map(u32::from_le_bytes)
    }

    /// Iterate over all complete words, interpreted as big endian
    ///
    /// Trailing bytes not forming a complete word are ignored.
    pub fn words_be(&self) -> impl Iterator<Item = u32> + '_ {
        self.data
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
    }

    fn word_bytes(&self, offset: usize) -> Option<[u8; 4]> {
        let end = offset.checked_add(4)?;
        self.data.get(offset..end)?.try_into().ok()
    }
}

impl fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryBlock {{ id: {}, address: {:#010x}, len: {} }}",
            self.id,
            self.address,
            self.data.len()
        )
    }
}

/// Access mode of a [`MemoryRef`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Read,
    Write,
}

impl From<u32> for Mode {
    fn from(raw: u32) -> Self {
        if raw == 1 { Self::Write } else { Self::Read }
    }
}

/// A packet's reference to a [`MemoryBlock`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryRef {
    pub block: Arc<MemoryBlock>,
    pub mode: Mode,
    /// Short tag attached by the capture tool, e.g. `PSSourceCode`
    pub tag: String,
}

impl MemoryRef {
    /// Create a new read-mode reference without tag
    pub fn read(block: Arc<MemoryBlock>) -> Self {
        Self {
            block,
            mode: Mode::Read,
            tag: Default::default(),
        }
    }

    /// Attach a tag to this reference
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..self
        }
    }
}

/// Maps GPU addresses to [`MemoryBlock`]s
pub trait Resolver {
    /// Find the block for the given GPU address
    ///
    /// Returns `None` if the address is not covered. Callers treat absent
    /// memory as zero.
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>>;
}

/// Exact-then-tagged lookup over read-mode references
impl Resolver for [MemoryRef] {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        find_read(self, address).or_else(|| find_read(self, HIGH_ADDRESS_TAG | address))
    }
}

impl Resolver for Vec<MemoryRef> {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        Resolver::find(self.as_slice(), address)
    }
}

fn find_read(refs: &[MemoryRef], address: u32) -> Option<&Arc<MemoryBlock>> {
    refs.iter()
        .find(|r| r.mode == Mode::Read && r.block.address() == address)
        .map(|r| &r.block)
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        R::find(self, address)
    }
}

impl<R: Resolver> Resolver for Option<R> {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        self.as_ref().and_then(|r| r.find(address))
    }
}

/// [`Resolver`] implementation for a tuple of two resolvers
///
/// The second resolver is only consulted if the first does not cover an
/// address.
impl<A: Resolver, B: Resolver> Resolver for (A, B) {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        self.0.find(address).or_else(|| self.1.find(address))
    }
}

#[cfg(feature = "either")]
impl<L: Resolver, R: Resolver> Resolver for either::Either<L, R> {
    fn find(&self, address: u32) -> Option<&Arc<MemoryBlock>> {
        either::for_both!(self, r => r.find(address))
    }
}

/// [`Resolver`] not covering any address
#[derive(Copy, Clone, Debug, Default)]
pub struct Empty;

impl Resolver for Empty {
    fn find(&self, _: u32) -> Option<&Arc<MemoryBlock>> {
        None
    }
}
