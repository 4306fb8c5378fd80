// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Dump loading errors

use core::fmt;

/// Section of a dump file
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Section {
    Header,
    MemoryBlocks,
    MemoryRefs,
    Words,
    Packets,
    CommandBlocks,
    MemoryData,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Header => "header",
            Self::MemoryBlocks => "memory block table",
            Self::MemoryRefs => "memory reference table",
            Self::Words => "data word pool",
            Self::Packets => "packet table",
            Self::CommandBlocks => "command block table",
            Self::MemoryData => "memory data",
        };
        f.write_str(name)
    }
}

/// Errors which may occur while loading a dump
#[derive(Debug)]
pub enum Error {
    /// The file ended within the given section
    Truncated(Section),
    /// The file does not start with the dump magic
    BadMagic(u32),
    /// The dump's format version is not supported
    UnsupportedVersion(u32),
    /// A memory reference names a block beyond the block table
    BlockOutOfRange { index: u32 },
    /// A packet's memory references exceed the reference table
    RefOutOfRange { first: u32, count: u32 },
    /// A packet's payload exceeds the data word pool
    WordsOutOfRange { first: u32, count: u32 },
    /// A command block's packets exceed the packet table
    PacketsOutOfRange { first: u32, count: u32 },
    /// A command block's sub blocks exceed the command block table
    SubBlocksOutOfRange { first: u32, count: u32 },
    /// Reading from the underlying source failed
    Io(std::io::Error),
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated(section) => write!(f, "Dump ends within the {section}"),
            Self::BadMagic(magic) => write!(f, "Not a dump, magic is {magic:#010x}"),
            Self::UnsupportedVersion(v) => write!(f, "Unsupported dump version {v}"),
            Self::BlockOutOfRange { index } => {
                write!(f, "Memory block {index} is out of range")
            }
            Self::RefOutOfRange { first, count } => {
                write!(f, "Memory references {first}+{count} are out of range")
            }
            Self::WordsOutOfRange { first, count } => {
                write!(f, "Data words {first}+{count} are out of range")
            }
            Self::PacketsOutOfRange { first, count } => {
                write!(f, "Command block packets {first}+{count} are out of range")
            }
            Self::SubBlocksOutOfRange { first, count } => {
                write!(f, "Command sub blocks {first}+{count} are out of range")
            }
            Self::Io(_) => write!(f, "Could not read dump"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
