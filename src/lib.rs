// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

//! # Replay of captured Xenon GPU command streams
//!
//! This crate replays a captured PM4 command stream of a Xenon-era GPU and
//! reconstructs, from that stream alone, the sequence of draw calls, the
//! register state active at each draw and a readable disassembly of the bound
//! vertex and pixel microcode.
//!
//! See [executor] for the packet executor operating on a [RegisterFile],
//! [draw] for the reconstruction of draw calls and draw groups and [shader]
//! for the microcode disassembler and its [cache][shader::cache]. Captures are
//! usually read through [dump], but [RawPacket]s and [MemoryBlock]s may also
//! be constructed directly.
//!
//! # Diagnostics
//!
//! Recoverable conditions such as unresolved memory, invalid packets or
//! malformed microcode are reported through [`tracing`] events. The library
//! never installs a subscriber. Human readable per-packet descriptions are a
//! separate concern and only produced for callers supplying an
//! [executor::Sink].
//!
//! # Example
//!
//! The following example replays a register write followed by a
//! non-indexed draw of a single triangle.
//!
//! ```
//! use xenon_gpu_replay::draw;
//! use xenon_gpu_replay::packet::RawPacket;
//!
//! let packets = [
//!     // Type 0: write one register at index 0x2000 (RB_SURFACE_INFO)
//!     RawPacket::new(0x0000_2000, [0x0000_0500]),
//!     // Type 3: DRAW_INDX, auto-generated indices, 3 vertices, triangle list
//!     RawPacket::new(0xC001_2200, [0x0000_0000, 0x0003_0084]),
//! ];
//!
//! let reconstructor = draw::builder().build();
//! let replay = reconstructor.replay(&packets);
//!
//! assert_eq!(replay.calls().len(), 1);
//! assert_eq!(replay.groups().len(), 1);
//! let capture = replay.calls()[0].capture().unwrap();
//! assert_eq!(capture.reg_by_name("RB_SURFACE_INFO"), Some(0x500));
//! ```

pub mod bits;
pub mod config;
pub mod draw;
pub mod dump;
pub mod executor;
pub mod memory;
pub mod packet;
pub mod registers;
pub mod shader;


pub use memory::MemoryBlock;
pub use packet::RawPacket;
pub use registers::RegisterFile;
