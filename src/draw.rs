// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Draw call and draw group reconstruction
//!
//! A [`Reconstructor`] replays a complete packet stream with an
//! [`Executor`][executor::Executor] and partitions it into [`DrawCall`]s: every
//! packet since the previous draw, inclusive of the draw packet itself. The
//! register state is captured whenever a draw packet fires.
//!
//! Consecutive draw calls with identical [`Viewport`] and [`RenderTargets`]
//! descriptors form a [`DrawGroup`]. Grouping only ever considers the group
//! opened last.
//!
//! # Example
//!
//! ```
//! use xenon_gpu_replay::{draw, RawPacket};
//!
//! let packets = [
//!     // DRAW_INDX with auto-generated indices, 3 vertices
//!     RawPacket::new(0xC001_2200, [0x0, 0x0003_0084]),
//!     // Type 0 write of PA_SC_WINDOW_SCISSOR_BR
//!     RawPacket::new(0x0000_2082, [0x0100_0100]),
//!     RawPacket::new(0xC001_2200, [0x0, 0x0003_0084]),
//! ];
//!
//! let replay = draw::builder().build().replay(&packets);
//! assert_eq!(replay.calls().len(), 2);
//! assert_eq!(replay.groups().len(), 2);
//! assert_eq!(replay.groups()[1].viewport().scissor.x2, 0x100);
//! ```

pub mod targets;
pub mod viewport;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use core::fmt;

pub use targets::RenderTargets;
pub use viewport::Viewport;

use crate::config;
use crate::executor::{self, Outcome, Record};
use crate::memory::{self, Resolver};
use crate::packet::RawPacket;
use crate::registers::Capture;
use crate::shader::ShaderCache;

/// Create a new [`Builder`] for [`Reconstructor`]s
pub fn builder() -> Builder {
    Builder::new()
}

/// Builder for [`Reconstructor`]s
#[derive(Clone, Debug)]
pub struct Builder<R = memory::Empty> {
    fallback: R,
    cache: Option<Arc<ShaderCache>>,
    params: config::Parameters,
}

impl Builder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            fallback: memory::Empty,
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
    /// Build the [`Reconstructor`] with the given [`config::Parameters`]
    pub fn with_params(self, params: &config::Parameters) -> Self {
        Self {
            params: *params,
            ..self
        }
    }

    /// Build the [`Reconstructor`] with a fallback [`Resolver`]
    ///
    /// See [`executor::Builder::with_fallback`].
    pub fn with_fallback<F: Resolver>(self, fallback: F) -> Builder<F> {
        Builder {
            fallback,
            cache: self.cache,
            params: self.params,
        }
    }

    /// Build the [`Reconstructor`] sharing the given [`ShaderCache`]
    pub fn with_cache(self, cache: Arc<ShaderCache>) -> Self {
        Self {
            cache: Some(cache),
            ..self
        }
    }

    /// Build the [`Reconstructor`]
    pub fn build(self) -> Reconstructor<R> {
        let cf_limit = self.params.cf_limit;
        Reconstructor {
            fallback: self.fallback,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(ShaderCache::with_cf_limit(cf_limit))),
            params: self.params,
        }
    }
}

/// Reconstructs draw calls and draw groups from packet streams
#[derive(Debug)]
pub struct Reconstructor<R = memory::Empty> {
    fallback: R,
    cache: Arc<ShaderCache>,
    params: config::Parameters,
}

impl<R> Reconstructor<R> {
    /// Retrieve the shader cache shared by all replays
    pub fn cache(&self) -> &Arc<ShaderCache> {
        &self.cache
    }
}

impl<R: Resolver> Reconstructor<R> {
    /// Replay a complete packet stream, starting from a zeroed register file
    ///
    /// Replaying the same stream twice yields equal results.
    pub fn replay<'p>(&self, packets: impl IntoIterator<Item = &'p RawPacket>) -> Replay<'p> {
        let mut executor = executor::builder()
            .with_params(&self.params)
            .with_fallback(&self.fallback)
            .with_cache(self.cache.clone())
            .build();

        let mut replay = Replay::default();
        let mut bucket: Option<DrawCall> = None;
        let mut packet_index = 1;
        for raw in packets {
            let call = bucket.get_or_insert_with(|| DrawCall::new(replay.calls.len() + 1));

            let (outcome, record) = if self.params.describe {
                let mut record = Record::default();
                (executor.execute_with(raw, &mut record), Some(record))
            } else {
                (executor.execute(raw), None)
            };
            if outcome == Outcome::Invalid {
                continue;
            }

            call.packets.push(Packet {
                index: packet_index,
                raw,
                outcome,
                record,
            });
            packet_index += 1;

            if raw.is_draw() {
                if let Some(call) = bucket.take() {
                    replay.finalize(call, executor.registers().capture());
                }
            }
        }

        if let Some(call) = bucket {
            tracing::debug!(index = call.index, "Trailing packets without draw");
            replay.calls.push(call);
        }
        replay
    }
}

/// Result of a [`Reconstructor::replay`]
#[derive(Clone, Debug, Default)]
pub struct Replay<'p> {
    calls: Vec<DrawCall<'p>>,
    groups: Vec<DrawGroup>,
}

impl<'p> Replay<'p> {
    /// Retrieve all draw calls in stream order
    ///
    /// The last draw call may lack a [`Capture`] if the stream does not end
    /// with a draw.
    pub fn calls(&self) -> &[DrawCall<'p>] {
        &self.calls
    }

    /// Retrieve all draw groups in stream order
    pub fn groups(&self) -> &[DrawGroup] {
        &self.groups
    }

    /// Retrieve the draw calls belonging to the given group
    pub fn members<'a>(&'a self, group: &'a DrawGroup) -> impl Iterator<Item = &'a DrawCall<'p>> {
        group.members.iter().filter_map(|i| self.calls.get(*i))
    }

    fn finalize(&mut self, mut call: DrawCall<'p>, capture: Capture) {
        let viewport = Viewport::from(&capture);
        let targets = RenderTargets::from(&capture);
        call.capture = Some(capture);

        let position = self.calls.len();
        match self.groups.last_mut() {
            Some(group) if group.viewport == viewport && group.targets == targets => {
                group.members.push(position);
            }
            _ => {
                let index = self.groups.len() + 1;
                tracing::debug!(index, "Opening draw group");
                self.groups.push(DrawGroup {
                    index,
                    viewport,
                    targets,
                    members: vec![position],
                });
            }
        }

        tracing::debug!(index = call.index, packets = call.packets.len(), "Draw call");
        self.calls.push(call);
    }
}

/// A replayed packet
#[derive(Clone, Debug)]
pub struct Packet<'p> {
    index: usize,
    raw: &'p RawPacket,
    outcome: Outcome,
    record: Option<Record>,
}

impl<'p> Packet<'p> {
    /// Retrieve the packet's index, counting only valid packets from 1
    pub fn index(&self) -> usize {
        self.index
    }

    /// Retrieve the raw packet
    pub fn raw(&self) -> &'p RawPacket {
        self.raw
    }

    /// Retrieve the outcome of executing the packet
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Retrieve the packet's description and log
    ///
    /// Only available if [`config::Parameters::describe`] was set.
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }
}

impl fmt::Display for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record {
            Some(record) => f.write_str(&record.description),
            None => write!(f, "Packet 0x{:08X}", self.raw.header()),
        }
    }
}

/// Packets up to and including a draw
#[derive(Clone, Debug)]
pub struct DrawCall<'p> {
    index: usize,
    packets: Vec<Packet<'p>>,
    capture: Option<Capture>,
}

impl<'p> DrawCall<'p> {
    fn new(index: usize) -> Self {
        Self {
            index,
            packets: Default::default(),
            capture: None,
        }
    }

    /// Retrieve the draw call's index, counting from 1
    pub fn index(&self) -> usize {
        self.index
    }

    /// Retrieve the packets belonging to this draw call
    pub fn packets(&self) -> &[Packet<'p>] {
        &self.packets
    }

    /// Retrieve the register state captured at the draw
    ///
    /// Returns `None` for a trailing draw call without draw packet.
    pub fn capture(&self) -> Option<&Capture> {
        self.capture.as_ref()
    }

    /// Derive the viewport descriptor from the captured state
    pub fn viewport(&self) -> Option<Viewport> {
        self.capture.as_ref().map(Viewport::from)
    }

    /// Derive the render target descriptor from the captured state
    pub fn render_targets(&self) -> Option<RenderTargets> {
        self.capture.as_ref().map(RenderTargets::from)
    }
}

impl fmt::Display for DrawCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.packets.first(), self.packets.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "[{}] ({}-{}): {last}",
                self.index,
                first.index(),
                last.index()
            ),
            _ => write!(f, "[{}] (empty)", self.index),
        }
    }
}

/// Consecutive draw calls sharing viewport and render targets
#[derive(Clone, Debug, PartialEq)]
pub struct DrawGroup {
    index: usize,
    viewport: Viewport,
    targets: RenderTargets,
    members: Vec<usize>,
}

impl DrawGroup {
    /// Retrieve the group's index, counting from 1
    pub fn index(&self) -> usize {
        self.index
    }

    /// Retrieve the viewport shared by all members
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Retrieve the render targets shared by all members
    pub fn render_targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Retrieve the positions of the members in [`Replay::calls`]
    pub fn members(&self) -> &[usize] {
        &self.members
    }
}

impl fmt::Display for DrawGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scissor = &self.viewport.scissor;
        write!(f, "[{}x{}] ", scissor.width(), scissor.height())?;
        for (i, color) in self.targets.color.iter().enumerate() {
            if color.enabled {
                write!(f, "COLOR{i} ")?;
            }
        }
        if self.targets.depth.enabled {
            write!(f, "DEPTH ")?;
        }
        write!(f, "[{}]", self.members.len())
    }
}
