// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Receivers of per-packet descriptions

use core::fmt;

use super::fetch::{Stream, TextureFetchConstant};

/// Receiver of the human readable projection of an executed packet
///
/// A [`Sink`] is purely diagnostic: whatever it does, replaying a packet
/// affects the [`RegisterFile`][crate::RegisterFile] in the same way.
pub trait Sink {
    /// Check whether this sink consumes anything at all
    ///
    /// The [`Executor`][super::Executor] skips work whose only purpose is
    /// feeding a sink, e.g. resolving fetch constants at draws, if this
    /// returns `false`.
    fn wants_details(&self) -> bool {
        true
    }

    /// Set the packet's short description
    fn describe(&mut self, description: fmt::Arguments<'_>);

    /// Add a line to the packet's log
    fn log(&mut self, line: fmt::Arguments<'_>);

    /// Report a texture bound at a draw
    fn texture(&mut self, texture: TextureFetchConstant);

    /// Report a vertex stream read by a draw
    fn stream(&mut self, stream: Stream);
}

/// Sink discarding everything
impl Sink for () {
    fn wants_details(&self) -> bool {
        false
    }

    fn describe(&mut self, _: fmt::Arguments<'_>) {}

    fn log(&mut self, _: fmt::Arguments<'_>) {}

    fn texture(&mut self, _: TextureFetchConstant) {}

    fn stream(&mut self, _: Stream) {}
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn wants_details(&self) -> bool {
        S::wants_details(self)
    }

    fn describe(&mut self, description: fmt::Arguments<'_>) {
        S::describe(self, description)
    }

    fn log(&mut self, line: fmt::Arguments<'_>) {
        S::log(self, line)
    }

    fn texture(&mut self, texture: TextureFetchConstant) {
        S::texture(self, texture)
    }

    fn stream(&mut self, stream: Stream) {
        S::stream(self, stream)
    }
}

/// Sink recording everything for a single packet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub description: String,
    pub log: Vec<String>,
    pub textures: Vec<TextureFetchConstant>,
    pub streams: Vec<Stream>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            description: "Packet".into(),
            log: Default::default(),
            textures: Default::default(),
            streams: Default::default(),
        }
    }
}

impl Sink for Record {
    fn describe(&mut self, description: fmt::Arguments<'_>) {
        self.description = description.to_string();
    }

    fn log(&mut self, line: fmt::Arguments<'_>) {
        self.log.push(line.to_string());
    }

    fn texture(&mut self, texture: TextureFetchConstant) {
        self.textures.push(texture);
    }

    fn stream(&mut self, stream: Stream) {
        self.streams.push(stream);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        self.log.iter().try_for_each(|l| writeln!(f, "  {l}"))
    }
}
