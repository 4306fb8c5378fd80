// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! GPU register state
//!
//! The [`RegisterFile`] holds the values of all GPU registers as well as the
//! memory blocks holding the currently bound vertex and pixel shaders. It is
//! the only mutable state of a replay. A [`Capture`] is an immutable snapshot
//! of it, taken whenever a draw is issued.
//!
//! The [`names`] module provides symbolic names for (a subset of) registers.

pub mod names;


use std::sync::Arc;

use core::fmt;

use crate::bits;
use crate::memory::MemoryBlock;
use crate::shader::Stage;

/// Number of registers in a [`RegisterFile`]
pub const REGISTER_COUNT: usize = 0x5003;

/// Mutable GPU register state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    values: Box<[u32]>,
    vertex_shader: Option<Arc<MemoryBlock>>,
    pixel_shader: Option<Arc<MemoryBlock>>,
}

impl RegisterFile {
    /// Retrieve the value of the register with the given index
    pub fn get(&self, index: u32) -> Option<u32> {
        self.values.get(usize::try_from(index).ok()?).copied()
    }

    /// Retrieve the value of a register, or zero if it does not exist
    pub fn reg(&self, index: u32) -> u32 {
        self.get(index).unwrap_or(0)
    }

    /// Retrieve all register values
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Write a single register
    ///
    /// Writes to registers beyond [`REGISTER_COUNT`] are rejected and leave
    /// all state untouched.
    pub fn write(&mut self, index: u32, value: u32) -> Result<(), Error> {
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| self.values.get_mut(i))
            .ok_or(Error::OutOfRange { index })?;
        *slot = value;
        Ok(())
    }

    /// Bind the microcode for the given shader stage
    pub fn bind_shader(&mut self, stage: Stage, block: Arc<MemoryBlock>) {
        match stage {
            Stage::Vertex => self.vertex_shader = Some(block),
            Stage::Pixel => self.pixel_shader = Some(block),
        }
    }

    /// Retrieve the microcode bound for the given shader stage
    pub fn shader(&self, stage: Stage) -> Option<&Arc<MemoryBlock>> {
        match stage {
            Stage::Vertex => self.vertex_shader.as_ref(),
            Stage::Pixel => self.pixel_shader.as_ref(),
        }
    }

    /// Take an immutable snapshot of the current state
    pub fn capture(&self) -> Capture {
        Capture {
            values: self.values.iter().copied().collect(),
            vertex_shader: self.vertex_shader.clone(),
            pixel_shader: self.pixel_shader.clone(),
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            values: vec![0; REGISTER_COUNT].into_boxed_slice(),
            vertex_shader: None,
            pixel_shader: None,
        }
    }
}

/// Snapshot of a [`RegisterFile`] taken at a draw
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capture {
    values: Arc<[u32]>,
    vertex_shader: Option<Arc<MemoryBlock>>,
    pixel_shader: Option<Arc<MemoryBlock>>,
}

impl Capture {
    /// Retrieve the value of the register with the given index
    pub fn get(&self, index: u32) -> Option<u32> {
        self.values.get(usize::try_from(index).ok()?).copied()
    }

    /// Retrieve the value of a register, or zero if it does not exist
    pub fn reg(&self, index: u32) -> u32 {
        self.get(index).unwrap_or(0)
    }

    /// Retrieve the value of a register reinterpreted as float
    pub fn reg_f32(&self, index: u32) -> f32 {
        bits::as_f32(self.reg(index))
    }

    /// Retrieve the value of a register by its symbolic name
    pub fn reg_by_name(&self, name: &str) -> Option<u32> {
        names::lookup(name).and_then(|i| self.get(i))
    }

    /// Retrieve all register values
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Retrieve the microcode bound for the given shader stage
    pub fn shader(&self, stage: Stage) -> Option<&Arc<MemoryBlock>> {
        match stage {
            Stage::Vertex => self.vertex_shader.as_ref(),
            Stage::Pixel => self.pixel_shader.as_ref(),
        }
    }
}

/// Register access errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The register index lies beyond [`REGISTER_COUNT`]
    OutOfRange { index: u32 },
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { index } => {
                write!(f, "Register {index:#06x} is out of range")
            }
        }
    }
}
