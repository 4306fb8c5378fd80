// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Shader microcode disassembly
//!
//! Shader microcode is a sequence of 32 bit words. Every group of three words
//! encodes two packed control flow ([`cf`]) instructions. EXEC control flow
//! instructions refer to instruction slots, which are again groups of three
//! words in the same array, holding either an [ALU][alu] or a [fetch][fetch]
//! instruction.
//!
//! [`decompile`] turns microcode into a [`Shader`]: human readable lines and
//! tables of the vertex and texture fetches performed. Decompilation is pure
//! and deterministic. The [`ShaderCache`] memoizes it per memory block.
//!
//! # Example
//!
//! ```
//! use xenon_gpu_replay::shader::{self, Stage};
//!
//! // ALLOC(POSITION) followed by an empty EXEC_END
//! let words = [0x0000_0000, 0x0000_C200, 0x2000_0000];
//! let shader = shader::decompile(Stage::Vertex, &words).unwrap();
//! assert_eq!(shader.lines(), ["Alloc(POSITION);", "EXEC"]);
//! ```

pub mod alu;
pub mod cache;
pub mod cf;
pub mod error;
pub mod fetch;
pub mod swizzle;


use std::collections::BTreeSet;

use core::fmt;

pub use cache::ShaderCache;
pub use error::Error;

use crate::config;

/// Shader stage
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    Vertex,
    Pixel,
}

impl Stage {
    /// Create from a raw 2 bit shader type
    ///
    /// Only a type of `1` denotes a pixel shader.
    pub fn from_raw(raw: u32) -> Self {
        if raw & 0x3 == 1 {
            Self::Pixel
        } else {
            Self::Vertex
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "Vertex"),
            Self::Pixel => write!(f, "Pixel"),
        }
    }
}

/// A disassembled shader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shader {
    stage: Stage,
    lines: Vec<String>,
    vertex_fetches: Vec<fetch::VertexFetch>,
    texture_fetches: Vec<fetch::TextureFetch>,
    constants: BTreeSet<u32>,
}

impl Shader {
    /// Retrieve the shader's stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Retrieve the disassembly, one pseudo instruction per line
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Retrieve all vertex fetches in order of appearance
    pub fn vertex_fetches(&self) -> &[fetch::VertexFetch] {
        &self.vertex_fetches
    }

    /// Retrieve all texture fetches in order of appearance
    pub fn texture_fetches(&self) -> &[fetch::TextureFetch] {
        &self.texture_fetches
    }

    /// Retrieve the indices of all directly addressed constants
    pub fn constants(&self) -> &BTreeSet<u32> {
        &self.constants
    }
}

impl fmt::Display for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lines.iter().try_for_each(|l| writeln!(f, "{l}"))
    }
}

/// Decompile microcode with the default control flow limit
///
/// See [`decompile_bounded`].
pub fn decompile(stage: Stage, words: &[u32]) -> Result<Shader, Error> {
    decompile_bounded(stage, words, config::PARAMETERS.cf_limit)
}

/// Decompile microcode, visiting at most `cf_limit` control flow word triples
///
/// Decompilation stops after the first pair of control flow instructions
/// containing an end marker, or when all words are consumed.
pub fn decompile_bounded(stage: Stage, words: &[u32], cf_limit: u32) -> Result<Shader, Error> {
    let mut decompiler = Decompiler::new(stage, words);

    let mut visited = 0u32;
    for (index, triple) in words.chunks(3).enumerate() {
        let [w0, w1, w2] = *triple else {
            return Err(Error::Truncated {
                word: index * 3 + triple.len(),
            });
        };
        if visited >= cf_limit {
            return Err(Error::CycleLimit { limit: cf_limit });
        }
        visited += 1;

        let first = cf::Instruction::decode(w0, w1 & 0xFFFF);
        let second = cf::Instruction::decode((w1 >> 16) | (w2 << 16), w2 >> 16);

        let end_a = decompiler.control_flow(&first)?;
        let end_b = decompiler.control_flow(&second)?;
        if end_a || end_b {
            break;
        }
    }

    Ok(decompiler.finish())
}

/// Condition prefix for unconditionally executed instructions
const UNCONDITIONAL: &str = "    ";

/// Disassembly state
///
/// Instruction specific emission lives in the [`alu`] and [`fetch`] modules.
struct Decompiler<'w> {
    stage: Stage,
    words: &'w [u32],
    lines: Vec<String>,
    vertex_fetches: Vec<fetch::VertexFetch>,
    texture_fetches: Vec<fetch::TextureFetch>,
    constants: BTreeSet<u32>,
    last_stride: u32,
}

impl<'w> Decompiler<'w> {
    fn new(stage: Stage, words: &'w [u32]) -> Self {
        Self {
            stage,
            words,
            lines: Default::default(),
            vertex_fetches: Default::default(),
            texture_fetches: Default::default(),
            constants: Default::default(),
            last_stride: 0,
        }
    }

    fn finish(self) -> Shader {
        Shader {
            stage: self.stage,
            lines: self.lines,
            vertex_fetches: self.vertex_fetches,
            texture_fetches: self.texture_fetches,
            constants: self.constants,
        }
    }

    /// Process a single control flow instruction
    ///
    /// Returns whether the instruction marks the end of the program.
    fn control_flow(&mut self, instruction: &cf::Instruction) -> Result<bool, Error> {
        use cf::Instruction;

        match instruction {
            Instruction::Nop => (),
            Instruction::JmpCall(j) if j.opcode != cf::Opcode::Return => (),
            Instruction::Exec(exec) => {
                self.lines.push("EXEC".into());
                let condition = if exec.is_conditional() {
                    if exec.opcode.is_pred_clean() {
                        self.lines.push(format!("P = BOOL[{}]", exec.bool_addr));
                    }
                    if exec.pred_condition { "(!P)" } else { "( P)" }
                } else {
                    UNCONDITIONAL
                };
                self.exec(exec, condition)?;
            }
            Instruction::Alloc(alloc) => match alloc.buffer_select {
                1 => self.lines.push("Alloc(POSITION);".into()),
                2 => self.lines.push(format!("Alloc(PARAMETERS, {});", 1 + alloc.size)),
                3 => self.lines.push(format!("Alloc(MEMEXPORT, {});", 1 + alloc.size)),
                _ => (),
            },
            Instruction::Loop(cf::Loop { opcode, .. })
            | Instruction::JmpCall(cf::JmpCall { opcode, .. }) => {
                self.lines.push(format!("UNKNOWN CF: 0x{:X}", *opcode as u8));
            }
            Instruction::MarkVsFetchDone => self.lines.push("VFETCH DONE".into()),
        }
        Ok(instruction.is_end())
    }

    /// Process the instruction slots of an EXEC
    fn exec(&mut self, exec: &cf::Exec, condition: &str) -> Result<(), Error> {
        for slot in exec.slots() {
            let words = self.slot_words(slot.address)?;
            match slot.kind {
                cf::SlotKind::Fetch => self.fetch(words, condition, exec.pred_condition),
                cf::SlotKind::Alu => {
                    let alu = alu::Instruction::decode(words);
                    let condition = predicate(
                        condition,
                        exec.pred_condition,
                        alu.pred_select,
                        alu.pred_condition,
                    );
                    self.alu(&alu, condition);
                }
            }
        }
        Ok(())
    }

    fn slot_words(&self, address: u32) -> Result<[u32; 3], Error> {
        let start = usize::try_from(address)
            .ok()
            .and_then(|a| a.checked_mul(3))
            .ok_or(Error::SlotOutOfRange { address })?;
        self.words
            .get(start..)
            .and_then(|w| w.get(..3))
            .and_then(|w| w.try_into().ok())
            .ok_or(Error::SlotOutOfRange { address })
    }
}

/// Determine the condition prefix of an individual instruction
///
/// An instruction selecting a predicate different from the EXEC's overrides
/// the EXEC's condition.
fn predicate<'c>(
    condition: &'c str,
    cf_condition: bool,
    pred_select: bool,
    pred_condition: bool,
) -> &'c str {
    if pred_select && cf_condition != pred_condition {
        if pred_condition { "(!P)" } else { "( P)" }
    } else {
        condition
    }
}
