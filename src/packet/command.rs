// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Decoded packet contents

use core::fmt;

use crate::bits::{Endian, field, flag};
use crate::shader::Stage;

use super::{Header, Opcode, RawPacket};

/// A packet decoded into its operation and operands
///
/// Decoding does not consider the tile predicate of type 3 packets. See the
/// [executor][crate::executor] for that.
///
/// The [`Display`][fmt::Display] impl yields a short description of the
/// packet, e.g. `SetRegs [Start: 8192, Count: 4]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Write a block of registers, or one register repeatedly
    SetRegisters {
        base: u32,
        write_one: bool,
        values: &'a [u32],
    },
    /// Write two arbitrary registers
    SetRegisterPair {
        registers: [u32; 2],
        values: [u32; 2],
    },
    /// Filler packet
    Filler,
    /// Opcode without any effect on the replayed state
    NoOp(Opcode),
    /// Opcode which is deliberately not replayed
    Ignored(Opcode),
    /// Write the event initiator
    EventWrite { initiator: u32 },
    /// Replace one half of the tile mask
    SetTileMask { half: Half, value: u32 },
    /// Replace one half of the tile selector
    SetTileSelect { half: Half, value: u32 },
    /// Wait for a register or memory value
    WaitRegMem { poll: Poll, wait: u32 },
    /// Read-modify-write of a register
    RegRmw(RegRmw),
    /// Conditional write to a register or memory
    CondWrite(CondWrite),
    /// Write inline values into a constant bank
    SetConstant {
        bank: Bank,
        index: u32,
        values: &'a [u32],
    },
    /// Write inline values to registers starting at an absolute index
    SetConstantDirect {
        opcode: Opcode,
        index: u32,
        values: &'a [u32],
    },
    /// Load a constant bank from memory
    LoadAluConstant {
        address: u32,
        bank: Option<Bank>,
        index: u32,
        size: u32,
    },
    /// Issue a draw
    Draw(Draw),
    /// Bind shader microcode
    ///
    /// An `address` of `None` denotes microcode embedded in the packet via its
    /// single memory reference.
    LoadShader {
        stage: Stage,
        address: Option<u32>,
        start: u32,
        size: u32,
    },
}

impl<'a> Command<'a> {
    /// Decode a packet
    pub fn decode(packet: &'a RawPacket) -> Result<Self, Error> {
        let words = packet.words();
        match packet.decode_header() {
            Header::Registers {
                base,
                count,
                write_one,
            } => Ok(Self::SetRegisters {
                base,
                write_one,
                values: take(words, count as usize)?,
            }),
            Header::RegisterPair { first, second } => {
                let [a, b] = array(words)?;
                Ok(Self::SetRegisterPair {
                    registers: [first, second],
                    values: [a, b],
                })
            }
            Header::Filler => Ok(Self::Filler),
            Header::Opcode { opcode, count, .. } => {
                let opcode = opcode.map_err(Error::UnknownOpcode)?;
                Self::decode_opcode(opcode, count as usize, words)
            }
        }
    }

    fn decode_opcode(opcode: Opcode, count: usize, words: &'a [u32]) -> Result<Self, Error> {
        use Opcode::*;

        match opcode {
            ME_INIT | NOP | INTERRUPT | HACK_SWAP | INVALIDATE_STATE | EVENT_WRITE_SHD
            | EVENT_WRITE_EXT => Ok(Self::NoOp(opcode)),
            SET_BIN_MASK | SET_BIN_SELECT => Ok(Self::Ignored(opcode)),
            SET_BIN_MASK_LO | SET_BIN_MASK_HI => {
                let [value] = array(words)?;
                let half = Half::from_low(opcode == SET_BIN_MASK_LO);
                Ok(Self::SetTileMask { half, value })
            }
            SET_BIN_SELECT_LO | SET_BIN_SELECT_HI => {
                let [value] = array(words)?;
                let half = Half::from_low(opcode == SET_BIN_SELECT_LO);
                Ok(Self::SetTileSelect { half, value })
            }
            EVENT_WRITE => {
                let [initiator] = array(words)?;
                Ok(Self::EventWrite {
                    initiator: initiator & 0x3F,
                })
            }
            WAIT_REG_MEM => {
                let [info, poll, reference, mask, wait] = array(words)?;
                Ok(Self::WaitRegMem {
                    poll: Poll::new(info, poll, reference, mask),
                    wait,
                })
            }
            REG_RMW => {
                let [setup] = array(words)?;
                Ok(Self::RegRmw(RegRmw::from_setup(setup)))
            }
            COND_WRITE => {
                let [info, poll, reference, mask, target, data] = array(words)?;
                let target = if info & 0x100 != 0 {
                    WriteTarget::Memory {
                        address: target & !0x3,
                        endian: Endian::from_bits(target),
                    }
                } else {
                    WriteTarget::Register(target)
                };
                Ok(Self::CondWrite(CondWrite {
                    poll: Poll::new(info, poll, reference, mask),
                    target,
                    data,
                }))
            }
            SET_CONSTANT => {
                let words = take(words, count)?;
                let [offset_type] = array(words)?;
                let raw_bank = field(offset_type, 16, 8);
                let bank = Bank::from_raw(raw_bank).ok_or(Error::UnknownBank(raw_bank))?;
                Ok(Self::SetConstant {
                    bank,
                    index: offset_type & 0x7FF,
                    values: &words[1..],
                })
            }
            SET_CONSTANT2 | SET_SHADER_CONSTANTS => {
                let words = take(words, count)?;
                let [offset_type] = array(words)?;
                Ok(Self::SetConstantDirect {
                    opcode,
                    index: offset_type & 0xFFFF,
                    values: &words[1..],
                })
            }
            LOAD_ALU_CONSTANT => {
                let [address, offset_type, size] = array(words)?;
                Ok(Self::LoadAluConstant {
                    address: address & 0x3FFF_FFFF,
                    bank: Bank::from_raw(field(offset_type, 16, 8)),
                    index: offset_type & 0x7FF,
                    size: size & 0xFFF,
                })
            }
            DRAW_INDX => {
                let [_, info] = array(words)?;
                let source = match field(info, 6, 2) {
                    0 => {
                        let [_, _, address, size] = array(words)?;
                        let format = if flag(info, 11) {
                            IndexFormat::Index32
                        } else {
                            IndexFormat::Index16
                        };
                        IndexSource::Dma {
                            format,
                            address,
                            endian: Endian::from_bits(size >> 30),
                        }
                    }
                    raw => IndexSource::from_raw(raw),
                };
                Ok(Self::Draw(Draw {
                    opcode,
                    primitive: PrimitiveType::from(info & 0x3F),
                    index_count: info >> 16,
                    source,
                }))
            }
            DRAW_INDX_2 => {
                let [info] = array(words)?;
                Ok(Self::Draw(Draw {
                    opcode,
                    primitive: PrimitiveType::from(info & 0x3F),
                    index_count: info >> 16,
                    source: IndexSource::from_raw(field(info, 6, 2)),
                }))
            }
            IM_LOAD => {
                let [addr_type, start_size] = array(words)?;
                Ok(Self::LoadShader {
                    stage: Stage::from_raw(addr_type),
                    address: Some(addr_type & !0x3),
                    start: start_size >> 16,
                    size: start_size & 0xFFFF,
                })
            }
            IM_LOAD_IMMEDIATE => {
                let [shader_type, start_size] = array(words)?;
                Ok(Self::LoadShader {
                    stage: Stage::from_raw(shader_type),
                    address: None,
                    start: start_size >> 16,
                    size: start_size & 0xFFFF,
                })
            }
            DRAW_INDX_BIN | DRAW_INDX_2_BIN => Err(Error::Unsupported(opcode)),
        }
    }

    /// Retrieve the [`Opcode`] of a type 3 packet
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Self::SetRegisters { .. } | Self::SetRegisterPair { .. } | Self::Filler => None,
            Self::NoOp(o) | Self::Ignored(o) => Some(*o),
            Self::EventWrite { .. } => Some(Opcode::EVENT_WRITE),
            Self::SetTileMask { half, .. } => Some(match half {
                Half::Low => Opcode::SET_BIN_MASK_LO,
                Half::High => Opcode::SET_BIN_MASK_HI,
            }),
            Self::SetTileSelect { half, .. } => Some(match half {
                Half::Low => Opcode::SET_BIN_SELECT_LO,
                Half::High => Opcode::SET_BIN_SELECT_HI,
            }),
            Self::WaitRegMem { .. } => Some(Opcode::WAIT_REG_MEM),
            Self::RegRmw(_) => Some(Opcode::REG_RMW),
            Self::CondWrite(_) => Some(Opcode::COND_WRITE),
            Self::SetConstant { .. } => Some(Opcode::SET_CONSTANT),
            Self::SetConstantDirect { opcode, .. } => Some(*opcode),
            Self::LoadAluConstant { .. } => Some(Opcode::LOAD_ALU_CONSTANT),
            Self::Draw(d) => Some(d.opcode),
            Self::LoadShader { address: Some(_), .. } => Some(Opcode::IM_LOAD),
            Self::LoadShader { address: None, .. } => Some(Opcode::IM_LOAD_IMMEDIATE),
        }
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetRegisters {
                base,
                write_one: false,
                values,
            } => write!(f, "SetRegs [Start: {base}, Count: {}]", values.len()),
            Self::SetRegisters {
                base,
                write_one: true,
                values,
            } => write!(f, "SetRegs [At: {base}, Times: {}]", values.len()),
            Self::SetRegisterPair {
                registers: [a, b], ..
            } => write!(f, "SetReg2 [RegA: {a}, RegB: {b}]"),
            Self::Filler => write!(f, "Filler"),
            Self::Draw(draw) => write!(f, "{draw}"),
            Self::LoadShader { stage, address, .. } => {
                let stage = match stage {
                    Stage::Pixel => "Pixel",
                    Stage::Vertex => "Vertex",
                };
                let suffix = if address.is_some() { "" } else { "IM" };
                write!(f, "Load{stage}Shader{suffix}")
            }
            command => match command.opcode() {
                Some(opcode) => write!(f, "{opcode}"),
                None => Ok(()),
            },
        }
    }
}

/// Errors which may occur when decoding a [`Command`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The payload holds fewer words than the operation requires
    Truncated { needed: usize, got: usize },
    /// The type 3 opcode is unknown
    UnknownOpcode(u8),
    /// The opcode is known but not replayed
    Unsupported(Opcode),
    /// The constant bank selector is unknown
    UnknownBank(u32),
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, got } => {
                write!(f, "Payload of {got} words, expected at least {needed}")
            }
            Self::UnknownOpcode(o) => write!(f, "Unknown opcode {o:#04x}"),
            Self::Unsupported(o) => write!(f, "Opcode {o} is not supported"),
            Self::UnknownBank(b) => write!(f, "Unknown constant bank {b}"),
        }
    }
}

fn take(words: &[u32], count: usize) -> Result<&[u32], Error> {
    words.get(..count).ok_or(Error::Truncated {
        needed: count,
        got: words.len(),
    })
}

/// Extract the first `N` words
fn array<const N: usize>(words: &[u32]) -> Result<[u32; N], Error> {
    take(words, N)?
        .try_into()
        .map_err(|_| Error::Truncated {
            needed: N,
            got: words.len(),
        })
}

/// Half of a 64 bit tile accumulator
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Half {
    Low,
    High,
}

impl Half {
    fn from_low(low: bool) -> Self {
        if low { Self::Low } else { Self::High }
    }
}

/// Constant bank selector
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bank {
    Alu,
    Fetch,
    Bool,
    Loop,
    Registers,
}

impl Bank {
    /// Create from the raw selector
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Alu),
            1 => Some(Self::Fetch),
            2 => Some(Self::Bool),
            3 => Some(Self::Loop),
            4 => Some(Self::Registers),
            _ => None,
        }
    }

    /// Register index of the bank's first entry
    pub fn base(self) -> u32 {
        use crate::registers::names;

        match self {
            Self::Alu => names::SHADER_CONSTANT_000_X,
            Self::Fetch => names::SHADER_CONSTANT_FETCH_00_0,
            Self::Bool => names::SHADER_CONSTANT_BOOL_000_031,
            Self::Loop => names::SHADER_CONSTANT_LOOP_00,
            Self::Registers => names::RB_SURFACE_INFO,
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alu => "ALU",
            Self::Fetch => "FETCH",
            Self::Bool => "BOOL",
            Self::Loop => "LOOP",
            Self::Registers => "REGISTERS",
        };
        f.write_str(name)
    }
}

/// Comparison applied by polling packets
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Compare {
    Never,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
    Always,
}

impl Compare {
    /// Create from the three lowest bits of a raw value
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0x7 {
            0 => Self::Never,
            1 => Self::Less,
            2 => Self::LessEqual,
            3 => Self::Equal,
            4 => Self::NotEqual,
            5 => Self::GreaterEqual,
            6 => Self::Greater,
            _ => Self::Always,
        }
    }

    /// Apply this comparison to an (already masked) value
    pub fn test(self, value: u32, reference: u32) -> bool {
        match self {
            Self::Never => false,
            Self::Less => value < reference,
            Self::LessEqual => value <= reference,
            Self::Equal => value == reference,
            Self::NotEqual => value != reference,
            Self::GreaterEqual => value >= reference,
            Self::Greater => value > reference,
            Self::Always => true,
        }
    }

    /// Retrieve the operator symbol of a genuine comparison
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Never | Self::Always => None,
            Self::Less => Some("<"),
            Self::LessEqual => Some("<="),
            Self::Equal => Some("=="),
            Self::NotEqual => Some("!="),
            Self::GreaterEqual => Some(">="),
            Self::Greater => Some(">"),
        }
    }
}

/// Source of a polled value
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollSource {
    Register(u32),
    Memory { address: u32, endian: Endian },
}

/// Polling operands shared by WAIT_REG_MEM and COND_WRITE
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Poll {
    pub source: PollSource,
    pub compare: Compare,
    pub reference: u32,
    pub mask: u32,
}

impl Poll {
    fn new(info: u32, poll: u32, reference: u32, mask: u32) -> Self {
        let source = if info & 0x10 != 0 {
            PollSource::Memory {
                address: poll & !0x3,
                endian: Endian::from_bits(poll),
            }
        } else {
            PollSource::Register(poll)
        };
        Self {
            source,
            compare: Compare::from_bits(info),
            reference,
            mask,
        }
    }
}

/// Operands of REG_RMW
///
/// The packet's AND and OR operands are taken from the same payload word as
/// the setup word. Capture tooling relies on this reading, so it is kept.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegRmw {
    pub setup: u32,
    pub and_mask: u32,
    pub or_mask: u32,
}

impl RegRmw {
    fn from_setup(setup: u32) -> Self {
        Self {
            setup,
            and_mask: setup,
            or_mask: setup,
        }
    }

    /// Register being modified
    pub fn register(&self) -> u32 {
        self.setup & 0x1FFF
    }

    /// Whether the OR operand names a register rather than an immediate
    pub fn or_from_register(&self) -> bool {
        flag(self.setup, 30)
    }

    /// Whether the AND operand names a register rather than an immediate
    pub fn and_from_register(&self) -> bool {
        flag(self.setup, 31)
    }
}

/// Destination of a COND_WRITE
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WriteTarget {
    Register(u32),
    Memory { address: u32, endian: Endian },
}

/// Operands of COND_WRITE
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CondWrite {
    pub poll: Poll,
    pub target: WriteTarget,
    pub data: u32,
}

/// Operands of a draw packet
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Draw {
    pub opcode: Opcode,
    pub primitive: PrimitiveType,
    pub index_count: u32,
    pub source: IndexSource,
}

impl Draw {
    /// Check whether this draw is actually issued
    ///
    /// DRAW_INDX issues draws for indices from memory and auto-generated
    /// indices, DRAW_INDX_2 only for the latter.
    pub fn is_issued(&self) -> bool {
        match self.source {
            IndexSource::Dma { .. } => self.opcode == Opcode::DRAW_INDX,
            IndexSource::Auto => true,
            _ => false,
        }
    }
}

impl fmt::Display for Draw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match (self.opcode, self.source) {
            (Opcode::DRAW_INDX_2, _) => "Indexed2 ",
            (_, IndexSource::Dma { .. }) => "Indexed ",
            _ => "",
        };
        write!(f, "Draw: {kind}{} {}", self.primitive, self.index_count)
    }
}

/// Source of a draw's indices
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexSource {
    /// Indices are read from GPU memory
    Dma {
        format: IndexFormat,
        address: u32,
        endian: Endian,
    },
    /// Indices are embedded in the packet
    Immediate,
    /// Indices are generated
    Auto,
    Reserved,
}

impl IndexSource {
    fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Immediate,
            2 => Self::Auto,
            _ => Self::Reserved,
        }
    }
}

/// Size of an index
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexFormat {
    Index16,
    Index32,
}

impl IndexFormat {
    /// Size of a single index in bytes
    pub fn size(self) -> u32 {
        match self {
            Self::Index16 => 2,
            Self::Index32 => 4,
        }
    }
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index16 => write!(f, "FMT_16,UINT"),
            Self::Index32 => write!(f, "FMT_32,UINT"),
        }
    }
}

/// Primitive topology
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveType {
    None,
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleFan,
    TriangleStrip,
    Unknown,
    RectangleList,
    LineLoop,
    QuadList,
    QuadStrip,
    Other(u8),
}

impl From<u32> for PrimitiveType {
    fn from(raw: u32) -> Self {
        match raw & 0x3F {
            0x0 => Self::None,
            0x1 => Self::PointList,
            0x2 => Self::LineList,
            0x3 => Self::LineStrip,
            0x4 => Self::TriangleList,
            0x5 => Self::TriangleFan,
            0x6 => Self::TriangleStrip,
            0x7 => Self::Unknown,
            0x8 => Self::RectangleList,
            0xC => Self::LineLoop,
            0xD => Self::QuadList,
            0xE => Self::QuadStrip,
            other => Self::Other(other as u8),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::PointList => "POINTLIST",
            Self::LineList => "LINELIST",
            Self::LineStrip => "LINESTRIP",
            Self::TriangleList => "TRIANGLELIST",
            Self::TriangleFan => "TRIANGLEFAN",
            Self::TriangleStrip => "TRIANGLESTRIP",
            Self::Unknown => "UNKNOWN",
            Self::RectangleList => "RECTANGLELIST",
            Self::LineLoop => "LINELOOP",
            Self::QuadList => "QUADLIST",
            Self::QuadStrip => "QUADSTRIP",
            Self::Other(raw) => return write!(f, "PRIMITIVE_{raw:#x}"),
        };
        f.write_str(name)
    }
}
